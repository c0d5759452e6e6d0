#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/particle-one/p1-client-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chunk;
pub mod client;
pub mod edgar;
pub mod error;
pub mod params;
mod paginate;
mod table;
pub mod transport;

pub use chunk::{CikFilter, CusipFilter, IdFilter};
pub use client::{Client, MetadataType, ScrollCursor, SearchQuery, SearchResult};
pub use error::{ClientError, Result};
pub use transport::RetryPolicy;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
