//! P1 EDGAR data REST API access.
//!
//! This module provides:
//! - Filing payload retrieval for form4, form8, form10 and form13
//! - Form header metadata queries
//! - CIK lookup by GVK, ticker, CUSIP or company name
//! - GVK <-> CIK and item mapping lookups
//!
//! # Example
//!
//! ```no_run
//! use p1_client::edgar::{EdgarClient, Form13Query};
//! use p1_client::CikFilter;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EdgarClient::from_env()?;
//!     let query = Form13Query {
//!         cik: Some(CikFilter::from(vec![320193, 1067983])),
//!         ..Form13Query::default()
//!     };
//!     let tables = client.get_form13_payload(&query)?;
//!     for (name, table) in &tables {
//!         println!("{name}: {} rows", table.height());
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod mappers;

pub use client::{
    CikQuery, EdgarClient, Form4Query, Form8Query, Form10Query, Form13Query, FormHeadersQuery,
};
pub use config::{DateMode, DateRange, ITEM_BLOCK_SIZE, form_types};
pub use mappers::{GvkCikMapper, ItemMapper};
