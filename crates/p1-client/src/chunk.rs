//! Identifier-filter chunking.
//!
//! Identifier filters (CIK, CUSIP) can be a single value or a list. Lists are
//! split into bounded batches before they are sent, so no single request URL
//! or server-side result set grows unbounded. Batches preserve the original
//! order and collectively cover the input exactly once.

use std::collections::HashSet;
use std::hash::Hash;

use tracing::{debug, warn};

use crate::error::Result;
use crate::paginate::{Page, Pages, Style};
use crate::transport::{HttpSession, Request};

/// An identifier filter: one value or a list of values.
///
/// `None` at the call site means "no filter", which turns into a single
/// unfiltered fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdFilter<T> {
    /// Filter by exactly one identifier.
    One(T),
    /// Filter by a list of identifiers, fetched in batches.
    Many(Vec<T>),
}

/// CIK filter for the EDGAR endpoints.
pub type CikFilter = IdFilter<u64>;

/// CUSIP filter for the form13 endpoint.
pub type CusipFilter = IdFilter<String>;

impl<T> From<T> for IdFilter<T> {
    fn from(value: T) -> Self {
        Self::One(value)
    }
}

impl<T> From<Vec<T>> for IdFilter<T> {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values)
    }
}

impl From<&str> for IdFilter<String> {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

/// Split a filter into ordered request batches of at most `block_size`.
///
/// `None` yields one unfiltered pass; a scalar yields one singleton batch; a
/// list yields contiguous slices in original order, without deduplication.
pub(crate) fn batches<T: Clone>(
    filter: Option<&IdFilter<T>>,
    block_size: usize,
) -> Vec<Option<Vec<T>>> {
    match filter {
        None => vec![None],
        Some(IdFilter::One(value)) => vec![Some(vec![value.clone()])],
        Some(IdFilter::Many(values)) => values
            .chunks(block_size.max(1))
            .map(|chunk| Some(chunk.to_vec()))
            .collect(),
    }
}

/// Warn when a list filter contains duplicated values.
///
/// Best effort only; the request is sent unchanged.
pub(crate) fn warn_duplicates<T: Eq + Hash>(name: &str, filter: Option<&IdFilter<T>>) {
    if let Some(IdFilter::Many(values)) = filter {
        let unique: HashSet<&T> = values.iter().collect();
        if unique.len() < values.len() {
            warn!("some values in the `{name}` parameter are duplicated");
        }
    }
}

/// Drive the page walker once per filter batch.
///
/// Each batch is substituted into the request under `key` as repeated query
/// values, and every page of every batch is handed to `on_page` in arrival
/// order.
pub(crate) fn for_each_batch_page<T, F>(
    session: &HttpSession,
    base: &Request,
    key: &str,
    filter: Option<&IdFilter<T>>,
    block_size: usize,
    style: Style,
    mut on_page: F,
) -> Result<()>
where
    T: Clone + ToString,
    F: FnMut(Page) -> Result<()>,
{
    for batch in batches(filter, block_size) {
        let mut request = base.clone();
        if let Some(values) = batch {
            request.set_repeated_param(key, values.iter().map(ToString::to_string));
        }
        for page in Pages::new(session, request, style) {
            let page = page?;
            debug!(key, total = page.count, "page received");
            on_page(page)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_no_filter_is_one_unbounded_pass() {
        let batches = batches::<u64>(None, 500);
        assert_eq!(batches, vec![None]);
    }

    #[test]
    fn test_scalar_filter_is_one_singleton_batch() {
        let filter = CikFilter::from(320193_u64);
        assert_eq!(batches(Some(&filter), 500), vec![Some(vec![320193])]);
    }

    #[rstest]
    #[case(1200, 500, vec![500, 500, 200])]
    #[case(500, 500, vec![500])]
    #[case(501, 500, vec![500, 1])]
    #[case(3, 500, vec![3])]
    fn test_list_filter_batch_sizes(
        #[case] len: usize,
        #[case] block: usize,
        #[case] expected: Vec<usize>,
    ) {
        let values: Vec<u64> = (0..len as u64).collect();
        let filter = CikFilter::from(values);
        let sizes: Vec<usize> = batches(Some(&filter), block)
            .iter()
            .map(|b| b.as_ref().map_or(0, Vec::len))
            .collect();
        assert_eq!(sizes, expected);
    }

    #[test]
    fn test_batches_reassemble_to_original_list() {
        let values: Vec<u64> = (0..1200).rev().collect();
        let filter = CikFilter::from(values.clone());
        let reassembled: Vec<u64> = batches(Some(&filter), 500)
            .into_iter()
            .flat_map(|b| b.unwrap_or_default())
            .collect();
        assert_eq!(reassembled, values);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let filter = CusipFilter::from(vec!["qwe".to_string(), "qwe".to_string()]);
        warn_duplicates("cusip", Some(&filter));
        let reassembled: Vec<String> = batches(Some(&filter), 500)
            .into_iter()
            .flat_map(|b| b.unwrap_or_default())
            .collect();
        assert_eq!(reassembled, vec!["qwe".to_string(), "qwe".to_string()]);
    }

    #[test]
    fn test_empty_list_yields_no_batches() {
        let filter = CikFilter::from(Vec::new());
        assert!(batches(Some(&filter), 500).is_empty());
    }
}
