//! Client for the P1 data REST API: search, payloads and metadata.

use std::str::FromStr;

use polars::prelude::DataFrame;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::paginate::{Pages, Style, expect_array, expect_str, expect_u64};
use crate::table::{one_column_table, records_to_dataframe};
use crate::transport::{HttpSession, Request, RetryPolicy};

/// Default REST API server URL.
pub const DEFAULT_BASE_URL: &str = "https://data.particle.one";

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "P1_API_TOKEN";

/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "P1_API_URL";

const SEARCH_ROUTE: &str = "/data-api/v1/search/";
const SEARCH_SCROLL_ROUTE: &str = "/data-api/v1/search-scroll/";
const PAYLOAD_ROUTE: &str = "/data-api/v1/payload/";

/// Search filters for [`Client::search`]. Absent fields are not sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchQuery {
    /// Free-text search over payload names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Commodity filter, see [`MetadataType::Commodities`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commodity: Option<String>,
    /// Business category filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_category: Option<String>,
    /// Country filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Frequency filter, e.g. `Monthly`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

/// Cursor for continuing a paginated search.
///
/// Returned by [`Client::search`] and advanced by every
/// [`Client::search_scroll`] call; threading it explicitly keeps independent
/// searches on one client safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollCursor {
    /// Opaque server-issued continuation token.
    pub scroll_id: String,
    /// Total number of matching records reported by the server.
    pub total_count: u64,
}

/// One page of search results plus the cursor for the next page.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Matching payload rows.
    pub table: DataFrame,
    /// Cursor to pass to [`Client::search_scroll`] for the next page.
    pub cursor: ScrollCursor,
}

/// Metadata enumerations served by the data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataType {
    /// Commodity names.
    Commodities,
    /// Business category names.
    BusinessCategories,
    /// Country names.
    Countries,
    /// Payload frequencies.
    Frequencies,
}

impl MetadataType {
    /// Every supported metadata type.
    pub const ALL: [Self; 4] = [
        Self::Commodities,
        Self::BusinessCategories,
        Self::Countries,
        Self::Frequencies,
    ];

    /// Canonical name, also used as the result column name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Commodities => "COMMODITIES",
            Self::BusinessCategories => "BUSINESS-CATEGORIES",
            Self::Countries => "COUNTRIES",
            Self::Frequencies => "FREQUENCIES",
        }
    }

    const fn route(self) -> &'static str {
        match self {
            Self::Commodities => "/data-api/v1/commodities/",
            Self::BusinessCategories => "/data-api/v1/business-categories/",
            Self::Countries => "/data-api/v1/countries/",
            Self::Frequencies => "/data-api/v1/frequencies/",
        }
    }
}

impl std::fmt::Display for MetadataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataType {
    type Err = ClientError;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mt| mt.as_str() == name)
            .ok_or_else(|| {
                ClientError::Precondition(format!(
                    "{name} metadata type is not supported in the client"
                ))
            })
    }
}

/// Client for the P1 data REST API.
#[derive(Debug)]
pub struct Client {
    session: HttpSession,
    base_url: String,
}

impl Client {
    /// Create a client for the default server with the default retry policy.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_options(token, DEFAULT_BASE_URL, RetryPolicy::default())
    }

    /// Create a client with an explicit base URL and retry policy.
    pub fn with_options(token: &str, base_url: &str, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            session: HttpSession::new(token, retry)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from `P1_API_TOKEN` (and optionally `P1_API_URL`).
    ///
    /// A `.env` file is loaded first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let token = std::env::var(TOKEN_ENV)
            .map_err(|_| ClientError::MissingToken(TOKEN_ENV.to_string()))?;
        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_options(&token, &base_url, RetryPolicy::default())
    }

    /// Search payload IDs by the given filters.
    ///
    /// Returns the first page of matches and a [`ScrollCursor`] for fetching
    /// the rest with [`Self::search_scroll`] or [`Self::search_pages`].
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        let body = serde_json::to_value(query)?;
        let request = Request::post(self.url(SEARCH_ROUTE), body);
        let response = self.session.execute(&request)?;
        Self::parse_search(&response, None)
    }

    /// Fetch the next page of a previously started search.
    pub fn search_scroll(&self, cursor: &ScrollCursor) -> Result<SearchResult> {
        let request = Request::get(self.url(SEARCH_SCROLL_ROUTE), vec![(
            "scroll_id".to_string(),
            cursor.scroll_id.clone(),
        )]);
        let response = self.session.execute(&request)?;
        Self::parse_search(&response, Some(cursor.total_count))
    }

    /// Lazily scroll through the remaining pages of a search.
    ///
    /// Stops at the first empty page or after `pages_limit` pages. Dropping
    /// the iterator early simply stops further requests.
    pub fn search_pages(
        &self,
        cursor: ScrollCursor,
        pages_limit: usize,
    ) -> impl Iterator<Item = Result<DataFrame>> + '_ {
        let request = Request::get(self.url(SEARCH_SCROLL_ROUTE), vec![(
            "scroll_id".to_string(),
            cursor.scroll_id,
        )]);
        let limit = if cursor.total_count == 0 {
            0
        } else {
            pages_limit
        };
        Pages::new(&self.session, request, Style::Scroll)
            .map(|page| {
                let page = page?;
                let records = page.data.as_array().cloned().unwrap_or_default();
                records_to_dataframe(&records)
            })
            .take(limit)
    }

    /// Get time-series data for one payload ID from the search results.
    pub fn get_payload(&self, payload_id: &str) -> Result<DataFrame> {
        let request = Request::get(self.url(PAYLOAD_ROUTE), vec![(
            "payload_id".to_string(),
            payload_id.to_string(),
        )]);
        let response = self.session.execute(&request)?;
        let records = expect_array(&response, "payload_data")?;
        records_to_dataframe(&records)
    }

    /// Get the list of values for a metadata type.
    ///
    /// The result is a one-column table named after the metadata type.
    pub fn get_metadata_type(&self, metadata_type: MetadataType) -> Result<DataFrame> {
        let request = Request::get(self.url(metadata_type.route()), Vec::new());
        let response = self.session.execute(&request)?;
        let records = expect_array(&response, "data")?;
        let names = records
            .iter()
            .map(|row| expect_str(row, "name"))
            .collect::<Result<Vec<_>>>()?;
        one_column_table(metadata_type.as_str(), names)
    }

    /// The metadata types this client can enumerate.
    #[must_use]
    pub const fn metadata_types(&self) -> &'static [MetadataType] {
        &MetadataType::ALL
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    fn parse_search(response: &Value, carried_total: Option<u64>) -> Result<SearchResult> {
        let rows = expect_array(response, "rows")?;
        let scroll_id = expect_str(response, "scroll_id")?;
        let total_count = match carried_total {
            Some(total) => total,
            None => expect_u64(response, "total_count")?,
        };
        Ok(SearchResult {
            table: records_to_dataframe(&rows)?,
            cursor: ScrollCursor {
                scroll_id,
                total_count,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_metadata_type_round_trip() {
        for mt in MetadataType::ALL {
            assert_eq!(mt.as_str().parse::<MetadataType>().unwrap(), mt);
        }
    }

    #[test]
    fn test_unknown_metadata_type_is_a_precondition_error() {
        let result = "Stranger Things".parse::<MetadataType>();
        assert!(matches!(result, Err(ClientError::Precondition(_))));
    }

    #[test]
    fn test_search_query_skips_absent_filters() {
        let query = SearchQuery {
            text: Some("Gas".to_string()),
            ..SearchQuery::default()
        };
        let body = serde_json::to_value(&query).unwrap();
        assert_eq!(body, json!({"text": "Gas"}));
    }

    #[test]
    fn test_parse_search_extracts_cursor() {
        let response = json!({
            "scroll_id": "abc",
            "total_count": 5555,
            "rows": [{"name": "Gas", "payload_id": "p1"}],
        });
        let result = Client::parse_search(&response, None).unwrap();
        assert_eq!(result.cursor.scroll_id, "abc");
        assert_eq!(result.cursor.total_count, 5555);
        assert_eq!(result.table.height(), 1);
    }

    #[test]
    fn test_parse_search_missing_key_is_a_response_error() {
        let response = json!({"message": "strange_message"});
        let result = Client::parse_search(&response, None);
        assert!(matches!(result, Err(ClientError::Response(_))));
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client = Client::with_options("token", "http://localhost:1/", RetryPolicy::none())
            .unwrap();
        assert_eq!(client.url("/data-api/v1/search/"), "http://localhost:1/data-api/v1/search/");
    }
}
