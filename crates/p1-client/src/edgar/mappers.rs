//! Mapping lookups between identifier universes.

use polars::prelude::DataFrame;

use crate::edgar::config;
use crate::error::{ClientError, Result};
use crate::paginate::expect_array;
use crate::params::{push_opt, push_opt_joined};
use crate::table::records_to_dataframe;
use crate::transport::{HttpSession, Request, RetryPolicy};

const GVK_ROUTE: &str = "/metadata/gvk";
const CIK_ROUTE: &str = "/metadata/cik";
const ITEM_ROUTE: &str = "/metadata/item";
const MAPPING_ROUTE: &str = "/metadata/mapping";

/// Lookup client for GVK <-> CIK transformation.
#[derive(Debug)]
pub struct GvkCikMapper {
    session: HttpSession,
    base_url: String,
}

impl GvkCikMapper {
    /// Create a mapper for the default server with the default retry policy.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_options(token, &config::default_edgar_base_url(), RetryPolicy::default())
    }

    /// Create a mapper with an explicit base URL and retry policy.
    pub fn with_options(token: &str, base_url: &str, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            session: HttpSession::new(token, retry)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a mapper from `P1_EDGAR_API_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let token = std::env::var(config::EDGAR_TOKEN_ENV)
            .map_err(|_| ClientError::MissingToken(config::EDGAR_TOKEN_ENV.to_string()))?;
        let base_url = std::env::var(config::EDGAR_BASE_URL_ENV)
            .unwrap_or_else(|_| config::default_edgar_base_url());
        Self::with_options(&token, &base_url, RetryPolicy::default())
    }

    /// Get the GVK for a CIK, optionally as of a date (`YYYY-MM-DD`).
    pub fn get_gvk_from_cik(&self, cik: u64, as_of_date: Option<&str>) -> Result<DataFrame> {
        let mut params = Vec::new();
        push_opt(&mut params, "cik", Some(cik))?;
        push_opt(&mut params, "as_of_date", as_of_date)?;
        self.fetch(GVK_ROUTE, params)
    }

    /// Get the CIK for a GVK, optionally as of a date.
    ///
    /// Without a date more than one CIK may be returned.
    pub fn get_cik_from_gvk(&self, gvk: u64, as_of_date: Option<&str>) -> Result<DataFrame> {
        let mut params = Vec::new();
        push_opt(&mut params, "gvk", Some(gvk))?;
        push_opt(&mut params, "gvk_date", as_of_date)?;
        self.fetch(CIK_ROUTE, params)
    }

    fn fetch(&self, route: &str, params: Vec<(String, String)>) -> Result<DataFrame> {
        let request = Request::get(format!("{}{}", self.base_url, route), params);
        let response = self.session.execute(&request)?;
        let records = expect_array(&response, "data")?;
        records_to_dataframe(&records)
    }
}

/// Lookup client for the item mapping.
#[derive(Debug)]
pub struct ItemMapper {
    session: HttpSession,
    base_url: String,
}

impl ItemMapper {
    /// Create a mapper for the default server with the default retry policy.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_options(token, &config::default_edgar_base_url(), RetryPolicy::default())
    }

    /// Create a mapper with an explicit base URL and retry policy.
    pub fn with_options(token: &str, base_url: &str, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            session: HttpSession::new(token, retry)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a mapper from `P1_EDGAR_API_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let token = std::env::var(config::EDGAR_TOKEN_ENV)
            .map_err(|_| ClientError::MissingToken(config::EDGAR_TOKEN_ENV.to_string()))?;
        let base_url = std::env::var(config::EDGAR_BASE_URL_ENV)
            .unwrap_or_else(|_| config::default_edgar_base_url());
        Self::with_options(&token, &base_url, RetryPolicy::default())
    }

    /// Get the full item mapping.
    pub fn get_mapping(&self) -> Result<DataFrame> {
        let params = vec![("mapping_type".to_string(), "items".to_string())];
        self.fetch(MAPPING_ROUTE, params)
    }

    /// Obtain item codes by keywords.
    pub fn get_item_from_keywords(&self, keywords: &[&str]) -> Result<DataFrame> {
        let mut params = Vec::new();
        push_opt_joined(&mut params, "keywords", Some(keywords));
        self.fetch(ITEM_ROUTE, params)
    }

    fn fetch(&self, route: &str, params: Vec<(String, String)>) -> Result<DataFrame> {
        let request = Request::get(format!("{}{}", self.base_url, route), params);
        let response = self.session.execute(&request)?;
        let records = expect_array(&response, "data")?;
        records_to_dataframe(&records)
    }
}
