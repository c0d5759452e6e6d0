//! Client for the P1 EDGAR data REST API.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use serde_json::Value;

use crate::chunk::{CikFilter, CusipFilter, for_each_batch_page, warn_duplicates};
use crate::edgar::config::{
    self, DateRange, FORM8_DATE_FIELDS, FORM8_SORT_COLUMNS, ITEM_BLOCK_SIZE,
};
use crate::error::{ClientError, Result};
use crate::paginate::{Style, expect_array};
use crate::params::push_opt;
use crate::table::{
    cast_fields, merge_tables, parse_datetime_fields, records_to_dataframe, sort_by,
    tables_to_dataframes,
};
use crate::transport::{HttpSession, Request, RetryPolicy};

const PAYLOAD_ROUTE: &str = "/data";
const HEADERS_ROUTE: &str = "/data/headers";
const CIK_ROUTE: &str = "/metadata/cik";

/// Filters for [`EdgarClient::get_form_headers`].
#[derive(Debug, Clone, Default)]
pub struct FormHeadersQuery {
    /// Form types to keep, e.g. `["13F-HR", "4"]`. `None` means all types.
    pub form_type: Option<Vec<String>>,
    /// CIK filter. `None` means all CIKs.
    pub cik: Option<CikFilter>,
    /// Filing date range.
    pub date_range: Option<DateRange>,
}

/// Filters for [`EdgarClient::get_form4_payload`].
#[derive(Debug, Clone, Default)]
pub struct Form4Query {
    /// CIK filter. `None` means all CIKs.
    pub cik: Option<CikFilter>,
    /// Filing date range.
    pub date_range: Option<DateRange>,
}

/// Filters for [`EdgarClient::get_form8_payload`].
#[derive(Debug, Clone, Default)]
pub struct Form8Query {
    /// CIK filter. `None` means all CIKs.
    pub cik: Option<CikFilter>,
    /// Item to retrieve. `None` means all items.
    pub item: Option<String>,
    /// Filing date range.
    pub date_range: Option<DateRange>,
}

/// Filters for [`EdgarClient::get_form10_payload`].
#[derive(Debug, Clone, Default)]
pub struct Form10Query {
    /// CIK filter. `None` means all CIKs.
    pub cik: Option<CikFilter>,
    /// Filing date range.
    pub date_range: Option<DateRange>,
}

/// Filters for [`EdgarClient::get_form13_payload`].
///
/// The CIK and CUSIP filters are mutually exclusive.
#[derive(Debug, Clone, Default)]
pub struct Form13Query {
    /// CIK filter.
    pub cik: Option<CikFilter>,
    /// CUSIP filter, alternative to `cik`.
    pub cusip: Option<CusipFilter>,
    /// Filing date range.
    pub date_range: Option<DateRange>,
}

/// Lookup keys for [`EdgarClient::get_cik`]. Absent fields are not sent.
#[derive(Debug, Clone, Default)]
pub struct CikQuery {
    /// Global Company Key.
    pub gvk: Option<u64>,
    /// Date the GVK is valid at; without it more than one CIK may match.
    pub gvk_date: Option<String>,
    /// Company ticker.
    pub ticker: Option<String>,
    /// CUSIP number.
    pub cusip: Option<String>,
    /// Company name.
    pub company: Option<String>,
}

/// Client for the P1 EDGAR data REST API.
#[derive(Debug)]
pub struct EdgarClient {
    session: HttpSession,
    base_url: String,
}

impl EdgarClient {
    /// Create a client for the default server with the default retry policy.
    ///
    /// The targeted API version can be overridden through
    /// [`config::EDGAR_VERSION_ENV`].
    pub fn new(token: &str) -> Result<Self> {
        Self::with_options(token, &config::default_edgar_base_url(), RetryPolicy::default())
    }

    /// Create a client with an explicit base URL and retry policy.
    pub fn with_options(token: &str, base_url: &str, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            session: HttpSession::new(token, retry)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from `P1_EDGAR_API_TOKEN` (and optionally
    /// `P1_EDGAR_API_URL`).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let token = std::env::var(config::EDGAR_TOKEN_ENV)
            .map_err(|_| ClientError::MissingToken(config::EDGAR_TOKEN_ENV.to_string()))?;
        let base_url = std::env::var(config::EDGAR_BASE_URL_ENV)
            .unwrap_or_else(|_| config::default_edgar_base_url());
        Self::with_options(&token, &base_url, RetryPolicy::default())
    }

    /// Get form header metadata matching the query.
    pub fn get_form_headers(&self, query: &FormHeadersQuery) -> Result<DataFrame> {
        check_form_types(query.form_type.as_deref())?;
        warn_duplicates("cik", query.cik.as_ref());
        let mut params = Vec::new();
        if let Some(types) = &query.form_type {
            for form_type in types {
                params.push(("form_type".to_string(), form_type.clone()));
            }
        }
        if let Some(range) = &query.date_range {
            range.encode(&mut params)?;
        }
        let base = Request::get(self.url(HEADERS_ROUTE), params);
        let mut records = Vec::new();
        for_each_batch_page(
            &self.session,
            &base,
            "cik",
            query.cik.as_ref(),
            ITEM_BLOCK_SIZE,
            Style::Link,
            |page| {
                records.extend(page.data.as_array().cloned().unwrap_or_default());
                Ok(())
            },
        )?;
        records_to_dataframe(&records)
    }

    /// Get form4 payload tables matching the query.
    ///
    /// Returns one DataFrame per normalized sub-table, keyed by table name.
    pub fn get_form4_payload(&self, query: &Form4Query) -> Result<BTreeMap<String, DataFrame>> {
        self.form4_13_payload("form4", query.cik.as_ref(), None, query.date_range.as_ref())
    }

    /// Get form13 payload tables matching the query.
    ///
    /// Filtering by CIK and CUSIP at the same time is a precondition error.
    pub fn get_form13_payload(&self, query: &Form13Query) -> Result<BTreeMap<String, DataFrame>> {
        self.form4_13_payload(
            "form13",
            query.cik.as_ref(),
            query.cusip.as_ref(),
            query.date_range.as_ref(),
        )
    }

    /// Get the form8 payload table matching the query.
    ///
    /// The accumulated table is sorted by filing date, CIK and item name,
    /// with the declared numeric and timestamp fields cast.
    pub fn get_form8_payload(&self, query: &Form8Query) -> Result<DataFrame> {
        warn_duplicates("cik", query.cik.as_ref());
        let mut params = Vec::new();
        push_opt(&mut params, "item", query.item.as_deref())?;
        if let Some(range) = &query.date_range {
            range.encode(&mut params)?;
        }
        let base = Request::get(self.payload_url("form8"), params);
        let mut records = Vec::new();
        for_each_batch_page(
            &self.session,
            &base,
            "cik",
            query.cik.as_ref(),
            ITEM_BLOCK_SIZE,
            Style::Link,
            |page| {
                records.extend(page.data.as_array().cloned().unwrap_or_default());
                Ok(())
            },
        )?;
        let df = records_to_dataframe(&records)?;
        let df = cast_fields(df, &config::form8_field_casts())?;
        let df = parse_datetime_fields(df, &FORM8_DATE_FIELDS)?;
        sort_by(df, &FORM8_SORT_COLUMNS)
    }

    /// Get raw form10 payload records matching the query.
    ///
    /// Form10 payloads are nested documents, so they are returned as raw
    /// records instead of a table.
    pub fn get_form10_payload(&self, query: &Form10Query) -> Result<Vec<Value>> {
        warn_duplicates("cik", query.cik.as_ref());
        let mut params = Vec::new();
        if let Some(range) = &query.date_range {
            range.encode(&mut params)?;
        }
        let base = Request::get(self.payload_url("form10"), params);
        let mut records = Vec::new();
        for_each_batch_page(
            &self.session,
            &base,
            "cik",
            query.cik.as_ref(),
            ITEM_BLOCK_SIZE,
            Style::Link,
            |page| {
                records.extend(page.data.as_array().cloned().unwrap_or_default());
                Ok(())
            },
        )?;
        Ok(records)
    }

    /// Get the payload of a single form10 filing by its unique form ID.
    pub fn get_form10_uuid_payload(&self, uuid: &str) -> Result<Value> {
        let request = Request::get(format!("{}/uuid", self.payload_url("form10")), vec![(
            "uuid".to_string(),
            uuid.to_string(),
        )]);
        let response = self.session.execute(&request)?;
        response
            .get("data")
            .cloned()
            .ok_or_else(|| ClientError::Response("response is missing the `data` key".to_string()))
    }

    /// Obtain Central Index Keys by the given lookup keys.
    pub fn get_cik(&self, query: &CikQuery) -> Result<DataFrame> {
        let mut params = Vec::new();
        push_opt(&mut params, "gvk", query.gvk)?;
        push_opt(&mut params, "gvk_date", query.gvk_date.as_deref())?;
        push_opt(&mut params, "ticker", query.ticker.as_deref())?;
        push_opt(&mut params, "cusip", query.cusip.as_deref())?;
        push_opt(&mut params, "company", query.company.as_deref())?;
        let request = Request::get(self.url(CIK_ROUTE), params);
        let response = self.session.execute(&request)?;
        let records = expect_array(&response, "data")?;
        records_to_dataframe(&records)
    }

    /// The form types accepted by [`Self::get_form_headers`].
    #[must_use]
    pub fn form_types(&self) -> Vec<&'static str> {
        config::form_types()
    }

    fn form4_13_payload(
        &self,
        form: &str,
        cik: Option<&CikFilter>,
        cusip: Option<&CusipFilter>,
        date_range: Option<&DateRange>,
    ) -> Result<BTreeMap<String, DataFrame>> {
        if cik.is_some() && cusip.is_some() {
            return Err(ClientError::Precondition(
                "the cik and cusip parameters cannot be passed at the same time".to_string(),
            ));
        }
        warn_duplicates("cik", cik);
        warn_duplicates("cusip", cusip);
        let mut params = Vec::new();
        if let Some(range) = date_range {
            range.encode(&mut params)?;
        }
        let base = Request::get(self.payload_url(form), params);
        let mut tables: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        if cusip.is_some() {
            for_each_batch_page(
                &self.session,
                &base,
                "cusip",
                cusip,
                ITEM_BLOCK_SIZE,
                Style::Link,
                |page| merge_tables(&mut tables, &page.data),
            )?;
        } else {
            for_each_batch_page(
                &self.session,
                &base,
                "cik",
                cik,
                ITEM_BLOCK_SIZE,
                Style::Link,
                |page| merge_tables(&mut tables, &page.data),
            )?;
        }
        tables_to_dataframes(tables)
    }

    fn payload_url(&self, form: &str) -> String {
        format!("{}{}/{}", self.base_url, PAYLOAD_ROUTE, form)
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }
}

/// Reject form types outside the accepted catalog.
fn check_form_types(form_type: Option<&[String]>) -> Result<()> {
    if let Some(types) = form_type {
        let valid = config::form_types();
        let unknown: Vec<&str> = types
            .iter()
            .map(String::as_str)
            .filter(|t| !valid.contains(t))
            .collect();
        if !unknown.is_empty() {
            return Err(ClientError::Precondition(format!(
                "form types {unknown:?} are not allowed, the accepted types are {valid:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> EdgarClient {
        EdgarClient::with_options("token", "http://localhost:1", RetryPolicy::none()).unwrap()
    }

    #[test]
    fn test_cik_and_cusip_are_mutually_exclusive() {
        let client = test_client();
        let query = Form13Query {
            cik: Some(CikFilter::from(123_u64)),
            cusip: Some(CusipFilter::from("qwe")),
            ..Form13Query::default()
        };
        // Fails fast, before any request is issued.
        let result = client.get_form13_payload(&query);
        assert!(matches!(result, Err(ClientError::Precondition(_))));
    }

    #[test]
    fn test_unknown_form_type_is_rejected() {
        let client = test_client();
        let query = FormHeadersQuery {
            form_type: Some(vec!["13F-HR".to_string(), "99-X".to_string()]),
            ..FormHeadersQuery::default()
        };
        let result = client.get_form_headers(&query);
        assert!(matches!(result, Err(ClientError::Precondition(_))));
    }

    #[test]
    fn test_date_range_without_bounds_fails_before_any_request() {
        let client = test_client();
        let query = Form8Query {
            date_range: Some(DateRange {
                start_datetime: None,
                end_datetime: None,
                date_mode: crate::edgar::DateMode::PublicationDate,
            }),
            ..Form8Query::default()
        };
        let result = client.get_form8_payload(&query);
        assert!(matches!(result, Err(ClientError::Precondition(_))));
    }

    #[test]
    fn test_form_types_catalog() {
        let client = test_client();
        assert!(client.form_types().contains(&"10-Q/A"));
    }
}
