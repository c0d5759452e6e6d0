//! Constants and shared argument types for the EDGAR endpoints.

use std::str::FromStr;

use polars::prelude::DataType;

use crate::error::{ClientError, Result};
use crate::params::push_opt;

/// EDGAR data API version this client targets.
pub const DEFAULT_EDGAR_DATA_API_VERSION: &str = "7";

/// Environment variable overriding the targeted EDGAR API version.
pub const EDGAR_VERSION_ENV: &str = "P1_EDGAR_API_VERSION";

/// Environment variable holding the EDGAR API token.
pub const EDGAR_TOKEN_ENV: &str = "P1_EDGAR_API_TOKEN";

/// Environment variable overriding the EDGAR base URL.
pub const EDGAR_BASE_URL_ENV: &str = "P1_EDGAR_API_URL";

/// Number of identifiers (CIK, CUSIP) sent per request. Larger filter lists
/// are chunked so query URLs and server-side result sets stay bounded.
pub const ITEM_BLOCK_SIZE: usize = 500;

/// Mapping between short form names and form types in the EDGAR universe.
pub(crate) const FORM_NAMES_TYPES: [(&str, &[&str]); 4] = [
    ("form4", &["3", "3/A", "4", "4/A", "5", "5/A"]),
    ("form8", &["8-K", "8-K/A"]),
    ("form10", &["10-K", "10-K/A", "10-Q", "10-Q/A"]),
    ("form13", &["13F-HR", "13F-HR/A"]),
];

/// Form8 timestamp fields parsed into datetime columns.
pub(crate) const FORM8_DATE_FIELDS: [&str; 5] = [
    "form_publication_timestamp",
    "filing_date",
    "compustat_timestamp",
    "period_of_report",
    "creation_timestamp",
];

/// Form8 columns cast to declared types after accumulation.
pub(crate) fn form8_field_casts() -> Vec<(&'static str, DataType)> {
    vec![("gvk", DataType::Int64), ("item_value", DataType::Float64)]
}

/// Sort keys applied to the accumulated form8 table.
pub(crate) const FORM8_SORT_COLUMNS: [&str; 3] = ["filing_date", "cik", "item_name"];

/// Default EDGAR base URL, honoring the version override variable.
pub(crate) fn default_edgar_base_url() -> String {
    let version = std::env::var(EDGAR_VERSION_ENV)
        .unwrap_or_else(|_| DEFAULT_EDGAR_DATA_API_VERSION.to_string());
    format!("https://data.particle.one/edgar/v{version}")
}

/// Selects which server-side timestamp a date range filters against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMode {
    /// Filter on the filing's nominal publication date.
    PublicationDate,
    /// Filter on the date the server ingested the filing.
    KnowledgeDate,
}

impl DateMode {
    /// Wire name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PublicationDate => "publication_date",
            Self::KnowledgeDate => "knowledge_date",
        }
    }
}

impl std::fmt::Display for DateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateMode {
    type Err = ClientError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "publication_date" => Ok(Self::PublicationDate),
            "knowledge_date" => Ok(Self::KnowledgeDate),
            other => Err(ClientError::Precondition(format!(
                "the date_mode parameter has to be publication_date or knowledge_date, got `{other}`"
            ))),
        }
    }
}

/// Filing date-range filter.
///
/// The mode is mandatory whenever a range is given, and a range needs at
/// least one bound; both rules are checked before any request goes out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    /// Keep filings dated on or after this bound, `YYYY-MM-DDTHH:MI:SS`.
    pub start_datetime: Option<String>,
    /// Keep filings dated on or before this bound, `YYYY-MM-DDTHH:MI:SS`.
    pub end_datetime: Option<String>,
    /// Which server-side timestamp the bounds apply to.
    pub date_mode: DateMode,
}

impl DateRange {
    /// Range over publication dates.
    #[must_use]
    pub fn publication(start: Option<&str>, end: Option<&str>) -> Self {
        Self::bounded(start, end, DateMode::PublicationDate)
    }

    /// Range over knowledge dates.
    #[must_use]
    pub fn knowledge(start: Option<&str>, end: Option<&str>) -> Self {
        Self::bounded(start, end, DateMode::KnowledgeDate)
    }

    fn bounded(start: Option<&str>, end: Option<&str>, date_mode: DateMode) -> Self {
        Self {
            start_datetime: start.map(str::to_string),
            end_datetime: end.map(str::to_string),
            date_mode,
        }
    }

    /// Validate the range and append its parameters.
    pub(crate) fn encode(&self, params: &mut Vec<(String, String)>) -> Result<()> {
        if self.start_datetime.is_none() && self.end_datetime.is_none() {
            return Err(ClientError::Precondition(
                "the date_mode parameter has to be used with start_datetime or end_datetime"
                    .to_string(),
            ));
        }
        push_opt(params, "start_datetime", self.start_datetime.as_deref())?;
        push_opt(params, "end_datetime", self.end_datetime.as_deref())?;
        push_opt(params, "date_mode", Some(self.date_mode.as_str()))?;
        Ok(())
    }
}

/// Flattened catalog of the accepted form types.
#[must_use]
pub fn form_types() -> Vec<&'static str> {
    FORM_NAMES_TYPES
        .iter()
        .flat_map(|(_, types)| types.iter().copied())
        .collect()
}
