//! Query-parameter encoding for the REST endpoints.
//!
//! Call arguments are typed options; only the present ones are encoded.
//! Parameter names ending in `datetime` carry service-format timestamps and
//! are validated before anything is sent over the wire.

use chrono::{DateTime, NaiveDateTime};

use crate::error::{ClientError, Result};

/// Accepted timestamp layout, without a UTC offset.
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Accepted timestamp layout with an explicit UTC offset.
const DATETIME_TZ_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Validate a datetime argument against the service's accepted formats.
///
/// The service accepts `YYYY-MM-DDTHH:MI:SS`, optionally followed by a UTC
/// offset such as `-05:00`.
pub fn validate_datetime(text: &str) -> Result<()> {
    if NaiveDateTime::parse_from_str(text, DATETIME_FORMAT).is_ok()
        || DateTime::parse_from_str(text, DATETIME_TZ_FORMAT).is_ok()
    {
        return Ok(());
    }
    Err(ClientError::Validation(format!(
        "incorrect datetime format `{text}`, should be YYYY-MM-DDTHH:MI:SS \
         with an optional offset, e.g. 2021-03-05T19:41:02-05:00"
    )))
}

/// Append an optional scalar parameter, skipping `None`.
///
/// Parameters whose name ends with `datetime` are validated against the
/// service datetime format first.
pub(crate) fn push_opt<T: ToString>(
    params: &mut Vec<(String, String)>,
    name: &str,
    value: Option<T>,
) -> Result<()> {
    if let Some(value) = value {
        let value = value.to_string();
        if name.ends_with("datetime") {
            validate_datetime(&value)?;
        }
        params.push((name.to_string(), value));
    }
    Ok(())
}

/// Append an optional list parameter as repeated keys (`cik=1&cik=2`).
pub(crate) fn push_opt_repeated<T: ToString>(
    params: &mut Vec<(String, String)>,
    name: &str,
    values: Option<&[T]>,
) {
    if let Some(values) = values {
        for value in values {
            params.push((name.to_string(), value.to_string()));
        }
    }
}

/// Append an optional list parameter as a single comma-joined value.
pub(crate) fn push_opt_joined<T: ToString>(
    params: &mut Vec<(String, String)>,
    name: &str,
    values: Option<&[T]>,
) {
    if let Some(values) = values {
        let joined = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        params.push((name.to_string(), joined));
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("2021-03-05T19:41:02")]
    #[case("2021-03-05T19:41:02-05:00")]
    #[case("2021-03-05T19:41:02+0000")]
    fn test_validate_datetime_accepts(#[case] text: &str) {
        assert!(validate_datetime(text).is_ok());
    }

    #[rstest]
    #[case("2021-03-05")]
    #[case("05/03/2021 19:41")]
    #[case("2021-03-05 19:41:02")]
    #[case("not a date")]
    fn test_validate_datetime_rejects(#[case] text: &str) {
        assert!(matches!(
            validate_datetime(text),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn test_push_opt_skips_none() {
        let mut params = Vec::new();
        push_opt::<String>(&mut params, "item", None).unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn test_push_opt_keeps_value() {
        let mut params = Vec::new();
        push_opt(&mut params, "cik", Some(320193_u64)).unwrap();
        assert_eq!(params, vec![("cik".to_string(), "320193".to_string())]);
    }

    #[test]
    fn test_push_opt_validates_datetime_names() {
        let mut params = Vec::new();
        let result = push_opt(&mut params, "start_datetime", Some("yesterday"));
        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert!(params.is_empty());

        push_opt(&mut params, "start_datetime", Some("2021-03-05T19:41:02")).unwrap();
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_push_opt_repeated() {
        let mut params = Vec::new();
        push_opt_repeated(&mut params, "cik", Some(&[1_u64, 2, 3][..]));
        assert_eq!(
            params,
            vec![
                ("cik".to_string(), "1".to_string()),
                ("cik".to_string(), "2".to_string()),
                ("cik".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_push_opt_joined() {
        let mut params = Vec::new();
        push_opt_joined(&mut params, "keywords", Some(&["sales", "revenue"][..]));
        assert_eq!(
            params,
            vec![("keywords".to_string(), "sales,revenue".to_string())]
        );
    }
}
