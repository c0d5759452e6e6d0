//! Decoding raw pages into DataFrames.
//!
//! Pages accumulate either into one flat record list (single-table
//! endpoints) or into a mapping of table name to record list (multi-table
//! endpoints). Zero matching records is an empty table, never an error.

use std::collections::BTreeMap;
use std::io::Cursor;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Build a DataFrame from a list of JSON records.
pub(crate) fn records_to_dataframe(records: &[Value]) -> Result<DataFrame> {
    if records.is_empty() {
        return Ok(DataFrame::empty());
    }
    let bytes = serde_json::to_vec(records)?;
    let df = JsonReader::new(Cursor::new(bytes))
        .with_json_format(JsonFormat::Json)
        .finish()?;
    Ok(df)
}

/// Build a one-column DataFrame, used for metadata enumerations.
pub(crate) fn one_column_table(name: &str, values: Vec<String>) -> Result<DataFrame> {
    let series = Series::new(name.into(), values);
    Ok(DataFrame::new(vec![series.into()])?)
}

/// Merge one multi-table page into the accumulator.
///
/// Keys present in any page are unioned; records for the same key across
/// pages concatenate in page-arrival order.
pub(crate) fn merge_tables(acc: &mut BTreeMap<String, Vec<Value>>, data: &Value) -> Result<()> {
    let map = data.as_object().ok_or_else(|| {
        ClientError::Response("expected a mapping of table name to records".to_string())
    })?;
    for (key, records) in map {
        let records = records
            .as_array()
            .ok_or_else(|| ClientError::Response(format!("table `{key}` is not a record array")))?;
        acc.entry(key.clone())
            .or_default()
            .extend(records.iter().cloned());
    }
    Ok(())
}

/// Convert an accumulated table mapping into one DataFrame per table.
pub(crate) fn tables_to_dataframes(
    tables: BTreeMap<String, Vec<Value>>,
) -> Result<BTreeMap<String, DataFrame>> {
    tables
        .into_iter()
        .map(|(name, records)| Ok((name, records_to_dataframe(&records)?)))
        .collect()
}

/// Cast named fields to their declared types after accumulation.
///
/// Columns absent from the frame are skipped. Empty-string and `"NA"` values
/// become null before the cast; any remaining value that fails the cast is a
/// [`ClientError::Cast`].
pub(crate) fn cast_fields(mut df: DataFrame, casts: &[(&str, DataType)]) -> Result<DataFrame> {
    for (name, dtype) in casts {
        let Some(column) = materialized(&df, name) else {
            continue;
        };
        let column = if column.dtype() == &DataType::String {
            nullify_missing(&column)?
        } else {
            column
        };
        let cast = column
            .strict_cast(dtype)
            .map_err(|e| ClientError::Cast {
                field: (*name).to_string(),
                dtype: dtype.to_string(),
                reason: e.to_string(),
            })?;
        df.with_column(cast)?;
    }
    Ok(df)
}

/// Parse string timestamp fields into datetime columns.
pub(crate) fn parse_datetime_fields(mut df: DataFrame, fields: &[&str]) -> Result<DataFrame> {
    for name in fields {
        let Some(column) = materialized(&df, name) else {
            continue;
        };
        if column.dtype() != &DataType::String {
            continue;
        }
        let ca = column.str()?;
        let mut nanos: Vec<Option<i64>> = Vec::with_capacity(ca.len());
        for value in ca {
            match value {
                None => nanos.push(None),
                Some(text) if text.is_empty() || text == "NA" => nanos.push(None),
                Some(text) => match parse_timestamp_nanos(text) {
                    Some(ts) => nanos.push(Some(ts)),
                    None => {
                        return Err(ClientError::Cast {
                            field: (*name).to_string(),
                            dtype: "datetime".to_string(),
                            reason: format!("unparseable timestamp `{text}`"),
                        });
                    }
                },
            }
        }
        let series = Series::new(column.name().clone(), nanos)
            .cast(&DataType::Datetime(TimeUnit::Nanoseconds, None))?;
        df.with_column(series)?;
    }
    Ok(df)
}

/// Stable sort on the given key columns, skipped unless all keys are present.
pub(crate) fn sort_by(df: DataFrame, columns: &[&str]) -> Result<DataFrame> {
    if df.height() == 0 || columns.iter().any(|c| df.column(c).is_err()) {
        return Ok(df);
    }
    let sorted = df.sort(
        columns.to_vec(),
        SortMultipleOptions::default().with_maintain_order(true),
    )?;
    Ok(sorted)
}

fn materialized(df: &DataFrame, name: &str) -> Option<Series> {
    df.column(name)
        .ok()
        .map(|c| c.as_materialized_series().clone())
}

/// Replace empty-string and `"NA"` markers with nulls.
fn nullify_missing(series: &Series) -> Result<Series> {
    let ca = series.str()?;
    let cleaned: Vec<Option<String>> = ca
        .into_iter()
        .map(|value| {
            value
                .filter(|text| !text.is_empty() && *text != "NA")
                .map(str::to_string)
        })
        .collect();
    Ok(Series::new(series.name().clone(), cleaned))
}

fn parse_timestamp_nanos(text: &str) -> Option<i64> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.and_utc().timestamp_nanos_opt();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return dt.timestamp_nanos_opt();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return dt.and_utc().timestamp_nanos_opt();
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_nanos_opt();
    }
    None
}
