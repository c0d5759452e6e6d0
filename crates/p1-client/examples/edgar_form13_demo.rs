//! Demo of the EDGAR form13 payload API.
//!
//! This example demonstrates how to:
//! - Fetch 13F holdings for a list of CIKs
//! - Filter by a knowledge-date range
//! - Look up the GVK for a CIK
//!
//! Run with: P1_EDGAR_API_TOKEN=... cargo run --example edgar_form13_demo

use p1_client::CikFilter;
use p1_client::edgar::{DateRange, EdgarClient, Form13Query, GvkCikMapper};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = EdgarClient::from_env()?;

    // Apple and Berkshire Hathaway; a list longer than 500 CIKs would be
    // fetched in batches automatically.
    let query = Form13Query {
        cik: Some(CikFilter::from(vec![320193, 1067983])),
        date_range: Some(DateRange::knowledge(
            Some("2021-01-01T00:00:00"),
            Some("2021-06-30T23:59:59"),
        )),
        ..Form13Query::default()
    };

    println!("Fetching form13 payloads...");
    let tables = client.get_form13_payload(&query)?;
    for (name, table) in &tables {
        println!("\n{name} ({} rows):", table.height());
        println!("{}", table.head(Some(5)));
    }

    println!("\nLooking up GVK for CIK 320193...");
    let mapper = GvkCikMapper::from_env()?;
    let gvk = mapper.get_gvk_from_cik(320193, Some("2021-01-01"))?;
    println!("{gvk}");

    Ok(())
}
