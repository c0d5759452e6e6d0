//! Demo of the P1 data API search flow.
//!
//! This example demonstrates how to:
//! - Search payloads by free text
//! - Scroll through the remaining result pages
//! - Fetch the time series for one payload ID
//!
//! Run with: P1_API_TOKEN=... cargo run --example search_demo

use p1_client::{Client, MetadataType, SearchQuery};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::from_env()?;

    println!("Searching payloads matching \"Gas\"...");
    let result = client.search(&SearchQuery {
        text: Some("Gas".to_string()),
        ..SearchQuery::default()
    })?;
    println!(
        "First page: {} rows of {} total",
        result.table.height(),
        result.cursor.total_count
    );
    println!("{}", result.table.head(Some(5)));

    // Pull the payload ID out of the first row, if any.
    if let Ok(ids) = result.table.column("payload_id") {
        let ids = ids.as_materialized_series();
        if let Some(payload_id) = ids.str()?.get(0) {
            println!("\nFetching time series for {payload_id}...");
            let series = client.get_payload(payload_id)?;
            println!("{}", series.head(Some(5)));
        }
    }

    // Walk up to three more pages with the explicit cursor.
    for (i, page) in client.search_pages(result.cursor, 3).enumerate() {
        println!("Page {}: {} rows", i + 2, page?.height());
    }

    println!("\nKnown commodities:");
    let commodities = client.get_metadata_type(MetadataType::Commodities)?;
    println!("{}", commodities.head(Some(10)));

    Ok(())
}
