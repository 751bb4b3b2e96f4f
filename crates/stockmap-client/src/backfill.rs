//! Fills in missing coordinates before the registry is built.
//!
//! Records that already carry a latitude/longitude pass through untouched.
//! The rest are geocoded from their postal address, one request at a time;
//! anything still unlocated afterwards is dropped and counted.

use stockmap_core::StockistRecord;
use stockmap_locator::Geocoder;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackfillSummary {
    pub already_located: usize,
    pub geocoded: usize,
    /// Blank address, no result, or a geocoder error.
    pub dropped: usize,
}

/// Geocodes every record that lacks coordinates.
///
/// Records without a country of their own are queried with
/// `default_country` appended, matching how typed postcodes are scoped.
pub async fn backfill_coordinates<G: Geocoder>(
    records: Vec<StockistRecord>,
    geocoder: &G,
    default_country: &str,
) -> (Vec<StockistRecord>, BackfillSummary) {
    let mut summary = BackfillSummary::default();
    let mut located = Vec::with_capacity(records.len());

    for mut record in records {
        if record.has_coordinates() {
            summary.already_located += 1;
            located.push(record);
            continue;
        }

        let query = geocode_query(&record, default_country);
        if query.is_empty() {
            summary.dropped += 1;
            continue;
        }

        match geocoder.geocode(&query).await {
            Ok(Some(coordinate)) => {
                record.latitude = Some(coordinate.latitude);
                record.longitude = Some(coordinate.longitude);
                summary.geocoded += 1;
                located.push(record);
            }
            Ok(None) | Err(_) => summary.dropped += 1,
        }
    }

    tracing::debug!(
        already_located = summary.already_located,
        geocoded = summary.geocoded,
        dropped = summary.dropped,
        "coordinate backfill complete"
    );
    (located, summary)
}

fn geocode_query(record: &StockistRecord, default_country: &str) -> String {
    let address = record.postal_address();
    let has_country = record
        .country
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());
    if address.is_empty() || has_country || default_country.is_empty() {
        address
    } else {
        format!("{address}, {default_country}")
    }
}
