use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tally::{EventRef, ProviderClient};
use tally_mock::MemoryEventStore;

/// Provider for the examples: the HTTP provider when `TALLY_API_URL` is set,
/// otherwise the fixture-backed mock.
#[must_use]
pub fn get_provider() -> Arc<dyn ProviderClient> {
    match std::env::var("TALLY_API_URL") {
        Ok(url) => match tally_http::HttpProvider::new_raw(&url) {
            Ok(http) => Arc::new(http),
            Err(e) => {
                println!("--- ({e}; falling back to the mock provider) ---");
                Arc::new(tally_mock::MockProvider::new())
            }
        },
        Err(_) => {
            println!("--- (Using Mock Provider; set TALLY_API_URL for a live one) ---");
            Arc::new(tally_mock::MockProvider::new())
        }
    }
}

/// Insert an event scheduled on `date` (YYYY-MM-DD) and attach it to `links`.
pub async fn schedule(
    events: &MemoryEventStore,
    id: &str,
    date: &str,
    links: &[&str],
) -> Result<(), Box<dyn std::error::Error>> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")?;
    events.insert_event(EventRef::new(id, date, Utc::now())).await;
    for link in links {
        events.attach(id, *link).await?;
    }
    Ok(())
}
