mod common;

use std::sync::Arc;

use common::{get_provider, schedule};
use tally::{EventId, MetricSchema, Tally};
use tally_mock::MemoryEventStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. The application's events live in its own store; here an in-memory one.
    let events = Arc::new(MemoryEventStore::new());

    // 2. Build the coordinator. The provider is wrapped with retries at build time.
    let tally = Tally::builder()
        .with_event_store(events.clone())
        .with_provider(get_provider())
        .margin_days(2)
        .schema(MetricSchema::new(["clicks", "unique_visitors"], ["country"]))
        .build()?;

    // 3. Two events share the same campaign link.
    schedule(&events, "kickoff", "2024-01-10", &["spring-campaign"]).await?;
    tally.handle_event_created(&EventId::new("kickoff")).await?;
    schedule(&events, "workshop", "2024-02-15", &["spring-campaign", "newsletter"]).await?;
    let report = tally.handle_event_created(&EventId::new("workshop")).await?;
    println!("workshop touched {} link(s)", report.outcomes.len());

    print_link(&tally, "spring-campaign").await?;

    // 4. Deleting the first event hands its days to the workshop.
    events.remove_event("kickoff").await;
    tally.handle_event_deleted(&EventId::new("kickoff")).await?;
    print_link(&tally, "spring-campaign").await?;

    Ok(())
}

async fn print_link(tally: &Tally, link: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("{link}:");
    for record in tally.attributions_for_link(&link.into()).await? {
        println!(
            "  {:<10} {:<28} clicks={} NL={}{}",
            record.event_id,
            record.range.to_string(),
            record.cached_metrics.total("clicks"),
            record.cached_metrics.breakdown("country", "NL"),
            if record.stale { " (stale)" } else { "" },
        );
    }
    Ok(())
}
