mod common;

use std::sync::Arc;

use common::{get_provider, schedule};
use tally::{EventId, Tally};
use tally_mock::MemoryEventStore;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize a human-friendly tracing subscriber with env-based filtering.
    // Suggested: RUST_LOG=info,tally=trace,tally_middleware=debug
    // Build with `--features tracing` to get spans from the library.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
        .try_init();

    let events = Arc::new(MemoryEventStore::new());
    let tally = Tally::builder()
        .with_event_store(events.clone())
        .with_provider(get_provider())
        .build()?;

    // A link the mock provider always fails for: bounds are committed stale.
    schedule(&events, "meetup", "2024-03-02", &["poster-qr", "FAIL"]).await?;
    let report = tally.recalc_event(&EventId::new("meetup")).await?;
    for warning in &report.warnings {
        println!("warning: {warning}");
    }

    // Periodic sweep over every link holding attributions.
    let sweep = tally.refresh_all_periodic().await?;
    println!("refreshed {} link(s), {} warning(s)", sweep.outcomes.len(), sweep.warnings.len());

    Ok(())
}
