use chrono::{Days, NaiveDate};
use tally_core::RawMetricPoint;

const COUNTRIES: [&str; 3] = ["NL", "DE", "BE"];

pub fn by_link(link: &str) -> Option<Vec<RawMetricPoint>> {
    match link {
        "spring-campaign" => Some(daily(date("2024-01-01"), 60, 12)),
        "newsletter" => Some(daily(date("2024-02-01"), 30, 5)),
        "poster-qr" => Some(daily(date("2024-03-01"), 14, 40)),
        "dormant" => Some(Vec::new()),
        _ => None,
    }
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// `days` consecutive points from `from` with a small weekly swing in clicks.
pub fn daily(from: NaiveDate, days: u64, base_clicks: i64) -> Vec<RawMetricPoint> {
    (0..days)
        .map(|offset| {
            let swing = i64::try_from(offset % 7).unwrap_or(0);
            let clicks = base_clicks + swing;
            let country = COUNTRIES[usize::try_from(offset).unwrap_or(0) % COUNTRIES.len()];
            RawMetricPoint::new(from + Days::new(offset))
                .with_metric("clicks", clicks)
                .with_metric("unique_visitors", clicks / 2)
                .with_breakdown("country", country, clicks)
        })
        .collect()
}
