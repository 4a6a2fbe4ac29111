use rust_decimal::Decimal;
use tally_types::{AggregatedMetrics, Breakdown, DateRange, MetricSchema, RawMetricPoint};

/// Sum the series points that fall inside `range`.
///
/// - A point is included iff its date is within the (possibly open) bounds.
/// - Only metrics and dimensions accepted by `schema` are summed; every metric
///   and dimension the schema names is present in the result even without data.
/// - No matching points yields an all-zero result.
/// - Sums saturate instead of overflowing.
#[must_use]
pub fn aggregate(
    range: &DateRange,
    series: &[RawMetricPoint],
    schema: &MetricSchema,
) -> AggregatedMetrics {
    let mut out = AggregatedMetrics::default();
    for name in &schema.metrics {
        out.totals.insert(name.clone(), Decimal::ZERO);
    }
    for dimension in &schema.breakdowns {
        out.breakdowns.insert(dimension.clone(), Breakdown::new());
    }

    for point in series.iter().filter(|p| range.contains(p.date)) {
        for (name, value) in &point.metrics {
            if schema.accepts_metric(name) {
                let slot = out.totals.entry(name.clone()).or_default();
                *slot = slot.saturating_add(*value);
            }
        }
        for (dimension, cells) in &point.breakdowns {
            if !schema.accepts_breakdown(dimension) {
                continue;
            }
            let dst = out.breakdowns.entry(dimension.clone()).or_default();
            for (value, count) in cells {
                let slot = dst.entry(value.clone()).or_default();
                *slot = slot.saturating_add(*count);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn series() -> Vec<RawMetricPoint> {
        vec![
            RawMetricPoint::new(d(1))
                .with_metric("clicks", 3)
                .with_metric("scans", 1)
                .with_breakdown("country", "NL", 2)
                .with_breakdown("country", "DE", 1),
            RawMetricPoint::new(d(2))
                .with_metric("clicks", 4)
                .with_breakdown("country", "NL", 4),
            RawMetricPoint::new(d(5)).with_metric("clicks", 10),
        ]
    }

    #[test]
    fn sums_inside_closed_bounds() {
        let m = aggregate(
            &DateRange::between(d(1), d(2)),
            &series(),
            &MetricSchema::open(),
        );
        assert_eq!(m.total("clicks"), Decimal::from(7));
        assert_eq!(m.total("scans"), Decimal::from(1));
        assert_eq!(m.breakdown("country", "NL"), Decimal::from(6));
        assert_eq!(m.breakdown("country", "DE"), Decimal::from(1));
    }

    #[test]
    fn schema_filters_and_zero_fills() {
        let schema = MetricSchema::new(["clicks", "signups"], ["referrer"]);
        let m = aggregate(&DateRange::UNBOUNDED, &series(), &schema);
        assert_eq!(m.total("clicks"), Decimal::from(17));
        assert_eq!(m.totals.get("signups"), Some(&Decimal::ZERO));
        assert!(!m.totals.contains_key("scans"));
        assert!(!m.breakdowns.contains_key("country"));
        assert_eq!(m.breakdowns.get("referrer"), Some(&Breakdown::new()));
    }

    #[test]
    fn empty_series_is_all_zero() {
        let schema = MetricSchema::new(["clicks"], ["country"]);
        let m = aggregate(&DateRange::UNBOUNDED, &[], &schema);
        assert!(m.is_zero());
        assert_eq!(m.total("clicks"), Decimal::ZERO);
    }
}
