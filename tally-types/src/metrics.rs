//! Raw provider series points, aggregated snapshots, and the metric schema.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-value counts for a single breakdown dimension (e.g. country → clicks).
pub type Breakdown = BTreeMap<String, Decimal>;

/// One day of analytics as reported by the provider for a tracking link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMetricPoint {
    /// Calendar day the counts belong to.
    pub date: NaiveDate,
    /// Metric name → value for this day.
    #[serde(default)]
    pub metrics: BTreeMap<String, Decimal>,
    /// Dimension name → per-value counts for this day.
    #[serde(default)]
    pub breakdowns: BTreeMap<String, Breakdown>,
}

impl RawMetricPoint {
    /// Create an empty point for `date`.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            date,
            metrics: BTreeMap::new(),
            breakdowns: BTreeMap::new(),
        }
    }

    /// Builder-style helper to set a metric value.
    #[must_use]
    pub fn with_metric(mut self, name: impl Into<String>, value: impl Into<Decimal>) -> Self {
        self.metrics.insert(name.into(), value.into());
        self
    }

    /// Builder-style helper to set one breakdown cell.
    #[must_use]
    pub fn with_breakdown(
        mut self,
        dimension: impl Into<String>,
        value: impl Into<String>,
        count: impl Into<Decimal>,
    ) -> Self {
        self.breakdowns
            .entry(dimension.into())
            .or_default()
            .insert(value.into(), count.into());
        self
    }
}

/// Summed analytics for one attribution window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    /// Metric name → summed value.
    pub totals: BTreeMap<String, Decimal>,
    /// Dimension name → per-value summed counts.
    pub breakdowns: BTreeMap<String, Breakdown>,
}

impl AggregatedMetrics {
    /// Summed value of a metric, zero when absent.
    #[must_use]
    pub fn total(&self, metric: &str) -> Decimal {
        self.totals.get(metric).copied().unwrap_or(Decimal::ZERO)
    }

    /// Summed count for a breakdown cell, zero when absent.
    #[must_use]
    pub fn breakdown(&self, dimension: &str, value: &str) -> Decimal {
        self.breakdowns
            .get(dimension)
            .and_then(|b| b.get(value))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// True when every total and every breakdown cell is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.totals.values().all(Decimal::is_zero)
            && self
                .breakdowns
                .values()
                .all(|b| b.values().all(Decimal::is_zero))
    }

    /// Add `other` into `self`, key by key. Sums saturate instead of overflowing.
    pub fn merge(&mut self, other: &Self) {
        for (name, value) in &other.totals {
            let slot = self.totals.entry(name.clone()).or_default();
            *slot = slot.saturating_add(*value);
        }
        for (dimension, cells) in &other.breakdowns {
            let dst = self.breakdowns.entry(dimension.clone()).or_default();
            for (value, count) in cells {
                let slot = dst.entry(value.clone()).or_default();
                *slot = slot.saturating_add(*count);
            }
        }
    }
}

/// Data-driven set of metric and breakdown names the aggregator reports.
///
/// - An empty `metrics` list means "every metric the provider reports".
/// - An empty `breakdowns` list means "every dimension the provider reports".
/// - Named metrics are always present in aggregates, zero when no data exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSchema {
    /// Metric names to sum (e.g. "clicks", "unique_visitors").
    #[serde(default)]
    pub metrics: Vec<String>,
    /// Breakdown dimensions to sum (e.g. "country", "referrer").
    #[serde(default)]
    pub breakdowns: Vec<String>,
}

impl MetricSchema {
    /// Schema that accepts every field present in the series.
    #[must_use]
    pub const fn open() -> Self {
        Self {
            metrics: Vec::new(),
            breakdowns: Vec::new(),
        }
    }

    /// Schema restricted to the given metric and breakdown names.
    pub fn new<M, B>(metrics: M, breakdowns: B) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            metrics: metrics.into_iter().map(Into::into).collect(),
            breakdowns: breakdowns.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a metric name is reported under this schema.
    #[must_use]
    pub fn accepts_metric(&self, name: &str) -> bool {
        self.metrics.is_empty() || self.metrics.iter().any(|m| m == name)
    }

    /// Whether a breakdown dimension is reported under this schema.
    #[must_use]
    pub fn accepts_breakdown(&self, dimension: &str) -> bool {
        self.breakdowns.is_empty() || self.breakdowns.iter().any(|d| d == dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_cells_and_saturates() {
        let mut a = AggregatedMetrics::default();
        a.totals.insert("clicks".into(), Decimal::MAX);
        a.breakdowns
            .entry("country".into())
            .or_default()
            .insert("NL".into(), Decimal::from(2));

        let mut b = AggregatedMetrics::default();
        b.totals.insert("clicks".into(), Decimal::ONE);
        b.totals.insert("unique_visitors".into(), Decimal::from(3));
        b.breakdowns
            .entry("country".into())
            .or_default()
            .insert("NL".into(), Decimal::from(5));

        a.merge(&b);
        assert_eq!(a.total("clicks"), Decimal::MAX);
        assert_eq!(a.total("unique_visitors"), Decimal::from(3));
        assert_eq!(a.breakdown("country", "NL"), Decimal::from(7));
    }
}
