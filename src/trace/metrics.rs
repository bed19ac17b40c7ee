//! Metrics - insertion-ordered `name -> value` map carried by every trace node

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Values at or above this bound are printed as powers of two.
const ROUND_BOUND: f64 = 9999.0;

/// Ordered mapping from metric name to value.
///
/// Keys keep the position of their first insertion, so two runs of the same
/// variant produce the same key sequence. Aggregation relies on that.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    entries: Vec<(String, f64)>,
}

impl Metrics {
    /// Create an empty metric map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no metrics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or overwrite a metric. Overwriting keeps the original position.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Add `by` to a counter, creating it at zero.
    pub fn increment(&mut self, key: impl Into<String>, by: f64) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 += by,
            None => self.entries.push((key, by)),
        }
    }

    /// Get a metric by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    /// Check if a metric exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Metric names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Metric values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(_, v)| *v)
    }

    /// `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Copy every metric of `other` into `self`.
    pub fn extend_from(&mut self, other: &Self) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }

    /// Flattened one-line rendering used in log output.
    ///
    /// ```rust
    /// use bkz_compare::trace::Metrics;
    ///
    /// let mut metrics = Metrics::new();
    /// metrics.insert("rhf", 1.0125);
    /// metrics.insert("swaps", 42.0);
    /// assert_eq!(metrics.pretty(), "{\"rhf\": 1.0125,  \"swaps\": 42}");
    /// ```
    #[must_use]
    pub fn pretty(&self) -> String {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(k, v)| format!("\"{k}\": {}", pretty_value(*v)))
            .collect();
        format!("{{{}}}", parts.join(",  "))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn pretty_value(v: f64) -> String {
    if !v.is_finite() {
        return format!("{v}");
    }
    if v.abs() >= ROUND_BOUND {
        return format!("2^{:.1}", v.abs().log2());
    }
    if v.fract() == 0.0 {
        return format!("{}", v as i64);
    }
    format!("{v:.4}")
}

impl<K: Into<String>> FromIterator<(K, f64)> for Metrics {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut metrics = Self::new();
        for (k, v) in iter {
            metrics.insert(k, v);
        }
        metrics
    }
}

impl Serialize for Metrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct MetricsVisitor;

impl<'de> Visitor<'de> for MetricsVisitor {
    type Value = Metrics;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map of metric names to numbers")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Metrics, A::Error> {
        let mut metrics = Metrics::new();
        while let Some((key, value)) = access.next_entry::<String, f64>()? {
            metrics.insert(key, value);
        }
        Ok(metrics)
    }
}

impl<'de> Deserialize<'de> for Metrics {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(MetricsVisitor)
    }
}
