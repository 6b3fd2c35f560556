//! Metric registry that stores and renders the exported series.
//!
//! The registry is created once at startup and shared between the
//! collection task (the only writer) and the scrape handler.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::config::{FilterConfig, PrometheusConfig};
use crate::families::{MetricFamily, build_metric_name, sanitize_label_name, sanitize_metric_name};

/// Errors raised when a sample does not match its family's schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{family}: missing value for label '{label}'")]
    MissingLabel {
        family: &'static str,
        label: &'static str,
    },
    #[error("{family}: label '{label}' is not declared")]
    UnknownLabel {
        family: &'static str,
        label: &'static str,
    },
}

/// Ordered label name/value pairs for one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    pairs: Vec<(&'static str, String)>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label, replacing any earlier value under the same name.
    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a label, replacing any earlier value under the same name.
    pub fn insert(&mut self, name: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter_mut().find(|(n, _)| *n == name) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((name, value)),
        }
    }

    /// Value of a label, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Values in the order of `family`'s schema.
    fn ordered_values(&self, family: &'static MetricFamily) -> Result<Vec<String>, RegistryError> {
        if let Some((label, _)) = self
            .pairs
            .iter()
            .find(|(n, _)| family.label_index(n).is_none())
        {
            return Err(RegistryError::UnknownLabel {
                family: family.name,
                label: *label,
            });
        }

        family
            .labels
            .iter()
            .map(|&label| {
                self.get(label)
                    .map(str::to_string)
                    .ok_or(RegistryError::MissingLabel {
                        family: family.name,
                        label,
                    })
            })
            .collect()
    }
}

/// One row destined for a metric family.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub family: &'static MetricFamily,
    pub labels: LabelSet,
    pub value: f64,
}

impl Sample {
    pub fn gauge(family: &'static MetricFamily, labels: LabelSet, value: f64) -> Self {
        Self {
            family,
            labels,
            value,
        }
    }

    /// An info row; its value is always 1.
    pub fn info(family: &'static MetricFamily, labels: LabelSet) -> Self {
        Self::gauge(family, labels, 1.0)
    }
}

/// A unique identifier for a stored series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    family: &'static str,
    values: Vec<String>,
}

#[derive(Debug, Clone)]
struct StoredSeries {
    family: &'static MetricFamily,
    values: Vec<String>,
    value: f64,
    /// Cycle generation that last wrote this series.
    generation: u64,
}

/// What [`MetricRegistry::record`] did with a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// Inserted or overwritten.
    Stored,
    /// Skipped by the family filter.
    Filtered,
    /// New series refused because `max_series` was reached.
    Dropped,
}

/// Filter deciding which families are exported.
pub struct FamilyFilter {
    include: Vec<glob::Pattern>,
    exclude: Vec<glob::Pattern>,
}

impl FamilyFilter {
    /// Create a new filter from configuration. Invalid patterns are ignored.
    pub fn new(config: &FilterConfig) -> Self {
        let compile = |patterns: &[String]| {
            patterns
                .iter()
                .filter_map(|p| glob::Pattern::new(p).ok())
                .collect()
        };

        Self {
            include: compile(&config.include_families),
            exclude: compile(&config.exclude_families),
        }
    }

    /// Check if a family should be exported.
    pub fn should_include(&self, family: &MetricFamily) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|p| p.matches(family.name)) {
            return false;
        }
        !self.exclude.iter().any(|p| p.matches(family.name))
    }
}

impl Default for FamilyFilter {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

/// Registry statistics.
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    /// Total samples offered to the registry.
    pub samples_received: u64,
    /// Samples stored (new or overwritten).
    pub samples_accepted: u64,
    /// Samples skipped by the family filter.
    pub samples_filtered: u64,
    /// Samples rejected because max_series was reached.
    pub samples_dropped_max_series: u64,
    /// Series removed because a completed cycle no longer reported them.
    pub series_expired: u64,
}

/// A stored row, as returned by [`MetricRegistry::rows`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
}

impl Row {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Thread-safe metric registry.
pub struct MetricRegistry {
    /// Stored series indexed by family and label values.
    series: RwLock<HashMap<SeriesKey, StoredSeries>>,
    /// Metric name prefix, sanitized.
    prefix: String,
    /// Constant labels appended on render.
    default_labels: Vec<(String, String)>,
    max_series: usize,
    filter: FamilyFilter,
    stats: RwLock<RegistryStats>,
    /// Generation stamped on every stored series.
    generation: AtomicU64,
    /// Exporter self-metrics, encoded with prometheus-client.
    self_metrics: prometheus_client::registry::Registry,
    cycle_duration: Histogram,
}

/// Create a shareable registry handle.
pub type SharedRegistry = Arc<MetricRegistry>;

impl MetricRegistry {
    /// Create a new registry.
    pub fn new(
        prometheus_config: &PrometheusConfig,
        max_series: usize,
        filter_config: &FilterConfig,
    ) -> Self {
        let prefix = sanitize_metric_name(&prometheus_config.prefix);

        let mut default_labels: Vec<(String, String)> = prometheus_config
            .default_labels
            .iter()
            .map(|(k, v)| (sanitize_label_name(k), v.clone()))
            .collect();
        default_labels.sort();

        // Exposed without the family prefix
        let mut self_metrics = prometheus_client::registry::Registry::default();
        let cycle_duration = Histogram::new(exponential_buckets(0.5, 2.0, 10));
        self_metrics.register(
            "request_processing_seconds",
            "Time spent processing one collection cycle",
            cycle_duration.clone(),
        );

        Self {
            series: RwLock::new(HashMap::new()),
            prefix,
            default_labels,
            max_series,
            filter: FamilyFilter::new(filter_config),
            stats: RwLock::new(RegistryStats::default()),
            generation: AtomicU64::new(0),
            self_metrics,
            cycle_duration,
        }
    }

    /// Start a new write generation and return it.
    ///
    /// Series recorded from now on are stamped with this generation.
    pub fn begin_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Remove series last written before `generation`.
    pub fn expire_before(&self, generation: u64) -> usize {
        let mut series = self.series.write();
        let before = series.len();

        series.retain(|_, s| s.generation >= generation);

        let removed = before - series.len();

        if removed > 0 {
            debug!(
                removed,
                remaining = series.len(),
                "Expired series not reported by the last cycle"
            );
            let mut stats = self.stats.write();
            stats.series_expired += removed as u64;
        }

        removed
    }

    /// Upsert one sample.
    ///
    /// The label set must carry exactly the labels its family declares.
    /// Filtered samples and samples beyond `max_series` are not stored, which
    /// the returned [`Recorded`] reports.
    pub fn record(&self, sample: &Sample) -> Result<Recorded, RegistryError> {
        self.stats.write().samples_received += 1;

        let values = sample.labels.ordered_values(sample.family)?;

        if !self.filter.should_include(sample.family) {
            self.stats.write().samples_filtered += 1;
            trace!(family = sample.family.name, "Sample filtered out");
            return Ok(Recorded::Filtered);
        }

        let key = SeriesKey {
            family: sample.family.name,
            values: values.clone(),
        };

        let mut series = self.series.write();

        if !series.contains_key(&key) && series.len() >= self.max_series {
            drop(series);
            self.stats.write().samples_dropped_max_series += 1;
            warn!(
                max_series = self.max_series,
                family = sample.family.name,
                "Max series limit reached, dropping new series"
            );
            return Ok(Recorded::Dropped);
        }

        series.insert(
            key,
            StoredSeries {
                family: sample.family,
                values,
                value: sample.value,
                generation: self.generation.load(Ordering::SeqCst),
            },
        );
        drop(series);

        self.stats.write().samples_accepted += 1;
        Ok(Recorded::Stored)
    }

    /// Record the wall time of one collection cycle.
    pub fn observe_cycle(&self, duration: Duration) {
        self.cycle_duration.observe(duration.as_secs_f64());
    }

    /// Get the current number of stored series.
    pub fn series_count(&self) -> usize {
        self.series.read().len()
    }

    /// Get registry statistics.
    pub fn stats(&self) -> RegistryStats {
        self.stats.read().clone()
    }

    /// Stored rows of one family, sorted by label values.
    pub fn rows(&self, family: &MetricFamily) -> Vec<Row> {
        let series = self.series.read();
        let mut rows: Vec<&StoredSeries> = series
            .values()
            .filter(|s| s.family.name == family.name)
            .collect();
        rows.sort_by(|a, b| a.values.cmp(&b.values));

        rows.into_iter()
            .map(|s| Row {
                labels: s
                    .family
                    .labels
                    .iter()
                    .copied()
                    .zip(s.values.iter().cloned())
                    .collect(),
                value: s.value,
            })
            .collect()
    }

    /// Render metrics in Prometheus exposition format.
    pub fn render(&self) -> String {
        let series = self.series.read();
        let mut output = String::with_capacity(series.len() * 160);

        // Group series by family for HELP/TYPE comments
        let mut by_family: HashMap<&str, Vec<&StoredSeries>> = HashMap::new();
        for stored in series.values() {
            by_family.entry(stored.family.name).or_default().push(stored);
        }

        let mut names: Vec<_> = by_family.keys().copied().collect();
        names.sort_unstable();

        for name in names {
            let mut rows = by_family.remove(name).unwrap_or_default();
            let Some(first) = rows.first() else {
                continue;
            };
            let family = first.family;
            let metric_name = build_metric_name(&self.prefix, family);

            writeln!(output, "# HELP {} {}", metric_name, family.help).ok();
            writeln!(output, "# TYPE {} {}", metric_name, family.kind.as_str()).ok();

            rows.sort_by(|a, b| a.values.cmp(&b.values));
            for stored in rows {
                let labels = self.format_labels(family, &stored.values);
                writeln!(output, "{}{} {}", metric_name, labels, format_value(stored.value)).ok();
            }
        }

        let series_total = series.len();
        drop(series);

        // Exporter statistics
        let stats = self.stats.read().clone();
        let exporter = |suffix: &str| {
            if self.prefix.is_empty() {
                format!("exporter_{}", suffix)
            } else {
                format!("{}_exporter_{}", self.prefix, suffix)
            }
        };

        writeln!(output).ok();
        for (name, kind, value) in [
            (exporter("series_total"), "gauge", series_total as u64),
            (
                exporter("samples_received_total"),
                "counter",
                stats.samples_received,
            ),
            (
                exporter("samples_accepted_total"),
                "counter",
                stats.samples_accepted,
            ),
            (
                exporter("samples_filtered_total"),
                "counter",
                stats.samples_filtered,
            ),
            (
                exporter("samples_dropped_total"),
                "counter",
                stats.samples_dropped_max_series,
            ),
            (
                exporter("series_expired_total"),
                "counter",
                stats.series_expired,
            ),
        ] {
            writeln!(output, "# TYPE {} {}", name, kind).ok();
            writeln!(output, "{} {}", name, value).ok();
        }

        if let Err(e) = prometheus_client::encoding::text::encode(&mut output, &self.self_metrics) {
            warn!(error = %e, "Failed to encode exporter self-metrics");
        }

        output
    }

    /// Format family labels plus default labels for exposition.
    fn format_labels(&self, family: &MetricFamily, values: &[String]) -> String {
        let mut parts: Vec<String> = family
            .labels
            .iter()
            .zip(values)
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
            .collect();

        for (k, v) in &self.default_labels {
            if family.label_index(k).is_none() {
                parts.push(format!("{}=\"{}\"", k, escape_label_value(v)));
            }
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!("{{{}}}", parts.join(","))
        }
    }
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::{LOCATION_COUNT, LOCATION_DETAILS, SENSOR_COUNT, SENSOR_DETAILS};

    fn make_registry() -> MetricRegistry {
        MetricRegistry::new(&PrometheusConfig::default(), 100, &FilterConfig::default())
    }

    fn location(id: &str, name: &str) -> LabelSet {
        LabelSet::new()
            .with("location_id", id)
            .with("location_name", name)
    }

    #[test]
    fn test_label_set_replaces_duplicates() {
        let labels = LabelSet::new().with("a", "1").with("a", "2");
        assert_eq!(labels.pairs.len(), 1);
        assert_eq!(labels.get("a"), Some("2"));
    }

    #[test]
    fn test_record_and_render_gauge() {
        let registry = make_registry();
        registry
            .record(&Sample::gauge(&LOCATION_COUNT, LabelSet::new(), 3.0))
            .unwrap();

        let output = registry.render();
        assert!(output.contains("# HELP wyebot_location_count Total number of locations"));
        assert!(output.contains("# TYPE wyebot_location_count gauge"));
        assert!(output.contains("\nwyebot_location_count 3\n"));
    }

    #[test]
    fn test_record_and_render_info() {
        let registry = make_registry();
        registry
            .record(&Sample::info(&LOCATION_DETAILS, location("1", "HQ")))
            .unwrap();

        let output = registry.render();
        assert!(output.contains("# TYPE wyebot_location_details_info gauge"));
        assert!(output.contains("wyebot_location_details_info{location_id=\"1\",location_name=\"HQ\"} 1"));
    }

    #[test]
    fn test_missing_label_is_rejected() {
        let registry = make_registry();
        let labels = LabelSet::new().with("location_id", "1");

        let err = registry
            .record(&Sample::gauge(&SENSOR_COUNT, labels, 1.0))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::MissingLabel {
                family: "sensor_count",
                label: "location_name"
            }
        );
        assert_eq!(registry.series_count(), 0);
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let registry = make_registry();
        let labels = location("1", "HQ").with("sensor_id", "10");

        let err = registry
            .record(&Sample::gauge(&SENSOR_COUNT, labels, 1.0))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownLabel { label: "sensor_id", .. }));
    }

    #[test]
    fn test_same_labels_overwrite() {
        let registry = make_registry();
        registry
            .record(&Sample::gauge(&SENSOR_COUNT, location("1", "HQ"), 2.0))
            .unwrap();
        registry
            .record(&Sample::gauge(&SENSOR_COUNT, location("1", "HQ"), 5.0))
            .unwrap();

        let rows = registry.rows(&SENSOR_COUNT);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 5.0);
    }

    #[test]
    fn test_label_order_does_not_matter() {
        let registry = make_registry();
        let reversed = LabelSet::new()
            .with("location_name", "HQ")
            .with("location_id", "1");

        registry
            .record(&Sample::gauge(&SENSOR_COUNT, location("1", "HQ"), 2.0))
            .unwrap();
        registry
            .record(&Sample::gauge(&SENSOR_COUNT, reversed, 4.0))
            .unwrap();

        assert_eq!(registry.series_count(), 1);
    }

    #[test]
    fn test_same_labels_in_different_families_are_distinct() {
        let registry = make_registry();
        registry
            .record(&Sample::gauge(&SENSOR_COUNT, location("1", "HQ"), 2.0))
            .unwrap();
        registry
            .record(&Sample::info(&LOCATION_DETAILS, location("1", "HQ")))
            .unwrap();

        assert_eq!(registry.series_count(), 2);
    }

    #[test]
    fn test_filter_excludes_families() {
        let registry = MetricRegistry::new(
            &PrometheusConfig::default(),
            100,
            &FilterConfig {
                exclude_families: vec!["sensor_*".to_string()],
                ..Default::default()
            },
        );

        let recorded = registry
            .record(&Sample::gauge(&SENSOR_COUNT, location("1", "HQ"), 2.0))
            .unwrap();
        assert_eq!(recorded, Recorded::Filtered);
        registry
            .record(&Sample::info(&LOCATION_DETAILS, location("1", "HQ")))
            .unwrap();

        assert_eq!(registry.series_count(), 1);
        assert_eq!(registry.stats().samples_filtered, 1);
        assert!(registry.rows(&SENSOR_COUNT).is_empty());
    }

    #[test]
    fn test_filter_still_validates_labels() {
        let registry = MetricRegistry::new(
            &PrometheusConfig::default(),
            100,
            &FilterConfig {
                exclude_families: vec!["*".to_string()],
                ..Default::default()
            },
        );

        let result = registry.record(&Sample::gauge(&SENSOR_COUNT, LabelSet::new(), 1.0));
        assert!(result.is_err());
    }

    #[test]
    fn test_include_filter() {
        let filter = FamilyFilter::new(&FilterConfig {
            include_families: vec!["location_*".to_string()],
            ..Default::default()
        });

        assert!(filter.should_include(&LOCATION_COUNT));
        assert!(filter.should_include(&LOCATION_DETAILS));
        assert!(!filter.should_include(&SENSOR_DETAILS));
    }

    #[test]
    fn test_max_series_limit() {
        let registry =
            MetricRegistry::new(&PrometheusConfig::default(), 2, &FilterConfig::default());

        for i in 0..5 {
            registry
                .record(&Sample::info(
                    &LOCATION_DETAILS,
                    location(&i.to_string(), "site"),
                ))
                .unwrap();
        }

        assert_eq!(registry.series_count(), 2);
        assert_eq!(registry.stats().samples_dropped_max_series, 3);

        // Existing series can still be updated at the cap
        let recorded = registry
            .record(&Sample::info(&LOCATION_DETAILS, location("0", "site")))
            .unwrap();
        assert_eq!(recorded, Recorded::Stored);

        let recorded = registry
            .record(&Sample::info(&LOCATION_DETAILS, location("9", "site")))
            .unwrap();
        assert_eq!(recorded, Recorded::Dropped);
        assert_eq!(registry.stats().samples_dropped_max_series, 4);
    }

    #[test]
    fn test_expire_removes_series_from_older_generations() {
        let registry = make_registry();

        let first = registry.begin_generation();
        registry
            .record(&Sample::info(&LOCATION_DETAILS, location("1", "HQ")))
            .unwrap();
        registry
            .record(&Sample::info(&LOCATION_DETAILS, location("2", "Old site")))
            .unwrap();
        assert_eq!(registry.expire_before(first), 0);

        let second = registry.begin_generation();
        assert!(second > first);
        registry
            .record(&Sample::info(&LOCATION_DETAILS, location("1", "HQ")))
            .unwrap();

        assert_eq!(registry.expire_before(second), 1);
        let rows = registry.rows(&LOCATION_DETAILS);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label("location_id"), Some("1"));
        assert_eq!(registry.stats().series_expired, 1);
        assert!(registry.render().contains("wyebot_exporter_series_expired_total 1"));
    }

    #[test]
    fn test_expiry_frees_room_under_the_cap() {
        let registry =
            MetricRegistry::new(&PrometheusConfig::default(), 1, &FilterConfig::default());

        registry.begin_generation();
        registry
            .record(&Sample::info(&LOCATION_DETAILS, location("1", "uptime 10")))
            .unwrap();

        let next = registry.begin_generation();
        let recorded = registry
            .record(&Sample::info(&LOCATION_DETAILS, location("1", "uptime 70")))
            .unwrap();
        assert_eq!(recorded, Recorded::Dropped);

        registry.expire_before(next);
        let recorded = registry
            .record(&Sample::info(&LOCATION_DETAILS, location("1", "uptime 70")))
            .unwrap();
        assert_eq!(recorded, Recorded::Stored);
    }

    #[test]
    fn test_default_labels_and_prefix() {
        let mut config = PrometheusConfig {
            prefix: "acme-wyebot".to_string(),
            ..Default::default()
        };
        config
            .default_labels
            .insert("environment".to_string(), "prod".to_string());
        let registry = MetricRegistry::new(&config, 100, &FilterConfig::default());

        registry
            .record(&Sample::gauge(&SENSOR_COUNT, location("1", "HQ"), 1.0))
            .unwrap();

        let output = registry.render();
        assert!(output.contains(
            "acme_wyebot_sensor_count{location_id=\"1\",location_name=\"HQ\",environment=\"prod\"} 1"
        ));
    }

    #[test]
    fn test_render_escapes_label_values() {
        let registry = make_registry();
        registry
            .record(&Sample::info(&LOCATION_DETAILS, location("1", "The \"Big\" Office")))
            .unwrap();

        assert!(registry.render().contains("location_name=\"The \\\"Big\\\" Office\""));
    }

    #[test]
    fn test_render_includes_cycle_histogram() {
        let registry = make_registry();
        registry.observe_cycle(Duration::from_millis(1500));

        let output = registry.render();
        assert!(output.contains("\nrequest_processing_seconds_count 1"));
        assert!(!output.contains("wyebot_request_processing_seconds"));
        assert!(output.contains("wyebot_exporter_series_total 0"));
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("simple"), "simple");
        assert_eq!(escape_label_value("with\"quote"), "with\\\"quote");
        assert_eq!(escape_label_value("with\\backslash"), "with\\\\backslash");
        assert_eq!(escape_label_value("with\nnewline"), "with\\nnewline");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(0.25), "0.25");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
    }
}
