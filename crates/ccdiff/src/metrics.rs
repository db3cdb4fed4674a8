//! Run metrics using metrics-rs.
//!
//! Verdict counters and job timings are recorded through the `metrics`
//! facade; [`CliRecorder`] keeps them in memory and prints a summary at exit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ccdiff_pipeline::Verdict;
use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit, counter,
    describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use parking_lot::RwLock;

pub const VERDICTS_TOTAL: &str = "ccdiff_verdicts_total";
pub const JOB_DURATION: &str = "ccdiff_job_duration_seconds";
pub const TEST_CASES: &str = "ccdiff_test_cases";

/// Register metric descriptions. Call once at startup.
pub fn init() {
    describe_counter!(
        VERDICTS_TOTAL,
        Unit::Count,
        "Test cases by verdict"
    );
    describe_gauge!(
        TEST_CASES,
        Unit::Count,
        "Test cases prepared for this run"
    );
    describe_histogram!(
        JOB_DURATION,
        Unit::Seconds,
        "Wall-clock time of one test case, both pipelines"
    );
}

/// Record one test case's verdict.
pub fn record_verdict(verdict: Verdict) {
    counter!(VERDICTS_TOTAL, "verdict" => verdict.as_str()).increment(1);
}

/// Record how long one test case took.
pub fn record_job(duration: Duration) {
    histogram!(JOB_DURATION).record(duration.as_secs_f64());
}

/// Record the size of the corpus after deduplication.
#[allow(clippy::cast_precision_loss)]
pub fn record_test_cases(count: usize) {
    gauge!(TEST_CASES).set(count as f64);
}

// ============================================================================
// CLI Recorder for terminal output
// ============================================================================

#[derive(Default)]
struct CounterStorage {
    values: RwLock<HashMap<String, u64>>,
}

#[derive(Default)]
struct GaugeStorage {
    values: RwLock<HashMap<String, f64>>,
}

#[derive(Default)]
struct HistogramStorage {
    values: RwLock<HashMap<String, Vec<f64>>>,
}

struct CliCounter {
    key: String,
    storage: Arc<CounterStorage>,
}

impl metrics::CounterFn for CliCounter {
    fn increment(&self, value: u64) {
        *self.storage.values.write().entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        self.storage.values.write().insert(self.key.clone(), value);
    }
}

struct CliGauge {
    key: String,
    storage: Arc<GaugeStorage>,
}

impl metrics::GaugeFn for CliGauge {
    fn increment(&self, value: f64) {
        *self.storage.values.write().entry(self.key.clone()).or_insert(0.0) += value;
    }

    fn decrement(&self, value: f64) {
        *self.storage.values.write().entry(self.key.clone()).or_insert(0.0) -= value;
    }

    fn set(&self, value: f64) {
        self.storage.values.write().insert(self.key.clone(), value);
    }
}

struct CliHistogram {
    key: String,
    storage: Arc<HistogramStorage>,
}

impl metrics::HistogramFn for CliHistogram {
    fn record(&self, value: f64) {
        self.storage
            .values
            .write()
            .entry(self.key.clone())
            .or_default()
            .push(value);
    }
}

/// Recorder that keeps metrics in memory for a terminal summary.
#[derive(Default)]
pub struct CliRecorder {
    counters: Arc<CounterStorage>,
    gauges: Arc<GaugeStorage>,
    histograms: Arc<HistogramStorage>,
}

impl CliRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install as the global recorder.
    ///
    /// Returns `None` if another recorder is already installed.
    #[must_use]
    pub fn install(self) -> Option<CliRecorderHandle> {
        let handle = self.handle();
        metrics::set_global_recorder(self).ok()?;
        Some(handle)
    }

    fn handle(&self) -> CliRecorderHandle {
        CliRecorderHandle {
            counters: Arc::clone(&self.counters),
            gauges: Arc::clone(&self.gauges),
            histograms: Arc::clone(&self.histograms),
        }
    }
}

fn key_to_string(key: &Key) -> String {
    let labels: Vec<String> = key
        .labels()
        .map(|l| format!("{}={}", l.key(), l.value()))
        .collect();
    if labels.is_empty() {
        key.name().to_string()
    } else {
        format!("{}{{{}}}", key.name(), labels.join(","))
    }
}

impl Recorder for CliRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(CliCounter {
            key: key_to_string(key),
            storage: Arc::clone(&self.counters),
        }))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(Arc::new(CliGauge {
            key: key_to_string(key),
            storage: Arc::clone(&self.gauges),
        }))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(CliHistogram {
            key: key_to_string(key),
            storage: Arc::clone(&self.histograms),
        }))
    }
}

/// Read access to the metrics of an installed [`CliRecorder`].
pub struct CliRecorderHandle {
    counters: Arc<CounterStorage>,
    gauges: Arc<GaugeStorage>,
    histograms: Arc<HistogramStorage>,
}

impl CliRecorderHandle {
    #[must_use]
    pub fn counter(&self, key: &str) -> Option<u64> {
        self.counters.values.read().get(key).copied()
    }

    #[must_use]
    pub fn gauge(&self, key: &str) -> Option<f64> {
        self.gauges.values.read().get(key).copied()
    }

    #[must_use]
    pub fn histogram(&self, key: &str) -> Option<Vec<f64>> {
        self.histograms.values.read().get(key).cloned()
    }

    /// Render all collected metrics, keys sorted.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn render_summary(&self) -> String {
        use std::fmt::Write;

        let counters = self.counters.values.read();
        let gauges = self.gauges.values.read();
        let histograms = self.histograms.values.read();

        if counters.is_empty() && gauges.is_empty() && histograms.is_empty() {
            return "No metrics collected.\n".to_string();
        }

        let mut out = String::from("\n## Metrics Summary\n\n");

        if !counters.is_empty() {
            out.push_str("### Counters\n");
            for (key, value) in sorted(&counters) {
                let _ = writeln!(out, "  {key}: {value}");
            }
            out.push('\n');
        }

        if !gauges.is_empty() {
            out.push_str("### Gauges\n");
            for (key, value) in sorted(&gauges) {
                let _ = writeln!(out, "  {key}: {value:.6}");
            }
            out.push('\n');
        }

        if !histograms.is_empty() {
            out.push_str("### Histograms\n");
            for (key, values) in sorted(&histograms) {
                if values.is_empty() {
                    continue;
                }
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let avg = values.iter().sum::<f64>() / values.len() as f64;
                let _ = writeln!(
                    out,
                    "  {key}: count={}, min={min:.6}, max={max:.6}, avg={avg:.6}",
                    values.len()
                );
            }
            out.push('\n');
        }

        out
    }

    /// Print all collected metrics to stdout.
    pub fn print_summary(&self) {
        print!("{}", self.render_summary());
    }
}

fn sorted<V>(map: &HashMap<String, V>) -> Vec<(&String, &V)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::Label;

    #[test]
    fn test_key_to_string() {
        let key = Key::from_name(JOB_DURATION);
        assert_eq!(key_to_string(&key), "ccdiff_job_duration_seconds");

        let key = Key::from_parts(VERDICTS_TOTAL, vec![Label::new("verdict", "pass")]);
        assert_eq!(key_to_string(&key), "ccdiff_verdicts_total{verdict=pass}");
    }

    #[test]
    fn test_recorder_collects_verdicts() {
        let recorder = CliRecorder::new();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_verdict(Verdict::Pass);
            record_verdict(Verdict::Pass);
            record_verdict(Verdict::BadAssembly);
            record_job(Duration::from_millis(250));
            record_test_cases(3);
        });

        assert_eq!(handle.counter("ccdiff_verdicts_total{verdict=pass}"), Some(2));
        assert_eq!(
            handle.counter("ccdiff_verdicts_total{verdict=bad_assembly}"),
            Some(1)
        );
        assert_eq!(handle.gauge(TEST_CASES), Some(3.0));
        assert_eq!(handle.histogram(JOB_DURATION), Some(vec![0.25]));

        let summary = handle.render_summary();
        assert!(summary.contains("### Counters"));
        assert!(summary.contains("count=1"));
    }

    #[test]
    fn test_empty_summary() {
        let handle = CliRecorder::new().handle();
        assert_eq!(handle.render_summary(), "No metrics collected.\n");
    }
}
