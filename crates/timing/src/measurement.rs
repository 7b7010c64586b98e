//! Measurement records produced by the benchmark runner.

use serde::{Deserialize, Serialize};
use spectrabench_kernels::config::ProblemSize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub prep_time_ms: f64,
    pub duration_ns_per_op: f64,
    pub iterations: u64,
    pub mflops: f64,
    pub total_duration_sec: f64,
    /// Filled by [`rank_measurements`] once every back-end at a size is done.
    pub relative_to_fastest: Option<f64>,
    /// Absent when the reference back-end was not applicable at this size.
    pub relative_to_reference: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    Measured(Metrics),
    NotApplicable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub backend: String,
    pub size: ProblemSize,
    pub outcome: Outcome,
}

impl Measurement {
    pub fn measured(backend: impl Into<String>, size: ProblemSize, metrics: Metrics) -> Self {
        Self {
            backend: backend.into(),
            size,
            outcome: Outcome::Measured(metrics),
        }
    }

    pub fn not_applicable(
        backend: impl Into<String>,
        size: ProblemSize,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            backend: backend.into(),
            size,
            outcome: Outcome::NotApplicable {
                reason: reason.into(),
            },
        }
    }

    pub fn metrics(&self) -> Option<&Metrics> {
        match &self.outcome {
            Outcome::Measured(metrics) => Some(metrics),
            Outcome::NotApplicable { .. } => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        self.metrics().is_some()
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.metrics().and_then(|m| metric.extract(m))
    }
}

/// Columns of the result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    PrepTimeMs,
    DurationNsPerOp,
    RelativeToFastest,
    RelativeToReference,
    Iterations,
    Mflops,
    TotalDurationSec,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::PrepTimeMs,
        Metric::DurationNsPerOp,
        Metric::RelativeToFastest,
        Metric::RelativeToReference,
        Metric::Iterations,
        Metric::Mflops,
        Metric::TotalDurationSec,
    ];

    /// Metrics exported as CSV files.
    pub const EXPORTED: [Metric; 5] = [
        Metric::PrepTimeMs,
        Metric::RelativeToReference,
        Metric::Iterations,
        Metric::Mflops,
        Metric::DurationNsPerOp,
    ];

    pub fn extract(&self, metrics: &Metrics) -> Option<f64> {
        match self {
            Metric::PrepTimeMs => Some(metrics.prep_time_ms),
            Metric::DurationNsPerOp => Some(metrics.duration_ns_per_op),
            Metric::RelativeToFastest => metrics.relative_to_fastest,
            Metric::RelativeToReference => metrics.relative_to_reference,
            Metric::Iterations => Some(metrics.iterations as f64),
            Metric::Mflops => Some(metrics.mflops),
            Metric::TotalDurationSec => Some(metrics.total_duration_sec),
        }
    }

    /// Short file-name label.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::PrepTimeMs => "prep",
            Metric::DurationNsPerOp => "duration",
            Metric::RelativeToFastest => "rel-fastest",
            Metric::RelativeToReference => "rel-ref",
            Metric::Iterations => "num-iter",
            Metric::Mflops => "mflops",
            Metric::TotalDurationSec => "total",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fill `relative_to_fastest` and `relative_to_reference` for every measured
/// back-end at one size.
pub fn rank_measurements(measurements: &mut [Measurement], reference: &str) {
    let fastest = measurements
        .iter()
        .filter_map(|m| m.metrics().map(|metrics| metrics.duration_ns_per_op))
        .fold(f64::INFINITY, f64::min);
    let reference_duration = measurements
        .iter()
        .find(|m| m.backend == reference)
        .and_then(|m| m.metrics().map(|metrics| metrics.duration_ns_per_op));

    for measurement in measurements.iter_mut() {
        if let Outcome::Measured(metrics) = &mut measurement.outcome {
            metrics.relative_to_fastest = Some(metrics.duration_ns_per_op / fastest);
            metrics.relative_to_reference =
                reference_duration.map(|reference| metrics.duration_ns_per_op / reference);
        }
    }
}
