//! Run configuration.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use spectrabench_kernels::config::{Domain, SizeSet, CALIBRATION_SIZE, VALIDATION_SIZES};
use spectrabench_timing::clock::ClockKind;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Wall-clock budget per (back-end, size) cell.
    pub time_budget_secs: f64,
    /// Length of the calibration probe window.
    pub calibration_probe_secs: f64,
    pub calibration_size: usize,
    pub domains: Vec<Domain>,
    pub size_set: SizeSet,
    /// Back-end used for calibration and `relative_to_reference`.
    pub reference_backend: String,
    pub disabled_backends: Vec<String>,
    pub clock: ClockKind,
    pub validation_sizes: Vec<usize>,
    /// Overrides `size_set` when non-empty.
    pub sizes: Vec<usize>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            time_budget_secs: 0.150,
            calibration_probe_secs: 0.250,
            calibration_size: CALIBRATION_SIZE,
            domains: vec![Domain::Real, Domain::Complex],
            size_set: SizeSet::PowerOfTwo,
            reference_backend: "radix2".to_string(),
            disabled_backends: Vec::new(),
            clock: ClockKind::ProcessCpu,
            validation_sizes: VALIDATION_SIZES.to_vec(),
            sizes: Vec::new(),
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.time_budget_secs.is_finite() && self.time_budget_secs > 0.0,
            "time budget must be positive, got {}",
            self.time_budget_secs
        );
        ensure!(
            self.calibration_probe_secs.is_finite() && self.calibration_probe_secs > 0.0,
            "calibration probe must be positive, got {}",
            self.calibration_probe_secs
        );
        ensure!(
            self.calibration_size >= 2,
            "calibration size must be at least 2, got {}",
            self.calibration_size
        );
        ensure!(!self.domains.is_empty(), "at least one domain must be selected");
        ensure!(
            !self.disabled_backends.contains(&self.reference_backend),
            "reference backend {} is disabled",
            self.reference_backend
        );
        ensure!(
            self.sizes.iter().all(|&n| n >= 2),
            "benchmark sizes must be at least 2"
        );
        Ok(())
    }

    /// Sizes to benchmark, ascending.
    pub fn benchmark_sizes(&self) -> Vec<usize> {
        let mut sizes = if self.sizes.is_empty() {
            self.size_set.sizes()
        } else {
            self.sizes.clone()
        };
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Self = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn defaults_are_valid() {
        let config = HarnessConfig::default();
        config.validate().unwrap();
        assert_eq!(config.reference_backend, "radix2");
        assert_eq!(config.benchmark_sizes().first(), Some(&2));
        assert_eq!(config.benchmark_sizes().last(), Some(&(1 << 20)));
    }

    #[test]
    fn disabling_the_reference_is_rejected() {
        let config = HarnessConfig {
            disabled_backends: vec!["radix2".into()],
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_sizes_override_the_size_set() {
        let config = HarnessConfig {
            sizes: vec![1024, 64, 1024],
            ..HarnessConfig::default()
        };
        assert_eq!(config.benchmark_sizes(), vec![64, 1024]);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.json");
        fs::write(&path, r#"{ "time_budget_secs": 0.05, "size_set": "composite" }"#).unwrap();
        let config = HarnessConfig::load_from_file(&path).unwrap();
        assert_abs_diff_eq!(config.time_budget_secs, 0.05);
        assert_eq!(config.size_set, SizeSet::Composite);
        assert_eq!(config.calibration_size, 512);

        config.save_to_file(&path).unwrap();
        assert_eq!(HarnessConfig::load_from_file(&path).unwrap(), config);
    }
}
