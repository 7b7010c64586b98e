//! Throughput calibration against the reference workload.

use crate::buffers::BufferSet;
use crate::clock::Clock;
use crate::runner::{target_iterations, transform_pair, RunError};
use serde::{Deserialize, Serialize};
use spectrabench_kernels::backend::{PlanError, TransformBackend};
use spectrabench_kernels::config::{workload, Domain, ProblemSize, CALIBRATION_SIZE};
use thiserror::Error;
use tracing::info;

/// Forward/inverse pairs run between clock readings while probing.
pub const PROBE_BLOCK: u64 = 512;

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("calibration backend cannot run the {domain} probe")]
    Plan {
        domain: Domain,
        #[source]
        source: PlanError,
    },
    #[error("{domain} calibration probe failed")]
    Probe {
        domain: Domain,
        #[source]
        source: RunError,
    },
}

/// Reference throughput for one domain, in workload units per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFactor {
    pub domain: Domain,
    pub probe_size: usize,
    pub iterations: u64,
    pub elapsed_secs: f64,
    pub throughput: f64,
}

impl CalibrationFactor {
    pub fn target_iterations(&self, size: &ProblemSize, budget_secs: f64) -> u64 {
        target_iterations(budget_secs, self.throughput, size.workload())
    }

    pub fn pairs_per_sec(&self) -> f64 {
        self.iterations as f64 / self.elapsed_secs
    }
}

pub struct CalibrationEngine<'c> {
    clock: &'c dyn Clock,
    probe_secs: f64,
    probe_size: usize,
    block: u64,
}

impl<'c> CalibrationEngine<'c> {
    pub fn new(clock: &'c dyn Clock, probe_secs: f64) -> Self {
        Self {
            clock,
            probe_secs,
            probe_size: CALIBRATION_SIZE,
            block: PROBE_BLOCK,
        }
    }

    pub fn with_probe_size(mut self, probe_size: usize) -> Self {
        self.probe_size = probe_size;
        self
    }

    pub fn with_block(mut self, block: u64) -> Self {
        self.block = block.max(1);
        self
    }

    /// Run `backend` at the probe size until the probe window elapses and
    /// derive `iterations · workload(probe) / elapsed`.
    pub fn calibrate(
        &self,
        backend: &dyn TransformBackend,
        domain: Domain,
    ) -> Result<CalibrationFactor, CalibrationError> {
        let size = ProblemSize::new(self.probe_size, domain);
        let probe_err = |source: RunError| CalibrationError::Probe { domain, source };

        let scratch_len = backend.scratch_len(&size);
        let mut buffers = BufferSet::new(size, scratch_len).map_err(|err| probe_err(err.into()))?;
        buffers.fill_input(|i| ((i % 17) as f32 - 8.0) / 8.0);
        let mut plan = backend
            .prepare(size)
            .map_err(|source| CalibrationError::Plan { domain, source })?;

        let mut iterations = 0u64;
        let start = self.clock.now();
        let elapsed = loop {
            for _ in 0..self.block {
                transform_pair(plan.as_mut(), &mut buffers, backend.name(), scratch_len)
                    .map_err(probe_err)?;
            }
            iterations += self.block;
            let elapsed = self.clock.now() - start;
            if elapsed >= self.probe_secs {
                break elapsed;
            }
        };

        let factor = CalibrationFactor {
            domain,
            probe_size: self.probe_size,
            iterations,
            elapsed_secs: elapsed,
            throughput: iterations as f64 * workload(self.probe_size) / elapsed,
        };
        info!(
            %domain,
            backend = backend.name(),
            iterations,
            elapsed_secs = elapsed,
            pairs_per_sec = factor.pairs_per_sec(),
            "calibrated"
        );
        Ok(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SteppingClock;
    use approx::assert_abs_diff_eq;
    use spectrabench_kernels::radix2::Radix2Fft;
    use spectrabench_kernels::registry::BackendRegistry;

    #[test]
    fn throughput_follows_the_workload_model() {
        let clock = SteppingClock::new(0.25);
        let engine = CalibrationEngine::new(&clock, 0.5).with_block(4);
        let registry = BackendRegistry::with_default_backends();
        let backend = registry.find("radix2").unwrap();

        let factor = engine.calibrate(backend.as_ref(), Domain::Complex).unwrap();
        assert_eq!(factor.iterations, 8);
        assert_abs_diff_eq!(factor.elapsed_secs, 0.5);
        assert_abs_diff_eq!(factor.throughput, 8.0 * 4608.0 / 0.5);

        // Budget equal to the probe window at the probe size reproduces the
        // probe iteration count.
        let target = factor.target_iterations(&ProblemSize::complex(512), 0.5);
        assert_eq!(target, 8);
    }

    #[test]
    fn unsupported_probe_size_is_a_plan_error() {
        let clock = SteppingClock::new(0.25);
        let engine = CalibrationEngine::new(&clock, 0.5).with_probe_size(500);
        let err = engine.calibrate(&Radix2Fft::new(), Domain::Real).unwrap_err();
        assert!(matches!(err, CalibrationError::Plan { domain: Domain::Real, .. }));
    }

    #[test]
    fn domains_calibrate_independently() {
        let registry = BackendRegistry::with_default_backends();
        let backend = registry.find("rustfft").unwrap();
        let clock = SteppingClock::new(0.25);
        let engine = CalibrationEngine::new(&clock, 0.25).with_block(2);
        let real = engine.calibrate(backend.as_ref(), Domain::Real).unwrap();
        let complex = engine.calibrate(backend.as_ref(), Domain::Complex).unwrap();
        assert_eq!(real.domain, Domain::Real);
        assert_eq!(complex.domain, Domain::Complex);
    }
}
