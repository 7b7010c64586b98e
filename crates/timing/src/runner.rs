//! Budget-bounded forward/inverse timing loops.

use crate::buffers::{BufferError, BufferSet, CorruptionError};
use crate::calibrate::CalibrationFactor;
use crate::clock::Clock;
use crate::measurement::{Measurement, Metrics};
use spectrabench_kernels::backend::{TransformBackend, TransformIo, TransformPlan};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Buffers(#[from] BufferError),
    #[error(transparent)]
    Corruption(#[from] CorruptionError),
}

/// `budget · throughput / workload`, at least 1.
pub fn target_iterations(budget_secs: f64, throughput: f64, workload: f64) -> u64 {
    let target = budget_secs * throughput / workload;
    if target.is_finite() && target >= 1.0 {
        target.floor() as u64
    } else {
        1
    }
}

/// Iterations between clock readings: 1% of the target, at least 1.
pub fn step_iterations(target: u64) -> u64 {
    (target / 100).max(1)
}

/// Run one forward and one inverse transform over the shared buffers,
/// checking every guard after each call.
pub fn transform_pair(
    plan: &mut dyn TransformPlan,
    buffers: &mut BufferSet,
    backend: &'static str,
    scratch_len: usize,
) -> Result<(), RunError> {
    {
        let (input, output, scratch) = buffers.split(backend, scratch_len)?;
        plan.forward(TransformIo::Separate { input, output }, scratch);
    }
    buffers.check_guards(backend)?;
    {
        let (input, output, scratch) = buffers.split(backend, scratch_len)?;
        plan.inverse(TransformIo::Separate { input, output }, scratch);
    }
    buffers.check_guards(backend)?;
    Ok(())
}

pub struct BenchmarkRunner<'c> {
    clock: &'c dyn Clock,
    budget_secs: f64,
}

impl<'c> BenchmarkRunner<'c> {
    pub fn new(clock: &'c dyn Clock, budget_secs: f64) -> Self {
        Self { clock, budget_secs }
    }

    pub fn budget_secs(&self) -> f64 {
        self.budget_secs
    }

    /// Time `backend` at `buffers.size()`. A back-end that cannot prepare
    /// a plan yields a not-applicable measurement; only buffer and guard
    /// failures are errors.
    pub fn run(
        &self,
        backend: &dyn TransformBackend,
        buffers: &mut BufferSet,
        calibration: &CalibrationFactor,
    ) -> Result<Measurement, RunError> {
        let size = buffers.size();
        let name = backend.name();

        let prep_start = self.clock.now();
        let mut plan = match backend.prepare(size) {
            Ok(plan) => plan,
            Err(err) => {
                debug!(backend = name, %size, %err, "skipping unsupported cell");
                return Ok(Measurement::not_applicable(name, size, err.to_string()));
            }
        };
        let prep_time_ms = (self.clock.now() - prep_start) * 1000.0;

        let scratch_len = backend.scratch_len(&size);
        let target = calibration.target_iterations(&size, self.budget_secs);
        let step = step_iterations(target);

        let mut iterations = 0u64;
        let start = self.clock.now();
        let elapsed = loop {
            for _ in 0..step {
                transform_pair(plan.as_mut(), buffers, name, scratch_len)?;
            }
            iterations += step;
            let elapsed = self.clock.now() - start;
            if elapsed >= self.budget_secs {
                break elapsed;
            }
        };
        drop(plan);

        let metrics = Metrics {
            prep_time_ms,
            duration_ns_per_op: elapsed / (2.0 * iterations as f64) * 1e9,
            iterations,
            mflops: iterations as f64 * size.flops_per_pair() / elapsed / 1e6,
            total_duration_sec: elapsed,
            relative_to_fastest: None,
            relative_to_reference: None,
        };
        debug!(
            backend = name,
            %size,
            target,
            iterations,
            mflops = metrics.mflops,
            "measured"
        );
        Ok(Measurement::measured(name, size, metrics))
    }
}
