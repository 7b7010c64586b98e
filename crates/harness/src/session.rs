//! Benchmark session orchestration.
//!
//! A run is strictly ordered: the validation gate covers every size and
//! domain first, then each selected domain is calibrated once and swept
//! size by size, back-end by back-end. [`BenchSession::validate`] is the
//! only way to obtain a [`ValidatedSession`], so no measurement can be taken
//! before the gate passes.

use crate::aggregate::ResultTable;
use crate::config::HarnessConfig;
use anyhow::{anyhow, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use spectrabench_kernels::config::{Domain, ProblemSize};
use spectrabench_kernels::reference::ScalarReference;
use spectrabench_kernels::registry::BackendRegistry;
use spectrabench_timing::buffers::BufferSet;
use spectrabench_timing::calibrate::{CalibrationEngine, CalibrationFactor};
use spectrabench_timing::clock::Clock;
use spectrabench_timing::measurement::{rank_measurements, Measurement};
use spectrabench_timing::runner::BenchmarkRunner;
use spectrabench_verifier::report::ValidationReport;
use spectrabench_verifier::verifier::{random_signal, ValidationHarness};
use std::time::Instant;
use tracing::{info, warn};

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub config: HarnessConfig,
    pub validation: ValidationReport,
    pub calibrations: Vec<CalibrationFactor>,
    pub results: ResultTable,
}

pub struct BenchSession {
    config: HarnessConfig,
    registry: BackendRegistry,
    reference: ScalarReference,
    clock: Box<dyn Clock>,
}

impl BenchSession {
    /// Session over the default back-ends minus `config.disabled_backends`.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        Self::with_registry(config, BackendRegistry::with_default_backends())
    }

    pub fn with_registry(config: HarnessConfig, mut registry: BackendRegistry) -> Result<Self> {
        config.validate()?;
        for name in &config.disabled_backends {
            if registry.find(name).is_none() {
                warn!(backend = %name, "disabled backend is not registered");
            }
        }
        registry.retain(|backend| !config.disabled_backends.iter().any(|name| name == backend.name()));
        ensure!(!registry.is_empty(), "no backends left to benchmark");
        ensure!(
            registry.find(&config.reference_backend).is_some(),
            "reference backend {} is not registered (available: {})",
            config.reference_backend,
            registry.names().join(", ")
        );
        let clock = config.clock.build();
        Ok(Self {
            config,
            registry,
            reference: ScalarReference::new(),
            clock,
        })
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Run the correctness gate over every validation size, complex then
    /// real. Any mismatch or guard corruption is returned as an error.
    pub fn validate(&self) -> Result<ValidatedSession<'_>> {
        let start = Instant::now();
        let harness = ValidationHarness::new(&self.registry, &self.reference);
        let report = harness
            .validate_sweep(&self.config.validation_sizes, &[Domain::Complex, Domain::Real])
            .context("validation failed, refusing to benchmark")?;
        info!(
            cases = report.cases.len(),
            passed = report.passed(),
            skipped = report.skipped(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "validation gate passed"
        );
        Ok(ValidatedSession {
            session: self,
            validation: report,
        })
    }

    /// Validate, then calibrate and sweep every selected domain.
    pub fn run(&self) -> Result<SessionReport> {
        self.validate()?.benchmark()
    }
}

pub struct ValidatedSession<'s> {
    session: &'s BenchSession,
    validation: ValidationReport,
}

impl<'s> ValidatedSession<'s> {
    pub fn validation(&self) -> &ValidationReport {
        &self.validation
    }

    pub fn calibrate(&self, domain: Domain) -> Result<CalibrationFactor> {
        let session = self.session;
        let config = &session.config;
        let backend = session
            .registry
            .find(&config.reference_backend)
            .ok_or_else(|| anyhow!("reference backend {} vanished", config.reference_backend))?;

        info!(%domain, size = config.calibration_size, "calibrating");
        let start = Instant::now();
        let engine = CalibrationEngine::new(session.clock.as_ref(), config.calibration_probe_secs)
            .with_probe_size(config.calibration_size);
        let factor = engine
            .calibrate(backend.as_ref(), domain)
            .with_context(|| format!("{domain} calibration failed"))?;
        info!(
            %domain,
            throughput = factor.throughput,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "calibration done"
        );
        Ok(factor)
    }

    /// Measure every back-end at `size`, strictly one after another, over a
    /// single shared buffer set, then rank the row.
    pub fn measure_size(
        &self,
        size: ProblemSize,
        factor: &CalibrationFactor,
    ) -> Result<Vec<Measurement>> {
        ensure!(
            factor.domain == size.domain,
            "{} calibration used for {size}",
            factor.domain
        );
        let session = self.session;
        let backends = session.registry.backends();
        let mut buffers = BufferSet::for_backends(size, backends)
            .with_context(|| format!("allocating buffers for {size}"))?;
        let signal = random_signal(size, size.n as u64);
        buffers.input_mut().copy_from_slice(&signal);

        let runner = BenchmarkRunner::new(session.clock.as_ref(), session.config.time_budget_secs);
        let mut row = Vec::with_capacity(backends.len());
        for backend in backends {
            let measurement = runner
                .run(backend.as_ref(), &mut buffers, factor)
                .with_context(|| format!("benchmarking {} at {size}", backend.name()))?;
            row.push(measurement);
        }
        rank_measurements(&mut row, &session.config.reference_backend);
        Ok(row)
    }

    /// Sweep one domain. Sizes below the registry minimum produce no rows.
    pub fn benchmark_domain(
        &self,
        domain: Domain,
        factor: &CalibrationFactor,
        table: &mut ResultTable,
    ) -> Result<()> {
        let min = self.session.registry.min_size(domain);
        for n in self.session.config.benchmark_sizes() {
            if n < min {
                continue;
            }
            let row = self.measure_size(ProblemSize::new(n, domain), factor)?;
            for measurement in &row {
                match measurement.metrics() {
                    Some(metrics) => info!(
                        backend = %measurement.backend,
                        %domain,
                        n,
                        mflops = metrics.mflops,
                        ns_per_op = metrics.duration_ns_per_op,
                        iterations = metrics.iterations,
                        "cell"
                    ),
                    None => info!(backend = %measurement.backend, %domain, n, "cell n/a"),
                }
            }
            table.extend(row);
        }
        Ok(())
    }

    pub fn benchmark(self) -> Result<SessionReport> {
        let session = self.session;
        let mut table = ResultTable::new(session.registry.names());
        let mut calibrations = Vec::new();
        for &domain in &session.config.domains {
            let factor = self.calibrate(domain)?;
            self.benchmark_domain(domain, &factor, &mut table)?;
            calibrations.push(factor);
        }
        Ok(SessionReport {
            config: session.config.clone(),
            validation: self.validation,
            calibrations,
            results: table,
        })
    }
}
