//! Correctness gate: every registered back-end against the trusted reference.

use crate::report::{
    CaseOutcome, CaseReport, CheckKind, CheckRecord, NumericMismatchError, ValidationPass,
    ValidationReport,
};
use spectrabench_kernels::backend::{PlanError, TransformBackend, TransformIo, TransformPlan};
use spectrabench_kernels::config::{Direction, Domain, ProblemSize};
use spectrabench_kernels::reference::ReferenceTransform;
use spectrabench_kernels::registry::BackendRegistry;
use spectrabench_timing::buffers::{BufferError, CorruptionError, GuardedBuffer};
use thiserror::Error;
use tracing::{debug, info};

/// Relative tolerances, scaled by the largest reference magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationTolerance {
    /// Forward equivalence and round trip, times `max|reference|`.
    pub reference: f64,
    /// Convolution theorem, times `max|expected product|`.
    pub convolution: f64,
}

impl Default for ValidationTolerance {
    fn default() -> Self {
        Self {
            reference: 1e-3,
            convolution: 1e-5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Mismatch(#[from] NumericMismatchError),
    #[error(transparent)]
    Corruption(#[from] CorruptionError),
    #[error(transparent)]
    Buffers(#[from] BufferError),
    #[error("reference transform cannot evaluate {size}")]
    Reference {
        size: ProblemSize,
        #[source]
        source: PlanError,
    },
}

/// Guarded buffers for one back-end at one size.
struct Workspace {
    size: ProblemSize,
    signal: GuardedBuffer,
    spectrum: GuardedBuffer,
    aliased: GuardedBuffer,
    output: GuardedBuffer,
    canonical: GuardedBuffer,
    staging: GuardedBuffer,
    scratch: GuardedBuffer,
}

impl Workspace {
    fn new(size: ProblemSize, scratch_len: usize) -> Result<Self, BufferError> {
        let len = size.float_len();
        Ok(Self {
            size,
            signal: GuardedBuffer::new("signal", len)?,
            spectrum: GuardedBuffer::new("spectrum", len)?,
            aliased: GuardedBuffer::new("aliased", len)?,
            output: GuardedBuffer::new("output", len)?,
            canonical: GuardedBuffer::new("canonical", len)?,
            staging: GuardedBuffer::new("staging", len)?,
            scratch: GuardedBuffer::new("scratch", scratch_len)?,
        })
    }

    fn check_guards(&self, backend: &str) -> Result<(), CorruptionError> {
        for buffer in [
            &self.signal,
            &self.spectrum,
            &self.aliased,
            &self.output,
            &self.canonical,
            &self.staging,
            &self.scratch,
        ] {
            buffer.check_guard(backend, self.size)?;
        }
        Ok(())
    }
}

fn transform(
    plan: &mut dyn TransformPlan,
    pass: ValidationPass,
    direction: Direction,
    io: TransformIo<'_>,
    scratch: &mut [f32],
    staging: &mut [f32],
) {
    match (pass, direction) {
        (ValidationPass::Native, Direction::Forward) => plan.forward(io, scratch),
        (ValidationPass::Native, Direction::Backward) => plan.inverse(io, scratch),
        (ValidationPass::Canonical, Direction::Forward) => {
            plan.forward_ordered(io, scratch, staging)
        }
        (ValidationPass::Canonical, Direction::Backward) => {
            plan.inverse_ordered(io, scratch, staging)
        }
    }
}

fn max_abs(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(0.0, |acc, v| acc.max(v.abs()))
}

fn max_abs_diff(a: &[f32], b: impl IntoIterator<Item = f64>) -> f64 {
    max_abs(a.iter().zip(b).map(|(&x, y)| x as f64 - y))
}

fn bit_identical(a: &[f32], b: &[f32]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

/// Elementwise complex square of a canonical spectrum. The first pair of a
/// packed real spectrum holds the purely real DC and Nyquist bins, which
/// square as scalars.
pub fn square_canonical(domain: Domain, spectrum: &[f32]) -> Vec<f64> {
    let mut out = Vec::with_capacity(spectrum.len());
    for (k, pair) in spectrum.chunks_exact(2).enumerate() {
        let (ar, ai) = (pair[0] as f64, pair[1] as f64);
        if domain == Domain::Real && k == 0 {
            out.extend([ar * ar, ai * ai]);
        } else {
            out.extend([ar * ar - ai * ai, 2.0 * ar * ai]);
        }
    }
    out
}

/// Deterministic signal in `[-1, 1)`.
pub fn random_signal(size: ProblemSize, seed: u64) -> Vec<f32> {
    let mut rng = fastrand::Rng::with_seed(seed ^ size.n as u64);
    (0..size.float_len())
        .map(|_| rng.f32() * 2.0 - 1.0)
        .collect()
}

/// Checks accumulated for one back-end.
struct CaseChecks<'a> {
    backend: &'a str,
    size: ProblemSize,
    pass: ValidationPass,
    records: Vec<CheckRecord>,
}

impl CaseChecks<'_> {
    fn mismatch(&self, check: CheckKind, max_error: f64, bound: f64) -> NumericMismatchError {
        NumericMismatchError {
            backend: self.backend.to_string(),
            size: self.size,
            pass: self.pass,
            check,
            max_error,
            bound,
        }
    }

    fn within(&mut self, check: CheckKind, max_error: f64, bound: f64) -> Result<(), NumericMismatchError> {
        // Written as a negation so NaN fails.
        if !(max_error <= bound) {
            return Err(self.mismatch(check, max_error, bound));
        }
        self.records.push(CheckRecord {
            pass: self.pass,
            check,
            max_error,
            bound,
        });
        Ok(())
    }

    fn exact(&mut self, check: CheckKind, a: &[f32], b: &[f32]) -> Result<(), NumericMismatchError> {
        if !bit_identical(a, b) {
            let max_error = max_abs_diff(a, b.iter().map(|&y| y as f64));
            return Err(self.mismatch(check, max_error, 0.0));
        }
        self.within(check, 0.0, 0.0)
    }
}

pub struct ValidationHarness<'r> {
    registry: &'r BackendRegistry,
    reference: &'r dyn ReferenceTransform,
    tolerance: ValidationTolerance,
    seed: u64,
}

impl<'r> ValidationHarness<'r> {
    pub fn new(registry: &'r BackendRegistry, reference: &'r dyn ReferenceTransform) -> Self {
        Self {
            registry,
            reference,
            tolerance: ValidationTolerance::default(),
            seed: 0x5eed,
        }
    }

    pub fn with_tolerance(mut self, tolerance: ValidationTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate every size in `sizes` for each domain, in order. Sizes below
    /// the registry minimum for a domain are skipped without a case.
    pub fn validate_sweep(
        &self,
        sizes: &[usize],
        domains: &[Domain],
    ) -> Result<ValidationReport, ValidationError> {
        let mut report = ValidationReport::new();
        for &domain in domains {
            let min = self.registry.min_size(domain);
            for &n in sizes {
                let size = ProblemSize::new(n, domain);
                if n < min {
                    debug!(%size, min, "below minimum size, not validated");
                    continue;
                }
                report.extend(self.validate(size)?);
            }
        }
        Ok(report)
    }

    /// Validate every registered back-end at `size`. Back-ends that cannot
    /// prepare the size are reported as skipped; any failed check aborts.
    pub fn validate(&self, size: ProblemSize) -> Result<Vec<CaseReport>, ValidationError> {
        let signal = random_signal(size, self.seed);
        let reference = self
            .reference
            .forward_canonical(size, &signal)
            .map_err(|source| ValidationError::Reference { size, source })?;
        let ref_max = max_abs(reference.iter().copied());

        let mut cases = Vec::with_capacity(self.registry.len());
        for backend in self.registry.backends() {
            cases.push(self.validate_backend(backend.as_ref(), size, &signal, &reference, ref_max)?);
        }
        let passed = cases.iter().filter(|case| case.passed()).count();
        info!(%size, passed, skipped = cases.len() - passed, "validated");
        Ok(cases)
    }

    fn validate_backend(
        &self,
        backend: &dyn TransformBackend,
        size: ProblemSize,
        signal: &[f32],
        reference: &[f64],
        ref_max: f64,
    ) -> Result<CaseReport, ValidationError> {
        let name = backend.name();
        let mut plan = match backend.prepare(size) {
            Ok(plan) => plan,
            Err(err) => {
                debug!(backend = name, %size, %err, "skipping validation case");
                return Ok(CaseReport {
                    backend: name.to_string(),
                    size,
                    outcome: CaseOutcome::Skipped {
                        reason: err.to_string(),
                    },
                });
            }
        };

        let mut ws = Workspace::new(size, backend.scratch_len(&size))?;
        ws.signal.data_mut().copy_from_slice(signal);

        let mut records = Vec::new();
        for pass in ValidationPass::ALL {
            let mut checks = CaseChecks {
                backend: name,
                size,
                pass,
                records: Vec::new(),
            };
            self.run_pass(plan.as_mut(), &mut ws, &mut checks, reference, ref_max)?;
            records.append(&mut checks.records);
        }
        debug!(backend = name, %size, checks = records.len(), "backend passed");

        Ok(CaseReport {
            backend: name.to_string(),
            size,
            outcome: CaseOutcome::Passed { checks: records },
        })
    }

    fn run_pass(
        &self,
        plan: &mut dyn TransformPlan,
        ws: &mut Workspace,
        checks: &mut CaseChecks<'_>,
        reference: &[f64],
        ref_max: f64,
    ) -> Result<(), ValidationError> {
        let pass = checks.pass;
        let name = checks.backend;
        let size = ws.size;

        // Forward with distinct buffers, then aliased.
        transform(
            plan,
            pass,
            Direction::Forward,
            TransformIo::Separate {
                input: ws.signal.data(),
                output: ws.spectrum.data_mut(),
            },
            ws.scratch.data_mut(),
            ws.staging.data_mut(),
        );
        ws.check_guards(name)?;
        ws.aliased.data_mut().copy_from_slice(ws.signal.data());
        transform(
            plan,
            pass,
            Direction::Forward,
            TransformIo::InPlace(ws.aliased.data_mut()),
            ws.scratch.data_mut(),
            ws.staging.data_mut(),
        );
        ws.check_guards(name)?;
        checks.exact(CheckKind::Determinism, ws.spectrum.data(), ws.aliased.data())?;

        match pass {
            ValidationPass::Native => {
                plan.reorder(ws.spectrum.data(), ws.canonical.data_mut(), Direction::Forward);
                plan.reorder(ws.canonical.data(), ws.aliased.data_mut(), Direction::Backward);
                ws.check_guards(name)?;
                checks.exact(
                    CheckKind::ReorderInvertibility,
                    ws.spectrum.data(),
                    ws.aliased.data(),
                )?;
            }
            ValidationPass::Canonical => {
                ws.canonical.data_mut().copy_from_slice(ws.spectrum.data());
            }
        }
        // The reference back-end runs the ground-truth engine itself.
        if name != self.reference.name() {
            checks.within(
                CheckKind::ReferenceEquivalence,
                max_abs_diff(ws.canonical.data(), reference.iter().copied()),
                self.tolerance.reference * ref_max,
            )?;
        }

        // Inverse with distinct buffers, then aliased.
        transform(
            plan,
            pass,
            Direction::Backward,
            TransformIo::Separate {
                input: ws.spectrum.data(),
                output: ws.output.data_mut(),
            },
            ws.scratch.data_mut(),
            ws.staging.data_mut(),
        );
        ws.check_guards(name)?;
        ws.aliased.data_mut().copy_from_slice(ws.spectrum.data());
        transform(
            plan,
            pass,
            Direction::Backward,
            TransformIo::InPlace(ws.aliased.data_mut()),
            ws.scratch.data_mut(),
            ws.staging.data_mut(),
        );
        ws.check_guards(name)?;
        checks.exact(CheckKind::InverseDeterminism, ws.output.data(), ws.aliased.data())?;

        let scale = 1.0 / size.n as f64;
        let round_trip = max_abs_diff(
            ws.signal.data(),
            ws.output.data().iter().map(|&y| y as f64 * scale),
        );
        checks.within(
            CheckKind::RoundTrip,
            round_trip,
            self.tolerance.reference * ref_max,
        )?;

        // Convolution theorem on the native layout of the spectrum.
        match pass {
            ValidationPass::Native => ws.aliased.data_mut().copy_from_slice(ws.spectrum.data()),
            ValidationPass::Canonical => {
                plan.reorder(ws.spectrum.data(), ws.aliased.data_mut(), Direction::Backward)
            }
        }
        let expected = square_canonical(size.domain, ws.canonical.data());
        ws.output.data_mut().fill(0.0);
        plan.accumulate_convolve(
            ws.aliased.data(),
            ws.aliased.data(),
            ws.output.data_mut(),
            1.0,
        );
        plan.reorder(ws.output.data(), ws.canonical.data_mut(), Direction::Forward);
        ws.check_guards(name)?;
        let conv_max = max_abs(expected.iter().copied());
        checks.within(
            CheckKind::ConvolutionTheorem,
            max_abs_diff(ws.canonical.data(), expected),
            self.tolerance.convolution * conv_max,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectrabench_kernels::layout::{convolve_canonical, identity_reorder};
    use spectrabench_kernels::reference::ScalarReference;
    use spectrabench_kernels::vendor::RustFftBackend;

    /// Writes one float past the end of its forward output.
    struct GuardOverrun;

    struct GuardOverrunPlan {
        size: ProblemSize,
    }

    impl TransformBackend for GuardOverrun {
        fn name(&self) -> &'static str {
            "overrun"
        }

        fn supports(&self, _size: &ProblemSize) -> bool {
            true
        }

        fn scratch_len(&self, _size: &ProblemSize) -> usize {
            0
        }

        fn prepare(&self, size: ProblemSize) -> Result<Box<dyn TransformPlan>, PlanError> {
            Ok(Box::new(GuardOverrunPlan { size }))
        }
    }

    impl TransformPlan for GuardOverrunPlan {
        fn size(&self) -> ProblemSize {
            self.size
        }

        fn forward(&mut self, io: TransformIo<'_>, _scratch: &mut [f32]) {
            let out = io.into_output();
            // SAFETY: every workspace buffer is followed by its guard slot in
            // the same allocation.
            unsafe { *out.as_mut_ptr().add(out.len()) = 0.0 };
        }

        fn inverse(&mut self, io: TransformIo<'_>, _scratch: &mut [f32]) {
            io.into_output();
        }

        fn reorder(&self, input: &[f32], output: &mut [f32], _direction: Direction) {
            identity_reorder(input, output)
        }

        fn accumulate_convolve(&self, a: &[f32], b: &[f32], out: &mut [f32], scale: f32) {
            convolve_canonical(self.size.domain, a, b, out, scale);
        }
    }

    /// Correct transform whose convolution drops the imaginary part.
    struct BrokenConvolution;

    struct BrokenPlan {
        inner: Box<dyn TransformPlan>,
    }

    impl TransformBackend for BrokenConvolution {
        fn name(&self) -> &'static str {
            "broken-conv"
        }

        fn supports(&self, size: &ProblemSize) -> bool {
            RustFftBackend::new().supports(size)
        }

        fn scratch_len(&self, size: &ProblemSize) -> usize {
            RustFftBackend::new().scratch_len(size)
        }

        fn prepare(&self, size: ProblemSize) -> Result<Box<dyn TransformPlan>, PlanError> {
            Ok(Box::new(BrokenPlan {
                inner: RustFftBackend::new().prepare(size)?,
            }))
        }
    }

    impl TransformPlan for BrokenPlan {
        fn size(&self) -> ProblemSize {
            self.inner.size()
        }

        fn forward(&mut self, io: TransformIo<'_>, scratch: &mut [f32]) {
            self.inner.forward(io, scratch)
        }

        fn inverse(&mut self, io: TransformIo<'_>, scratch: &mut [f32]) {
            self.inner.inverse(io, scratch)
        }

        fn reorder(&self, input: &[f32], output: &mut [f32], _direction: Direction) {
            identity_reorder(input, output)
        }

        fn accumulate_convolve(&self, a: &[f32], b: &[f32], out: &mut [f32], scale: f32) {
            convolve_canonical(self.size().domain, a, b, out, scale);
            for k in (3..out.len()).step_by(2) {
                out[k] = 0.0;
            }
        }
    }

    #[test]
    fn default_backends_pass_at_mixed_sizes() {
        let registry = BackendRegistry::with_default_backends();
        let reference = ScalarReference::new();
        let harness = ValidationHarness::new(&registry, &reference);
        let report = harness
            .validate_sweep(&[16, 96, 256, 1024], &[Domain::Complex, Domain::Real])
            .unwrap();

        // 16 real is below the registry minimum, so 7 sizes remain.
        assert_eq!(report.cases.len(), 7 * registry.len());
        assert!(report
            .cases
            .iter()
            .all(|case| case.passed() || case.size.n == 96));
        let skipped: Vec<_> = report
            .cases
            .iter()
            .filter(|case| !case.passed())
            .map(|case| (case.backend.as_str(), case.size.n))
            .collect();
        assert_eq!(
            skipped,
            vec![("radix2-u", 96), ("radix2", 96), ("radix2-u", 96), ("radix2", 96)]
        );
    }

    #[test]
    fn every_check_is_recorded_for_both_passes() {
        let registry = BackendRegistry::with_default_backends();
        let reference = ScalarReference::new();
        let harness = ValidationHarness::new(&registry, &reference);
        let cases = harness.validate(ProblemSize::real(64)).unwrap();
        let radix2 = cases.iter().find(|case| case.backend == "radix2-u").unwrap();
        match &radix2.outcome {
            // 6 checks in the native pass, 5 in the canonical pass.
            CaseOutcome::Passed { checks } => assert_eq!(checks.len(), 11),
            CaseOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
        }
    }

    #[test]
    fn broken_convolution_is_a_fatal_mismatch() {
        let mut registry = BackendRegistry::new();
        registry.register(BrokenConvolution);
        let reference = ScalarReference::new();
        let harness = ValidationHarness::new(&registry, &reference);
        match harness.validate(ProblemSize::complex(64)) {
            Err(ValidationError::Mismatch(err)) => {
                assert_eq!(err.backend, "broken-conv");
                assert_eq!(err.check, CheckKind::ConvolutionTheorem);
                assert_eq!(err.pass, ValidationPass::Native);
            }
            other => panic!("expected a convolution mismatch, got {other:?}"),
        }
    }

    #[test]
    fn out_of_bounds_write_fails_the_gate() {
        let mut registry = BackendRegistry::new();
        registry.register(GuardOverrun);
        let reference = ScalarReference::new();
        let harness = ValidationHarness::new(&registry, &reference);
        match harness.validate(ProblemSize::complex(64)) {
            Err(ValidationError::Corruption(err)) => {
                assert_eq!(err.backend, "overrun");
                assert_eq!(err.buffer, "spectrum");
                assert_eq!(err.found, 0.0);
            }
            other => panic!("expected guard corruption, got {other:?}"),
        }
    }

    #[test]
    fn reference_backend_skips_comparison_with_itself() {
        let registry = BackendRegistry::with_default_backends();
        let reference = ScalarReference::new();
        let harness = ValidationHarness::new(&registry, &reference);
        let cases = harness.validate(ProblemSize::complex(96)).unwrap();
        let checks = |backend: &str| match &cases
            .iter()
            .find(|case| case.backend == backend)
            .unwrap()
            .outcome
        {
            CaseOutcome::Passed { checks } => checks.clone(),
            CaseOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
        };

        let scalar = checks("scalar");
        assert_eq!(scalar.len(), 9);
        assert!(scalar
            .iter()
            .all(|record| record.check != CheckKind::ReferenceEquivalence));
        let rustfft = checks("rustfft");
        assert_eq!(rustfft.len(), 11);
        assert_eq!(
            rustfft
                .iter()
                .filter(|record| record.check == CheckKind::ReferenceEquivalence)
                .count(),
            2
        );
    }

    #[test]
    fn real_square_treats_dc_and_nyquist_as_scalars() {
        let squared = square_canonical(Domain::Real, &[2.0, -3.0, 1.0, 2.0]);
        assert_eq!(squared, vec![4.0, 9.0, -3.0, 4.0]);
        let squared = square_canonical(Domain::Complex, &[2.0, -3.0]);
        assert_eq!(squared, vec![-5.0, -12.0]);
    }

    #[test]
    fn random_signal_is_seeded() {
        let size = ProblemSize::complex(32);
        assert_eq!(random_signal(size, 1), random_signal(size, 1));
        assert!(random_signal(size, 1)
            .iter()
            .all(|x| (-1.0..1.0).contains(x)));
    }
}
