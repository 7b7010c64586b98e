//! Adapter that presents an unordered back-end in canonical order.

use crate::backend::{PlanError, TransformBackend, TransformIo, TransformPlan};
use crate::config::{Direction, Domain, ProblemSize};
use crate::layout::{convolve_canonical, identity_reorder};

/// Wraps `B` so every forward/inverse call goes through the inner plan's
/// `reorder`. The staging buffer for the permutation is carved out of the
/// front of the caller scratch.
#[derive(Debug, Clone)]
pub struct Ordered<B> {
    name: &'static str,
    inner: B,
}

impl<B: TransformBackend> Ordered<B> {
    pub fn new(name: &'static str, inner: B) -> Self {
        Self { name, inner }
    }
}

impl<B: TransformBackend> TransformBackend for Ordered<B> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn min_size(&self, domain: Domain) -> usize {
        self.inner.min_size(domain)
    }

    fn supports(&self, size: &ProblemSize) -> bool {
        self.inner.supports(size)
    }

    fn alignment(&self) -> usize {
        self.inner.alignment()
    }

    fn scratch_len(&self, size: &ProblemSize) -> usize {
        size.float_len() + self.inner.scratch_len(size)
    }

    fn prepare(&self, size: ProblemSize) -> Result<Box<dyn TransformPlan>, PlanError> {
        let inner = self.inner.prepare(size).map_err(|err| match err {
            PlanError::UnsupportedSize { size, reason, .. } => {
                PlanError::unsupported(self.name, size, reason)
            }
        })?;
        Ok(Box::new(OrderedPlan { inner }))
    }
}

pub struct OrderedPlan {
    inner: Box<dyn TransformPlan>,
}

impl TransformPlan for OrderedPlan {
    fn size(&self) -> ProblemSize {
        self.inner.size()
    }

    fn forward(&mut self, io: TransformIo<'_>, scratch: &mut [f32]) {
        let (staging, rest) = scratch.split_at_mut(self.size().float_len());
        self.inner.forward_ordered(io, rest, staging);
    }

    fn inverse(&mut self, io: TransformIo<'_>, scratch: &mut [f32]) {
        let (staging, rest) = scratch.split_at_mut(self.size().float_len());
        self.inner.inverse_ordered(io, rest, staging);
    }

    fn reorder(&self, input: &[f32], output: &mut [f32], _direction: Direction) {
        identity_reorder(input, output);
    }

    fn accumulate_convolve(&self, a: &[f32], b: &[f32], out: &mut [f32], scale: f32) {
        convolve_canonical(self.size().domain, a, b, out, scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radix2::Radix2Fft;
    use crate::reference::{ReferenceTransform, ScalarReference};
    use approx::assert_abs_diff_eq;

    #[test]
    fn ordered_radix2_output_is_canonical() {
        let backend = Ordered::new("radix2", Radix2Fft::new());
        for size in [ProblemSize::complex(32), ProblemSize::real(64)] {
            fastrand::seed(size.n as u64);
            let input: Vec<f32> = (0..size.float_len()).map(|_| fastrand::f32() - 0.5).collect();
            let mut plan = backend.prepare(size).unwrap();
            let mut output = vec![0.0f32; size.float_len()];
            let mut scratch = vec![0.0f32; backend.scratch_len(&size)];
            plan.forward(
                TransformIo::Separate {
                    input: &input,
                    output: &mut output,
                },
                &mut scratch,
            );
            let expected = ScalarReference::new()
                .forward_canonical(size, &input)
                .unwrap();
            for (got, want) in output.iter().zip(expected) {
                assert_abs_diff_eq!(*got as f64, want, epsilon = 1e-4);
            }

            plan.inverse(TransformIo::InPlace(&mut output), &mut scratch);
            let n = size.n as f32;
            for (x, y) in input.iter().zip(&output) {
                assert_abs_diff_eq!(x * n, *y, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn unsupported_size_is_reported_under_wrapper_name() {
        let backend = Ordered::new("radix2", Radix2Fft::new());
        match backend.prepare(ProblemSize::complex(48)) {
            Err(PlanError::UnsupportedSize { backend, .. }) => assert_eq!(backend, "radix2"),
            Ok(_) => panic!("48 is not a power of two"),
        }
    }

    #[test]
    fn scratch_includes_staging() {
        let backend = Ordered::new("radix2", Radix2Fft::new());
        assert_eq!(backend.scratch_len(&ProblemSize::real(64)), 128);
        assert_eq!(backend.scratch_len(&ProblemSize::complex(64)), 128);
    }
}
