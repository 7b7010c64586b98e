//! Back-end wrapping the `rustfft` planner.
//!
//! Output is already canonical, so `reorder` is a copy. Real transforms run
//! as complex transforms of length `N` in caller scratch and are packed into
//! the canonical real layout afterwards.

use crate::backend::{PlanError, TransformBackend, TransformIo, TransformPlan};
use crate::config::{Direction, Domain, ProblemSize};
use crate::layout::{convolve_canonical, identity_reorder, pack_real, unpack_real};
use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Copy)]
pub struct RustFftBackend;

impl RustFftBackend {
    pub fn new() -> Self {
        Self
    }
}

impl TransformBackend for RustFftBackend {
    fn name(&self) -> &'static str {
        "rustfft"
    }

    fn supports(&self, size: &ProblemSize) -> bool {
        match size.domain {
            Domain::Complex => size.n >= self.min_size(size.domain),
            Domain::Real => size.n >= self.min_size(size.domain) && size.n % 2 == 0,
        }
    }

    fn scratch_len(&self, size: &ProblemSize) -> usize {
        match size.domain {
            Domain::Real => 2 * size.n,
            Domain::Complex => 0,
        }
    }

    fn prepare(&self, size: ProblemSize) -> Result<Box<dyn TransformPlan>, PlanError> {
        if !self.supports(&size) {
            return Err(PlanError::unsupported(
                self.name(),
                size,
                "real lengths must be even and at least 2",
            ));
        }
        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(size.n);
        let inverse = planner.plan_fft_inverse(size.n);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Ok(Box::new(RustFftPlan {
            size,
            forward,
            inverse,
            fft_scratch: vec![Complex32::new(0.0, 0.0); scratch_len],
        }))
    }
}

pub struct RustFftPlan {
    size: ProblemSize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    fft_scratch: Vec<Complex32>,
}

impl RustFftPlan {
    fn real_forward(&mut self, io: TransformIo<'_>, scratch: &mut [f32]) {
        let n = self.size.n;
        let work: &mut [Complex32] = bytemuck::cast_slice_mut(&mut scratch[..2 * n]);
        let out = match io {
            TransformIo::Separate { input, output } => {
                load_real(input, work);
                output
            }
            TransformIo::InPlace(data) => {
                load_real(data, work);
                data
            }
        };
        self.forward.process_with_scratch(work, &mut self.fft_scratch);
        pack_real(work, out);
    }

    fn real_inverse(&mut self, io: TransformIo<'_>, scratch: &mut [f32]) {
        let n = self.size.n;
        let work: &mut [Complex32] = bytemuck::cast_slice_mut(&mut scratch[..2 * n]);
        let out = match io {
            TransformIo::Separate { input, output } => {
                unpack_real(input, work);
                output
            }
            TransformIo::InPlace(data) => {
                unpack_real(data, work);
                data
            }
        };
        self.inverse.process_with_scratch(work, &mut self.fft_scratch);
        for (dst, z) in out.iter_mut().zip(work.iter()) {
            *dst = z.re;
        }
    }
}

fn load_real(input: &[f32], work: &mut [Complex32]) {
    for (z, &x) in work.iter_mut().zip(input) {
        *z = Complex32::new(x, 0.0);
    }
}

impl TransformPlan for RustFftPlan {
    fn size(&self) -> ProblemSize {
        self.size
    }

    fn forward(&mut self, io: TransformIo<'_>, scratch: &mut [f32]) {
        match self.size.domain {
            Domain::Complex => {
                let data = bytemuck::cast_slice_mut(io.into_output());
                self.forward.process_with_scratch(data, &mut self.fft_scratch);
            }
            Domain::Real => self.real_forward(io, scratch),
        }
    }

    fn inverse(&mut self, io: TransformIo<'_>, scratch: &mut [f32]) {
        match self.size.domain {
            Domain::Complex => {
                let data = bytemuck::cast_slice_mut(io.into_output());
                self.inverse.process_with_scratch(data, &mut self.fft_scratch);
            }
            Domain::Real => self.real_inverse(io, scratch),
        }
    }

    fn reorder(&self, input: &[f32], output: &mut [f32], _direction: Direction) {
        identity_reorder(input, output);
    }

    fn accumulate_convolve(&self, a: &[f32], b: &[f32], out: &mut [f32], scale: f32) {
        convolve_canonical(self.size.domain, a, b, out, scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{ReferenceTransform, ScalarReference};
    use approx::assert_abs_diff_eq;

    fn run_forward(size: ProblemSize, input: &[f32]) -> Vec<f32> {
        let backend = RustFftBackend::new();
        let mut plan = backend.prepare(size).unwrap();
        let mut output = vec![0.0f32; size.float_len()];
        let mut scratch = vec![0.0f32; backend.scratch_len(&size)];
        plan.forward(
            TransformIo::Separate {
                input,
                output: &mut output,
            },
            &mut scratch,
        );
        output
    }

    #[test]
    fn composite_complex_length_matches_reference() {
        let size = ProblemSize::complex(96);
        fastrand::seed(21);
        let input: Vec<f32> = (0..size.float_len()).map(|_| fastrand::f32() - 0.5).collect();
        let expected = ScalarReference::new()
            .forward_canonical(size, &input)
            .unwrap();
        for (got, want) in run_forward(size, &input).iter().zip(expected) {
            assert_abs_diff_eq!(*got as f64, want, epsilon = 1e-4);
        }
    }

    #[test]
    fn real_impulse_has_flat_spectrum() {
        let size = ProblemSize::real(12);
        let mut input = vec![0.0f32; 12];
        input[0] = 1.0;
        let spectrum = run_forward(size, &input);
        assert_abs_diff_eq!(spectrum[0], 1.0);
        assert_abs_diff_eq!(spectrum[1], 1.0);
        for k in 1..6 {
            assert_abs_diff_eq!(spectrum[2 * k], 1.0, epsilon = 1e-6);
            assert_abs_diff_eq!(spectrum[2 * k + 1], 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn odd_real_length_is_rejected() {
        let err = RustFftBackend::new().prepare(ProblemSize::real(15));
        assert!(matches!(err, Err(PlanError::UnsupportedSize { .. })));
    }

    #[test]
    fn in_place_real_roundtrip_scales_by_n() {
        let size = ProblemSize::real(20);
        let backend = RustFftBackend::new();
        let mut plan = backend.prepare(size).unwrap();
        let input: Vec<f32> = (0..20).map(|i| (i as f32 * 0.3).sin()).collect();
        let mut data = input.clone();
        let mut scratch = vec![0.0f32; backend.scratch_len(&size)];
        plan.forward(TransformIo::InPlace(&mut data), &mut scratch);
        plan.inverse(TransformIo::InPlace(&mut data), &mut scratch);
        for (x, y) in input.iter().zip(&data) {
            assert_abs_diff_eq!(x * 20.0, *y, epsilon = 1e-4);
        }
    }
}
