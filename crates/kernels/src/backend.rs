//! Transform back-end capability.
//!
//! A [`TransformBackend`] is a factory for [`TransformPlan`]s. A plan is bound
//! to one [`ProblemSize`] and is released when dropped, so every exit path of
//! a run (including early `?` returns) tears it down.
//!
//! All buffers handed to a plan hold exactly `size.float_len()` interleaved
//! `f32`s. Forward and inverse transforms are unnormalized: running both
//! scales the signal by `N`.

use crate::config::{Direction, Domain, ProblemSize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("{backend} does not support {size}: {reason}")]
    UnsupportedSize {
        backend: &'static str,
        size: ProblemSize,
        reason: String,
    },
}

impl PlanError {
    pub fn unsupported(backend: &'static str, size: ProblemSize, reason: impl Into<String>) -> Self {
        PlanError::UnsupportedSize {
            backend,
            size,
            reason: reason.into(),
        }
    }
}

/// Input/output pair for one transform call. `InPlace` is the aliased case.
pub enum TransformIo<'a> {
    Separate {
        input: &'a [f32],
        output: &'a mut [f32],
    },
    InPlace(&'a mut [f32]),
}

impl<'a> TransformIo<'a> {
    pub fn len(&self) -> usize {
        match self {
            TransformIo::Separate { output, .. } => output.len(),
            TransformIo::InPlace(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the input into the output (no-op when aliased) and hand back the
    /// output, for kernels that always work in place.
    pub fn into_output(self) -> &'a mut [f32] {
        match self {
            TransformIo::Separate { input, output } => {
                output.copy_from_slice(input);
                output
            }
            TransformIo::InPlace(data) => data,
        }
    }

    /// Copy the input into `staging` and hand back the output, for kernels
    /// that read all of their input before writing any output.
    pub fn stage_input(self, staging: &mut [f32]) -> &'a mut [f32] {
        match self {
            TransformIo::Separate { input, output } => {
                staging[..input.len()].copy_from_slice(input);
                output
            }
            TransformIo::InPlace(data) => {
                staging[..data.len()].copy_from_slice(data);
                data
            }
        }
    }
}

pub trait TransformPlan {
    fn size(&self) -> ProblemSize;

    /// Forward transform; the result is in the back-end's native layout.
    fn forward(&mut self, io: TransformIo<'_>, scratch: &mut [f32]);

    /// Inverse transform of a native-layout spectrum.
    fn inverse(&mut self, io: TransformIo<'_>, scratch: &mut [f32]);

    /// Permute between native and canonical coefficient order.
    fn reorder(&self, input: &[f32], output: &mut [f32], direction: Direction);

    /// `out += a * b * scale`, elementwise over native-layout spectra.
    fn accumulate_convolve(&self, a: &[f32], b: &[f32], out: &mut [f32], scale: f32);

    /// Forward transform producing canonical order. `staging` must hold
    /// `size().float_len()` floats and is disjoint from `scratch`.
    fn forward_ordered(&mut self, io: TransformIo<'_>, scratch: &mut [f32], staging: &mut [f32]) {
        let len = self.size().float_len();
        let staging = &mut staging[..len];
        match io {
            TransformIo::Separate { input, output } => {
                self.forward(
                    TransformIo::Separate {
                        input,
                        output: &mut *output,
                    },
                    scratch,
                );
                self.reorder(output, staging, Direction::Forward);
                output.copy_from_slice(staging);
            }
            TransformIo::InPlace(data) => {
                self.forward(TransformIo::InPlace(&mut *data), scratch);
                self.reorder(data, staging, Direction::Forward);
                data.copy_from_slice(staging);
            }
        }
    }

    /// Inverse transform of a canonical-order spectrum.
    fn inverse_ordered(&mut self, io: TransformIo<'_>, scratch: &mut [f32], staging: &mut [f32]) {
        let len = self.size().float_len();
        let staging = &mut staging[..len];
        match io {
            TransformIo::Separate { input, output } => {
                self.reorder(input, staging, Direction::Backward);
                self.inverse(
                    TransformIo::Separate {
                        input: staging,
                        output,
                    },
                    scratch,
                );
            }
            TransformIo::InPlace(data) => {
                self.reorder(data, staging, Direction::Backward);
                self.inverse(
                    TransformIo::Separate {
                        input: staging,
                        output: data,
                    },
                    scratch,
                );
            }
        }
    }
}

pub trait TransformBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Smallest `N` this back-end accepts for `domain`.
    fn min_size(&self, _domain: Domain) -> usize {
        2
    }

    fn supports(&self, size: &ProblemSize) -> bool;

    /// Required buffer alignment in bytes.
    fn alignment(&self) -> usize {
        16
    }

    /// Scratch floats a plan for `size` expects from the caller.
    fn scratch_len(&self, size: &ProblemSize) -> usize;

    fn prepare(&self, size: ProblemSize) -> Result<Box<dyn TransformPlan>, PlanError>;
}

pub type DynTransformBackend = Arc<dyn TransformBackend>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_output_copies_separate_input() {
        let input = [1.0f32, 2.0, 3.0];
        let mut output = [0.0f32; 3];
        let io = TransformIo::Separate {
            input: &input,
            output: &mut output,
        };
        assert_eq!(io.len(), 3);
        let out = io.into_output();
        assert_eq!(out, &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn stage_input_preserves_aliased_data() {
        let mut data = [4.0f32, 5.0];
        let mut staging = [0.0f32; 4];
        let out = TransformIo::InPlace(&mut data).stage_input(&mut staging);
        assert_eq!(out, &[4.0, 5.0]);
        assert_eq!(&staging[..2], &[4.0, 5.0]);
    }

    #[test]
    fn unsupported_error_names_backend_and_size() {
        let err = PlanError::unsupported("radix2", ProblemSize::real(16), "below minimum");
        assert_eq!(
            err.to_string(),
            "radix2 does not support N=16 real: below minimum"
        );
    }
}
