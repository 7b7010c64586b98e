//! Iterative radix-2 kernel with a native (unordered) coefficient layout.
//!
//! Complex forward transforms run decimation-in-frequency and leave the bins
//! in bit-reversed order; the inverse runs decimation-in-time and consumes
//! bit-reversed bins directly, so neither direction pays for a permutation.
//! Real transforms of length `N` run a complex transform of length `N/2` and
//! store the result half-complex: `[r0, r1, ..., r(N/2), i(N/2-1), ..., i1]`.

use crate::backend::{PlanError, TransformBackend, TransformIo, TransformPlan};
use crate::config::{Direction, Domain, ProblemSize};
use crate::utils::{bit_reverse_table, twiddles_f32};
use num_complex::Complex32;

pub const MIN_COMPLEX_SIZE: usize = 16;
pub const MIN_REAL_SIZE: usize = 2 * MIN_COMPLEX_SIZE;

#[derive(Debug, Default, Clone, Copy)]
pub struct Radix2Fft;

impl Radix2Fft {
    pub fn new() -> Self {
        Self
    }
}

impl TransformBackend for Radix2Fft {
    fn name(&self) -> &'static str {
        "radix2-u"
    }

    fn min_size(&self, domain: Domain) -> usize {
        match domain {
            Domain::Real => MIN_REAL_SIZE,
            Domain::Complex => MIN_COMPLEX_SIZE,
        }
    }

    fn supports(&self, size: &ProblemSize) -> bool {
        size.is_power_of_two() && size.n >= self.min_size(size.domain)
    }

    fn alignment(&self) -> usize {
        32
    }

    fn scratch_len(&self, size: &ProblemSize) -> usize {
        match size.domain {
            Domain::Real => size.n,
            Domain::Complex => 0,
        }
    }

    fn prepare(&self, size: ProblemSize) -> Result<Box<dyn TransformPlan>, PlanError> {
        if !size.is_power_of_two() {
            return Err(PlanError::unsupported(
                self.name(),
                size,
                "length must be a power of two",
            ));
        }
        if size.n < self.min_size(size.domain) {
            return Err(PlanError::unsupported(
                self.name(),
                size,
                format!("minimum {} size is {}", size.domain, self.min_size(size.domain)),
            ));
        }
        Ok(Box::new(Radix2Plan::new(size)))
    }
}

pub struct Radix2Plan {
    size: ProblemSize,
    /// Complex transform length: `N` for complex data, `N/2` for real data.
    len: usize,
    twiddles: Vec<Complex32>,
    bitrev: Vec<u32>,
    /// `exp(-2πi·k/N)` for `k` in `0..=N/2`, real domain only.
    real_twiddles: Vec<Complex32>,
}

impl Radix2Plan {
    pub fn new(size: ProblemSize) -> Self {
        let len = match size.domain {
            Domain::Complex => size.n,
            Domain::Real => size.n / 2,
        };
        let real_twiddles = match size.domain {
            Domain::Real => twiddles_f32(size.n, len + 1),
            Domain::Complex => Vec::new(),
        };
        Self {
            size,
            len,
            twiddles: twiddles_f32(len, len / 2),
            bitrev: bit_reverse_table(len),
            real_twiddles,
        }
    }

    /// Natural order in, bit-reversed order out.
    fn dif(&self, data: &mut [Complex32]) {
        let n = data.len();
        let mut half = n / 2;
        let mut tw_step = 1;
        while half >= 1 {
            for start in (0..n).step_by(2 * half) {
                for j in 0..half {
                    let a = data[start + j];
                    let b = data[start + j + half];
                    data[start + j] = a + b;
                    data[start + j + half] = (a - b) * self.twiddles[j * tw_step];
                }
            }
            half /= 2;
            tw_step *= 2;
        }
    }

    /// Bit-reversed order in, natural order out, conjugate twiddles.
    fn dit_inverse(&self, data: &mut [Complex32]) {
        let n = data.len();
        let mut half = 1;
        let mut tw_step = n / 2;
        while half < n {
            for start in (0..n).step_by(2 * half) {
                for j in 0..half {
                    let a = data[start + j];
                    let b = data[start + j + half] * self.twiddles[j * tw_step].conj();
                    data[start + j] = a + b;
                    data[start + j + half] = a - b;
                }
            }
            half *= 2;
            tw_step /= 2;
        }
    }

    fn real_forward(&self, io: TransformIo<'_>, scratch: &mut [f32]) {
        let n = self.size.n;
        let half = self.len;
        let staging = &mut scratch[..n];
        let out = io.stage_input(staging);
        let z: &mut [Complex32] = bytemuck::cast_slice_mut(staging);
        self.dif(z);

        for k in 0..=half {
            let zk = z[self.bitrev[k % half] as usize];
            let zm = z[self.bitrev[(half - k) % half] as usize].conj();
            let even = (zk + zm) * 0.5;
            let odd = (zk - zm) * Complex32::new(0.0, -0.5);
            let x = even + self.real_twiddles[k] * odd;
            out[k] = x.re;
            if k > 0 && k < half {
                out[n - k] = x.im;
            }
        }
    }

    fn real_inverse(&self, io: TransformIo<'_>, scratch: &mut [f32]) {
        match io {
            TransformIo::Separate { input, output } => {
                self.stage_half_complex(input, &mut scratch[..self.size.n]);
                self.finish_real_inverse(&mut scratch[..self.size.n], output);
            }
            TransformIo::InPlace(data) => {
                self.stage_half_complex(data, &mut scratch[..self.size.n]);
                self.finish_real_inverse(&mut scratch[..self.size.n], data);
            }
        }
    }

    /// Fold the half-complex spectrum into the bit-reversed packed spectrum
    /// of the length-`N/2` complex signal `x[2t] + i·x[2t+1]`, scaled by 2.
    fn stage_half_complex(&self, spectrum: &[f32], staging: &mut [f32]) {
        let n = self.size.n;
        let half = self.len;
        let bin = |k: usize| {
            if k == 0 || k == half {
                Complex32::new(spectrum[k], 0.0)
            } else {
                Complex32::new(spectrum[k], spectrum[n - k])
            }
        };
        let z: &mut [Complex32] = bytemuck::cast_slice_mut(staging);
        for k in 0..half {
            let a = bin(k);
            let b = bin(half - k).conj();
            let w = self.real_twiddles[k].conj();
            z[self.bitrev[k] as usize] = (a + b) + Complex32::new(0.0, 1.0) * w * (a - b);
        }
    }

    fn finish_real_inverse(&self, staging: &mut [f32], out: &mut [f32]) {
        let z: &mut [Complex32] = bytemuck::cast_slice_mut(staging);
        self.dit_inverse(z);
        out.copy_from_slice(bytemuck::cast_slice::<Complex32, f32>(z));
    }
}

impl TransformPlan for Radix2Plan {
    fn size(&self) -> ProblemSize {
        self.size
    }

    fn forward(&mut self, io: TransformIo<'_>, scratch: &mut [f32]) {
        match self.size.domain {
            Domain::Complex => {
                let data = io.into_output();
                self.dif(bytemuck::cast_slice_mut(data));
            }
            Domain::Real => self.real_forward(io, scratch),
        }
    }

    fn inverse(&mut self, io: TransformIo<'_>, scratch: &mut [f32]) {
        match self.size.domain {
            Domain::Complex => {
                let data = io.into_output();
                self.dit_inverse(bytemuck::cast_slice_mut(data));
            }
            Domain::Real => self.real_inverse(io, scratch),
        }
    }

    fn reorder(&self, input: &[f32], output: &mut [f32], direction: Direction) {
        match self.size.domain {
            Domain::Complex => {
                let src: &[Complex32] = bytemuck::cast_slice(input);
                let dst: &mut [Complex32] = bytemuck::cast_slice_mut(output);
                for (k, &r) in self.bitrev.iter().enumerate() {
                    match direction {
                        Direction::Forward => dst[k] = src[r as usize],
                        Direction::Backward => dst[r as usize] = src[k],
                    }
                }
            }
            Domain::Real => {
                let n = self.size.n;
                let half = self.len;
                match direction {
                    Direction::Forward => {
                        output[0] = input[0];
                        output[1] = input[half];
                        for k in 1..half {
                            output[2 * k] = input[k];
                            output[2 * k + 1] = input[n - k];
                        }
                    }
                    Direction::Backward => {
                        output[0] = input[0];
                        output[half] = input[1];
                        for k in 1..half {
                            output[k] = input[2 * k];
                            output[n - k] = input[2 * k + 1];
                        }
                    }
                }
            }
        }
    }

    fn accumulate_convolve(&self, a: &[f32], b: &[f32], out: &mut [f32], scale: f32) {
        match self.size.domain {
            Domain::Complex => {
                for k in (0..out.len()).step_by(2) {
                    let (ar, ai) = (a[k], a[k + 1]);
                    let (br, bi) = (b[k], b[k + 1]);
                    out[k] += (ar * br - ai * bi) * scale;
                    out[k + 1] += (ar * bi + ai * br) * scale;
                }
            }
            Domain::Real => {
                let n = self.size.n;
                let half = self.len;
                out[0] += a[0] * b[0] * scale;
                out[half] += a[half] * b[half] * scale;
                for k in 1..half {
                    let (ar, ai) = (a[k], a[n - k]);
                    let (br, bi) = (b[k], b[n - k]);
                    out[k] += (ar * br - ai * bi) * scale;
                    out[n - k] += (ar * bi + ai * br) * scale;
                }
            }
        }
    }
}
