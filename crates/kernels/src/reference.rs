//! Trusted scalar reference: recursive mixed-radix DFT in double precision.
//!
//! Used as ground truth by the correctness gate and also registered as the
//! scalar baseline back-end. It accepts any `N`; the real domain needs `N`
//! even so that the Nyquist bin exists.

use crate::backend::{PlanError, TransformBackend, TransformIo, TransformPlan};
use crate::config::{Direction, Domain, ProblemSize};
use crate::layout::{convolve_canonical, identity_reorder, pack_real, unpack_real};
use crate::utils::{prime_factors, twiddles_f64};
use num_complex::Complex;

type C64 = Complex<f64>;

/// Ground-truth transforms in canonical layout.
pub trait ReferenceTransform: Send + Sync {
    fn name(&self) -> &'static str;

    fn forward_canonical(&self, size: ProblemSize, input: &[f32]) -> Result<Vec<f64>, PlanError>;

    /// Unnormalized inverse of a canonical spectrum.
    fn inverse_canonical(&self, size: ProblemSize, spectrum: &[f64])
        -> Result<Vec<f64>, PlanError>;
}

/// Factorized DFT engine of one length.
#[derive(Debug, Clone)]
pub struct MixedRadix {
    n: usize,
    factors: Vec<usize>,
    twiddles: Vec<C64>,
    max_radix: usize,
}

impl MixedRadix {
    pub fn new(n: usize) -> Self {
        let factors = if n > 1 { prime_factors(n) } else { vec![1] };
        let max_radix = factors.iter().copied().max().unwrap_or(1);
        Self {
            n,
            factors,
            twiddles: twiddles_f64(n, n),
            max_radix,
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Unnormalized DFT of `input` into `output`; `tmp` needs `max_radix()` slots.
    pub fn process(&self, input: &[C64], output: &mut [C64], inverse: bool, tmp: &mut [C64]) {
        debug_assert_eq!(input.len(), self.n);
        debug_assert_eq!(output.len(), self.n);
        self.work(output, input, 1, &self.factors, 1, inverse, tmp);
    }

    pub fn max_radix(&self) -> usize {
        self.max_radix
    }

    fn twiddle(&self, index: usize, inverse: bool) -> C64 {
        let w = self.twiddles[index % self.n];
        if inverse {
            w.conj()
        } else {
            w
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn work(
        &self,
        out: &mut [C64],
        input: &[C64],
        in_stride: usize,
        factors: &[usize],
        tw_stride: usize,
        inverse: bool,
        tmp: &mut [C64],
    ) {
        let p = factors[0];
        let m = out.len() / p;

        if m == 1 {
            for (q, slot) in out.iter_mut().enumerate() {
                *slot = input[q * in_stride];
            }
        } else {
            for q in 0..p {
                self.work(
                    &mut out[q * m..(q + 1) * m],
                    &input[q * in_stride..],
                    in_stride * p,
                    &factors[1..],
                    tw_stride * p,
                    inverse,
                    tmp,
                );
            }
        }

        if p == 1 {
            return;
        }

        for k in 0..m {
            for q in 0..p {
                tmp[q] = out[q * m + k] * self.twiddle(q * k * tw_stride, inverse);
            }
            for q2 in 0..p {
                let mut acc = C64::new(0.0, 0.0);
                for (q, &value) in tmp[..p].iter().enumerate() {
                    acc += value * self.twiddle(q * q2 * m * tw_stride, inverse);
                }
                out[q2 * m + k] = acc;
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarReference;

impl ScalarReference {
    pub fn new() -> Self {
        Self
    }

    fn check(&self, size: &ProblemSize) -> Result<(), PlanError> {
        if size.n < self.min_size(size.domain) {
            return Err(PlanError::unsupported(
                TransformBackend::name(self),
                *size,
                format!("minimum size is {}", self.min_size(size.domain)),
            ));
        }
        if size.domain == Domain::Real && size.n % 2 != 0 {
            return Err(PlanError::unsupported(
                TransformBackend::name(self),
                *size,
                "real transforms need an even length",
            ));
        }
        Ok(())
    }
}

impl ReferenceTransform for ScalarReference {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn forward_canonical(&self, size: ProblemSize, input: &[f32]) -> Result<Vec<f64>, PlanError> {
        self.check(&size)?;
        let engine = MixedRadix::new(size.n);
        let mut tmp = vec![C64::new(0.0, 0.0); engine.max_radix()];
        let mut output = vec![C64::new(0.0, 0.0); size.n];
        let signal = load_signal(size, input);
        engine.process(&signal, &mut output, false, &mut tmp);

        let mut canonical = vec![0.0f64; size.float_len()];
        match size.domain {
            Domain::Complex => {
                for (k, value) in output.iter().enumerate() {
                    canonical[2 * k] = value.re;
                    canonical[2 * k + 1] = value.im;
                }
            }
            Domain::Real => pack_real(&output, &mut canonical),
        }
        Ok(canonical)
    }

    fn inverse_canonical(
        &self,
        size: ProblemSize,
        spectrum: &[f64],
    ) -> Result<Vec<f64>, PlanError> {
        self.check(&size)?;
        let engine = MixedRadix::new(size.n);
        let mut tmp = vec![C64::new(0.0, 0.0); engine.max_radix()];
        let mut full = vec![C64::new(0.0, 0.0); size.n];
        match size.domain {
            Domain::Complex => {
                for (k, slot) in full.iter_mut().enumerate() {
                    *slot = C64::new(spectrum[2 * k], spectrum[2 * k + 1]);
                }
            }
            Domain::Real => unpack_real(spectrum, &mut full),
        }
        let mut output = vec![C64::new(0.0, 0.0); size.n];
        engine.process(&full, &mut output, true, &mut tmp);

        Ok(match size.domain {
            Domain::Complex => output.iter().flat_map(|c| [c.re, c.im]).collect(),
            Domain::Real => output.iter().map(|c| c.re).collect(),
        })
    }
}

impl TransformBackend for ScalarReference {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn supports(&self, size: &ProblemSize) -> bool {
        self.check(size).is_ok()
    }

    fn scratch_len(&self, _size: &ProblemSize) -> usize {
        0
    }

    fn prepare(&self, size: ProblemSize) -> Result<Box<dyn TransformPlan>, PlanError> {
        self.check(&size)?;
        let engine = MixedRadix::new(size.n);
        let tmp = vec![C64::new(0.0, 0.0); engine.max_radix()];
        Ok(Box::new(ScalarPlan {
            size,
            engine,
            signal: vec![C64::new(0.0, 0.0); size.n],
            result: vec![C64::new(0.0, 0.0); size.n],
            tmp,
        }))
    }
}

fn load_signal(size: ProblemSize, input: &[f32]) -> Vec<C64> {
    match size.domain {
        Domain::Complex => input
            .chunks_exact(2)
            .map(|pair| C64::new(pair[0] as f64, pair[1] as f64))
            .collect(),
        Domain::Real => input.iter().map(|&x| C64::new(x as f64, 0.0)).collect(),
    }
}

struct ScalarPlan {
    size: ProblemSize,
    engine: MixedRadix,
    signal: Vec<C64>,
    result: Vec<C64>,
    tmp: Vec<C64>,
}

impl ScalarPlan {
    fn load(&mut self, data: &[f32]) {
        match self.size.domain {
            Domain::Complex => {
                for (slot, pair) in self.signal.iter_mut().zip(data.chunks_exact(2)) {
                    *slot = C64::new(pair[0] as f64, pair[1] as f64);
                }
            }
            Domain::Real => {
                for (slot, &x) in self.signal.iter_mut().zip(data) {
                    *slot = C64::new(x as f64, 0.0);
                }
            }
        }
    }

    fn load_spectrum(&mut self, data: &[f32]) {
        match self.size.domain {
            Domain::Complex => self.load(data),
            Domain::Real => {
                let n = self.size.n;
                let half = n / 2;
                self.signal[0] = C64::new(data[0] as f64, 0.0);
                self.signal[half] = C64::new(data[1] as f64, 0.0);
                for k in 1..half {
                    let value = C64::new(data[2 * k] as f64, data[2 * k + 1] as f64);
                    self.signal[k] = value;
                    self.signal[n - k] = value.conj();
                }
            }
        }
    }

    fn store_spectrum(&self, out: &mut [f32]) {
        match self.size.domain {
            Domain::Complex => store_interleaved(&self.result, out),
            Domain::Real => {
                let half = self.size.n / 2;
                out[0] = self.result[0].re as f32;
                out[1] = self.result[half].re as f32;
                for k in 1..half {
                    out[2 * k] = self.result[k].re as f32;
                    out[2 * k + 1] = self.result[k].im as f32;
                }
            }
        }
    }

    fn store_signal(&self, out: &mut [f32]) {
        match self.size.domain {
            Domain::Complex => store_interleaved(&self.result, out),
            Domain::Real => {
                for (slot, value) in out.iter_mut().zip(&self.result) {
                    *slot = value.re as f32;
                }
            }
        }
    }
}

fn store_interleaved(values: &[C64], out: &mut [f32]) {
    for (pair, value) in out.chunks_exact_mut(2).zip(values) {
        pair[0] = value.re as f32;
        pair[1] = value.im as f32;
    }
}

impl TransformPlan for ScalarPlan {
    fn size(&self) -> ProblemSize {
        self.size
    }

    fn forward(&mut self, io: TransformIo<'_>, _scratch: &mut [f32]) {
        let output = match io {
            TransformIo::Separate { input, output } => {
                self.load(input);
                output
            }
            TransformIo::InPlace(data) => {
                self.load(data);
                data
            }
        };
        self.engine
            .process(&self.signal, &mut self.result, false, &mut self.tmp);
        self.store_spectrum(output);
    }

    fn inverse(&mut self, io: TransformIo<'_>, _scratch: &mut [f32]) {
        let output = match io {
            TransformIo::Separate { input, output } => {
                self.load_spectrum(input);
                output
            }
            TransformIo::InPlace(data) => {
                self.load_spectrum(data);
                data
            }
        };
        self.engine
            .process(&self.signal, &mut self.result, true, &mut self.tmp);
        self.store_signal(output);
    }

    fn reorder(&self, input: &[f32], output: &mut [f32], _direction: Direction) {
        identity_reorder(input, output);
    }

    fn accumulate_convolve(&self, a: &[f32], b: &[f32], out: &mut [f32], scale: f32) {
        convolve_canonical(self.size.domain, a, b, out, scale);
    }
}
