//! Problem configuration structures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sweep of sizes used by the correctness gate, smallest to largest.
pub const VALIDATION_SIZES: [usize; 23] = [
    16, 32, 64, 96, 128, 160, 192, 256, 288, 384, 480, 512, 576, 640, 800, 864, 1024, 2048, 2592,
    4000, 4096, 12000, 36864,
];

/// Canonical probe size for throughput calibration.
pub const CALIBRATION_SIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Real,
    Complex,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::Real, Domain::Complex];

    /// Number of interleaved `f32`s needed to hold `n` samples.
    pub fn float_len(&self, n: usize) -> usize {
        match self {
            Domain::Real => n,
            Domain::Complex => 2 * n,
        }
    }

    /// Per-sample constant of the `c·N·log2(N)` flop model.
    pub fn flop_constant(&self) -> f64 {
        match self {
            Domain::Real => 2.5,
            Domain::Complex => 5.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Domain::Real => "real",
            Domain::Complex => "cplx",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Transform direction. For reordering, `Forward` maps native to canonical
/// layout and `Backward` maps canonical back to native.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProblemSize {
    pub n: usize,
    pub domain: Domain,
}

impl ProblemSize {
    pub fn new(n: usize, domain: Domain) -> Self {
        Self { n, domain }
    }

    pub fn complex(n: usize) -> Self {
        Self::new(n, Domain::Complex)
    }

    pub fn real(n: usize) -> Self {
        Self::new(n, Domain::Real)
    }

    pub fn float_len(&self) -> usize {
        self.domain.float_len(self.n)
    }

    pub fn workload(&self) -> f64 {
        workload(self.n)
    }

    /// Flops of one forward+inverse pair under the standard FFT cost model.
    pub fn flops_per_pair(&self) -> f64 {
        2.0 * self.domain.flop_constant() * self.workload()
    }

    pub fn is_power_of_two(&self) -> bool {
        self.n.is_power_of_two()
    }
}

impl fmt::Display for ProblemSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N={} {}", self.n, self.domain)
    }
}

/// Operation-count proxy `N·log2(N)`.
pub fn workload(n: usize) -> f64 {
    let n = n as f64;
    n * n.log2()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SizeSet {
    #[default]
    PowerOfTwo,
    Composite,
}

impl SizeSet {
    pub fn sizes(&self) -> Vec<usize> {
        match self {
            SizeSet::PowerOfTwo => (1..=20).map(|exp| 1usize << exp).collect(),
            SizeSet::Composite => vec![96, 160, 192, 384, 480, 640, 768, 800, 2400, 9216],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SizeSet::PowerOfTwo => "pow2",
            SizeSet::Composite => "non2",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn float_len_interleaves_complex() {
        assert_eq!(ProblemSize::real(64).float_len(), 64);
        assert_eq!(ProblemSize::complex(64).float_len(), 128);
    }

    #[test]
    fn flop_model_matches_fftw_convention() {
        let size = ProblemSize::complex(1024);
        assert_abs_diff_eq!(size.workload(), 10240.0);
        assert_abs_diff_eq!(size.flops_per_pair(), 2.0 * 5.0 * 10240.0);
        assert_abs_diff_eq!(ProblemSize::real(1024).flops_per_pair(), 2.0 * 2.5 * 10240.0);
    }

    #[test]
    fn composite_set_has_no_powers_of_two() {
        assert!(SizeSet::Composite
            .sizes()
            .iter()
            .all(|n| !n.is_power_of_two()));
        let pow2 = SizeSet::PowerOfTwo.sizes();
        assert_eq!(pow2.first(), Some(&2));
        assert_eq!(pow2.last(), Some(&(1 << 20)));
    }

    #[test]
    fn validation_sweep_is_sorted() {
        assert!(VALIDATION_SIZES.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn size_set_serializes_kebab_case() {
        let json = serde_json::to_string(&SizeSet::PowerOfTwo).unwrap();
        assert_eq!(json, "\"power-of-two\"");
    }
}
