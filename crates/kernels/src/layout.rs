//! Canonical coefficient layouts shared by back-ends.
//!
//! Complex spectra are interleaved `(re, im)` pairs in ascending frequency.
//! Real spectra use the packed layout
//! `[X0.re, X(N/2).re, X1.re, X1.im, ..., X(N/2-1).re, X(N/2-1).im]`:
//! DC and Nyquist are purely real and share the first pair.

use crate::config::Domain;
use num_complex::Complex;
use std::ops::Neg;

/// Pack the lower half of a full Hermitian spectrum into the real layout.
pub fn pack_real<T: Copy>(full: &[Complex<T>], packed: &mut [T]) {
    let n = packed.len();
    let half = n / 2;
    packed[0] = full[0].re;
    packed[1] = full[half].re;
    for k in 1..half {
        packed[2 * k] = full[k].re;
        packed[2 * k + 1] = full[k].im;
    }
}

/// Expand a packed real spectrum into the full Hermitian spectrum.
pub fn unpack_real<T>(packed: &[T], full: &mut [Complex<T>])
where
    T: Copy + Default + Neg<Output = T>,
{
    let n = packed.len();
    let half = n / 2;
    full[0] = Complex::new(packed[0], T::default());
    full[half] = Complex::new(packed[1], T::default());
    for k in 1..half {
        let re = packed[2 * k];
        let im = packed[2 * k + 1];
        full[k] = Complex::new(re, im);
        full[n - k] = Complex::new(re, -im);
    }
}

/// `out += a * b * scale` over canonical spectra of `domain`.
pub fn convolve_canonical(domain: Domain, a: &[f32], b: &[f32], out: &mut [f32], scale: f32) {
    let start = match domain {
        Domain::Real => {
            out[0] += a[0] * b[0] * scale;
            out[1] += a[1] * b[1] * scale;
            2
        }
        Domain::Complex => 0,
    };
    for k in (start..out.len()).step_by(2) {
        let (ar, ai) = (a[k], a[k + 1]);
        let (br, bi) = (b[k], b[k + 1]);
        out[k] += (ar * br - ai * bi) * scale;
        out[k + 1] += (ar * bi + ai * br) * scale;
    }
}

/// Reorder for back-ends whose native layout already is canonical.
pub fn identity_reorder(input: &[f32], output: &mut [f32]) {
    output.copy_from_slice(input);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_roundtrip_preserves_hermitian_spectrum() {
        let n = 8;
        let mut full = vec![Complex::new(0.0f64, 0.0); n];
        full[0] = Complex::new(3.0, 0.0);
        full[4] = Complex::new(-1.0, 0.0);
        for k in 1..4 {
            full[k] = Complex::new(k as f64, 0.5 * k as f64);
            full[n - k] = full[k].conj();
        }
        let mut packed = vec![0.0f64; n];
        pack_real(&full, &mut packed);
        assert_eq!(&packed[..4], &[3.0, -1.0, 1.0, 0.5]);

        let mut rebuilt = vec![Complex::new(0.0f64, 0.0); n];
        unpack_real(&packed, &mut rebuilt);
        assert_eq!(rebuilt, full);
    }

    #[test]
    fn real_convolution_squares_dc_and_nyquist_as_scalars() {
        let a = [2.0f32, 3.0, 1.0, 1.0];
        let mut out = [0.0f32; 4];
        convolve_canonical(Domain::Real, &a, &a, &mut out, 1.0);
        assert_eq!(out, [4.0, 9.0, 0.0, 2.0]);
    }

    #[test]
    fn complex_convolution_accumulates() {
        let a = [1.0f32, 2.0];
        let b = [3.0f32, -1.0];
        let mut out = [1.0f32, 1.0];
        convolve_canonical(Domain::Complex, &a, &b, &mut out, 0.5);
        // (1 + 2i)(3 - i) = 5 + 5i
        assert_eq!(out, [3.5, 3.5]);
    }
}
