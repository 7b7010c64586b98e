//! Shared helpers for back-end implementations.

use num_complex::Complex;
use std::f64::consts::PI;

/// `floor(log2(n))`, with `log2_floor(0) == 0`.
pub fn log2_floor(n: usize) -> u32 {
    if n == 0 {
        0
    } else {
        usize::BITS - 1 - n.leading_zeros()
    }
}

/// Bit-reversal permutation over `n` (a power of two) slots.
pub fn bit_reverse_table(n: usize) -> Vec<u32> {
    let bits = log2_floor(n);
    (0..n as u32)
        .map(|i| {
            if bits == 0 {
                0
            } else {
                i.reverse_bits() >> (u32::BITS - bits)
            }
        })
        .collect()
}

/// Prime factors of `n` in ascending order, with multiplicity.
pub fn prime_factors(mut n: usize) -> Vec<usize> {
    let mut factors = Vec::new();
    let mut p = 2;
    while p * p <= n {
        while n % p == 0 {
            factors.push(p);
            n /= p;
        }
        p += if p == 2 { 1 } else { 2 };
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// `exp(-2πi·k/n)` for `k` in `0..count`, computed in `f64`.
pub fn twiddles_f64(n: usize, count: usize) -> Vec<Complex<f64>> {
    (0..count)
        .map(|k| {
            let angle = -2.0 * PI * k as f64 / n as f64;
            Complex::new(angle.cos(), angle.sin())
        })
        .collect()
}

/// Single-precision twiddles rounded from the `f64` table.
pub fn twiddles_f32(n: usize, count: usize) -> Vec<Complex<f32>> {
    twiddles_f64(n, count)
        .into_iter()
        .map(|w| Complex::new(w.re as f32, w.im as f32))
        .collect()
}
