//! Validation gate for SpectraBench back-ends.
//!
//! Every back-end is checked in its native coefficient order and in
//! canonical order: aliased and distinct buffers must agree bit-for-bit,
//! reordering must be lossless, and forward, round-trip and convolution
//! results must match the trusted reference within tolerance.

pub mod report;
pub mod verifier;

pub use report::*;
pub use verifier::*;
