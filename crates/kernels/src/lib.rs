//! FFT back-ends and coefficient layouts for SpectraBench.

pub mod backend;
pub mod config;
pub mod layout;
pub mod ordered;
pub mod radix2;
pub mod reference;
pub mod registry;
pub mod utils;
pub mod vendor;

pub use backend::*;
pub use config::*;
pub use layout::*;
pub use ordered::*;
pub use radix2::{Radix2Fft, Radix2Plan};
pub use reference::*;
pub use registry::*;
pub use utils::*;
pub use vendor::*;
