//! Clocks, guarded buffers, throughput calibration and budget-bounded
//! benchmark loops for SpectraBench.

pub mod buffers;
pub mod calibrate;
pub mod clock;
pub mod measurement;
pub mod runner;

pub use buffers::*;
pub use calibrate::*;
pub use clock::*;
pub use measurement::*;
pub use runner::*;
