//! SpectraBench harness: configuration, the validation-gated benchmark
//! session, result aggregation and presentation.

pub mod aggregate;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod report;
pub mod session;

pub use aggregate::*;
#[cfg(feature = "cli")]
pub use cli::*;
pub use config::*;
pub use report::*;
pub use session::*;
