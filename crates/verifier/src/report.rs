//! Validation outcomes and the fatal mismatch error.

use serde::{Deserialize, Serialize};
use spectrabench_kernels::config::{Domain, ProblemSize};
use std::fmt;
use thiserror::Error;

/// Coefficient order a validation pass works in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPass {
    Native,
    Canonical,
}

impl ValidationPass {
    pub const ALL: [ValidationPass; 2] = [ValidationPass::Native, ValidationPass::Canonical];
}

impl fmt::Display for ValidationPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationPass::Native => f.write_str("native"),
            ValidationPass::Canonical => f.write_str("canonical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckKind {
    /// Separate and aliased forward outputs are bit-identical.
    Determinism,
    /// Separate and aliased inverse outputs are bit-identical.
    InverseDeterminism,
    /// Native -> canonical -> native is bit-identical.
    ReorderInvertibility,
    ReferenceEquivalence,
    RoundTrip,
    ConvolutionTheorem,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckKind::Determinism => "forward determinism",
            CheckKind::InverseDeterminism => "inverse determinism",
            CheckKind::ReorderInvertibility => "reorder invertibility",
            CheckKind::ReferenceEquivalence => "reference equivalence",
            CheckKind::RoundTrip => "round trip",
            CheckKind::ConvolutionTheorem => "convolution theorem",
        };
        f.write_str(label)
    }
}

/// A tolerance was exceeded. Always fatal.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error(
    "{backend} failed {check} at {size} ({pass} pass): max error {max_error:e} exceeds {bound:e}"
)]
pub struct NumericMismatchError {
    pub backend: String,
    pub size: ProblemSize,
    pub pass: ValidationPass,
    pub check: CheckKind,
    pub max_error: f64,
    pub bound: f64,
}

/// Worst observed error for one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub pass: ValidationPass,
    pub check: CheckKind,
    pub max_error: f64,
    pub bound: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum CaseOutcome {
    Passed { checks: Vec<CheckRecord> },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    pub backend: String,
    pub size: ProblemSize,
    pub outcome: CaseOutcome,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Passed { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub cases: Vec<CaseReport>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, cases: impl IntoIterator<Item = CaseReport>) {
        self.cases.extend(cases);
    }

    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|case| case.passed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.cases.len() - self.passed()
    }

    pub fn cases_for(&self, domain: Domain) -> impl Iterator<Item = &CaseReport> {
        self.cases
            .iter()
            .filter(move |case| case.size.domain == domain)
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
