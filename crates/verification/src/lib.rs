//! Dependency verification failures and their console report.
//!
//! Verification produces [`VerificationFailure`]s per artifact.
//! [`DependencyVerificationReporter`] groups them, orders them so the same
//! failures always render the same text, and decides which hints to show.

pub mod error;
pub mod failure;
pub mod report;

pub use error::{Error, Result};
pub use failure::{
    ChecksumKind, RepositoryAwareVerificationFailure, SignatureError, SignatureErrorKind,
    VerificationFailure,
};
pub use report::{
    render, DependencyVerificationReporter, ReportRenderer, TextReportRenderer, VerificationHighLevelErrors,
    VerificationReport,
};
