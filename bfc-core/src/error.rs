//! Typed errors the core pipeline can itself detect.
//!
//! The driver crate adds its own argument/I-O diagnostics on top of
//! these; both are formatted through the same `<program-name>:
//! <message>.` convention so the two layers are indistinguishable to a
//! caller reading stderr.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    /// A `WHILE` placeholder has no balanced `END` before the code
    /// buffer runs out.
    #[error("non matching '['")]
    MismatchedOpeningBracket,

    /// An `END` placeholder was reached in the top-level stride scan
    /// with no open `WHILE` to match it.
    #[error("non matching ']'")]
    MismatchedClosingBracket,

    /// The code buffer could not be grown to the requested capacity.
    #[error("cannot allocate memory")]
    AllocationFailure,
}
