//! Errors raised by the disclosure engine.
//!
//! Every error is raised synchronously by the call that detects it; the
//! engine never catches its own errors.
use std::io;
use thiserror::Error;

use crate::ParticipantIndex;

pub type Result<T> = std::result::Result<T, SdaError>;

#[derive(Error, Debug)]
pub enum SdaError {
    /// Invalid probability or rate arguments.
    #[error("domain error: {0}")]
    Domain(String),

    /// An identifier that never appears as a sender in the trace.
    #[error("participant `{0}` never sends in the trace")]
    UnknownParticipant(String),

    /// No rounds are available for the target.
    #[error("no observations available for the target")]
    EmptyObservations,

    /// A subset required by an estimator is empty.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("participant index {index} out of range for {n} participants")]
    IndexOutOfRange { index: ParticipantIndex, n: usize },

    #[error("round has {found} participants, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("could not parse line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
