//! This module implements statistical disclosure estimates of the
//! recipients of a target participant.
//!
//! Estimators are fed one round at a time, and can be queried for the
//! current likelihood vector at any point; running them over a growing
//! prefix of the rounds costs no more than running them once.
pub mod standard;
pub mod extended;

pub use self::standard::{StandardEstimator, standard_sda};
pub use self::extended::{ExtendedEstimator, extended_sda};

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ParticipantIndex;
use crate::error::{Result, SdaError};
use crate::observations::RoundObservation;

/// Available estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Estimate {
    /// Standard disclosure attack against a known background profile.
    Standard,
    /// Disclosure attack using the target's cloak as background.
    Extended,
}

impl Default for Estimate {
    fn default() -> Self {
        Estimate::Standard
    }
}

pub trait DisclosureEstimator {
    /// Adds the next round.
    fn add_round(&mut self, round: &RoundObservation) -> Result<()>;
    /// Returns the number of rounds added so far.
    fn rounds(&self) -> usize;
    /// Returns the current likelihood of each participant being one of
    /// the target's recipients. Only the ordering of the values is
    /// meaningful.
    fn likelihoods(&self) -> Result<Array1<f64>>;
}

/// Checks that both count vectors of a round cover `expected` participants.
fn check_dimension(round: &RoundObservation, expected: usize) -> Result<()> {
    for found in &[round.sent_counts.len(), round.received_counts.len()] {
        if *found != expected {
            return Err(SdaError::DimensionMismatch { expected, found: *found });
        }
    }
    Ok(())
}

fn check_target(target: ParticipantIndex, n: usize) -> Result<()> {
    if target >= n {
        return Err(SdaError::IndexOutOfRange { index: target, n });
    }
    Ok(())
}
