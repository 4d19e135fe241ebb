//! Standard statistical disclosure attack.
//!
//! With `t` rounds observed, `b` messages entering the network per round
//! and `u` the profile of the other senders, the target's profile is
//! estimated as:
//!
//! ```text
//! v = b * sum(received counts of rounds where the target sent) / t
//!     - (b - 1) * u
//! ```
//!
//! Note that `t` counts *all* the observed rounds, not only those in
//! which the target was active.
use ndarray::prelude::*;

use crate::ParticipantIndex;
use crate::error::{Result, SdaError};
use crate::estimates::{DisclosureEstimator, check_dimension, check_target};
use crate::observations::RoundObservation;

/// Keeps the running sums of the standard disclosure attack.
#[derive(Debug, Clone)]
pub struct StandardEstimator {
    b: f64,
    background: Array1<f64>,
    target: ParticipantIndex,
    // Received counts summed over the rounds in which the target sent.
    received: Array1<usize>,
    // Number of those rounds.
    relevant: usize,
    rounds: usize,
}

impl StandardEstimator {
    /// Creates an estimator for `target`, with `b` messages per round and
    /// a background profile whose length sets the number of participants.
    pub fn new(b: f64, background: &ArrayView1<f64>, target: ParticipantIndex)
            -> Result<StandardEstimator> {
        check_target(target, background.len())?;

        Ok(StandardEstimator {
            b,
            background: background.to_owned(),
            target,
            received: Array1::zeros(background.len()),
            relevant: 0,
            rounds: 0,
        })
    }

    /// Number of rounds in which the target was active.
    pub fn relevant_rounds(&self) -> usize {
        self.relevant
    }
}

impl DisclosureEstimator for StandardEstimator {
    fn add_round(&mut self, round: &RoundObservation) -> Result<()> {
        check_dimension(round, self.background.len())?;

        self.rounds += 1;
        if round.is_active(self.target) {
            self.received += &round.received_counts;
            self.relevant += 1;
        }
        Ok(())
    }

    fn rounds(&self) -> usize {
        self.rounds
    }

    fn likelihoods(&self) -> Result<Array1<f64>> {
        if self.rounds == 0 {
            return Err(SdaError::EmptyObservations);
        }
        let t = self.rounds as f64;
        let mut v = self.received.mapv(|c| self.b * c as f64 / t);
        v.scaled_add(-(self.b - 1.), &self.background);

        Ok(v)
    }
}

/// Runs the standard disclosure attack on `observations`.
pub fn standard_sda(observations: &[RoundObservation], b: f64,
                    background: &ArrayView1<f64>, target: ParticipantIndex)
        -> Result<Array1<f64>> {
    let mut estimator = StandardEstimator::new(b, background, target)?;
    for round in observations {
        estimator.add_round(round)?;
    }
    estimator.likelihoods()
}
