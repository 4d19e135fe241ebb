//! Disclosure attack using the target's cloak as background.
//!
//! The *cloak* of the target is the set of participants that sent in at
//! least one of the rounds in which the target sent. Rounds in which the
//! target was silent but some cloak member sent estimate how the cloak
//! behaves without the target, replacing the static background profile
//! of the standard attack:
//!
//! ```text
//! v = b / (a * t') * sum(sent counts of target rounds)
//!     - (b - a) / a * cloak
//! ```
//!
//! where `t'` is the number of target rounds, `a` the target's average
//! share of the packets sent in them, and `cloak` the average sent
//! counts of the silent rounds in which the cloak was active.
//!
//! Silent rounds observed before any cloak member is known are kept
//! aside and reconsidered whenever the cloak grows.
use ndarray::prelude::*;

use crate::ParticipantIndex;
use crate::error::{Result, SdaError};
use crate::estimates::{DisclosureEstimator, check_dimension, check_target};
use crate::observations::RoundObservation;

#[derive(Debug, Clone)]
pub struct ExtendedEstimator {
    b: f64,
    target: ParticipantIndex,
    rounds: usize,
    // Sent counts summed over target rounds.
    target_sent: Array1<usize>,
    target_rounds: usize,
    // Sum over target rounds of the target's share of sent packets.
    share_sum: f64,
    cloak: Vec<bool>,
    // Sent counts summed over silent rounds where the cloak was active.
    cloak_sent: Array1<usize>,
    cloak_rounds: usize,
    // Silent rounds without any cloak member (yet).
    pending: Vec<Array1<usize>>,
}

fn touches_cloak(sent: &Array1<usize>, cloak: &[bool]) -> bool {
    sent.iter().zip(cloak).any(|(&c, &member)| member && c != 0)
}

impl ExtendedEstimator {
    pub fn new(b: f64, n_participants: usize, target: ParticipantIndex)
            -> Result<ExtendedEstimator> {
        check_target(target, n_participants)?;

        Ok(ExtendedEstimator {
            b,
            target,
            rounds: 0,
            target_sent: Array1::zeros(n_participants),
            target_rounds: 0,
            share_sum: 0.,
            cloak: vec![false; n_participants],
            cloak_sent: Array1::zeros(n_participants),
            cloak_rounds: 0,
            pending: Vec::new(),
        })
    }

    /// Participants in the target's cloak, ascending.
    pub fn cloak(&self) -> Vec<ParticipantIndex> {
        self.cloak.iter()
                  .enumerate()
                  .filter(|(_, &member)| member)
                  .map(|(i, _)| i)
                  .collect()
    }

    fn add_target_round(&mut self, sent: &Array1<usize>) {
        self.target_sent += sent;
        self.target_rounds += 1;
        self.share_sum += sent[self.target] as f64 / sent.sum() as f64;

        let mut grew = false;
        for (i, &c) in sent.iter().enumerate() {
            if c != 0 && i != self.target && !self.cloak[i] {
                self.cloak[i] = true;
                grew = true;
            }
        }

        if grew {
            let cloak = &self.cloak;
            let (active, silent): (Vec<_>, Vec<_>) =
                self.pending.drain(..)
                            .partition(|s| touches_cloak(s, cloak));
            self.pending = silent;
            for s in active {
                self.cloak_sent += &s;
                self.cloak_rounds += 1;
            }
        }
    }

    fn add_silent_round(&mut self, sent: &Array1<usize>) {
        if touches_cloak(sent, &self.cloak) {
            self.cloak_sent += sent;
            self.cloak_rounds += 1;
        } else {
            self.pending.push(sent.clone());
        }
    }
}

impl DisclosureEstimator for ExtendedEstimator {
    fn add_round(&mut self, round: &RoundObservation) -> Result<()> {
        check_dimension(round, self.cloak.len())?;

        self.rounds += 1;
        if round.is_active(self.target) {
            self.add_target_round(&round.sent_counts);
        } else {
            self.add_silent_round(&round.sent_counts);
        }
        Ok(())
    }

    fn rounds(&self) -> usize {
        self.rounds
    }

    fn likelihoods(&self) -> Result<Array1<f64>> {
        if self.target_rounds == 0 {
            return Err(SdaError::EmptyObservations);
        }
        if self.cloak_rounds == 0 {
            return Err(SdaError::InsufficientData(
                "no round without the target has an active cloak member".into()));
        }

        let t_prime = self.target_rounds as f64;
        let a_bar = self.share_sum / t_prime;
        let cloak_bar = self.cloak_sent.mapv(|c| c as f64 / self.cloak_rounds as f64);

        let mut v = self.target_sent.mapv(|c| self.b / (a_bar * t_prime) * c as f64);
        v.scaled_add(-(self.b - a_bar) / a_bar, &cloak_bar);

        Ok(v)
    }
}

/// Runs the cloak-based disclosure attack on `observations`.
pub fn extended_sda(observations: &[RoundObservation], b: f64, target: ParticipantIndex)
        -> Result<Array1<f64>> {
    let n = match observations.first() {
        Some(round) => round.n_participants(),
        None => return Err(SdaError::EmptyObservations),
    };
    let mut estimator = ExtendedEstimator::new(b, n, target)?;
    for round in observations {
        estimator.add_round(round)?;
    }
    estimator.likelihoods()
}


#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use ndarray::array;

    fn round(sent: Array1<usize>) -> RoundObservation {
        let n = sent.len();
        RoundObservation::from_counts(0., sent, Array1::zeros(n))
    }

    fn assert_close(a: &Array1<f64>, b: &Array1<f64>) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!(approx_eq!(f64, *x, *y, epsilon = 1e-12), "{} != {}", a, b);
        }
    }

    fn observations() -> Vec<RoundObservation> {
        vec![round(array![1, 1, 0]),
             // Silent, cloak member 1 active.
             round(array![0, 1, 0]),
             // Silent, 2 is not (yet) in the cloak.
             round(array![0, 0, 2]),
             // Target round adding 2 to the cloak.
             round(array![2, 0, 2])]
    }

    #[test]
    fn extended_estimate() {
        let v = extended_sda(&observations(), 2., 0).unwrap();
        // t' = 2, a = 0.5, cloak = [0, 0.5, 1]:
        // 2 * [3, 1, 2] - 3 * [0, 0.5, 1]
        assert_close(&v, &array![6., 0.5, 1.]);
    }

    #[test]
    fn extended_estimate_on_prefix() {
        let v = extended_sda(&observations()[..3], 2., 0).unwrap();
        // t' = 1, a = 0.5, cloak = [0, 1, 0]:
        // 4 * [1, 1, 0] - 3 * [0, 1, 0]
        assert_close(&v, &array![4., 1., 0.]);
    }

    #[test]
    fn pending_rounds_join_when_cloak_grows() {
        let mut estimator = ExtendedEstimator::new(2., 3, 0).unwrap();
        let rounds = observations();

        estimator.add_round(&rounds[0]).unwrap();
        assert_eq!(estimator.cloak(), vec![1]);
        assert!(matches!(estimator.likelihoods(), Err(SdaError::InsufficientData(_))));

        estimator.add_round(&rounds[1]).unwrap();
        estimator.add_round(&rounds[2]).unwrap();
        assert_eq!(estimator.pending.len(), 1);

        estimator.add_round(&rounds[3]).unwrap();
        assert_eq!(estimator.cloak(), vec![1, 2]);
        assert!(estimator.pending.is_empty());
        assert_eq!(estimator.cloak_rounds, 2);
        assert_eq!(estimator.rounds(), 4);
    }

    #[test]
    fn incremental_matches_batch() {
        let rounds = vec![round(array![1, 0, 1, 0]),
                          round(array![0, 0, 0, 3]),
                          round(array![0, 1, 1, 0]),
                          round(array![2, 0, 0, 1]),
                          round(array![0, 2, 0, 1]),
                          round(array![1, 3, 0, 0])];

        let mut estimator = ExtendedEstimator::new(3., 4, 0).unwrap();
        for (t, r) in rounds.iter().enumerate() {
            estimator.add_round(r).unwrap();
            match (estimator.likelihoods(), extended_sda(&rounds[..t + 1], 3., 0)) {
                (Ok(a), Ok(b)) => assert_close(&a, &b),
                (Err(SdaError::InsufficientData(_)), Err(SdaError::InsufficientData(_))) => {},
                (a, b) => panic!("mismatch at {}: {:?} vs {:?}", t, a, b),
            }
        }
    }

    #[test]
    fn extended_errors() {
        assert!(matches!(extended_sda(&[], 2., 0), Err(SdaError::EmptyObservations)));

        // Only target rounds: the cloak background is undefined.
        let rounds = vec![round(array![1, 1, 0]), round(array![1, 0, 1])];
        assert!(matches!(extended_sda(&rounds, 2., 0), Err(SdaError::InsufficientData(_))));

        // Only silent rounds.
        let rounds = vec![round(array![0, 1, 0])];
        assert!(matches!(extended_sda(&rounds, 2., 0), Err(SdaError::EmptyObservations)));

        assert!(matches!(ExtendedEstimator::new(2., 3, 3),
                         Err(SdaError::IndexOutOfRange { index: 3, n: 3 })));
    }
}
