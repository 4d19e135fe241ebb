//! Ranking of likelihood vectors and accuracy of the predicted
//! recipients, also as a function of the number of observed rounds.
use itertools::Itertools;
use ndarray::prelude::*;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;

use crate::ParticipantIndex;
use crate::error::{Result, SdaError};
use crate::estimates::{DisclosureEstimator, ExtendedEstimator, StandardEstimator};
use crate::observations::RoundObservation;

/// Returns the indices of the `k` largest entries of `v`, ascending.
///
/// Ties are broken in favour of the smaller index.
pub fn top_k(v: &ArrayView1<f64>, k: usize) -> Vec<ParticipantIndex> {
    let mut top = v.iter()
                   .enumerate()
                   .sorted_by_key(|&(_, &x)| Reverse(OrderedFloat(x)))
                   .take(k)
                   .map(|(i, _)| i)
                   .collect::<Vec<_>>();
    top.sort_unstable();
    top
}

/// Fraction of positions at which `real` and `predicted` agree.
///
/// This is a positional comparison: both sequences should be sorted the
/// same way for it to measure how many recipients were found. Only the
/// common length of the two sequences is compared; if it is zero, the
/// accuracy is 0.
pub fn accuracy(real: &[ParticipantIndex], predicted: &[ParticipantIndex]) -> f64 {
    let n = real.len().min(predicted.len());
    if n == 0 {
        return 0.;
    }
    let hits = real.iter()
                   .zip(predicted)
                   .filter(|(r, p)| r == p)
                   .count();

    hits as f64 / n as f64
}

/// Accuracy of an estimator after each additional round.
///
/// Produced lazily: each item feeds one more round to the estimator,
/// ranks the updated likelihoods and scores them against the real
/// recipients. Prefixes on which the estimator has no estimate yet (no
/// target round, or no cloak background) yield `None`.
pub struct AccuracyCurve<'a, E: DisclosureEstimator> {
    estimator: E,
    rounds: std::slice::Iter<'a, RoundObservation>,
    real: &'a [ParticipantIndex],
}

impl<'a, E: DisclosureEstimator> AccuracyCurve<'a, E> {
    pub fn new(estimator: E, observations: &'a [RoundObservation],
               real: &'a [ParticipantIndex]) -> AccuracyCurve<'a, E> {
        AccuracyCurve {
            estimator,
            rounds: observations.iter(),
            real,
        }
    }
}

impl<'a, E: DisclosureEstimator> Iterator for AccuracyCurve<'a, E> {
    type Item = Result<Option<f64>>;

    fn next(&mut self) -> Option<Result<Option<f64>>> {
        let round = self.rounds.next()?;
        if let Err(e) = self.estimator.add_round(round) {
            return Some(Err(e));
        }

        Some(match self.estimator.likelihoods() {
            Ok(v) => Ok(Some(accuracy(self.real, &top_k(&v.view(), self.real.len())))),
            Err(SdaError::EmptyObservations) | Err(SdaError::InsufficientData(_)) => Ok(None),
            Err(e) => Err(e),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rounds.size_hint()
    }
}

/// Accuracy after each prefix `observations[..t]`, `t = 1..=T`.
///
/// With a `background` profile the standard attack is run, otherwise the
/// cloak-based one. `real` must be sorted ascending. Entry `t - 1` is
/// `None` when the estimator fails on `observations[..t]` for lack of
/// target rounds or of cloak background.
pub fn accuracy_over_time(observations: &[RoundObservation], b: f64,
                          background: Option<&ArrayView1<f64>>,
                          real: &[ParticipantIndex], target: ParticipantIndex)
        -> Result<Vec<Option<f64>>> {
    match background {
        Some(u) => {
            let estimator = StandardEstimator::new(b, u, target)?;
            AccuracyCurve::new(estimator, observations, real).collect()
        },
        None => {
            let n = match observations.first() {
                Some(round) => round.n_participants(),
                None => return Ok(vec![]),
            };
            let estimator = ExtendedEstimator::new(b, n, target)?;
            AccuracyCurve::new(estimator, observations, real).collect()
        },
    }
}

/// Returns the number of rounds after which `curve` stays within `delta`
/// (absolute) of its final value, provided it does so for at least `q`
/// consecutive prefixes; `None` otherwise.
///
/// Prefixes without an estimate never count as stable.
pub fn convergence_point(curve: &[Option<f64>], delta: f64, q: usize) -> Option<usize> {
    let last = (*curve.last()?)?;
    let stable = curve.iter()
                      .rev()
                      .take_while(|a| matches!(a, Some(a) if (a - last).abs() <= delta))
                      .count();

    if stable >= q.max(1) {
        Some(curve.len() - stable + 1)
    } else {
        None
    }
}
