//! Disclosure attack routines.
//!
//! Given a normalized trace and the parameters of the mix network that
//! produced it, `run_disclosure_attack()` extracts the rounds of the
//! target, derives the number of messages per round, runs the chosen
//! estimate and either ranks the likely recipients of the target or
//! reports how the accuracy of that ranking evolves round after round.
use ndarray::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::ParticipantIndex;
use crate::bound::chernov_bound;
use crate::config::{AttackConfig, MixStrategy};
use crate::error::{Result, SdaError};
use crate::estimates::*;
use crate::evaluation::{accuracy, accuracy_over_time, top_k};
use crate::observations::{RoundObservation, extract, extract_background, merge_rounds};
use crate::trace::Trace;

/// Result of a disclosure attack.
#[derive(Debug, Clone, PartialEq)]
pub enum AttackOutcome {
    /// Final estimate over all the rounds.
    Ranked {
        likelihoods: Array1<f64>,
        /// As many indices as the target has recipients, ascending.
        predicted: Vec<ParticipantIndex>,
        accuracy: f64,
    },
    /// Accuracy after each round; `None` where no estimate exists yet.
    OverTime {
        curve: Vec<Option<f64>>,
    },
}

/// Number of messages entering the network in each round.
///
/// For threshold and pool mixing this is a property of the mix nodes;
/// for stop-and-go mixing it is the average number of packets sent in
/// the observed rounds.
pub fn sda_b(strategy: &MixStrategy, observations: &[RoundObservation]) -> Result<f64> {
    match *strategy {
        MixStrategy::Threshold { threshold } => Ok(threshold),
        MixStrategy::Pool { size } => Ok(size),
        MixStrategy::StopAndGo => {
            if observations.is_empty() {
                return Err(SdaError::EmptyObservations);
            }
            let total = observations.iter().map(|r| r.total_sent()).sum::<usize>();
            Ok(total as f64 / observations.len() as f64)
        },
    }
}

/// Sending profile of the participants other than the target.
///
/// When requested and available, this is the average of the rows of the
/// trace's sending profile, excluding the target's, renormalized to sum
/// to 1. Otherwise it is uniform.
pub fn background_profile(trace: &Trace, use_profile: bool) -> Array1<f64> {
    let n = trace.n_participants();
    let uniform = Array1::from_elem(n, 1. / n as f64);

    let profile = match (&trace.sending_profile, use_profile) {
        (Some(profile), true) => profile,
        (None, true) => {
            warn!("trace has no sending profile, using a uniform background");
            return uniform;
        },
        _ => return uniform,
    };

    let mut u = Array1::<f64>::zeros(n);
    for (i, row) in profile.outer_iter().enumerate() {
        if i == trace.target {
            continue;
        }
        for (j, &p) in row.iter().enumerate().take(n) {
            u[j] += p;
        }
    }

    let total = u.sum();
    if !(total > 0.) {
        warn!("sending profile carries no weight, using a uniform background");
        return uniform;
    }
    u / total
}

/// Runs a disclosure attack against the target of `trace`.
pub fn run_disclosure_attack(trace: &Trace, config: &AttackConfig) -> Result<AttackOutcome> {
    config.validate()?;
    let mixing = &config.mixing;
    let n = trace.n_participants();

    let observations = extract(&trace.packets, n, trace.target, mixing.mu,
                               mixing.n_hops, config.confidence)?;
    if observations.is_empty() {
        return Err(SdaError::EmptyObservations);
    }
    info!("{} rounds in which the target sent", observations.len());

    let b = sda_b(&mixing.strategy, &observations)?;
    debug!("b = {}", b);

    let (observations, background) = match config.estimate {
        Estimate::Standard => {
            (observations, Some(background_profile(trace, config.use_background_profile)))
        },
        Estimate::Extended => {
            if config.use_background_profile {
                debug!("the cloak estimate ignores the sending profile");
            }
            let bound = chernov_bound(mixing.mu, mixing.n_hops, config.confidence)?;
            let silent = extract_background(&trace.packets, n, trace.target, bound)?;
            info!("{} rounds in which the target was silent", silent.len());
            (merge_rounds(observations, silent), None)
        },
    };

    if config.over_time {
        let curve = accuracy_over_time(&observations, b,
                                       background.as_ref().map(|u| u.view()).as_ref(),
                                       &trace.recipients, trace.target)?;
        return Ok(AttackOutcome::OverTime { curve });
    }

    let likelihoods = match background {
        Some(u) => standard_sda(&observations, b, &u.view(), trace.target)?,
        None => extended_sda(&observations, b, trace.target)?,
    };
    let predicted = top_k(&likelihoods.view(), trace.recipients.len());
    let accuracy = accuracy(&trace.recipients, &predicted);

    Ok(AttackOutcome::Ranked { likelihoods, predicted, accuracy })
}

/// Writes an accuracy curve as CSV, one row per number of rounds.
///
/// Rounds without an estimate have an empty accuracy field.
pub fn write_curve(path: impl AsRef<Path>, curve: &[Option<f64>]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&["rounds", "accuracy"])?;
    for (t, a) in curve.iter().enumerate() {
        let accuracy = a.map(|a| a.to_string()).unwrap_or_default();
        writer.write_record(&[(t + 1).to_string(), accuracy])?;
    }
    writer.flush()?;
    Ok(())
}
