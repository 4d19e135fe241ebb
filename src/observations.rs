//! Extraction of per-round observations from a packet trace.
//!
//! Every packet sent by the target anchors one round at its sending time
//! `t`. Given the delay bound `d`, a round counts:
//!  - as *sent*, every packet entering the network in `[t - d, t + d]`;
//!  - as *received*, every packet delivered in `[t, t + d]`.
//!
//! Packets are sorted once by sending and by delivery time, so that
//! each window is located with two binary searches instead of a scan of
//! the whole trace.
use itertools::Itertools;
use ndarray::prelude::*;
use tracing::{debug, info};

use crate::ParticipantIndex;
use crate::bound::chernov_bound;
use crate::error::{Result, SdaError};
use crate::trace::Packet;

/// Sending and receiving counts of all participants within one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundObservation {
    /// Time at which the packet anchoring the round entered the network.
    pub anchor: f64,
    pub sent_counts: Array1<usize>,
    pub received_counts: Array1<usize>,
}

impl RoundObservation {
    pub fn new(anchor: f64, n_participants: usize) -> RoundObservation {
        RoundObservation {
            anchor,
            sent_counts: Array1::zeros(n_participants),
            received_counts: Array1::zeros(n_participants),
        }
    }

    /// Builds a round from explicit counts.
    pub fn from_counts(anchor: f64, sent_counts: Array1<usize>,
                       received_counts: Array1<usize>) -> RoundObservation {
        RoundObservation { anchor, sent_counts, received_counts }
    }

    pub fn n_participants(&self) -> usize {
        self.sent_counts.len()
    }

    /// Returns true if `participant` sent at least one packet in this round.
    pub fn is_active(&self, participant: ParticipantIndex) -> bool {
        self.sent_counts.get(participant).map_or(false, |&c| c >= 1)
    }

    pub fn total_sent(&self) -> usize {
        self.sent_counts.sum()
    }
}

/// Packets sorted by sending and by delivery time.
struct TimeIndex {
    // (time_sent, src)
    by_sent: Vec<(f64, ParticipantIndex)>,
    // (time_delivered, dst)
    by_delivered: Vec<(f64, ParticipantIndex)>,
    n_participants: usize,
}

impl TimeIndex {
    fn new(packets: &[Packet], n_participants: usize) -> Result<TimeIndex> {
        for p in packets {
            for &index in &[p.src, p.dst] {
                if index >= n_participants {
                    return Err(SdaError::IndexOutOfRange { index, n: n_participants });
                }
            }
        }

        let by_sent = packets.iter()
                             .map(|p| (p.time_sent, p.src))
                             .sorted_by(|a, b| a.0.total_cmp(&b.0))
                             .collect();
        let by_delivered = packets.iter()
                                  .map(|p| (p.time_delivered, p.dst))
                                  .sorted_by(|a, b| a.0.total_cmp(&b.0))
                                  .collect();

        Ok(TimeIndex { by_sent, by_delivered, n_participants })
    }

    /// Entries whose time lies in `[from, to]`.
    fn window(events: &[(f64, ParticipantIndex)], from: f64, to: f64)
            -> &[(f64, ParticipantIndex)] {
        let start = events.partition_point(|&(t, _)| t < from);
        let end = events.partition_point(|&(t, _)| t <= to);
        if start < end { &events[start..end] } else { &[] }
    }

    fn round(&self, anchor: f64, bound: f64) -> RoundObservation {
        let mut round = RoundObservation::new(anchor, self.n_participants);

        for &(_, src) in TimeIndex::window(&self.by_sent, anchor - bound, anchor + bound) {
            round.sent_counts[src] += 1;
        }
        for &(_, dst) in TimeIndex::window(&self.by_delivered, anchor, anchor + bound) {
            round.received_counts[dst] += 1;
        }

        round
    }
}

/// Fraction of packets whose delay does not exceed `bound`.
pub fn delay_coverage(packets: &[Packet], bound: f64) -> f64 {
    if packets.is_empty() {
        return 0.;
    }
    let covered = packets.iter().filter(|p| p.delay() <= bound).count();

    covered as f64 / packets.len() as f64
}

/// Extracts one observation per packet sent by `target`, with windows
/// given by the Chernov bound for `n_hops` mix layers of rate `mu`.
///
/// Rounds are returned in chronological order of their anchors. If the
/// target never sends, no rounds are returned.
pub fn extract(packets: &[Packet], n_participants: usize, target: ParticipantIndex,
               mu: f64, n_hops: usize, confidence: f64) -> Result<Vec<RoundObservation>> {
    let bound = chernov_bound(mu, n_hops, confidence)?;
    info!("upper delay bound with {}% confidence is {}", confidence * 100., bound);
    info!("{}% of packet delays are below that bound",
          delay_coverage(packets, bound) * 100.);

    extract_with_bound(packets, n_participants, target, bound)
}

/// Same as `extract()`, for an explicit window half-width `bound`.
pub fn extract_with_bound(packets: &[Packet], n_participants: usize,
                          target: ParticipantIndex, bound: f64)
        -> Result<Vec<RoundObservation>> {
    let index = TimeIndex::new(packets, n_participants)?;

    let rounds = index.by_sent.iter()
                      .filter(|&&(_, src)| src == target)
                      .map(|&(t, _)| index.round(t, bound))
                      .collect::<Vec<_>>();
    debug!("extracted {} rounds anchored at participant {}", rounds.len(), target);

    Ok(rounds)
}

/// Extracts rounds in which `target` did not send.
///
/// Anchors are packets of the other participants, taken in order of
/// sending time and spaced more than `2 * bound` apart, so that the
/// sending windows of consecutive anchors do not overlap. Windows that
/// contain a packet of the target are dropped.
pub fn extract_background(packets: &[Packet], n_participants: usize,
                          target: ParticipantIndex, bound: f64)
        -> Result<Vec<RoundObservation>> {
    let index = TimeIndex::new(packets, n_participants)?;

    let mut rounds = Vec::new();
    let mut last_anchor: Option<f64> = None;
    for &(t, src) in &index.by_sent {
        if src == target {
            continue;
        }
        if let Some(last) = last_anchor {
            if t - last <= 2. * bound {
                continue;
            }
        }
        last_anchor = Some(t);

        let round = index.round(t, bound);
        if !round.is_active(target) {
            rounds.push(round);
        }
    }
    debug!("extracted {} background rounds", rounds.len());

    Ok(rounds)
}

/// Interleaves two chronological sequences of rounds by anchor time.
///
/// On equal anchors, rounds of `first` come first.
pub fn merge_rounds(first: Vec<RoundObservation>, second: Vec<RoundObservation>)
        -> Vec<RoundObservation> {
    first.into_iter()
         .merge_by(second, |a, b| a.anchor <= b.anchor)
         .collect()
}
