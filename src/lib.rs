//! mixsda reconstructs who a participant of a mix network talks to, by
//! running statistical disclosure attacks on packet-level traces of the
//! network.
//!
//! A mix network delays, batches and reorders packets so that an observer
//! cannot link the packets entering it to those leaving it. Over many
//! rounds, however, the recipients of a target participant are more
//! likely to receive packets shortly after the target sends, and simple
//! counting reveals them [1,2].
//!
//! # Getting started
//!
//! mixsda is mainly used via the binary it provides, `mixsda`; see its
//! help screen: `mixsda -h`.
//!
//! The analysis goes as follows:
//!
//! 1. a trace is loaded and its participants are mapped to dense indices
//!    (`trace`);
//! 2. each packet of the target anchors a round, whose width is given by
//!    a bound on the delay packets suffer in the network (`bound`,
//!    `observations`);
//! 3. an estimate turns the rounds into a likelihood for each participant
//!    to be a recipient of the target (`estimates`);
//! 4. the most likely recipients are compared to the real ones, possibly
//!    after each round (`evaluation`).
//!
//! `attack::run_disclosure_attack()` runs the whole pipeline.
//!
//! # References
//!
//! [1] 2004, "Statistical Disclosure Attacks: Traffic Confirmation in Open Environments". _George Danezis_
//!
//! [2] 2006, "Statistical Disclosure or Intersection Attacks on Anonymity Systems". _George Danezis, Andrei Serjantov_
//!
//! [3] 2010, "Statistical Disclosure: Improved, Extended, and Resisted". _Navid Emamdoost Alessandro Acquisti_ et al.
extern crate csv;
extern crate ndarray;
extern crate itertools;
extern crate ordered_float;

pub mod attack;
pub mod bound;
pub mod config;
pub mod error;
pub mod estimates;
pub mod evaluation;
pub mod observations;
pub mod trace;

#[cfg(feature = "python-module")]
mod python_module;

pub use crate::error::{Result, SdaError};

/// Dense index of a participant within a trace.
pub type ParticipantIndex = usize;
