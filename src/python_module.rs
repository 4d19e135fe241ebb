//! A wrapper to allow calling mixsda from Python.
//!
//! Wraps the function `attack::run_disclosure_attack()`.
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::attack::{AttackOutcome, run_disclosure_attack};
use crate::config::{AttackConfig, MixStrategy, MixingParams};
use crate::error::SdaError;
use crate::estimates::Estimate;
use crate::trace::Trace;

fn to_py_err(e: SdaError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Statistical disclosure attacks on packet traces of simulated mix
/// networks.
#[pymodule]
fn mixsda(_py: Python, m: &PyModule) -> PyResult<()> {
    /// run_sda(trace_path, mu, n_hops, mix, threshold, confidence,
    /// use_profile, extended)
    /// --
    ///
    /// Run a disclosure attack against the target of a trace.
    ///
    /// Keyword arguments:
    /// trace_path : path of the trace file
    /// mu : inverse of the mean delay at each mix
    /// n_hops : number of mix layers crossed by each packet
    /// mix : mixing strategy, value in ("threshold", "pool", "stopandgo")
    /// threshold : messages per round for "threshold" and "pool"
    /// confidence : confidence of the delay bound
    /// use_profile : use the trace's sending profile as background
    /// extended : run the cloak-based attack instead of the standard one
    ///
    /// Returns the predicted recipients, their accuracy and the accuracy
    /// after each round (None for rounds without an estimate).
    #[pyfn(m, "run_sda")]
    fn run_sda_py(_py: Python, trace_path: &str, mu: f64, n_hops: usize, mix: &str,
                  threshold: Option<f64>, confidence: Option<f64>, use_profile: bool,
                  extended: bool)
            -> PyResult<(Vec<String>, f64, Vec<Option<f64>>)> {

        let strategy = match (mix, threshold) {
            ("threshold", Some(threshold)) => MixStrategy::Threshold { threshold },
            ("pool", Some(size)) => MixStrategy::Pool { size },
            ("stopandgo", _) => MixStrategy::StopAndGo,
            _ => return Err(PyValueError::new_err(
                    format!("invalid mixing strategy: {} (threshold: {:?})", mix, threshold))),
        };

        let mut config = AttackConfig::new(MixingParams { mu, n_hops, strategy });
        if let Some(c) = confidence {
            config.confidence = c;
        }
        config.use_background_profile = use_profile;
        if extended {
            config.estimate = Estimate::Extended;
        }

        let trace = Trace::load(trace_path).map_err(to_py_err)?;

        let (predicted, accuracy) = match run_disclosure_attack(&trace, &config)
                                              .map_err(to_py_err)? {
            AttackOutcome::Ranked { predicted, accuracy, .. } => (predicted, accuracy),
            _ => return Err(PyValueError::new_err("expected a ranking")),
        };
        let ids = predicted.iter()
                           .filter_map(|&i| trace.participant_id(i))
                           .map(String::from)
                           .collect();

        config.over_time = true;
        let curve = match run_disclosure_attack(&trace, &config).map_err(to_py_err)? {
            AttackOutcome::OverTime { curve } => curve,
            _ => return Err(PyValueError::new_err("expected an accuracy curve")),
        };

        Ok((ids, accuracy, curve))
    }
    Ok(())
}
