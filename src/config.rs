//! Attack configuration.
//!
//! A configuration file is written in TOML, e.g.:
//!
//! ```text
//! confidence = 0.75
//! use_background_profile = true
//! estimate = "standard"
//! over_time = false
//!
//! [mixing]
//! mu = 10.0
//! n_hops = 3
//!
//! [mixing.strategy]
//! type = "threshold"
//! threshold = 50.0
//! ```
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, SdaError};
use crate::estimates::Estimate;

/// How mix nodes decide when to forward packets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MixStrategy {
    /// Flush once `threshold` packets are queued.
    Threshold { threshold: f64 },
    /// Keep a pool of `size` packets, forwarding one at random.
    Pool { size: f64 },
    /// Continuous (stop-and-go) mixing with exponential delays.
    StopAndGo,
}

/// Parameters of the mix network that produced a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixingParams {
    /// Inverse of the mean delay at each mix node.
    pub mu: f64,
    /// Number of mix layers crossed by each packet.
    pub n_hops: usize,
    pub strategy: MixStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackConfig {
    /// Confidence of the delay bound delimiting rounds.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Use the trace's sending profile as background, if it has one.
    #[serde(default = "default_use_background_profile")]
    pub use_background_profile: bool,
    #[serde(default)]
    pub estimate: Estimate,
    /// Report the accuracy after each round instead of the final ranking.
    #[serde(default)]
    pub over_time: bool,
    pub mixing: MixingParams,
}

fn default_confidence() -> f64 {
    0.5
}

fn default_use_background_profile() -> bool {
    true
}

impl AttackConfig {
    pub fn new(mixing: MixingParams) -> AttackConfig {
        AttackConfig {
            mixing,
            confidence: default_confidence(),
            use_background_profile: default_use_background_profile(),
            estimate: Estimate::default(),
            over_time: false,
        }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<AttackConfig> {
        let content = fs::read_to_string(path)?;
        AttackConfig::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<AttackConfig> {
        let config: AttackConfig = toml::from_str(content)
                                        .map_err(|e| SdaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mixing = &self.mixing;
        if !(mixing.mu > 0.) || !mixing.mu.is_finite() {
            return Err(SdaError::Config(format!("mu must be positive, got {}", mixing.mu)));
        }
        if mixing.n_hops == 0 {
            return Err(SdaError::Config("n_hops must be at least 1".into()));
        }
        if !(self.confidence > 0. && self.confidence < 1.) {
            return Err(SdaError::Config(format!("confidence must lie in (0, 1), got {}",
                                                self.confidence)));
        }
        match mixing.strategy {
            MixStrategy::Threshold { threshold: b } | MixStrategy::Pool { size: b }
                    if !(b > 0.) => {
                Err(SdaError::Config(format!("messages per round must be positive, got {}", b)))
            },
            _ => Ok(()),
        }
    }
}
