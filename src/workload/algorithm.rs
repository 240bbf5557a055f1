//! Pricing algorithms and per-stage parameters

use super::error::{WorkloadError, WorkloadResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pricing algorithm run by the worker image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Full risk: delta and vega on top of present value
    #[default]
    DeltaVega,
    /// Present value only
    PvOnly,
    /// Synthetic load with configurable delay, memory and duration
    Synthetic,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::DeltaVega, Algorithm::PvOnly, Algorithm::Synthetic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::DeltaVega => "deltavega",
            Algorithm::PvOnly => "pvonly",
            Algorithm::Synthetic => "synthetic",
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Algorithm::Synthetic)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                format!("unknown algorithm '{}', expected one of: deltavega, pvonly, synthetic", s)
            })
    }
}

/// Knobs for the synthetic-load algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticParams {
    /// Startup delay in seconds
    pub delay_start: u64,
    /// Memory footprint in MB
    pub mem_usage: u64,
    /// Per-task duration in milliseconds
    pub task_duration: u64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            delay_start: 0,
            mem_usage: 16,
            task_duration: 20,
        }
    }
}

/// Validated parameters shared by every pricing task of one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    algorithm: Algorithm,
    failure: f64,
    synthetic: Option<SyntheticParams>,
}

impl StageConfig {
    /// Build a stage configuration.
    ///
    /// Synthetic parameters are required for [`Algorithm::Synthetic`] and
    /// rejected for every other algorithm.
    pub fn new(
        algorithm: Algorithm,
        failure: f64,
        synthetic: Option<SyntheticParams>,
    ) -> WorkloadResult<Self> {
        if !(0.0..=1.0).contains(&failure) {
            return Err(WorkloadError::InvalidFailureProbability(failure));
        }

        match (algorithm.is_synthetic(), synthetic.is_some()) {
            (true, false) => Err(WorkloadError::UnsupportedAlgorithmParameter {
                algorithm: algorithm.to_string(),
                reason: "synthetic parameters are required".to_string(),
            }),
            (false, true) => Err(WorkloadError::UnsupportedAlgorithmParameter {
                algorithm: algorithm.to_string(),
                reason: "synthetic parameters are only valid with algorithm 'synthetic'"
                    .to_string(),
            }),
            _ => Ok(Self {
                algorithm,
                failure,
                synthetic,
            }),
        }
    }

    /// Shorthand for a non-synthetic algorithm.
    pub fn pricing(algorithm: Algorithm, failure: f64) -> WorkloadResult<Self> {
        Self::new(algorithm, failure, None)
    }

    pub fn synthetic(failure: f64, params: SyntheticParams) -> WorkloadResult<Self> {
        Self::new(Algorithm::Synthetic, failure, Some(params))
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn failure(&self) -> f64 {
        self.failure
    }

    pub fn synthetic_params(&self) -> Option<&SyntheticParams> {
        self.synthetic.as_ref()
    }
}
