//! Results produced by the optimizers.

use crate::offer::Offer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The optimizers under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "MPSO")]
    Mpso,
    #[serde(rename = "ABC-MNG")]
    Abc,
    #[serde(rename = "GA-HV")]
    Ga,
}

impl Algorithm {
    /// Execution order used by the comparator; ties in fitness go to the earlier one.
    pub const ALL: [Algorithm; 3] = [Algorithm::Mpso, Algorithm::Abc, Algorithm::Ga];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Mpso => "MPSO",
            Algorithm::Abc => "ABC-MNG",
            Algorithm::Ga => "GA-HV",
        }
    }

    pub(crate) fn index(self) -> u64 {
        match self {
            Algorithm::Mpso => 0,
            Algorithm::Abc => 1,
            Algorithm::Ga => 2,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mpso" | "pso" => Ok(Algorithm::Mpso),
            "abc" | "abc-mng" => Ok(Algorithm::Abc),
            "ga" | "ga-hv" | "genetic" => Ok(Algorithm::Ga),
            other => Err(format!("unknown algorithm '{}'", other)),
        }
    }
}

/// One candidate as observed at the end of a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub id: usize,
    pub offer: Offer,
    pub fitness: f64,
    /// The candidate set a new run-wide best during this round.
    pub new_best: bool,
    /// MPSO only: how many global bests this particle has set so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contribution: Option<u32>,
}

/// Snapshot of a population after one iteration or generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    /// 1-based round number.
    pub round: usize,
    pub best_fitness: f64,
    pub candidates: Vec<CandidateRecord>,
}

/// Outcome of one optimizer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub algorithm: Algorithm,
    pub best_offer: Offer,
    /// Bilateral fitness of `best_offer`. Higher is better.
    pub fitness: f64,
    /// Wall-clock seconds spent inside the run
    #[serde(rename = "executionTime", alias = "executionTimeSeconds", alias = "executionTimeSecs")]
    pub execution_time_secs: f64,
    pub evaluations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_history: Option<Vec<RoundRecord>>,
    /// MPSO only: global-best count per particle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributions: Option<Vec<u32>>,
}
