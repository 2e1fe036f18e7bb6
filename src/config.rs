//! Configuration parameters for the optimizers and the comparator.

use crate::error::{NegotiationError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration of the contribution-adaptive particle swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MpsoConfig {
    /// Smallest swarm size that may be drawn
    pub swarm_size_min: usize,
    /// Largest swarm size that may be drawn
    pub swarm_size_max: usize,
    /// Number of swarm iterations
    pub max_iterations: usize,
    /// Inertia weight applied to the previous velocity
    pub inertia: f64,
    /// Attraction towards the particle's own best
    pub cognitive: f64,
    /// Base attraction towards the global best, before contribution bonus
    pub base_social: f64,
    /// Half-width of the initial price velocity range
    pub price_velocity: f64,
    /// Half-width of the initial delivery velocity range
    pub delivery_velocity: f64,
    /// Half-width of the initial quality velocity range
    pub quality_velocity: f64,
    /// Keep per-iteration snapshots of the swarm
    pub record_history: bool,
}

impl Default for MpsoConfig {
    fn default() -> Self {
        MpsoConfig {
            swarm_size_min: 5,
            swarm_size_max: 10,
            max_iterations: 30,
            inertia: 0.5,
            cognitive: 1.5,
            base_social: 1.5,
            price_velocity: 1.0,
            delivery_velocity: 1.0,
            quality_velocity: 0.2,
            record_history: true,
        }
    }
}

impl MpsoConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        MpsoConfig::default()
    }

    /// Set the range the swarm size is drawn from.
    pub fn with_swarm_size(mut self, min: usize, max: usize) -> Self {
        self.swarm_size_min = min;
        self.swarm_size_max = max;
        self
    }

    /// Set the number of swarm iterations.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Set inertia, cognitive and base social coefficients.
    pub fn with_coefficients(mut self, inertia: f64, cognitive: f64, base_social: f64) -> Self {
        self.inertia = inertia;
        self.cognitive = cognitive;
        self.base_social = base_social;
        self
    }

    /// Set whether per-iteration swarm snapshots are kept.
    pub fn with_record_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }

    /// Reject sizes and rates the optimizer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.swarm_size_min == 0 || self.swarm_size_min > self.swarm_size_max {
            return Err(NegotiationError::configuration(
                "mpso.swarmSize",
                format!(
                    "need 1 <= min <= max, got {}..={}",
                    self.swarm_size_min, self.swarm_size_max
                ),
            ));
        }
        for (field, value) in [
            ("mpso.inertia", self.inertia),
            ("mpso.cognitive", self.cognitive),
            ("mpso.baseSocial", self.base_social),
            ("mpso.priceVelocity", self.price_velocity),
            ("mpso.deliveryVelocity", self.delivery_velocity),
            ("mpso.qualityVelocity", self.quality_velocity),
        ] {
            non_negative(field, value)?;
        }
        Ok(())
    }
}

/// Configuration of the artificial bee colony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AbcConfig {
    /// Number of food sources (and employed bees)
    pub num_bees: usize,
    /// Failed improvements before a source is abandoned
    pub limit: u32,
    /// Number of employed/onlooker/scout cycles
    pub max_iterations: usize,
    /// Optional quality bounds in percent, overriding the seller's level span
    pub quality_percent: Option<(f64, f64)>,
    /// Keep per-iteration snapshots of the colony
    pub record_history: bool,
}

impl Default for AbcConfig {
    fn default() -> Self {
        AbcConfig {
            num_bees: 15,
            limit: 8,
            max_iterations: 50,
            quality_percent: None,
            record_history: false,
        }
    }
}

impl AbcConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        AbcConfig::default()
    }

    /// Set the number of food sources.
    pub fn with_num_bees(mut self, bees: usize) -> Self {
        self.num_bees = bees;
        self
    }

    /// Set the abandonment limit.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the number of colony cycles.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Set the quality gene bounds, in percent.
    pub fn with_quality_percent(mut self, low: f64, high: f64) -> Self {
        self.quality_percent = Some((low, high));
        self
    }

    /// Set whether per-cycle snapshots are kept.
    pub fn with_record_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }

    /// Reject sizes and rates the optimizer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.num_bees < 2 {
            return Err(NegotiationError::configuration(
                "abc.numBees",
                format!("at least 2 bees are required, got {}", self.num_bees),
            ));
        }
        if self.limit == 0 {
            return Err(NegotiationError::configuration(
                "abc.limit",
                "abandonment limit must be positive",
            ));
        }
        Ok(())
    }
}

/// Coupling rules applied after a gene is re-randomized.
///
/// A high price buys more quality, a slow delivery makes the offer cheaper
/// and a low quality costs more.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DependentMutation {
    pub price_threshold: f64,
    pub quality_bonus: f64,
    pub delivery_threshold: f64,
    pub price_discount: f64,
    /// In percent
    pub quality_threshold: f64,
    pub price_surcharge: f64,
}

impl Default for DependentMutation {
    fn default() -> Self {
        DependentMutation {
            price_threshold: 4.5,
            quality_bonus: 5.0,
            delivery_threshold: 20.0,
            price_discount: 0.5,
            quality_threshold: 85.0,
            price_surcharge: 0.3,
        }
    }
}

/// Configuration of the genetic optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GaConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Probability that an offspring receives one gene mutation
    pub mutation_rate: f64,
    pub coupling: DependentMutation,
    /// Optional quality bounds in percent, overriding the seller's level span
    pub quality_percent: Option<(f64, f64)>,
    /// Keep per-generation snapshots of the population
    pub record_history: bool,
}

impl Default for GaConfig {
    fn default() -> Self {
        GaConfig {
            population_size: 25,
            generations: 60,
            mutation_rate: 0.2,
            coupling: DependentMutation::default(),
            quality_percent: None,
            record_history: false,
        }
    }
}

impl GaConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        GaConfig::default()
    }

    /// Set the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Set the number of generations.
    pub fn with_generations(mut self, generations: usize) -> Self {
        self.generations = generations;
        self
    }

    /// Set the per-child mutation probability.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate;
        self
    }

    /// Set the price/delivery/quality coupling applied after a mutation.
    pub fn with_coupling(mut self, coupling: DependentMutation) -> Self {
        self.coupling = coupling;
        self
    }

    /// Set the quality gene bounds, in percent.
    pub fn with_quality_percent(mut self, low: f64, high: f64) -> Self {
        self.quality_percent = Some((low, high));
        self
    }

    /// Set whether per-generation snapshots are kept.
    pub fn with_record_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }

    /// Reject sizes and rates the optimizer cannot run with.
    pub fn validate(&self) -> Result<()> {
        // Truncation keeps half the population and crossover needs two parents.
        if self.population_size < 4 {
            return Err(NegotiationError::configuration(
                "ga.populationSize",
                format!("at least 4 chromosomes are required, got {}", self.population_size),
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(NegotiationError::configuration(
                "ga.mutationRate",
                format!("must lie in [0, 1], got {}", self.mutation_rate),
            ));
        }
        Ok(())
    }
}

/// Configuration of a full three-algorithm comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComparatorConfig {
    /// Master seed every per-run random stream is derived from
    pub seed: u64,
    pub mpso: MpsoConfig,
    pub abc: AbcConfig,
    pub ga: GaConfig,
    /// Explicit hypervolume reference point `[fitness, time]`
    pub reference_point: Option<[f64; 2]>,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        ComparatorConfig {
            seed: 42,
            mpso: MpsoConfig::default(),
            abc: AbcConfig::default(),
            ga: GaConfig::default(),
            reference_point: None,
        }
    }
}

impl ComparatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        ComparatorConfig::default()
    }

    /// Set the master seed every run stream derives from.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the particle swarm configuration.
    pub fn with_mpso(mut self, mpso: MpsoConfig) -> Self {
        self.mpso = mpso;
        self
    }

    /// Set the bee colony configuration.
    pub fn with_abc(mut self, abc: AbcConfig) -> Self {
        self.abc = abc;
        self
    }

    /// Set the genetic algorithm configuration.
    pub fn with_ga(mut self, ga: GaConfig) -> Self {
        self.ga = ga;
        self
    }

    /// Set an explicit `[fitness, time]` hypervolume reference point.
    pub fn with_reference_point(mut self, point: [f64; 2]) -> Self {
        self.reference_point = Some(point);
        self
    }

    /// Load a configuration from a JSON file; absent fields take defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let payload = fs::read_to_string(path)?;
        let config: ComparatorConfig = serde_json::from_str(&payload)?;
        Ok(config)
    }

    /// Check every nested configuration and the reference point.
    pub fn validate(&self) -> Result<()> {
        self.mpso.validate()?;
        self.abc.validate()?;
        self.ga.validate()?;
        if let Some(point) = self.reference_point {
            if point.iter().any(|v| !v.is_finite()) {
                return Err(NegotiationError::configuration(
                    "referencePoint",
                    "coordinates must be finite",
                ));
            }
        }
        Ok(())
    }
}

fn non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(NegotiationError::configuration(
            field,
            format!("must be finite and non-negative, got {value}"),
        ))
    }
}
