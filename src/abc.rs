//! Artificial bee colony with multi-neighbour mutation.
//!
//! Food sources are `[price, delivery, quality%]` gene vectors. Employed
//! bees try to improve their own source, onlookers pick sources by roulette
//! wheel and try the same, and scouts replace sources that failed to improve
//! `limit` times in a row.

use crate::config::AbcConfig;
use crate::error::Result;
use crate::fitness::{EvaluationObserver, FitnessModel};
use crate::offer::{Offer, OfferSpace, Quality};
use crate::result::{Algorithm, CandidateRecord, OptimizationResult, RoundRecord};
use crate::utils::round_to;
use log::{debug, info};
use rand::seq::index;
use rand::Rng;
use std::time::Instant;

/// Keeps roulette weights positive when a fitness is zero.
pub const ROULETTE_EPSILON: f64 = 1e-6;

const NEIGHBOURS: usize = 3;

/// A food source and its stagnation counter.
#[derive(Debug, Clone, PartialEq)]
pub struct Bee {
    /// `[price, delivery, quality%]`
    pub genes: [f64; 3],
    pub fitness: f64,
    pub trial: u32,
}

/// The colony owned by one run.
#[derive(Debug, Clone)]
pub struct Colony {
    pub bees: Vec<Bee>,
    /// Best source seen so far, kept as a copy
    pub best: Bee,
    pub evaluations: usize,
}

/// Bee colony optimizer for one buyer/seller pair.
#[derive(Debug, Clone)]
pub struct Abc<'a> {
    config: AbcConfig,
    model: FitnessModel<'a>,
    space: OfferSpace,
    bounds: [(f64, f64); 3],
}

impl<'a> Abc<'a> {
    pub fn new(config: AbcConfig, model: FitnessModel<'a>) -> Result<Self> {
        config.validate()?;
        let mut space = OfferSpace::from_seller(model.seller())?;
        if let Some((low, high)) = config.quality_percent {
            space = space.with_quality_percent(low, high)?;
        }
        let bounds = gene_bounds(&space);
        Ok(Abc {
            config,
            model,
            space,
            bounds,
        })
    }

    pub fn space(&self) -> &OfferSpace {
        &self.space
    }

    pub fn offer_of(&self, genes: &[f64; 3]) -> Offer {
        Offer {
            price: genes[0],
            delivery: genes[1] as u32,
            quality: Quality::from_percent(genes[2]),
        }
    }

    /// Random source: price to cents, whole days, whole percent.
    pub fn random_genes<R: Rng>(&self, rng: &mut R) -> [f64; 3] {
        let [price, delivery, quality] = self.bounds;
        [
            round_to(rng.gen_range(price.0..=price.1), 2).clamp(price.0, price.1),
            rng.gen_range(delivery.0 as u32..=delivery.1 as u32) as f64,
            rng.gen_range(quality.0 as u32..=quality.1 as u32) as f64,
        ]
    }

    fn evaluate(&self, genes: &[f64; 3], colony_evaluations: &mut usize, observer: &mut dyn EvaluationObserver) -> f64 {
        *colony_evaluations += 1;
        self.model
            .evaluate_observed(&self.offer_of(genes), Algorithm::Abc, observer)
    }

    fn random_bee<R: Rng>(
        &self,
        rng: &mut R,
        evaluations: &mut usize,
        observer: &mut dyn EvaluationObserver,
    ) -> Bee {
        let genes = self.random_genes(rng);
        let fitness = self.evaluate(&genes, evaluations, observer);
        Bee {
            genes,
            fitness,
            trial: 0,
        }
    }

    pub fn initialize<R: Rng>(&self, rng: &mut R, observer: &mut dyn EvaluationObserver) -> Colony {
        let mut evaluations = 0;
        let bees: Vec<Bee> = (0..self.config.num_bees)
            .map(|_| self.random_bee(rng, &mut evaluations, observer))
            .collect();
        let best = best_bee(&bees).clone();
        Colony {
            bees,
            best,
            evaluations,
        }
    }

    /// Move `genes` towards (or away from) the mean of up to three sampled bees.
    pub fn mutate<R: Rng>(&self, bees: &[Bee], genes: &[f64; 3], rng: &mut R) -> [f64; 3] {
        let sampled = index::sample(rng, bees.len(), NEIGHBOURS.min(bees.len()));
        let mut mutated = *genes;

        for (dim, value) in mutated.iter_mut().enumerate() {
            let phi = rng.gen_range(-1.0..=1.0);
            let mean = sampled.iter().map(|i| bees[i].genes[dim]).sum::<f64>() / sampled.len() as f64;
            let (low, high) = self.bounds[dim];
            let moved = (genes[dim] + phi * (mean - genes[dim])).clamp(low, high);
            *value = if dim == 0 {
                round_to(moved, 2).clamp(low, high)
            } else {
                moved.round()
            };
        }

        mutated
    }

    /// Mutate bee `i` and keep the candidate only if it is strictly fitter.
    ///
    /// Returns `true` when the bee improved.
    pub fn try_improve<R: Rng>(
        &self,
        colony: &mut Colony,
        i: usize,
        rng: &mut R,
        observer: &mut dyn EvaluationObserver,
    ) -> bool {
        let candidate = self.mutate(&colony.bees, &colony.bees[i].genes, rng);
        let fitness = self.evaluate(&candidate, &mut colony.evaluations, observer);
        let bee = &mut colony.bees[i];
        if fitness > bee.fitness {
            bee.genes = candidate;
            bee.fitness = fitness;
            bee.trial = 0;
            true
        } else {
            bee.trial += 1;
            false
        }
    }

    pub fn employed_phase<R: Rng>(&self, colony: &mut Colony, rng: &mut R, observer: &mut dyn EvaluationObserver) {
        for i in 0..colony.bees.len() {
            self.try_improve(colony, i, rng, observer);
        }
    }

    pub fn onlooker_phase<R: Rng>(&self, colony: &mut Colony, rng: &mut R, observer: &mut dyn EvaluationObserver) {
        let probabilities = selection_probabilities(&colony.bees);
        for _ in 0..colony.bees.len() {
            let i = roulette_select(&probabilities, rng.gen());
            self.try_improve(colony, i, rng, observer);
        }
    }

    /// Replace every source whose trial counter reached the limit.
    ///
    /// Returns the indices of the replaced bees.
    pub fn scout_phase<R: Rng>(
        &self,
        colony: &mut Colony,
        rng: &mut R,
        observer: &mut dyn EvaluationObserver,
    ) -> Vec<usize> {
        let mut abandoned = Vec::new();
        for i in 0..colony.bees.len() {
            if colony.bees[i].trial >= self.config.limit {
                colony.bees[i] = self.random_bee(rng, &mut colony.evaluations, observer);
                abandoned.push(i);
            }
        }
        abandoned
    }

    pub fn run<R: Rng>(&self, rng: &mut R, observer: &mut dyn EvaluationObserver) -> OptimizationResult {
        let start_time = Instant::now();
        let mut colony = self.initialize(rng, observer);
        let mut history = Vec::new();

        info!(
            "ABC for seller {}: {} bees, limit {}, {} iterations",
            self.model.seller().id,
            self.config.num_bees,
            self.config.limit,
            self.config.max_iterations
        );

        for iteration in 0..self.config.max_iterations {
            self.employed_phase(&mut colony, rng, observer);
            self.onlooker_phase(&mut colony, rng, observer);
            let abandoned = self.scout_phase(&mut colony, rng, observer);

            let current = best_bee(&colony.bees);
            let new_best = current.fitness > colony.best.fitness;
            if new_best {
                colony.best = current.clone();
            }

            debug!(
                "ABC iteration {}: best {:.4}, {} sources abandoned",
                iteration + 1,
                colony.best.fitness,
                abandoned.len()
            );

            if self.config.record_history {
                history.push(RoundRecord {
                    round: iteration + 1,
                    best_fitness: colony.best.fitness,
                    candidates: colony
                        .bees
                        .iter()
                        .enumerate()
                        .map(|(id, bee)| CandidateRecord {
                            id,
                            offer: self.offer_of(&bee.genes),
                            fitness: bee.fitness,
                            new_best: new_best && bee.genes == colony.best.genes,
                            contribution: None,
                        })
                        .collect(),
                });
            }
        }

        let best_offer = self.offer_of(&colony.best.genes);
        info!(
            "ABC for seller {} finished: {} (fitness {:.4})",
            self.model.seller().id,
            best_offer,
            colony.best.fitness
        );

        OptimizationResult {
            algorithm: Algorithm::Abc,
            best_offer,
            fitness: colony.best.fitness,
            execution_time_secs: start_time.elapsed().as_secs_f64(),
            evaluations: colony.evaluations,
            round_history: self.config.record_history.then_some(history),
            contributions: None,
        }
    }
}

/// Gene bounds `[price, delivery, quality%]` of an offer space.
fn gene_bounds(space: &OfferSpace) -> [(f64, f64); 3] {
    [
        space.price,
        (space.delivery.0 as f64, space.delivery.1 as f64),
        space.quality_percent(),
    ]
}

/// Fittest bee; the first one wins ties.
fn best_bee(bees: &[Bee]) -> &Bee {
    let mut best = &bees[0];
    for bee in &bees[1..] {
        if bee.fitness > best.fitness {
            best = bee;
        }
    }
    best
}

/// Onlooker probabilities, proportional to `fitness + ε`.
pub fn selection_probabilities(bees: &[Bee]) -> Vec<f64> {
    let weights: Vec<f64> = bees.iter().map(|b| b.fitness + ROULETTE_EPSILON).collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Index selected by the uniform draw `r` over cumulative `probabilities`.
///
/// Falls back to the last index when rounding leaves the sum below `r`.
pub fn roulette_select(probabilities: &[f64], r: f64) -> usize {
    let mut cumulative = 0.0;
    for (i, p) in probabilities.iter().enumerate() {
        cumulative += p;
        if r <= cumulative {
            return i;
        }
    }
    probabilities.len().saturating_sub(1)
}
