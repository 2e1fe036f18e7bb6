//! Genetic operators and the generational loop of the GA optimizer.

use crate::config::GaConfig;
use crate::error::Result;
use crate::fitness::{EvaluationObserver, FitnessModel};
use crate::offer::{Offer, OfferSpace, Quality};
use crate::result::{Algorithm, CandidateRecord, OptimizationResult, RoundRecord};
use crate::utils::round_to;
use log::{debug, info};
use rand::seq::index;
use rand::Rng;
use std::cmp::Ordering;
use std::time::Instant;

/// `[price, delivery, quality%]`
pub type Chromosome = [f64; 3];

/// Gene positions of a [`Chromosome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gene {
    Price = 0,
    Delivery = 1,
    Quality = 2,
}

impl Gene {
    pub const ALL: [Gene; 3] = [Gene::Price, Gene::Delivery, Gene::Quality];
}

/// A chromosome together with its bilateral fitness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub chromosome: Chromosome,
    pub fitness: f64,
}

/// Elitist GA with truncation selection and dependent mutation.
#[derive(Debug, Clone)]
pub struct Genetic<'a> {
    config: GaConfig,
    model: FitnessModel<'a>,
    space: OfferSpace,
    bounds: [(f64, f64); 3],
}

impl<'a> Genetic<'a> {
    pub fn new(config: GaConfig, model: FitnessModel<'a>) -> Result<Self> {
        config.validate()?;
        let mut space = OfferSpace::from_seller(model.seller())?;
        if let Some((low, high)) = config.quality_percent {
            space = space.with_quality_percent(low, high)?;
        }
        let bounds = [
            space.price,
            (space.delivery.0 as f64, space.delivery.1 as f64),
            space.quality_percent(),
        ];
        Ok(Genetic {
            config,
            model,
            space,
            bounds,
        })
    }

    pub fn space(&self) -> &OfferSpace {
        &self.space
    }

    pub fn offer_of(&self, chromosome: &Chromosome) -> Offer {
        Offer {
            price: chromosome[0],
            delivery: chromosome[1] as u32,
            quality: Quality::from_percent(chromosome[2]),
        }
    }

    /// Draw a fresh value for one gene.
    fn random_gene<R: Rng>(&self, gene: Gene, rng: &mut R) -> f64 {
        let (low, high) = self.bounds[gene as usize];
        match gene {
            Gene::Price => round_to(rng.gen_range(low..=high), 2).clamp(low, high),
            Gene::Delivery | Gene::Quality => rng.gen_range(low as u32..=high as u32) as f64,
        }
    }

    pub fn random_chromosome<R: Rng>(&self, rng: &mut R) -> Chromosome {
        [
            self.random_gene(Gene::Price, rng),
            self.random_gene(Gene::Delivery, rng),
            self.random_gene(Gene::Quality, rng),
        ]
    }

    pub fn initialize<R: Rng>(&self, rng: &mut R) -> Vec<Chromosome> {
        (0..self.config.population_size)
            .map(|_| self.random_chromosome(rng))
            .collect()
    }

    pub fn evaluate(
        &self,
        population: &[Chromosome],
        observer: &mut dyn EvaluationObserver,
    ) -> Vec<Scored> {
        population
            .iter()
            .map(|chromosome| Scored {
                chromosome: *chromosome,
                fitness: self
                    .model
                    .evaluate_observed(&self.offer_of(chromosome), Algorithm::Ga, observer),
            })
            .collect()
    }

    /// Truncation selection: the fitter half, best first.
    ///
    /// The sort is stable, so equally fit chromosomes keep their order.
    pub fn select(&self, mut scored: Vec<Scored>) -> Vec<Scored> {
        scored.sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap_or(Ordering::Equal));
        scored.truncate(scored.len() / 2);
        scored
    }

    /// Uniform crossover: each gene comes from either parent with probability 0.5.
    pub fn crossover<R: Rng>(&self, parent1: &Chromosome, parent2: &Chromosome, rng: &mut R) -> Chromosome {
        let mut child = [0.0; 3];
        for (i, gene) in child.iter_mut().enumerate() {
            *gene = if rng.gen::<f64>() < 0.5 {
                parent1[i]
            } else {
                parent2[i]
            };
        }
        child
    }

    /// With probability `mutation_rate`, re-randomize one gene.
    ///
    /// Returns the mutated gene, if any.
    pub fn mutate<R: Rng>(&self, chromosome: &mut Chromosome, rng: &mut R) -> Option<Gene> {
        if rng.gen::<f64>() >= self.config.mutation_rate {
            return None;
        }
        let gene = Gene::ALL[rng.gen_range(0..Gene::ALL.len())];
        self.mutate_gene(chromosome, gene, rng);
        Some(gene)
    }

    /// Re-randomize `gene` and apply its coupling to the dependent gene.
    pub fn mutate_gene<R: Rng>(&self, chromosome: &mut Chromosome, gene: Gene, rng: &mut R) {
        chromosome[gene as usize] = self.random_gene(gene, rng);
        self.apply_coupling(chromosome, gene);
    }

    /// Nudge the dependent gene after `gene` changed.
    pub fn apply_coupling(&self, chromosome: &mut Chromosome, gene: Gene) {
        let coupling = &self.config.coupling;
        let (price_low, price_high) = self.bounds[Gene::Price as usize];
        let quality_high = self.bounds[Gene::Quality as usize].1;

        match gene {
            Gene::Price => {
                if chromosome[0] > coupling.price_threshold {
                    chromosome[2] = (chromosome[2] + coupling.quality_bonus).min(quality_high);
                }
            }
            Gene::Delivery => {
                if chromosome[1] > coupling.delivery_threshold {
                    chromosome[0] = round_to(chromosome[0] - coupling.price_discount, 2).max(price_low);
                }
            }
            Gene::Quality => {
                if chromosome[2] < coupling.quality_threshold {
                    chromosome[0] = round_to(chromosome[0] + coupling.price_surcharge, 2).min(price_high);
                }
            }
        }
    }

    /// Breed a full replacement population from the selected parents.
    pub fn next_generation<R: Rng>(&self, selected: &[Scored], rng: &mut R) -> Vec<Chromosome> {
        let mut offspring = Vec::with_capacity(self.config.population_size);
        while offspring.len() < self.config.population_size {
            let pair = index::sample(rng, selected.len(), 2);
            let mut child = self.crossover(
                &selected[pair.index(0)].chromosome,
                &selected[pair.index(1)].chromosome,
                rng,
            );
            self.mutate(&mut child, rng);
            offspring.push(child);
        }
        offspring
    }

    pub fn run<R: Rng>(&self, rng: &mut R, observer: &mut dyn EvaluationObserver) -> OptimizationResult {
        let start_time = Instant::now();
        let mut population = self.initialize(rng);
        let mut evaluations = 0;
        let mut history = Vec::new();

        info!(
            "GA for seller {}: population {}, {} generations, mutation rate {}",
            self.model.seller().id,
            self.config.population_size,
            self.config.generations,
            self.config.mutation_rate
        );

        for generation in 0..self.config.generations {
            let scored = self.evaluate(&population, observer);
            evaluations += scored.len();

            if self.config.record_history {
                history.push(round_record(generation + 1, &scored, |c| self.offer_of(c)));
            }

            let selected = self.select(scored);
            debug!(
                "GA generation {}: best {:.4}",
                generation + 1,
                selected[0].fitness
            );
            population = self.next_generation(&selected, rng);
        }

        let scored = self.evaluate(&population, observer);
        evaluations += scored.len();
        let best = fittest(&scored);
        let best_offer = self.offer_of(&best.chromosome);

        info!(
            "GA for seller {} finished: {} (fitness {:.4})",
            self.model.seller().id,
            best_offer,
            best.fitness
        );

        OptimizationResult {
            algorithm: Algorithm::Ga,
            best_offer,
            fitness: best.fitness,
            execution_time_secs: start_time.elapsed().as_secs_f64(),
            evaluations,
            round_history: self.config.record_history.then_some(history),
            contributions: None,
        }
    }
}

/// Fittest scored chromosome; the first one wins ties.
fn fittest(scored: &[Scored]) -> Scored {
    let mut best = scored[0];
    for candidate in &scored[1..] {
        if candidate.fitness > best.fitness {
            best = *candidate;
        }
    }
    best
}

fn round_record(round: usize, scored: &[Scored], offer_of: impl Fn(&Chromosome) -> Offer) -> RoundRecord {
    let best = fittest(scored);
    RoundRecord {
        round,
        best_fitness: best.fitness,
        candidates: scored
            .iter()
            .enumerate()
            .map(|(id, s)| CandidateRecord {
                id,
                offer: offer_of(&s.chromosome),
                fitness: s.fitness,
                new_best: false,
                contribution: None,
            })
            .collect(),
    }
}
