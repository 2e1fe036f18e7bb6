//! Contribution-adaptive multi-agent particle swarm optimization.
//!
//! Each particle moves through (price, delivery, quality) space under the
//! usual inertia/cognitive/social velocity rule, except that the social
//! coefficient of particle `i` grows with the number of times `i` has set a
//! new global best: `base_social + contributions[i] / (iteration + 1)`.

use crate::config::MpsoConfig;
use crate::error::Result;
use crate::fitness::{EvaluationObserver, FitnessModel};
use crate::offer::{Offer, OfferSpace, Quality};
use crate::result::{Algorithm, CandidateRecord, OptimizationResult, RoundRecord};
use crate::utils::round_to;
use log::{debug, info};
use rand::Rng;
use std::time::Instant;

const PRICE: usize = 0;
const DELIVERY: usize = 1;
const QUALITY: usize = 2;

/// A particle of the swarm. Positions are `[price, delivery, quality]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub best_position: [f64; 3],
    pub best_fitness: f64,
    /// Number of times this particle set a new global best
    pub contribution: u32,
}

/// The swarm owned by one run. Particles are addressed by index.
#[derive(Debug, Clone)]
pub struct Swarm {
    pub particles: Vec<Particle>,
    pub global_best: [f64; 3],
    pub global_best_fitness: f64,
}

impl Swarm {
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn contributions(&self) -> Vec<u32> {
        self.particles.iter().map(|p| p.contribution).collect()
    }
}

/// Particle swarm optimizer for one buyer/seller pair.
#[derive(Debug, Clone)]
pub struct Mpso<'a> {
    config: MpsoConfig,
    model: FitnessModel<'a>,
    space: OfferSpace,
}

impl<'a> Mpso<'a> {
    pub fn new(config: MpsoConfig, model: FitnessModel<'a>) -> Result<Self> {
        config.validate()?;
        let space = OfferSpace::from_seller(model.seller())?;
        Ok(Mpso {
            config,
            model,
            space,
        })
    }

    pub fn space(&self) -> &OfferSpace {
        &self.space
    }

    /// The offer a position is evaluated as: quality snapped to a level.
    pub fn offer_at(&self, position: &[f64; 3]) -> Offer {
        Offer {
            price: position[PRICE],
            delivery: position[DELIVERY] as u32,
            quality: Quality::from_value(position[QUALITY]).snapped(),
        }
    }

    /// Draw the swarm size and the initial particles.
    pub fn initialize<R: Rng>(&self, rng: &mut R, observer: &mut dyn EvaluationObserver) -> Swarm {
        let size = rng.gen_range(self.config.swarm_size_min..=self.config.swarm_size_max);
        let mut particles = Vec::with_capacity(size);
        let mut global_best = [0.0; 3];
        let mut global_best_fitness = f64::NEG_INFINITY;

        for _ in 0..size {
            let offer = self.space.random_offer(rng);
            let position = [offer.price, offer.delivery as f64, offer.quality.value];
            let velocity = [
                symmetric(rng, self.config.price_velocity),
                symmetric(rng, self.config.delivery_velocity),
                symmetric(rng, self.config.quality_velocity),
            ];

            let fitness =
                self.model
                    .evaluate_observed(&self.offer_at(&position), Algorithm::Mpso, observer);

            // Strict comparison keeps the first-seen particle on ties.
            if fitness > global_best_fitness {
                global_best = position;
                global_best_fitness = fitness;
            }

            particles.push(Particle {
                position,
                velocity,
                best_position: position,
                best_fitness: fitness,
                contribution: 0,
            });
        }

        Swarm {
            particles,
            global_best,
            global_best_fitness,
        }
    }

    /// Move every particle once. `iteration` is 0-based.
    pub fn iterate<R: Rng>(
        &self,
        swarm: &mut Swarm,
        iteration: usize,
        rng: &mut R,
        observer: &mut dyn EvaluationObserver,
    ) -> Vec<CandidateRecord> {
        let mut records = Vec::with_capacity(swarm.len());

        for i in 0..swarm.particles.len() {
            let global_best = swarm.global_best;
            let particle = &mut swarm.particles[i];
            let social = self.config.base_social + particle.contribution as f64 / (iteration + 1) as f64;

            for dim in [PRICE, DELIVERY, QUALITY] {
                let r1: f64 = rng.gen();
                let r2: f64 = rng.gen();
                let velocity = self.config.inertia * particle.velocity[dim]
                    + self.config.cognitive * r1 * (particle.best_position[dim] - particle.position[dim])
                    + social * r2 * (global_best[dim] - particle.position[dim]);
                particle.position[dim] += velocity;
                particle.velocity[dim] = velocity;
            }

            particle.position[PRICE] = self.space.clamp_price(particle.position[PRICE]);
            particle.position[DELIVERY] = self.space.clamp_delivery(particle.position[DELIVERY]) as f64;
            particle.position[QUALITY] = self.space.clamp_quality(particle.position[QUALITY]);

            let offer = self.offer_at(&particle.position);
            let fitness = self.model.evaluate_observed(&offer, Algorithm::Mpso, observer);

            if fitness > particle.best_fitness {
                particle.best_position = particle.position;
                particle.best_fitness = fitness;
            }

            let new_best = fitness > swarm.global_best_fitness;
            if new_best {
                swarm.global_best = particle.position;
                swarm.global_best_fitness = fitness;
                particle.contribution += 1;
            }

            records.push(CandidateRecord {
                id: i,
                offer,
                fitness,
                new_best,
                contribution: Some(particle.contribution),
            });
        }

        records
    }

    /// Run the full iteration budget and return the global best.
    pub fn run<R: Rng>(&self, rng: &mut R, observer: &mut dyn EvaluationObserver) -> OptimizationResult {
        let start_time = Instant::now();
        let mut swarm = self.initialize(rng, observer);
        let mut evaluations = swarm.len();
        let mut history = Vec::new();

        info!(
            "MPSO for seller {}: {} particles, {} iterations",
            self.model.seller().id,
            swarm.len(),
            self.config.max_iterations
        );

        for iteration in 0..self.config.max_iterations {
            let candidates = self.iterate(&mut swarm, iteration, rng, observer);
            evaluations += candidates.len();
            debug!(
                "MPSO iteration {}: global best {:.4}",
                iteration + 1,
                swarm.global_best_fitness
            );
            if self.config.record_history {
                history.push(RoundRecord {
                    round: iteration + 1,
                    best_fitness: swarm.global_best_fitness,
                    candidates,
                });
            }
        }

        let mut best_offer = self.offer_at(&swarm.global_best);
        best_offer.price = self.space.clamp_price(round_to(best_offer.price, 2));

        info!(
            "MPSO for seller {} finished: {} (fitness {:.4})",
            self.model.seller().id,
            best_offer,
            swarm.global_best_fitness
        );

        OptimizationResult {
            algorithm: Algorithm::Mpso,
            best_offer,
            fitness: swarm.global_best_fitness,
            execution_time_secs: start_time.elapsed().as_secs_f64(),
            evaluations,
            round_history: self.config.record_history.then_some(history),
            contributions: Some(swarm.contributions()),
        }
    }
}

fn symmetric<R: Rng>(rng: &mut R, half_width: f64) -> f64 {
    if half_width > 0.0 {
        rng.gen_range(-half_width..=half_width)
    } else {
        0.0
    }
}
