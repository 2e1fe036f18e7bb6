//! Runs the three optimizers per seller and compares their results.

use crate::abc::Abc;
use crate::config::ComparatorConfig;
use crate::error::Result;
use crate::fitness::{EvaluationObserver, FitnessModel, MemoryRecorder, NoopObserver, RunRecord, TraceRecord};
use crate::genetic::Genetic;
use crate::mpso::Mpso;
use crate::offer::Offer;
use crate::pareto::{contribution_ranking, pareto_front_indices, ParetoEvaluator, ParetoReport, FITNESS_TIME};
use crate::profile::NegotiationRequest;
use crate::result::{Algorithm, OptimizationResult, RoundRecord};
use crate::utils::{round_to, run_rng};
use itertools::Itertools;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Fitness and time of every algorithm for one seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonMetrics {
    pub fitness_by_algorithm: BTreeMap<Algorithm, f64>,
    pub time_by_algorithm: BTreeMap<Algorithm, f64>,
}

/// Outcome of the three-way comparison for one seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManufacturerComparison {
    pub manufacturer_id: String,
    pub per_algorithm: BTreeMap<Algorithm, OptimizationResult>,
    /// Highest fitness; earlier algorithms win ties.
    pub winner: Algorithm,
    pub comparison_metrics: ComparisonMetrics,
    /// Algorithms whose `[fitness, time]` point is non-dominated for this seller.
    pub pareto_front: Vec<Algorithm>,
    /// Front members by decreasing hypervolume contribution; absent below two members.
    pub contribution_ranking: Option<Vec<Algorithm>>,
}

/// Full comparison across all sellers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub manufacturers: Vec<ManufacturerComparison>,
    /// Metrics of each algorithm's `[fitness, time]` points across sellers.
    pub pareto: ParetoReport<Algorithm>,
}

/// One seller's MPSO offer in the negotiation ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedOffer {
    pub manufacturer_id: String,
    pub optimized_offer: Offer,
    /// Rounded to 4 decimals.
    pub fitness: f64,
    pub contributions: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_history: Option<Vec<RoundRecord>>,
}

/// MPSO offers of all sellers, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationOutcome {
    pub recommended: RankedOffer,
    pub rejected: Vec<RankedOffer>,
    pub all_results: Vec<RankedOffer>,
}

/// Optimizers prepared for one seller. Building them validates everything.
struct SellerSetup<'a> {
    index: usize,
    seller_id: String,
    mpso: Mpso<'a>,
    abc: Abc<'a>,
    ga: Genetic<'a>,
}

impl SellerSetup<'_> {
    fn run(&self, algorithm: Algorithm, seed: u64, observer: &mut dyn EvaluationObserver) -> OptimizationResult {
        let mut rng = run_rng(seed, self.index, algorithm);
        let result = match algorithm {
            Algorithm::Mpso => self.mpso.run(&mut rng, observer),
            Algorithm::Abc => self.abc.run(&mut rng, observer),
            Algorithm::Ga => self.ga.run(&mut rng, observer),
        };
        if observer.enabled() {
            observer.record(&TraceRecord::RunResult(RunRecord::from_result(&self.seller_id, &result)));
        }
        result
    }

    /// Run `algorithms` in order, buffering trace records when `trace` is set.
    fn run_all(&self, algorithms: &[Algorithm], seed: u64, trace: bool) -> (Vec<OptimizationResult>, MemoryRecorder) {
        let mut recorder = MemoryRecorder::new();
        let results = algorithms
            .iter()
            .map(|&algorithm| {
                if trace {
                    self.run(algorithm, seed, &mut recorder)
                } else {
                    self.run(algorithm, seed, &mut NoopObserver)
                }
            })
            .collect();
        (results, recorder)
    }
}

/// Runs MPSO, ABC and GA for every seller of a request.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmComparator {
    config: ComparatorConfig,
}

impl AlgorithmComparator {
    pub fn new(config: ComparatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(AlgorithmComparator { config })
    }

    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    fn prepare<'a>(&self, request: &'a NegotiationRequest) -> Result<Vec<SellerSetup<'a>>> {
        request.validate()?;
        request
            .sellers
            .iter()
            .enumerate()
            .map(|(index, seller)| {
                let model = FitnessModel::new(&request.buyer, seller, request.weights)?;
                Ok(SellerSetup {
                    index,
                    seller_id: seller.id.clone(),
                    mpso: Mpso::new(self.config.mpso.clone(), model.clone())?,
                    abc: Abc::new(self.config.abc.clone(), model.clone())?,
                    ga: Genetic::new(self.config.ga.clone(), model)?,
                })
            })
            .collect()
    }

    /// Run `algorithms` for every seller, replaying trace records in seller order.
    fn run_sellers(
        &self,
        setups: &[SellerSetup<'_>],
        algorithms: &[Algorithm],
        observer: &mut dyn EvaluationObserver,
    ) -> Vec<Vec<OptimizationResult>> {
        let trace = observer.enabled();
        let seed = self.config.seed;

        #[cfg(feature = "parallel")]
        let runs: Vec<(Vec<OptimizationResult>, MemoryRecorder)> = setups
            .par_iter()
            .map(|setup| setup.run_all(algorithms, seed, trace))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let runs: Vec<(Vec<OptimizationResult>, MemoryRecorder)> = setups
            .iter()
            .map(|setup| setup.run_all(algorithms, seed, trace))
            .collect();

        runs.into_iter()
            .map(|(results, recorder)| {
                recorder.replay_into(observer);
                results
            })
            .collect()
    }

    /// Run a single optimizer for every seller.
    pub fn run_single(
        &self,
        algorithm: Algorithm,
        request: &NegotiationRequest,
        observer: &mut dyn EvaluationObserver,
    ) -> Result<Vec<(String, OptimizationResult)>> {
        let setups = self.prepare(request)?;
        let runs = self.run_sellers(&setups, &[algorithm], observer);
        Ok(setups
            .iter()
            .zip(runs)
            .filter_map(|(setup, mut results)| results.pop().map(|r| (setup.seller_id.clone(), r)))
            .collect())
    }

    /// Rank every seller's MPSO offer by fitness.
    pub fn negotiate(
        &self,
        request: &NegotiationRequest,
        observer: &mut dyn EvaluationObserver,
    ) -> Result<NegotiationOutcome> {
        let mut ranked: Vec<RankedOffer> = self
            .run_single(Algorithm::Mpso, request, observer)?
            .into_iter()
            .map(|(manufacturer_id, result)| RankedOffer {
                manufacturer_id,
                optimized_offer: result.best_offer,
                fitness: round_to(result.fitness, 4),
                contributions: result.contributions.unwrap_or_default(),
                round_history: result.round_history,
            })
            .collect();
        ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

        let recommended = ranked[0].clone();
        info!(
            "Recommended seller {} with fitness {:.4}",
            recommended.manufacturer_id, recommended.fitness
        );
        Ok(NegotiationOutcome {
            recommended,
            rejected: ranked[1..].to_vec(),
            all_results: ranked,
        })
    }

    /// Run all three optimizers for every seller and compare them.
    pub fn compare(
        &self,
        request: &NegotiationRequest,
        observer: &mut dyn EvaluationObserver,
    ) -> Result<ComparisonReport> {
        let setups = self.prepare(request)?;
        info!(
            "Comparing {} algorithms over {} sellers (seed {})",
            Algorithm::ALL.len(),
            setups.len(),
            self.config.seed
        );
        let runs = self.run_sellers(&setups, &Algorithm::ALL, observer);

        let mut groups: BTreeMap<Algorithm, Vec<Vec<f64>>> = BTreeMap::new();
        for results in &runs {
            for result in results {
                groups
                    .entry(result.algorithm)
                    .or_default()
                    .push(vec![result.fitness, result.execution_time_secs]);
            }
        }

        let mut evaluator = ParetoEvaluator::fitness_time();
        if let Some(point) = self.config.reference_point {
            evaluator = evaluator.with_reference_point(point.to_vec());
        }
        let pareto = evaluator.evaluate(&groups)?;

        let manufacturers = setups
            .iter()
            .zip(runs)
            .map(|(setup, results)| summarize(&setup.seller_id, results, &pareto.reference_point))
            .collect::<Result<Vec<_>>>()?;

        info!("Algorithm ranking by hypervolume: {}", pareto.ranking.iter().join(", "));

        Ok(ComparisonReport {
            manufacturers,
            pareto,
        })
    }
}

fn summarize(seller_id: &str, results: Vec<OptimizationResult>, reference: &[f64]) -> Result<ManufacturerComparison> {
    let mut winner = results[0].algorithm;
    let mut best_fitness = results[0].fitness;
    for result in &results[1..] {
        if result.fitness > best_fitness {
            winner = result.algorithm;
            best_fitness = result.fitness;
        }
    }

    let points: Vec<Vec<f64>> = results
        .iter()
        .map(|r| vec![r.fitness, r.execution_time_secs])
        .collect();
    let front_indices = pareto_front_indices(&points, &FITNESS_TIME);
    let front_points: Vec<Vec<f64>> = front_indices.iter().map(|&i| points[i].clone()).collect();
    let pareto_front: Vec<Algorithm> = front_indices.iter().map(|&i| results[i].algorithm).collect();
    let contribution_ranking = contribution_ranking(&front_points, reference, &FITNESS_TIME)?
        .map(|order| order.into_iter().map(|i| pareto_front[i]).collect());

    info!("Seller {}: winner {} (fitness {:.4})", seller_id, winner, best_fitness);

    let comparison_metrics = ComparisonMetrics {
        fitness_by_algorithm: results.iter().map(|r| (r.algorithm, r.fitness)).collect(),
        time_by_algorithm: results.iter().map(|r| (r.algorithm, r.execution_time_secs)).collect(),
    };

    Ok(ManufacturerComparison {
        manufacturer_id: seller_id.to_string(),
        per_algorithm: results.into_iter().map(|r| (r.algorithm, r)).collect(),
        winner,
        comparison_metrics,
        pareto_front,
        contribution_ranking,
    })
}
