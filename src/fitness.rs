//! Offer scoring.
//!
//! The bilateral satisfaction score is the fitness every optimizer
//! maximizes. The weighted-penalty score is a separate, lower-is-better
//! convention kept for scoring legacy chromosomes; it is never mixed into an
//! optimizer run.

use crate::error::Result;
use crate::offer::Offer;
use crate::profile::{BuyerProfile, SellerProfile, WeightConfig};
use crate::result::{Algorithm, OptimizationResult};
use chrono::{DateTime, Utc};
use log::{log_enabled, trace, warn, Level};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Per-attribute closeness scores of one party, each clamped at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SatisfactionScores {
    pub price: f64,
    pub quality: f64,
    pub delivery: f64,
    /// Mean of the three component scores.
    pub total: f64,
}

impl SatisfactionScores {
    fn from_components(price: f64, quality: f64, delivery: f64) -> Self {
        SatisfactionScores {
            price,
            quality,
            delivery,
            total: (price + quality + delivery) / 3.0,
        }
    }
}

/// Full breakdown of one bilateral evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub buyer: SatisfactionScores,
    pub seller: SatisfactionScores,
    /// Weighted sum of both satisfactions. Higher is better.
    pub fitness: f64,
}

/// Bilateral satisfaction scoring for one buyer/seller pair.
///
/// Construction validates every normalization denominator, so evaluation
/// itself cannot fail.
#[derive(Debug, Clone)]
pub struct FitnessModel<'a> {
    buyer: &'a BuyerProfile,
    seller: &'a SellerProfile,
    weights: WeightConfig,
}

impl<'a> FitnessModel<'a> {
    pub fn new(
        buyer: &'a BuyerProfile,
        seller: &'a SellerProfile,
        weights: WeightConfig,
    ) -> Result<Self> {
        buyer.validate()?;
        seller.validate()?;
        weights.validate()?;
        Ok(FitnessModel {
            buyer,
            seller,
            weights,
        })
    }

    pub fn buyer(&self) -> &BuyerProfile {
        self.buyer
    }

    pub fn seller(&self) -> &SellerProfile {
        self.seller
    }

    pub fn weights(&self) -> WeightConfig {
        self.weights
    }

    /// Score an offer against both parties.
    pub fn evaluate(&self, offer: &Offer) -> Evaluation {
        let quality = offer.quality.value;
        let delivery = offer.delivery as f64;

        let buyer = SatisfactionScores::from_components(
            closeness(offer.price, self.buyer.price_target),
            (1.0 - (quality - self.buyer.quality_preference.value()).abs()).max(0.0),
            closeness(delivery, self.buyer.delivery_target),
        );

        let seller = SatisfactionScores::from_components(
            ((offer.price - self.seller.min_price) / self.seller.min_price).max(0.0),
            (1.0 - (quality - self.seller.max_quality_cost).abs()).max(0.0),
            closeness(delivery, self.seller.delivery_capacity),
        );

        let fitness =
            self.weights.buyer_weight * buyer.total + self.weights.seller_weight * seller.total;

        Evaluation {
            buyer,
            seller,
            fitness,
        }
    }

    pub fn fitness(&self, offer: &Offer) -> f64 {
        self.evaluate(offer).fitness
    }

    /// Score an offer and report the evaluation to `observer`.
    pub fn evaluate_observed(
        &self,
        offer: &Offer,
        algorithm: Algorithm,
        observer: &mut dyn EvaluationObserver,
    ) -> f64 {
        let evaluation = self.evaluate(offer);
        if observer.enabled() {
            observer.record(&TraceRecord::Evaluation(EvaluationRecord {
                timestamp: Utc::now(),
                algorithm,
                seller_id: self.seller.id.clone(),
                offer: *offer,
                evaluation,
            }));
        }
        evaluation.fitness
    }
}

/// `max(0, 1 - |value - target| / target)`.
fn closeness(value: f64, target: f64) -> f64 {
    (1.0 - (value - target).abs() / target).max(0.0)
}

/// Weights of the legacy penalty score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyWeights {
    #[serde(alias = "weight_price")]
    pub price: f64,
    #[serde(alias = "weight_time")]
    pub time: f64,
    #[serde(alias = "weight_quality")]
    pub quality: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        PenaltyWeights {
            price: 1.0,
            time: 1.0,
            quality: 1.0,
        }
    }
}

/// Legacy weighted-penalty score of a `(price, delivery, quality%)` chromosome.
///
/// LOWER is better, the inverse of [`FitnessModel`]. To compare against a
/// bilateral fitness, negate it; the two scales are otherwise unrelated.
pub fn weighted_penalty(price: f64, delivery: f64, quality_percent: f64, weights: &PenaltyWeights) -> f64 {
    let quality_penalty = 1.0 - quality_percent / 100.0;
    weights.price * price + weights.time * delivery + weights.quality * quality_penalty
}

/// Trace record of a single fitness evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub timestamp: DateTime<Utc>,
    pub algorithm: Algorithm,
    pub seller_id: String,
    pub offer: Offer,
    pub evaluation: Evaluation,
}

/// Trace record of a completed optimizer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub timestamp: DateTime<Utc>,
    pub algorithm: Algorithm,
    pub seller_id: String,
    pub best_offer: Offer,
    pub fitness: f64,
    /// Wall-clock seconds spent inside the run
    #[serde(rename = "executionTime", alias = "executionTimeSeconds", alias = "executionTimeSecs")]
    pub execution_time_secs: f64,
    pub evaluations: usize,
}

impl RunRecord {
    pub fn from_result(seller_id: &str, result: &OptimizationResult) -> Self {
        RunRecord {
            timestamp: Utc::now(),
            algorithm: result.algorithm,
            seller_id: seller_id.to_string(),
            best_offer: result.best_offer,
            fitness: result.fitness,
            execution_time_secs: result.execution_time_secs,
            evaluations: result.evaluations,
        }
    }
}

/// Append-only structured record emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TraceRecord {
    Evaluation(EvaluationRecord),
    RunResult(RunRecord),
}

/// Receives trace records. Implementations must not fail the caller.
pub trait EvaluationObserver {
    fn record(&mut self, record: &TraceRecord);

    /// Returning `false` lets callers skip building records entirely.
    fn enabled(&self) -> bool {
        true
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl EvaluationObserver for NoopObserver {
    fn record(&mut self, _record: &TraceRecord) {}

    fn enabled(&self) -> bool {
        false
    }
}

/// Forwards records to the `log` facade at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl EvaluationObserver for LogObserver {
    fn record(&mut self, record: &TraceRecord) {
        match serde_json::to_string(record) {
            Ok(line) => trace!("{}", line),
            Err(e) => warn!("Failed to serialize trace record: {}", e),
        }
    }

    fn enabled(&self) -> bool {
        log_enabled!(Level::Trace)
    }
}

/// Collects records in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecorder {
    pub records: Vec<TraceRecord>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        MemoryRecorder::default()
    }

    pub fn evaluations(&self) -> impl Iterator<Item = &EvaluationRecord> {
        self.records.iter().filter_map(|record| match record {
            TraceRecord::Evaluation(evaluation) => Some(evaluation),
            TraceRecord::RunResult(_) => None,
        })
    }

    pub fn runs(&self) -> impl Iterator<Item = &RunRecord> {
        self.records.iter().filter_map(|record| match record {
            TraceRecord::RunResult(run) => Some(run),
            TraceRecord::Evaluation(_) => None,
        })
    }

    /// Hand every collected record to another observer, in order.
    pub fn replay_into(&self, observer: &mut dyn EvaluationObserver) {
        for record in &self.records {
            observer.record(record);
        }
    }
}

impl EvaluationObserver for MemoryRecorder {
    fn record(&mut self, record: &TraceRecord) {
        self.records.push(record.clone());
    }
}

/// Writes one JSON document per line. Write failures are logged and dropped.
pub struct JsonLinesRecorder<W: Write> {
    writer: W,
    failures: usize,
}

impl<W: Write> JsonLinesRecorder<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesRecorder {
            writer,
            failures: 0,
        }
    }

    /// Number of records that could not be written.
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EvaluationObserver for JsonLinesRecorder<W> {
    fn record(&mut self, record: &TraceRecord) {
        let outcome = serde_json::to_writer(&mut self.writer, record)
            .map_err(std::io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"));
        if let Err(e) = outcome {
            if self.failures == 0 {
                warn!("Trace sink write failed, further failures are silent: {}", e);
            }
            self.failures += 1;
        }
    }
}
