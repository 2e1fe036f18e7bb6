//! # Negotiation engine
//!
//! Searches for a compromise offer (price, delivery time, quality) between a
//! buyer and a seller by maximizing a bilateral satisfaction score with three
//! population-based metaheuristics:
//!
//! - [`mpso`]: particle swarm whose social coefficient grows with each
//!   particle's record of setting new global bests,
//! - [`abc`]: artificial bee colony with multi-neighbour mutation,
//! - [`genetic`]: truncation-selection GA with dependent mutation.
//!
//! [`comparator::AlgorithmComparator`] runs all three per seller and ranks
//! them with the Pareto metrics of [`pareto`] (dominance, hypervolume, IGD)
//! over `[fitness, execution time]` points.
//!
//! All optimizers maximize the same score. Every run draws from its own
//! seeded random stream, so a request and a seed fully determine every
//! offer and fitness.
//!
//! ```no_run
//! use negotiation_engine::comparator::AlgorithmComparator;
//! use negotiation_engine::config::ComparatorConfig;
//! use negotiation_engine::fitness::NoopObserver;
//! use negotiation_engine::profile::NegotiationRequest;
//!
//! let request = NegotiationRequest::from_file("request.json")?;
//! let comparator = AlgorithmComparator::new(ComparatorConfig::new().with_seed(7))?;
//! let report = comparator.compare(&request, &mut NoopObserver)?;
//! for m in &report.manufacturers {
//!     println!("{}: {}", m.manufacturer_id, m.winner);
//! }
//! # Ok::<(), negotiation_engine::error::NegotiationError>(())
//! ```

pub mod abc;
pub mod comparator;
pub mod config;
pub mod error;
pub mod fitness;
pub mod genetic;
pub mod mpso;
pub mod offer;
pub mod pareto;
pub mod profile;
pub mod result;
pub mod utils;

pub use crate::comparator::{AlgorithmComparator, ComparisonReport};
pub use crate::error::{NegotiationError, Result};
pub use crate::fitness::FitnessModel;
pub use crate::offer::{Offer, OfferSpace, Quality, QualityLevel};
pub use crate::profile::{BuyerProfile, NegotiationRequest, SellerProfile, WeightConfig};
pub use crate::result::{Algorithm, OptimizationResult};
