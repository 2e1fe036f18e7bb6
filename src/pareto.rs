//! Pareto-based comparison of optimizer results.
//!
//! Points are objective vectors; every function takes explicit objective
//! [`Direction`]s. The comparator uses `[fitness, execution time]` with
//! fitness maximized and time minimized ([`FITNESS_TIME`]).
//!
//! Hypervolume is exact: a sort-and-sweep for two objectives and recursive
//! slicing along the last objective for more.

use crate::error::{NegotiationError, Result};
use crate::utils::round_to;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Optimization direction of one objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Minimize,
    Maximize,
}

/// `[fitness, execution time]`: maximize fitness, minimize time.
pub const FITNESS_TIME: [Direction; 2] = [Direction::Maximize, Direction::Minimize];

impl Direction {
    fn better(self, a: f64, b: f64) -> bool {
        match self {
            Direction::Minimize => a < b,
            Direction::Maximize => a > b,
        }
    }

    /// Value in minimization form.
    fn to_min(self, value: f64) -> f64 {
        match self {
            Direction::Minimize => value,
            Direction::Maximize => -value,
        }
    }
}

/// `true` if `a` is at least as good as `b` everywhere and strictly better somewhere.
pub fn dominates(a: &[f64], b: &[f64], directions: &[Direction]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), directions.len());

    let mut strictly_better = false;
    for ((&av, &bv), &dir) in a.iter().zip(b).zip(directions) {
        if dir.better(bv, av) {
            return false;
        }
        if dir.better(av, bv) {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Indices of the non-dominated points, in input order.
pub fn pareto_front_indices(points: &[Vec<f64>], directions: &[Direction]) -> Vec<usize> {
    (0..points.len())
        .filter(|&i| {
            !points
                .iter()
                .enumerate()
                .any(|(j, q)| i != j && dominates(q, &points[i], directions))
        })
        .collect()
}

/// The non-dominated points, in input order.
pub fn pareto_front(points: &[Vec<f64>], directions: &[Direction]) -> Vec<Vec<f64>> {
    pareto_front_indices(points, directions)
        .into_iter()
        .map(|i| points[i].clone())
        .collect()
}

/// Inverted generational distance: mean over `reference` of the Euclidean
/// distance to the nearest point of `solutions`. Lower is better.
pub fn igd(solutions: &[Vec<f64>], reference: &[Vec<f64>]) -> Result<f64> {
    if solutions.is_empty() || reference.is_empty() {
        return Err(NegotiationError::degenerate(
            "IGD needs non-empty solution and reference sets",
        ));
    }

    let total: f64 = reference
        .iter()
        .map(|r| {
            solutions
                .iter()
                .map(|s| euclidean(r, s))
                .fold(f64::INFINITY, f64::min)
        })
        .sum();
    Ok(total / reference.len() as f64)
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Volume of objective space dominated by `points` and bounded by `reference`.
///
/// Points that do not dominate the reference point contribute nothing. An
/// empty set has zero hypervolume.
pub fn hypervolume(points: &[Vec<f64>], reference: &[f64], directions: &[Direction]) -> Result<f64> {
    if reference.len() != directions.len() {
        return Err(NegotiationError::configuration(
            "referencePoint",
            format!("expected {} coordinates, got {}", directions.len(), reference.len()),
        ));
    }
    check_dimensions(points, directions)?;

    let reference: Vec<f64> = reference
        .iter()
        .zip(directions)
        .map(|(&r, &dir)| dir.to_min(r))
        .collect();
    let points: Vec<Vec<f64>> = points
        .iter()
        .map(|p| p.iter().zip(directions).map(|(&v, &dir)| dir.to_min(v)).collect::<Vec<f64>>())
        .filter(|p| p.iter().zip(&reference).all(|(v, r)| v < r))
        .collect();

    Ok(hypervolume_min(points, &reference))
}

/// Hypervolume of minimization-form points that all lie strictly inside the reference box.
fn hypervolume_min(mut points: Vec<Vec<f64>>, reference: &[f64]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }

    match reference.len() {
        1 => reference[0] - points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min),
        2 => {
            points.sort_by(|a, b| {
                a[0].partial_cmp(&b[0])
                    .unwrap_or(Ordering::Equal)
                    .then(a[1].partial_cmp(&b[1]).unwrap_or(Ordering::Equal))
            });
            let mut volume = 0.0;
            let mut ceiling = reference[1];
            for p in &points {
                if p[1] < ceiling {
                    volume += (reference[0] - p[0]) * (ceiling - p[1]);
                    ceiling = p[1];
                }
            }
            volume
        }
        d => {
            let last = d - 1;
            points.sort_by(|a, b| a[last].partial_cmp(&b[last]).unwrap_or(Ordering::Equal));
            let mut volume = 0.0;
            for k in 0..points.len() {
                let upper = points.get(k + 1).map_or(reference[last], |p| p[last]);
                let depth = upper - points[k][last];
                if depth <= 0.0 {
                    continue;
                }
                let slice: Vec<Vec<f64>> = points[..=k].iter().map(|p| p[..last].to_vec()).collect();
                volume += hypervolume_min(slice, &reference[..last]) * depth;
            }
            volume
        }
    }
}

/// Hypervolume lost when each point is removed from `front`.
pub fn hv_contributions(front: &[Vec<f64>], reference: &[f64], directions: &[Direction]) -> Result<Vec<f64>> {
    let total = hypervolume(front, reference, directions)?;
    (0..front.len())
        .map(|i| {
            let reduced: Vec<Vec<f64>> = front
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, p)| p.clone())
                .collect();
            Ok(total - hypervolume(&reduced, reference, directions)?)
        })
        .collect()
}

/// Indices of `front` ordered by decreasing hypervolume contribution.
///
/// `None` for fronts of fewer than two points, where a ranking says nothing.
pub fn contribution_ranking(
    front: &[Vec<f64>],
    reference: &[f64],
    directions: &[Direction],
) -> Result<Option<Vec<usize>>> {
    if front.len() < 2 {
        return Ok(None);
    }
    let contributions = hv_contributions(front, reference, directions)?;
    Ok(Some(
        (0..front.len())
            .sorted_by(|&a, &b| {
                contributions[b]
                    .partial_cmp(&contributions[a])
                    .unwrap_or(Ordering::Equal)
            })
            .collect(),
    ))
}

/// Reference point dominated by every point of `points`.
///
/// Per objective the worst observed value is pushed outward by 10% of its
/// magnitude: `1.1 × max` for a positive minimized objective, `0.9 × min`
/// for a positive maximized one. A worst value of zero is pushed by 0.1.
pub fn derive_reference_point(points: &[Vec<f64>], directions: &[Direction]) -> Result<Vec<f64>> {
    if points.is_empty() {
        return Err(NegotiationError::degenerate(
            "cannot derive a reference point from an empty point set",
        ));
    }
    check_dimensions(points, directions)?;

    Ok(directions
        .iter()
        .enumerate()
        .map(|(j, &dir)| {
            let values = points.iter().map(|p| p[j]);
            let (worst, sign) = match dir {
                Direction::Minimize => (values.fold(f64::NEG_INFINITY, f64::max), 1.0),
                Direction::Maximize => (values.fold(f64::INFINITY, f64::min), -1.0),
            };
            let margin = if worst == 0.0 { 0.1 } else { 0.1 * worst.abs() };
            worst + sign * margin
        })
        .collect())
}

/// Every point must have one coordinate per objective.
fn check_dimensions(points: &[Vec<f64>], directions: &[Direction]) -> Result<()> {
    match points.iter().find(|p| p.len() != directions.len()) {
        Some(point) => Err(NegotiationError::configuration(
            "points",
            format!("expected {} coordinates, got {}", directions.len(), point.len()),
        )),
        None => Ok(()),
    }
}

/// Pareto metrics of one algorithm's point set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParetoMetrics {
    pub pareto_size: usize,
    /// Against the union of all compared points.
    pub igd: f64,
    pub hypervolume: f64,
    pub hv_contributions: Vec<f64>,
    pub max_hv_contribution: f64,
    pub avg_hv_contribution: f64,
}

/// Metrics of every compared algorithm plus their ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParetoReport<K: Ord> {
    pub reference_point: Vec<f64>,
    pub metrics: BTreeMap<K, ParetoMetrics>,
    /// Best first: higher hypervolume, then lower IGD.
    pub ranking: Vec<K>,
}

/// Computes Pareto metrics for groups of objective vectors.
#[derive(Debug, Clone)]
pub struct ParetoEvaluator {
    directions: Vec<Direction>,
    reference_point: Option<Vec<f64>>,
}

impl ParetoEvaluator {
    pub fn new(directions: &[Direction]) -> Self {
        ParetoEvaluator {
            directions: directions.to_vec(),
            reference_point: None,
        }
    }

    /// Evaluator for `[fitness, execution time]` points.
    pub fn fitness_time() -> Self {
        ParetoEvaluator::new(&FITNESS_TIME)
    }

    pub fn with_reference_point(mut self, point: Vec<f64>) -> Self {
        self.reference_point = Some(point);
        self
    }

    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    /// Explicit reference point if set, otherwise one derived from `points`.
    ///
    /// An explicit point that no observed point dominates is rejected.
    pub fn reference_point(&self, points: &[Vec<f64>]) -> Result<Vec<f64>> {
        check_dimensions(points, &self.directions)?;
        match &self.reference_point {
            Some(point) => {
                if point.len() != self.directions.len() {
                    return Err(NegotiationError::configuration(
                        "referencePoint",
                        format!("expected {} coordinates, got {}", self.directions.len(), point.len()),
                    ));
                }
                if !points.iter().any(|p| dominates(p, point, &self.directions)) {
                    return Err(NegotiationError::degenerate(
                        "reference point is not dominated by any observed point",
                    ));
                }
                Ok(point.clone())
            }
            None => derive_reference_point(points, &self.directions),
        }
    }

    /// Front size, IGD, hypervolume and contributions per group.
    pub fn evaluate<K: Ord + Clone>(&self, groups: &BTreeMap<K, Vec<Vec<f64>>>) -> Result<ParetoReport<K>> {
        let all_points: Vec<Vec<f64>> = groups.values().flatten().cloned().collect();
        if all_points.is_empty() {
            return Err(NegotiationError::degenerate("no points to compare"));
        }
        check_dimensions(&all_points, &self.directions)?;
        let reference = self.reference_point(&all_points)?;

        let mut metrics = BTreeMap::new();
        for (key, points) in groups {
            let front = pareto_front(points, &self.directions);
            if front.is_empty() {
                return Err(NegotiationError::degenerate("empty Pareto front"));
            }
            let distance = igd(&front, &all_points)?;
            let volume = hypervolume(&front, &reference, &self.directions)?;
            let contributions = hv_contributions(&front, &reference, &self.directions)?;
            let max_contribution = contributions.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg_contribution = contributions.iter().sum::<f64>() / contributions.len() as f64;

            metrics.insert(
                key.clone(),
                ParetoMetrics {
                    pareto_size: front.len(),
                    igd: round_to(distance, 5),
                    hypervolume: round_to(volume, 5),
                    hv_contributions: contributions.iter().map(|c| round_to(*c, 6)).collect(),
                    max_hv_contribution: round_to(max_contribution, 6),
                    avg_hv_contribution: round_to(avg_contribution, 6),
                },
            );
        }

        let ranking = metrics
            .iter()
            .sorted_by(|(_, a), (_, b)| {
                b.hypervolume
                    .partial_cmp(&a.hypervolume)
                    .unwrap_or(Ordering::Equal)
                    .then(a.igd.partial_cmp(&b.igd).unwrap_or(Ordering::Equal))
            })
            .map(|(key, _)| key.clone())
            .collect();

        Ok(ParetoReport {
            reference_point: reference,
            metrics,
            ranking,
        })
    }
}
