//! Integration tests for the full three-algorithm comparison.

use negotiation_engine::abc::Abc;
use negotiation_engine::comparator::AlgorithmComparator;
use negotiation_engine::config::{AbcConfig, ComparatorConfig, GaConfig, MpsoConfig};
use negotiation_engine::error::NegotiationError;
use negotiation_engine::genetic::Genetic;
use negotiation_engine::mpso::Mpso;
use negotiation_engine::fitness::{EvaluationObserver, FitnessModel, MemoryRecorder, NoopObserver, TraceRecord};
use negotiation_engine::offer::QualityLevel;
use negotiation_engine::profile::{BuyerProfile, InitialOffer, NegotiationRequest, SellerProfile, WeightConfig};
use negotiation_engine::result::{Algorithm, OptimizationResult};
use negotiation_engine::utils::run_rng;

fn create_seller(id: &str, initial_price: f64, min_price: f64, delivery: u32) -> SellerProfile {
    SellerProfile {
        id: id.to_string(),
        initial_offer: InitialOffer {
            price: initial_price,
            quality: QualityLevel::Standard,
            delivery,
        },
        min_price,
        min_delivery: 3,
        quality_levels: vec![QualityLevel::Economy, QualityLevel::Standard, QualityLevel::Premium],
        max_quality_cost: 0.8,
        delivery_capacity: 9.0,
    }
}

fn create_test_request() -> NegotiationRequest {
    NegotiationRequest::new(
        BuyerProfile::new(1000.0, QualityLevel::Premium, 5.0),
        vec![
            create_seller("1", 1200.0, 800.0, 10),
            create_seller("2", 1100.0, 900.0, 8),
            create_seller("3", 1500.0, 700.0, 14),
        ],
        WeightConfig::default(),
    )
}

/// Small budgets keep the comparison quick.
fn create_test_config(seed: u64) -> ComparatorConfig {
    ComparatorConfig::new()
        .with_seed(seed)
        .with_mpso(MpsoConfig::new().with_max_iterations(15))
        .with_abc(AbcConfig::new().with_num_bees(8).with_max_iterations(15))
        .with_ga(GaConfig::new().with_population_size(12).with_generations(15))
}

/// Counts records without keeping them.
#[derive(Default)]
struct CountingObserver {
    evaluations: usize,
    runs: usize,
}

impl EvaluationObserver for CountingObserver {
    fn record(&mut self, record: &TraceRecord) {
        match record {
            TraceRecord::Evaluation(_) => self.evaluations += 1,
            TraceRecord::RunResult(_) => self.runs += 1,
        }
    }
}

#[test]
fn test_compare_report_structure() {
    let request = create_test_request();
    let comparator = AlgorithmComparator::new(create_test_config(42)).unwrap();
    let report = comparator.compare(&request, &mut NoopObserver).unwrap();

    assert_eq!(report.manufacturers.len(), 3);
    let ids: Vec<&str> = report.manufacturers.iter().map(|m| m.manufacturer_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);

    for (seller, comparison) in request.sellers.iter().zip(&report.manufacturers) {
        assert_eq!(comparison.per_algorithm.len(), 3);
        let model = FitnessModel::new(&request.buyer, seller, request.weights).unwrap();

        for algorithm in Algorithm::ALL {
            let result = &comparison.per_algorithm[&algorithm];
            assert_eq!(result.algorithm, algorithm);
            assert!(result.fitness >= 0.0);
            assert!(result.execution_time_secs >= 0.0);
            assert_eq!(comparison.comparison_metrics.fitness_by_algorithm[&algorithm], result.fitness);
            assert!(result.best_offer.price >= seller.min_price);
            assert!(result.best_offer.price <= seller.initial_offer.price);
            assert!(result.best_offer.delivery >= seller.min_delivery);
            assert!(result.best_offer.delivery <= seller.initial_offer.delivery);
            if algorithm != Algorithm::Mpso {
                assert_eq!(model.fitness(&result.best_offer), result.fitness);
            }
        }

        assert!(!comparison.pareto_front.is_empty());
        match &comparison.contribution_ranking {
            Some(ranking) => {
                assert!(comparison.pareto_front.len() >= 2);
                assert_eq!(ranking.len(), comparison.pareto_front.len());
            }
            None => assert_eq!(comparison.pareto_front.len(), 1),
        }
    }

    assert_eq!(report.pareto.metrics.len(), 3);
    assert_eq!(report.pareto.ranking.len(), 3);
    assert_eq!(report.pareto.reference_point.len(), 2);
    for metrics in report.pareto.metrics.values() {
        assert!(metrics.pareto_size >= 1 && metrics.pareto_size <= 3);
        assert!(metrics.hypervolume >= 0.0);
        assert!(metrics.igd >= 0.0);
        assert_eq!(metrics.hv_contributions.len(), metrics.pareto_size);
    }
}

#[test]
fn test_winner_has_highest_fitness() {
    let request = create_test_request();
    let comparator = AlgorithmComparator::new(create_test_config(7)).unwrap();
    let report = comparator.compare(&request, &mut NoopObserver).unwrap();

    for comparison in &report.manufacturers {
        let winner_fitness = comparison.per_algorithm[&comparison.winner].fitness;
        for (algorithm, result) in &comparison.per_algorithm {
            assert!(result.fitness <= winner_fitness);
            // Ties go to the algorithm that ran first.
            if result.fitness == winner_fitness {
                assert!(comparison.winner <= *algorithm);
            }
        }
        // Some algorithm with the top fitness is always on the front.
        assert!(comparison
            .pareto_front
            .iter()
            .any(|algorithm| comparison.per_algorithm[algorithm].fitness == winner_fitness));
    }
}

#[test]
fn test_same_seed_same_offers() {
    let request = create_test_request();
    let comparator = AlgorithmComparator::new(create_test_config(1234)).unwrap();

    let first = comparator.compare(&request, &mut NoopObserver).unwrap();
    let second = comparator.compare(&request, &mut NoopObserver).unwrap();

    for (a, b) in first.manufacturers.iter().zip(&second.manufacturers) {
        assert_eq!(a.winner, b.winner);
        for algorithm in Algorithm::ALL {
            let (ra, rb) = (&a.per_algorithm[&algorithm], &b.per_algorithm[&algorithm]);
            assert_eq!(ra.best_offer, rb.best_offer);
            assert_eq!(ra.fitness, rb.fitness);
            assert_eq!(ra.evaluations, rb.evaluations);
        }
    }
}

/// Run one optimizer for one seller outside the comparator, on the stream
/// the comparator assigns to that pair.
fn run_alone(
    config: &ComparatorConfig,
    request: &NegotiationRequest,
    index: usize,
    algorithm: Algorithm,
    observer: &mut dyn EvaluationObserver,
) -> OptimizationResult {
    let model = FitnessModel::new(&request.buyer, &request.sellers[index], request.weights).unwrap();
    let mut rng = run_rng(config.seed, index, algorithm);
    match algorithm {
        Algorithm::Mpso => Mpso::new(config.mpso.clone(), model).unwrap().run(&mut rng, observer),
        Algorithm::Abc => Abc::new(config.abc.clone(), model).unwrap().run(&mut rng, observer),
        Algorithm::Ga => Genetic::new(config.ga.clone(), model).unwrap().run(&mut rng, observer),
    }
}

#[test]
fn test_comparison_matches_one_run_at_a_time() {
    let request = create_test_request();
    let config = create_test_config(2024);
    let comparator = AlgorithmComparator::new(config.clone()).unwrap();
    let report = comparator.compare(&request, &mut NoopObserver).unwrap();

    for (index, comparison) in report.manufacturers.iter().enumerate() {
        for algorithm in Algorithm::ALL {
            let alone = run_alone(&config, &request, index, algorithm, &mut NoopObserver);
            let compared = &comparison.per_algorithm[&algorithm];
            assert_eq!(compared.best_offer, alone.best_offer, "seller {index} {algorithm:?}");
            assert_eq!(compared.fitness, alone.fitness, "seller {index} {algorithm:?}");
            assert_eq!(compared.evaluations, alone.evaluations);
            assert_eq!(compared.contributions, alone.contributions);
        }
    }
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_trace_matches_sequential_order() {
    let request = create_test_request();
    let config = create_test_config(77);
    let comparator = AlgorithmComparator::new(config.clone()).unwrap();

    let mut parallel = MemoryRecorder::new();
    comparator.compare(&request, &mut parallel).unwrap();

    // The same evaluations, one seller and one algorithm at a time.
    let mut sequential = MemoryRecorder::new();
    for index in 0..request.sellers.len() {
        for algorithm in Algorithm::ALL {
            run_alone(&config, &request, index, algorithm, &mut sequential);
        }
    }

    let key = |recorder: &MemoryRecorder| -> Vec<(String, Algorithm, f64)> {
        recorder
            .evaluations()
            .map(|e| (e.seller_id.clone(), e.algorithm, e.offer.price))
            .collect()
    };
    assert_eq!(key(&parallel), key(&sequential));

    // Repeated parallel runs replay identically.
    let mut again = MemoryRecorder::new();
    comparator.compare(&request, &mut again).unwrap();
    assert_eq!(key(&again), key(&parallel));
}

#[test]
fn test_run_single_matches_comparison() {
    let request = create_test_request();
    let comparator = AlgorithmComparator::new(create_test_config(99)).unwrap();

    let report = comparator.compare(&request, &mut NoopObserver).unwrap();
    let results = comparator.run_single(Algorithm::Abc, &request, &mut NoopObserver).unwrap();

    assert_eq!(results.len(), 3);
    for ((seller_id, result), comparison) in results.iter().zip(&report.manufacturers) {
        assert_eq!(seller_id, &comparison.manufacturer_id);
        assert_eq!(result.algorithm, Algorithm::Abc);
        // Each run owns its random stream, so running alone changes nothing.
        assert_eq!(result.best_offer, comparison.per_algorithm[&Algorithm::Abc].best_offer);
    }
}

#[test]
fn test_negotiate_ranks_sellers() {
    let request = create_test_request();
    let comparator = AlgorithmComparator::new(create_test_config(5)).unwrap();
    let outcome = comparator.negotiate(&request, &mut NoopObserver).unwrap();

    assert_eq!(outcome.all_results.len(), 3);
    assert_eq!(outcome.rejected.len(), 2);
    assert_eq!(outcome.recommended, outcome.all_results[0]);
    assert_eq!(outcome.rejected, outcome.all_results[1..].to_vec());

    for pair in outcome.all_results.windows(2) {
        assert!(pair[0].fitness >= pair[1].fitness);
    }
    for ranked in &outcome.all_results {
        assert!(!ranked.contributions.is_empty());
        let scaled = ranked.fitness * 1e4;
        assert!((scaled - scaled.round()).abs() < 1e-6);
    }
}

#[test]
fn test_trace_records_every_evaluation() {
    let request = create_test_request();
    let comparator = AlgorithmComparator::new(create_test_config(3)).unwrap();

    let mut recorder = MemoryRecorder::new();
    let report = comparator.compare(&request, &mut recorder).unwrap();

    let total: usize = report
        .manufacturers
        .iter()
        .flat_map(|m| m.per_algorithm.values())
        .map(|r| r.evaluations)
        .sum();
    assert_eq!(recorder.evaluations().count(), total);
    assert_eq!(recorder.runs().count(), 9);

    // Records arrive grouped by seller, then by algorithm.
    let order: Vec<(String, Algorithm)> = recorder
        .runs()
        .map(|run| (run.seller_id.clone(), run.algorithm))
        .collect();
    let expected: Vec<(String, Algorithm)> = ["1", "2", "3"]
        .iter()
        .flat_map(|id| Algorithm::ALL.iter().map(move |a| (id.to_string(), *a)))
        .collect();
    assert_eq!(order, expected);

    let mut counter = CountingObserver::default();
    comparator.compare(&request, &mut counter).unwrap();
    assert_eq!(counter.evaluations, total);
    assert_eq!(counter.runs, 9);
}

#[test]
fn test_invalid_input_fails_before_any_run() {
    let comparator = AlgorithmComparator::new(create_test_config(1)).unwrap();

    let mut request = create_test_request();
    request.sellers[2].delivery_capacity = 0.0;
    let mut recorder = MemoryRecorder::new();
    let err = comparator.compare(&request, &mut recorder).unwrap_err();
    assert!(matches!(err, NegotiationError::Configuration { .. }));
    assert_eq!(recorder.evaluations().count(), 0);

    let mut request = create_test_request();
    request.weights = WeightConfig::new(-1.0, 0.5);
    assert!(matches!(
        comparator.negotiate(&request, &mut recorder),
        Err(NegotiationError::InputValidation { .. })
    ));

    let mut request = create_test_request();
    request.sellers.clear();
    assert!(matches!(
        comparator.run_single(Algorithm::Ga, &request, &mut recorder),
        Err(NegotiationError::InputValidation { .. })
    ));
    assert!(recorder.records.is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = create_test_config(1).with_ga(GaConfig::new().with_population_size(2));
    assert!(matches!(
        AlgorithmComparator::new(config),
        Err(NegotiationError::Configuration { .. })
    ));

    let config = create_test_config(1).with_reference_point([f64::NAN, 1.0]);
    assert!(AlgorithmComparator::new(config).is_err());
}

#[test]
fn test_unreachable_reference_point_is_degenerate() {
    let request = create_test_request();
    // Fitness above 10 and negative time cannot be dominated by any run.
    let config = create_test_config(1).with_reference_point([10.0, -1.0]);
    let comparator = AlgorithmComparator::new(config).unwrap();
    assert!(matches!(
        comparator.compare(&request, &mut NoopObserver),
        Err(NegotiationError::NumericDegeneracy { .. })
    ));
}

#[test]
fn test_report_serializes_with_algorithm_names() {
    let request = create_test_request();
    let comparator = AlgorithmComparator::new(create_test_config(11)).unwrap();
    let report = comparator.compare(&request, &mut NoopObserver).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    let first = &json["manufacturers"][0];
    assert_eq!(first["manufacturerId"], "1");
    assert!(first["perAlgorithm"]["MPSO"]["bestOffer"].is_object());
    assert!(first["perAlgorithm"]["ABC-MNG"]["fitness"].is_number());
    assert!(json["pareto"]["metrics"]["GA-HV"]["hypervolume"].is_number());

    // Per-algorithm timings go out as `executionTime`, in seconds.
    let mpso = &first["perAlgorithm"]["MPSO"];
    let seconds = report.manufacturers[0].per_algorithm[&Algorithm::Mpso].execution_time_secs;
    assert!((mpso["executionTime"].as_f64().unwrap() - seconds).abs() < 1e-12);
    assert!(mpso.get("executionTimeSecs").is_none());

    // Older field names are still read back.
    let mut legacy = mpso.clone();
    let value = legacy.as_object_mut().unwrap().remove("executionTime").unwrap();
    legacy["executionTimeSeconds"] = value;
    let parsed: OptimizationResult = serde_json::from_value(legacy).unwrap();
    assert_eq!(parsed.algorithm, Algorithm::Mpso);
    assert!((parsed.execution_time_secs - seconds).abs() < 1e-12);
}
