//! Unit tests for the genetic operators of the GA optimizer.

use negotiation_engine::config::GaConfig;
use negotiation_engine::fitness::{FitnessModel, MemoryRecorder, NoopObserver};
use negotiation_engine::genetic::{Gene, Genetic, Scored};
use negotiation_engine::offer::QualityLevel;
use negotiation_engine::profile::{BuyerProfile, InitialOffer, SellerProfile, WeightConfig};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn create_test_buyer() -> BuyerProfile {
    BuyerProfile::new(4.5, QualityLevel::Premium, 7.0)
}

/// Prices between 3.5 and 5.0, delivery between 5 and 30 days, quality 60% to 100%.
fn create_test_seller() -> SellerProfile {
    SellerProfile {
        id: "acme".to_string(),
        initial_offer: InitialOffer {
            price: 5.0,
            quality: QualityLevel::Premium,
            delivery: 30,
        },
        min_price: 3.5,
        min_delivery: 5,
        quality_levels: vec![QualityLevel::Standard, QualityLevel::Premium],
        max_quality_cost: 0.9,
        delivery_capacity: 15.0,
    }
}

/// Every price this seller can offer lies above the 4.5 coupling threshold.
fn create_premium_seller() -> SellerProfile {
    SellerProfile {
        min_price: 4.6,
        ..create_test_seller()
    }
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

fn scored(fitness: f64, tag: f64) -> Scored {
    Scored {
        chromosome: [tag, 10.0, 80.0],
        fitness,
    }
}

#[test]
fn test_price_mutation_raises_quality() {
    let buyer = create_test_buyer();
    let seller = create_premium_seller();
    let model = FitnessModel::new(&buyer, &seller, WeightConfig::default()).unwrap();
    let genetic = Genetic::new(GaConfig::new(), model).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for _ in 0..50 {
        let mut chromosome = [4.8, 10.0, 90.0];
        genetic.mutate_gene(&mut chromosome, Gene::Price, &mut rng);
        assert!(chromosome[0] > 4.5);
        assert_eq!(chromosome[2], 95.0);
        assert_eq!(chromosome[1], 10.0);

        // Clamped to the upper quality bound.
        let mut chromosome = [4.8, 10.0, 98.0];
        genetic.mutate_gene(&mut chromosome, Gene::Price, &mut rng);
        assert_eq!(chromosome[2], 100.0);
    }
}

#[test]
fn test_price_coupling_threshold_is_strict() {
    let buyer = create_test_buyer();
    let seller = create_test_seller();
    let model = FitnessModel::new(&buyer, &seller, WeightConfig::default()).unwrap();
    let genetic = Genetic::new(GaConfig::new(), model).unwrap();

    let mut chromosome = [4.5, 10.0, 90.0];
    genetic.apply_coupling(&mut chromosome, Gene::Price);
    assert_eq!(chromosome, [4.5, 10.0, 90.0]);

    let mut chromosome = [4.51, 10.0, 90.0];
    genetic.apply_coupling(&mut chromosome, Gene::Price);
    assert_eq!(chromosome[2], 95.0);
}

#[test]
fn test_delivery_and_quality_couplings() {
    let buyer = create_test_buyer();
    let seller = create_test_seller();
    let model = FitnessModel::new(&buyer, &seller, WeightConfig::default()).unwrap();
    let genetic = Genetic::new(GaConfig::new(), model).unwrap();

    // Slow delivery discounts the price.
    let mut chromosome = [4.2, 25.0, 90.0];
    genetic.apply_coupling(&mut chromosome, Gene::Delivery);
    assert_close(chromosome[0], 3.7);

    let mut chromosome = [3.8, 25.0, 90.0];
    genetic.apply_coupling(&mut chromosome, Gene::Delivery);
    assert_close(chromosome[0], 3.5);

    let mut chromosome = [4.2, 20.0, 90.0];
    genetic.apply_coupling(&mut chromosome, Gene::Delivery);
    assert_close(chromosome[0], 4.2);

    // Low quality carries a surcharge.
    let mut chromosome = [4.0, 10.0, 80.0];
    genetic.apply_coupling(&mut chromosome, Gene::Quality);
    assert_close(chromosome[0], 4.3);

    let mut chromosome = [4.9, 10.0, 80.0];
    genetic.apply_coupling(&mut chromosome, Gene::Quality);
    assert_close(chromosome[0], 5.0);

    let mut chromosome = [4.0, 10.0, 85.0];
    genetic.apply_coupling(&mut chromosome, Gene::Quality);
    assert_close(chromosome[0], 4.0);
}

#[test]
fn test_selection_keeps_fitter_half() {
    let buyer = create_test_buyer();
    let seller = create_test_seller();
    let model = FitnessModel::new(&buyer, &seller, WeightConfig::default()).unwrap();
    let genetic = Genetic::new(GaConfig::new(), model).unwrap();

    let population = vec![
        scored(0.2, 1.0),
        scored(0.9, 2.0),
        scored(0.5, 3.0),
        scored(0.9, 4.0),
        scored(0.1, 5.0),
        scored(0.4, 6.0),
    ];
    let selected = genetic.select(population);

    assert_eq!(selected.len(), 3);
    let fitness: Vec<f64> = selected.iter().map(|s| s.fitness).collect();
    assert_eq!(fitness, vec![0.9, 0.9, 0.5]);
    // Ties keep their original order.
    assert_eq!(selected[0].chromosome[0], 2.0);
    assert_eq!(selected[1].chromosome[0], 4.0);
}

#[test]
fn test_crossover_takes_genes_from_parents() {
    let buyer = create_test_buyer();
    let seller = create_test_seller();
    let model = FitnessModel::new(&buyer, &seller, WeightConfig::default()).unwrap();
    let genetic = Genetic::new(GaConfig::new(), model).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let parent1 = [3.6, 6.0, 60.0];
    let parent2 = [4.9, 28.0, 100.0];
    let mut seen_mixed = false;

    for _ in 0..100 {
        let child = genetic.crossover(&parent1, &parent2, &mut rng);
        for i in 0..3 {
            assert!(child[i] == parent1[i] || child[i] == parent2[i]);
        }
        seen_mixed |= child != parent1 && child != parent2;
    }
    assert!(seen_mixed);
}

#[test]
fn test_mutation_rate_extremes() {
    let buyer = create_test_buyer();
    let seller = create_test_seller();
    let model = FitnessModel::new(&buyer, &seller, WeightConfig::default()).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let never = Genetic::new(GaConfig::new().with_mutation_rate(0.0), model.clone()).unwrap();
    let always = Genetic::new(GaConfig::new().with_mutation_rate(1.0), model).unwrap();

    for _ in 0..100 {
        let mut chromosome = [4.0, 10.0, 80.0];
        assert_eq!(never.mutate(&mut chromosome, &mut rng), None);
        assert_eq!(chromosome, [4.0, 10.0, 80.0]);

        assert!(always.mutate(&mut chromosome, &mut rng).is_some());
        assert!(always.space().contains(&always.offer_of(&chromosome)));
    }
}

#[test]
fn test_offspring_stay_in_bounds() {
    let buyer = create_test_buyer();
    let seller = create_test_seller();
    let model = FitnessModel::new(&buyer, &seller, WeightConfig::default()).unwrap();
    let genetic = Genetic::new(GaConfig::new().with_mutation_rate(0.8), model).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(19);

    let population = genetic.initialize(&mut rng);
    assert_eq!(population.len(), 25);

    let selected = genetic.select(genetic.evaluate(&population, &mut NoopObserver));
    let offspring = genetic.next_generation(&selected, &mut rng);
    assert_eq!(offspring.len(), 25);

    for chromosome in population.iter().chain(&offspring) {
        let [price, delivery, quality] = *chromosome;
        assert!((3.5..=5.0).contains(&price));
        assert!((5.0..=30.0).contains(&delivery));
        assert!((60.0..=100.0).contains(&quality));
        assert_eq!(delivery.fract(), 0.0);
    }
}

#[test]
fn test_run_returns_fittest_offer() {
    let buyer = create_test_buyer();
    let seller = create_test_seller();
    let model = FitnessModel::new(&buyer, &seller, WeightConfig::default()).unwrap();
    let genetic = Genetic::new(
        GaConfig::new().with_generations(20).with_record_history(true),
        model.clone(),
    )
    .unwrap();

    let mut recorder = MemoryRecorder::new();
    let result = genetic.run(&mut ChaCha8Rng::seed_from_u64(5), &mut recorder);

    assert_eq!(result.evaluations, 25 * 21);
    assert_eq!(recorder.evaluations().count(), result.evaluations);
    assert_eq!(model.fitness(&result.best_offer), result.fitness);
    assert!(genetic.space().contains(&result.best_offer));

    let history = result.round_history.unwrap();
    assert_eq!(history.len(), 20);
    assert!(history.iter().all(|round| round.candidates.len() == 25));
}

#[test]
fn test_run_is_reproducible() {
    let buyer = create_test_buyer();
    let seller = create_test_seller();
    let model = FitnessModel::new(&buyer, &seller, WeightConfig::default()).unwrap();
    let genetic = Genetic::new(GaConfig::new(), model).unwrap();

    let first = genetic.run(&mut ChaCha8Rng::seed_from_u64(123), &mut NoopObserver);
    let second = genetic.run(&mut ChaCha8Rng::seed_from_u64(123), &mut NoopObserver);
    assert_eq!(first.best_offer, second.best_offer);
    assert_eq!(first.fitness, second.fitness);
}

#[test]
fn test_invalid_config_is_rejected() {
    let buyer = create_test_buyer();
    let seller = create_test_seller();
    let model = FitnessModel::new(&buyer, &seller, WeightConfig::default()).unwrap();

    assert!(Genetic::new(GaConfig::new().with_population_size(3), model.clone()).is_err());
    assert!(Genetic::new(GaConfig::new().with_mutation_rate(1.5), model).is_err());
}
