//! Quick evolution performance test

use racer_evolution::{
    EvolutionConfig, EvolutionEngine, LineageGroup, Topology, Trainer,
    compute::evolution::WeightMagnitude,
    schema::{CarProfile, PopulationConfig},
};
use std::time::Instant;

fn main() {
    println!("=== Evolution Performance Test ===\n");

    // Test different topologies
    for sizes in [vec![5, 8, 4], vec![5, 16, 16, 4], vec![12, 32, 32, 4]] {
        println!("Topology: {:?}", sizes);

        let config = EvolutionConfig {
            topology: Topology::new(sizes),
            population: PopulationConfig {
                size: 40,
                max_generations: 50,
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        };

        let start = Instant::now();
        let mut engine = EvolutionEngine::new(config, LineageGroup::default()).unwrap();
        let result = engine.run(&WeightMagnitude).unwrap();
        let elapsed = start.elapsed();

        let total_evals = result.stats.total_evaluations;
        let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

        println!("  Generations:    {}", result.stats.generations);
        println!("  Evaluations:    {}", total_evals);
        println!("  Elapsed:        {:.2}s", elapsed.as_secs_f64());
        println!("  Evals/sec:      {:.1}", evals_per_sec);
        println!("  Best fitness:   {:.4}", result.stats.best_fitness);
        println!();
    }

    println!("=== Scalability Test (lineage groups) ===\n");

    // Test different numbers of parallel groups
    for groups in [1, 2, 4, 8] {
        let config = EvolutionConfig {
            population: PopulationConfig {
                size: 20,
                max_generations: 30,
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        };
        let profiles = vec![CarProfile::default(); groups];

        let start = Instant::now();
        let mut trainer = Trainer::new(config, profiles).unwrap();
        let results = trainer.run(&WeightMagnitude).unwrap();
        let elapsed = start.elapsed();

        let total_evals: u64 = results.iter().map(|r| r.stats.total_evaluations).sum();
        let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

        println!(
            "Groups {}: {} evals in {:.2}s ({:.1} evals/sec)",
            groups,
            total_evals,
            elapsed.as_secs_f64(),
            evals_per_sec
        );
    }
}
