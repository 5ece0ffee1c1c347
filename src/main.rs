//! Racer evolution CLI - Train car controllers from JSON configuration.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use racer_evolution::{
    compute::evolution::{Trainer, WeightMagnitude},
    schema::TrainingConfig,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [output.json]", args[0]);
        eprintln!();
        eprintln!("Train one controller population per car profile.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to training configuration file");
        eprintln!("  output.json  Where to write trained models (default: trained_models.json)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let output_path = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("trained_models.json"));

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: TrainingConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    let mut trainer = Trainer::from_config(&config).unwrap_or_else(|e| {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    });

    let evolution = &config.evolution;
    println!("Racer Evolution");
    println!("===============");
    println!("Topology: {:?}", evolution.topology.layer_sizes);
    println!("Lineage groups: {}", trainer.len());
    println!("Population: {}", evolution.population.size);
    println!("Generations: {}", evolution.population.max_generations);
    println!();

    println!("Training...");
    let start = Instant::now();
    let results = trainer.run(&WeightMagnitude).unwrap_or_else(|e| {
        eprintln!("Training failed: {}", e);
        std::process::exit(1);
    });
    let elapsed = start.elapsed();

    println!();
    for result in &results {
        println!(
            "  {}: {} generations, best={:.4}, final avg={:.4} ({:?})",
            result.group,
            result.stats.generations,
            result.stats.best_fitness,
            result.stats.final_avg_fitness,
            result.stats.stop_reason
        );
    }

    let total_evaluations: u64 = results.iter().map(|r| r.stats.total_evaluations).sum();
    println!();
    println!(
        "Time: {:.2}s ({:.1} evaluations/s)",
        elapsed.as_secs_f32(),
        total_evaluations as f32 / elapsed.as_secs_f32().max(f32::EPSILON)
    );

    let models = trainer.trained_models();
    if let Err(e) = models.save(&output_path) {
        eprintln!("Error writing {}: {}", output_path.display(), e);
        std::process::exit(1);
    }
    println!(
        "Saved {} trained models to {}",
        models.len(),
        output_path.display()
    );
}

fn print_example_config() {
    let config = TrainingConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            std::process::exit(1);
        }
    }
}
