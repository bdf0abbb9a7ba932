//! Trains a network to tell apart the quadrants of a noisy unit circle.

use anyhow::{Context, Result};
use clap::Parser;
use parallel_backprop::{
    arg_max, Activator, Checkpoint, LearningConfig, LearningEvent, LearningProcessManager,
    Network, PatternSet, StopCondition,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, Uniform};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file with the learning configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Layer sizes, starting with the input layer
    #[arg(short, long, value_delimiter = ',', default_value = "2,5,5,2")]
    topology: Vec<usize>,

    /// Number of training samples to generate
    #[arg(long, default_value_t = 10_000)]
    samples: usize,

    /// Number of check samples to generate
    #[arg(long, default_value_t = 1_000)]
    check_samples: usize,

    /// Seed for data generation and weight initialization
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Where to write the best checkpoint as JSON
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn generate_data<R: rand::Rng>(rng: &mut R, num_samples: usize) -> Result<PatternSet> {
    let radians = Uniform::new(0.0, 2.0 * std::f64::consts::PI);
    let noise = Normal::new(0.0, 0.1)?;

    let mut data = PatternSet::new();
    for _ in 0..num_samples {
        let theta = radians.sample(rng);
        let dx = noise.sample(rng);
        let dy = noise.sample(rng);
        let point = vec![theta.cos() + dx, theta.sin() + dy];
        let class = if point[0] * point[1] > 0.0 {
            vec![1.0, 0.0]
        } else {
            vec![0.0, 1.0]
        };
        data.push(point, class);
    }
    Ok(data)
}

fn score(set_name: &str, network: &Network, data: &PatternSet) -> Result<()> {
    use parallel_backprop::PatternSource;
    let mut num_correct = 0;
    for i in 0..data.len() {
        let pattern = data.pattern(i);
        let output = network.run(pattern.input)?;
        if arg_max(&output) == arg_max(pattern.target) {
            num_correct += 1;
        }
    }
    log::info!(
        "{} set results: {} of {} correct",
        set_name,
        num_correct,
        data.len()
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level),
    )
    .init();

    let config = match &args.config {
        Some(path) => LearningConfig::from_toml_file(path)?,
        None => LearningConfig {
            learning_rate: 0.3,
            stop_conditions: vec![
                StopCondition::IrreducibleError(0.001),
                StopCondition::MaxIterations(200),
            ],
            ..LearningConfig::default()
        },
    };

    let mut rng = StdRng::seed_from_u64(args.seed);
    let training_data = generate_data(&mut rng, args.samples)?;
    let check_data = generate_data(&mut rng, args.check_samples)?;

    let mut network = Network::with_topology(Activator::Sigmoid, &args.topology)?;
    network.initialize_weights(&mut rng);

    let best: Rc<RefCell<Option<(f64, Checkpoint)>>> = Rc::new(RefCell::new(None));
    let keep_best = best.clone();
    let outcome = LearningProcessManager::new(&mut network, &training_data, config)?
        .check_patterns(&check_data)
        .on_event(move |event, manager| {
            if let LearningEvent::PerformanceCalculated { performance } = *event {
                log::info!(
                    "Iteration {}: performance={:.4} error={:.6} rate={}",
                    manager.iteration(),
                    performance,
                    manager.total_error(),
                    manager.learning_rate()
                );
                let mut best = keep_best.borrow_mut();
                let improved = best.as_ref().map_or(true, |(p, _)| performance > *p);
                if improved {
                    *best = Some((performance, manager.network().checkpoint()));
                }
            }
        })
        .execute()?;
    log::info!("Training finished: {:?}", outcome);

    score("Training", &network, &training_data)?;
    score("Check", &network, &check_data)?;

    if let Some(path) = &args.checkpoint {
        let best = best.borrow();
        let checkpoint = match best.as_ref() {
            Some((performance, checkpoint)) => {
                log::info!("Saving checkpoint with performance {:.4}", performance);
                checkpoint.clone()
            }
            None => network.checkpoint(),
        };
        let json = serde_json::to_string_pretty(&checkpoint)?;
        fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}
