use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use forage_core::config::SimConfig;
use forage_core::controller::{
    ConstantController, Controller, ElmanController, RandomTurnController,
};
use forage_core::simulation::Simulation;
use forage_io::{load_trajectory, read_json_file, EvaluationReport, TrajectoryLog};
use forage_lib::runner::{controller_input_size, evaluate, Estimator};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a controller over several seeded episodes
    Run(RunArgs),
    /// Summarise a saved trajectory
    Inspect {
        /// Trajectory file (.json.gz or .rkyv)
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Config file: sectioned `.toml` or flat `KEY=VALUE` lines
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of episodes
    #[arg(short, long, default_value_t = 10)]
    episodes: usize,

    /// First episode seed, defaults to the config seed
    #[arg(short, long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value = "random")]
    controller: ControllerKind,

    /// Action for the constant controller, spread for the random one
    #[arg(long, default_value_t = 0.5)]
    action: f64,

    /// JSON array of network parameters for the elman controller
    #[arg(long)]
    params: Option<PathBuf>,

    /// Hidden units for the elman controller
    #[arg(long, default_value_t = 8)]
    hidden: usize,

    #[arg(long, value_enum, default_value = "mean")]
    estimator: EstimatorArg,

    /// Write the first episode's trajectory here
    #[arg(long)]
    trajectory: Option<PathBuf>,

    /// Write an evaluation report here
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ControllerKind {
    Constant,
    Random,
    Elman,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EstimatorArg {
    Mean,
    Median,
}

impl From<EstimatorArg> for Estimator {
    fn from(e: EstimatorArg) -> Self {
        match e {
            EstimatorArg::Mean => Estimator::Mean,
            EstimatorArg::Median => Estimator::Median,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Command::Run(run) => execute_run(&run),
        Command::Inspect { path } => inspect(&path),
    }
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match std::env::var("RUST_LOG") {
        Ok(filter) => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::EnvFilter::new(filter))
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
        Err(_) => forage_core::init_logging(),
    }
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = if path.extension().and_then(|e| e.to_str()) == Some("toml") {
        SimConfig::from_toml(&content)?
    } else {
        SimConfig::parse_flat(&content)?
    };
    Ok(config)
}

fn execute_run(args: &RunArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let start_seed = args.seed.unwrap_or(config.episode.seed);
    tracing::info!(
        "Running {} {:?} episodes from seed {} ({:?} controller)",
        args.episodes,
        config.episode.sim_type,
        start_seed,
        args.controller
    );

    match args.controller {
        ControllerKind::Constant => {
            let action = args.action;
            run_with(args, &config, start_seed, "constant", |_| {
                ConstantController::new(action)
            })
        }
        ControllerKind::Random => {
            let spread = args.action;
            run_with(args, &config, start_seed, "random", |seed| {
                RandomTurnController::new(seed, spread)
            })
        }
        ControllerKind::Elman => {
            let input = controller_input_size(&config);
            let net = match &args.params {
                Some(path) => {
                    let params: Vec<f64> = read_json_file(path)?;
                    ElmanController::from_params(input, args.hidden, &params)?
                }
                None => {
                    tracing::warn!("No --params given, using a random network");
                    let mut rng = ChaCha8Rng::seed_from_u64(start_seed);
                    ElmanController::random(input, args.hidden, &mut rng)?
                }
            };
            run_with(args, &config, start_seed, "elman", |_| net.clone())
        }
    }
}

fn run_with<C, F>(
    args: &RunArgs,
    config: &SimConfig,
    start_seed: u64,
    label: &str,
    make_controller: F,
) -> Result<()>
where
    C: Controller,
    F: Fn(u64) -> C + Sync,
{
    let estimator = Estimator::from(args.estimator);
    let eval = evaluate(config, args.episodes, start_seed, estimator, &make_controller)?;

    for r in &eval.results {
        tracing::info!(
            "seed {:>4}: {:?} after {} ticks, collected {:.1}, fitness {:.2}",
            r.seed,
            r.termination,
            r.ticks_elapsed,
            r.total_collected,
            r.fitness()
        );
    }
    let summary = serde_json::json!({
        "controller": label,
        "sim_type": config.episode.sim_type,
        "episodes": eval.results.len(),
        "start_seed": start_seed,
        "estimator": estimator,
        "objective": eval.objective,
        "fitness": eval.fitness,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = &args.trajectory {
        let episode_config = config.with_seed(start_seed);
        let mut log = TrajectoryLog::new(&episode_config);
        let mut sim = Simulation::new(episode_config, make_controller(start_seed))?;
        sim.run(&mut log);
        log.save(path)?;
        tracing::info!("Trajectory written to {}", path.display());
    }

    if let Some(path) = &args.report {
        let report = EvaluationReport::new(config, label, estimator.name(), eval.fitness, eval.results)?;
        report.save(path)?;
        tracing::info!("Report written to {}", path.display());
    }
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let (meta, traj) = load_trajectory(path)?;
    if let Some(meta) = meta {
        println!(
            "{:?} run recorded {} (config {})",
            meta.sim_type,
            meta.recorded_at,
            &meta.config_fingerprint[..12.min(meta.config_fingerprint.len())]
        );
    }
    println!(
        "seed {}, arena {}x{}, {} ticks, {} patches",
        traj.seed,
        traj.width,
        traj.height,
        traj.tick_count(),
        traj.patches.len()
    );
    let agents = traj.frames.first().map(|f| f.agents.len()).unwrap_or(0);
    for id in 0..agents {
        let path = traj.agent_path(id);
        let length: f64 = path
            .windows(2)
            .map(|w| (w[1].0 - w[0].0).hypot(w[1].1 - w[0].1))
            .sum();
        let collected = traj
            .frames
            .last()
            .and_then(|f| f.agents.iter().find(|a| a.id == id))
            .map(|a| a.collected)
            .unwrap_or(0.0);
        println!("agent {id}: path length {length:.1}, collected {collected:.1}");
    }
    Ok(())
}
