//! Tempo demo - drives the synthetic vitals engine under a jittery frame
//! clock and logs a summary once per simulated second.

use std::path::PathBuf;

use clap::Parser;
use tempo::engine::DeterministicRng;
use tempo::{
    Driver, DriverConfig, InitialState, SerializationFormat, SyntheticVitalsEngine, TempoError,
    TempoResult, VitalsBaseline,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tempo")]
#[command(about = "Run the synthetic vitals engine through the fixed-timestep driver")]
struct Cli {
    /// Requested simulation timestep in seconds
    #[arg(long, default_value = "0.02")]
    timestep: f64,

    /// External seconds to run for
    #[arg(long, default_value = "5.0")]
    duration: f64,

    /// Nominal host frame rate in Hz
    #[arg(long, default_value = "60.0")]
    frame_rate: f64,

    /// Relative jitter applied to every frame interval (0 = steady)
    #[arg(long, default_value = "0.3")]
    jitter: f64,

    /// Probability that a single engine step fails
    #[arg(long, default_value = "0.0")]
    failure_rate: f64,

    /// Seed for the engine and the frame jitter
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Upper bound on steps per frame
    #[arg(long)]
    max_catch_up: Option<u64>,

    /// Initial state file (.json or .pbb); defaults to a resting baseline
    #[arg(long)]
    state: Option<PathBuf>,

    /// Driver configuration file (JSON); replaces --timestep and --max-catch-up
    #[cfg(feature = "serialize")]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the final frame's samples as JSON to this path
    #[cfg(feature = "serialize")]
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tempo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> TempoResult<DriverConfig> {
    #[cfg(feature = "serialize")]
    {
        if let Some(path) = &cli.config {
            info!("Loading configuration from: {}", path.display());
            return DriverConfig::from_json_file(path);
        }
    }

    DriverConfig::builder()
        .timestep(cli.timestep)
        .max_catch_up(cli.max_catch_up)
        .build()
}

fn load_state(cli: &Cli) -> TempoResult<InitialState> {
    match &cli.state {
        Some(path) => {
            info!("Loading initial state from: {}", path.display());
            InitialState::from_file(path, None).map_err(|source| {
                TempoError::InitializationFailed {
                    format: SerializationFormat::from_extension(path).unwrap_or_default(),
                    source,
                }
            })
        }
        None => Ok(InitialState::from_bytes(
            VitalsBaseline::default().to_bytes(),
            SerializationFormat::Binary,
        )),
    }
}

fn run(cli: &Cli) -> TempoResult<()> {
    let config = load_config(cli)?;
    let state = load_state(cli)?;

    let mut driver = Driver::new(config);
    driver.setup()?;

    let engine = SyntheticVitalsEngine::new(cli.seed).with_failure_rate(cli.failure_rate);
    driver.start(engine, &state, 0.0)?;

    let heart_rate = driver.schema().index_of("Heart Rate (1/min)");
    let temperature = driver.schema().index_of("Core Temperature (degC)");

    let mut frames = DeterministicRng::new(cli.seed ^ 0x5eed);
    let nominal = 1.0 / cli.frame_rate.max(1.0);
    let mut external_now = 0.0;
    let mut next_summary = 1.0;

    while external_now < cli.duration {
        external_now += (nominal * (1.0 + frames.jitter(cli.jitter.clamp(0.0, 0.9)))).max(0.0);
        let report = driver.on_frame(external_now)?;

        if external_now >= next_summary {
            next_summary += 1.0;
            let last = driver.buffer().and_then(|b| b.last());
            let pick = |channel: Option<usize>| {
                channel
                    .zip(last.as_ref())
                    .map_or(f64::NAN, |(c, (_, values))| values[c])
            };
            info!(
                external = format_args!("{:.3}", external_now),
                simulation = format_args!("{:.3}", report.simulation_time),
                steps = report.executed,
                heart_rate = format_args!("{:.1}", pick(heart_rate)),
                temperature = format_args!("{:.2}", pick(temperature)),
                "summary"
            );
        }
    }

    #[cfg(feature = "serialize")]
    {
        if let Some((path, snapshot)) = cli.export.as_ref().zip(driver.snapshot()) {
            std::fs::write(path, snapshot.to_json())
                .map_err(|e| TempoError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
            info!("Wrote {} samples to {}", snapshot.len(), path.display());
        }
    }

    let stats = driver.stats();
    driver.stop()?;
    info!(
        frames = stats.ticks,
        steps = stats.steps,
        failed = stats.failed_steps,
        samples = stats.samples,
        capped = stats.capped_ticks,
        "done"
    );
    Ok(())
}
