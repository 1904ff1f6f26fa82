//! PlayTag CLI
//!
//! Runs the live game with a Prometheus endpoint until Ctrl+C, or plays a
//! finite scenario under the virtual clock.

use anyhow::{bail, Context};
use clap::Parser;
use playtag_core::{FanoutSink, GameConfig, HuntPause, PrometheusSink, RecordingSink, Topology};
use playtag_env::{wait_for_termination, GameContext, ShutdownSignal, TokioContext};
use playtag_sim::scenarios::ScenarioId;
use playtag_sim::{endpoint, GameWorld, ScenarioResult, ScenarioRunner, SimExport};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// PlayTag: concurrent predator/prey tag
#[derive(Parser, Debug)]
#[command(name = "playtag")]
#[command(about = "Run the PlayTag game and expose its metrics", long_about = None)]
struct Args {
    /// Number of players (default: 120, or the scenario's own count)
    #[arg(short, long)]
    players: Option<usize>,

    /// Port of the /metrics endpoint
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Seed for the per-agent RNGs (0 = OS entropy; for scenarios, from time)
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Hunt relation as team>prey pairs
    #[arg(long, default_value = "fox>chicken,chicken>snake,snake>fox")]
    teams: String,

    /// Where hunters pause after a capture (inside-lock, after-release)
    #[arg(long, default_value = "inside-lock")]
    hunt_pause: HuntPause,

    /// Upper bound of every randomized pause, in milliseconds
    #[arg(long, default_value = "500")]
    max_pause_ms: u64,

    /// Run a finite scenario instead of the live game (canonical, stress, all)
    #[arg(short = 'S', long)]
    scenario: Option<String>,

    /// Turns per agent in scenario mode (default: the scenario's own)
    #[arg(long)]
    turns: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Write a JSON summary to this file when the game ends
    #[arg(long)]
    export: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("PlayTag v{}", env!("CARGO_PKG_VERSION"));
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    match &args.scenario {
        Some(name) => run_scenarios(&args, name),
        None => {
            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            runtime.block_on(run_live(&args))
        }
    }
}

/// Plays one or all scenarios and fails if any of them did.
fn run_scenarios(args: &Args, name: &str) -> anyhow::Result<()> {
    let scenarios: Vec<ScenarioId> = if name == "all" {
        ScenarioId::all()
    } else {
        vec![name.parse().map_err(anyhow::Error::msg)?]
    };

    if args.export.is_some() && scenarios.len() > 1 {
        bail!("--export only supports a single scenario, not 'all'");
    }

    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let mut runner = ScenarioRunner::new(seed)
        .with_hunt_pause(args.hunt_pause)
        .with_max_pause_ms(args.max_pause_ms);
    if let Some(players) = args.players {
        runner = runner.with_players(players);
    }
    if let Some(turns) = args.turns {
        runner = runner.with_turns(turns);
    }

    let results: Vec<ScenarioResult> = scenarios.iter().map(|s| runner.run(*s)).collect();

    for result in &results {
        if result.passed {
            info!(
                "✓ {} (seed={}) PASSED: {} turns, {} audits, {:.1}s virtual",
                result.scenario,
                result.seed,
                result.total_turns,
                result.audits,
                result.final_time_secs
            );
        } else {
            error!(
                "✗ {} (seed={}) FAILED: {}",
                result.scenario,
                result.seed,
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
        }
        result.export.log_summary();
    }

    if let (Some(path), Some(result)) = (&args.export, results.first()) {
        write_export(&result.export, path);
    }

    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        bail!("{}/{} scenario runs failed", failed, results.len());
    }
    info!("✅ All {} scenario runs passed!", results.len());
    Ok(())
}

/// Plays until SIGINT/SIGTERM while serving /metrics.
async fn run_live(args: &Args) -> anyhow::Result<()> {
    let topology = Topology::parse(&args.teams).context("invalid --teams")?;
    let config = GameConfig::default()
        .with_players(args.players.unwrap_or(GameConfig::default().num_players))
        .with_hunt_pause(args.hunt_pause)
        .with_max_pause_ms(args.max_pause_ms);

    let prometheus = Arc::new(PrometheusSink::new()?);
    let tallies = Arc::new(RecordingSink::tallies_only());
    let sink = Arc::new(
        FanoutSink::new()
            .with(prometheus.clone())
            .with(tallies.clone()),
    );

    // Bind before any agent starts: a busy port aborts startup
    let listener = endpoint::bind(SocketAddr::from(([0, 0, 0, 0], args.port))).await?;

    let context = TokioContext::shared(args.seed);
    let mut world = GameWorld::new(topology, config, context.clone(), sink)?;

    let server_stop = ShutdownSignal::new();
    let server = tokio::spawn(endpoint::serve(listener, prometheus, server_stop.listener()));

    world.spawn_agents(None);
    info!("Game started. Press Ctrl+C to stop.");

    let signal = wait_for_termination().await?;
    info!("Received {}, stopping players", signal);

    let outcome = world.shutdown().await;
    server_stop.trigger();
    server.await.context("metrics endpoint task failed")??;

    let game = world.game().lock().await;
    let mut export = SimExport::new("live", args.seed, game.topology());
    export.add_teams(&game, &tallies);
    let (reports, failure) = match outcome {
        Ok(reports) => (reports, None),
        Err(e) => (Vec::new(), Some(e.to_string())),
    };
    export.finalize(context.now().as_secs_f64(), reports, game.snapshot(), failure);

    info!("Game over!");
    export.log_summary();
    if let Some(path) = &args.export {
        write_export(&export, path);
    }

    if let Some(reason) = &export.failure_reason {
        bail!("game ended in an inconsistent state: {}", reason);
    }
    Ok(())
}

fn write_export(export: &SimExport, path: &str) {
    match export.write_to_file(path) {
        Ok(()) => info!("Exported summary to {}", path),
        Err(e) => warn!("Failed to write export to {}: {}", path, e),
    }
}
