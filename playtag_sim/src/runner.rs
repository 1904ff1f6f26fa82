//! Scenario runner - plays a finite game under the virtual clock and checks
//! the bookkeeping while it runs.

use crate::context::SimContext;
use crate::exporter::SimExport;
use crate::scenarios::ScenarioId;
use crate::world::GameWorld;

use playtag_core::{GameConfig, HuntPause, InvariantViolation, RecordingSink, SharedGame};
use playtag_env::{GameContext, ShutdownSignal};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether every audit and gauge check passed
    pub passed: bool,

    /// Turns played across all agents
    pub total_turns: u64,

    /// Audits taken while the agents were playing
    pub audits: u64,

    /// Final virtual time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Full export of the finished game
    pub export: SimExport,
}

/// Runs scenarios with a fixed seed.
pub struct ScenarioRunner {
    seed: u64,
    players: Option<usize>,
    turns: Option<u64>,
    hunt_pause: Option<HuntPause>,
    max_pause_ms: u64,
}

impl ScenarioRunner {
    /// Creates a runner using each scenario's own defaults.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            players: None,
            turns: None,
            hunt_pause: None,
            max_pause_ms: GameConfig::default().max_pause_ms,
        }
    }

    /// Overrides the number of players.
    pub fn with_players(mut self, players: usize) -> Self {
        self.players = Some(players);
        self
    }

    /// Overrides the turns per agent.
    pub fn with_turns(mut self, turns: u64) -> Self {
        self.turns = Some(turns);
        self
    }

    /// Overrides the hunt pause placement.
    pub fn with_hunt_pause(mut self, hunt_pause: HuntPause) -> Self {
        self.hunt_pause = Some(hunt_pause);
        self
    }

    /// Overrides the maximum pause.
    pub fn with_max_pause_ms(mut self, max_pause_ms: u64) -> Self {
        self.max_pause_ms = max_pause_ms;
        self
    }

    /// Runs a scenario on a fresh single-threaded runtime.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.run_async(scenario)),
            Err(e) => self.failed(scenario, format!("failed to build runtime: {}", e)),
        }
    }

    /// Runs a scenario on the current runtime.
    pub async fn run_async(&self, scenario: ScenarioId) -> ScenarioResult {
        let topology = match scenario.topology() {
            Ok(topology) => topology,
            Err(e) => return self.failed(scenario, e.to_string()),
        };
        let turns = self.turns.unwrap_or_else(|| scenario.turns());
        let config = GameConfig::default()
            .with_players(self.players.unwrap_or_else(|| scenario.players()))
            .with_hunt_pause(self.hunt_pause.unwrap_or_else(|| scenario.hunt_pause()))
            .with_max_pause_ms(self.max_pause_ms);

        info!(
            "Running {} (seed={}): {} players x {} turns, hunt pause {}",
            scenario, self.seed, config.num_players, turns, config.hunt_pause
        );

        let context = SimContext::shared(self.seed);
        let sink = Arc::new(RecordingSink::tallies_only());
        let mut world = match GameWorld::new(topology, config, context.clone(), sink.clone()) {
            Ok(world) => world,
            Err(e) => return self.failed(scenario, e.to_string()),
        };

        let auditor_stop = ShutdownSignal::new();
        let auditor = context.spawn(
            "auditor",
            audit_until_stopped(world.game().clone(), auditor_stop.clone()),
        );

        world.spawn_agents(Some(turns));
        let joined = world.join().await;

        auditor_stop.trigger();
        let audited = auditor.await;

        let mut failures = Vec::new();
        let reports = match joined {
            Ok(reports) => reports,
            Err(e) => {
                failures.push(e.to_string());
                Vec::new()
            }
        };
        let audits = match audited {
            Ok(Ok(count)) => count,
            Ok(Err(violation)) => {
                failures.push(format!("mid-game audit: {}", violation));
                0
            }
            Err(e) => {
                failures.push(format!("auditor failed: {}", e));
                0
            }
        };

        let game = world.game().lock().await;
        if let Err(violation) = game.audit() {
            failures.push(format!("final audit: {}", violation));
        }

        let mut export = SimExport::new(scenario.name(), self.seed, game.topology());
        for team in game.topology().teams() {
            let name = game.team_name(team);
            let tally = sink.tally(name);
            let census = game.census(team);
            if tally.hunted_now != census.hunted as i64 {
                failures.push(format!(
                    "hunted gauge for {} is {}, census says {}",
                    name, tally.hunted_now, census.hunted
                ));
            }
            if tally.in_base_now != census.in_base as i64 {
                failures.push(format!(
                    "in-base gauge for {} is {}, census says {}",
                    name, tally.in_base_now, census.in_base
                ));
            }
            export.add_team(name, tally, census);
        }

        let total_turns = reports.iter().map(|r| r.turns).sum();
        let final_time_secs = context.now().as_secs_f64();
        let failure_reason = (!failures.is_empty()).then(|| failures.join("; "));
        if let Some(reason) = &failure_reason {
            warn!("{} failed: {}", scenario, reason);
        }
        export.finalize(final_time_secs, reports, game.snapshot(), failure_reason.clone());

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failure_reason.is_none(),
            total_turns,
            audits,
            final_time_secs,
            failure_reason,
            export,
        }
    }

    fn failed(&self, scenario: ScenarioId, reason: String) -> ScenarioResult {
        warn!("{} could not run: {}", scenario, reason);
        let mut export = SimExport::new(scenario.name(), self.seed, "");
        export.failure_reason = Some(reason.clone());
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            total_turns: 0,
            audits: 0,
            final_time_secs: 0.0,
            failure_reason: Some(reason),
            export,
        }
    }
}

/// Audits the game over and over until `stop` fires. Returns the number of
/// audits taken.
async fn audit_until_stopped(
    game: SharedGame,
    stop: ShutdownSignal,
) -> Result<u64, InvariantViolation> {
    let mut audits = 0;
    while !stop.is_triggered() {
        game.audit().await?;
        audits += 1;
        tokio::task::yield_now().await;
    }
    debug!("Auditor finished after {} audits", audits);
    Ok(audits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_scenario_passes() {
        let result = ScenarioRunner::new(42)
            .with_players(30)
            .with_turns(50)
            .run(ScenarioId::Canonical);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.total_turns, 30 * 50);
        assert!(result.audits > 0);
        assert_eq!(result.export.agents.len(), 30);
        assert_eq!(result.export.teams.len(), 3);
    }

    #[test]
    fn test_stress_scenario_passes() {
        let result = ScenarioRunner::new(7)
            .with_players(120)
            .with_turns(30)
            .run(ScenarioId::Stress);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.export.teams.len(), 6);
    }

    #[test]
    fn test_virtual_time_moves() {
        let result = ScenarioRunner::new(3)
            .with_players(9)
            .with_turns(20)
            .run(ScenarioId::Canonical);

        assert!(result.passed);
        assert!(result.final_time_secs > 0.0);
    }

    #[test]
    fn test_invalid_player_count_fails_cleanly() {
        let result = ScenarioRunner::new(1)
            .with_players(0)
            .run(ScenarioId::Canonical);

        assert!(!result.passed);
        assert!(result.failure_reason.unwrap().contains("at least one player"));
    }
}
