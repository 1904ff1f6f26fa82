//! GameWorld - builds the game and owns the running agents.

use playtag_core::{
    AgentReport, ConfigError, Game, GameConfig, InvariantViolation, MetricsSink, OperationError,
    PlayerAgent, SharedGame, Spawn, Topology,
};
use playtag_env::{EnvError, GameContext, PlayerId, ShutdownSignal};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors raised while building or draining a [`GameWorld`].
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("agent failed: {0}")]
    Agent(#[from] OperationError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// The game plus every agent playing it.
pub struct GameWorld<Ctx: GameContext> {
    /// Configuration shared by every agent
    pub config: GameConfig,

    /// Shared context (clock, RNG derivation)
    pub context: Arc<Ctx>,

    game: SharedGame,
    sink: Arc<dyn MetricsSink>,
    shutdown: ShutdownSignal,
    agents: Vec<(PlayerId, JoinHandle<Result<AgentReport, OperationError>>)>,
}

impl<Ctx: GameContext> GameWorld<Ctx> {
    /// Validates `config`, builds the roster with everybody in base and
    /// publishes the starting gauges to `sink`.
    pub fn new(
        topology: Topology,
        config: GameConfig,
        context: Arc<Ctx>,
        sink: Arc<dyn MetricsSink>,
    ) -> Result<Self, WorldError> {
        config.validate()?;

        let game = Game::new(Arc::new(topology), config.num_players, Spawn::InBase);
        game.publish_initial_gauges(sink.as_ref());

        info!(
            "Game ready: {} players, teams {}",
            config.num_players,
            game.topology()
        );

        Ok(Self {
            config,
            context,
            game: SharedGame::new(game),
            sink,
            shutdown: ShutdownSignal::new(),
            agents: Vec::new(),
        })
    }

    /// The lock-guarded game.
    pub fn game(&self) -> &SharedGame {
        &self.game
    }

    /// A handle that stops every agent when triggered.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Number of agents spawned and not yet joined.
    pub fn running_agents(&self) -> usize {
        self.agents.len()
    }

    /// Spawns one agent per player. Each stops on shutdown or, when given,
    /// after `max_turns` turns.
    pub fn spawn_agents(&mut self, max_turns: Option<u64>) {
        let ids: Vec<PlayerId> = (1..=self.config.num_players as u32).map(PlayerId).collect();

        for id in ids {
            let agent = PlayerAgent::new(
                id,
                self.game.clone(),
                self.context.clone(),
                self.config.clone(),
                self.sink.clone(),
            );
            let name = format!("player-{}", id);
            let handle = self
                .context
                .spawn(&name, agent.run(self.shutdown.listener(), max_turns));
            self.agents.push((id, handle));
        }

        debug!("Spawned {} agents", self.agents.len());
    }

    /// Asks every agent to stop after its current turn.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    /// Waits for every agent to finish and returns their reports in id order.
    ///
    /// The first failing agent stops the rest; every agent is still awaited
    /// and the first error is returned.
    pub async fn join(&mut self) -> Result<Vec<AgentReport>, WorldError> {
        let mut reports = Vec::with_capacity(self.agents.len());
        let mut first_error: Option<WorldError> = None;
        for (id, handle) in std::mem::take(&mut self.agents) {
            let result = match handle.await {
                Ok(Ok(report)) => Ok(report),
                Ok(Err(e)) => Err(WorldError::from(e)),
                Err(e) => Err(EnvError::task(format!("player-{}", id), e).into()),
            };
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    if first_error.is_none() {
                        warn!("Player {} failed, stopping the others: {}", id, e);
                        self.stop();
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }

    /// Stops every agent, waits for them, then audits the final state.
    pub async fn shutdown(&mut self) -> Result<Vec<AgentReport>, WorldError> {
        self.stop();
        let reports = self.join().await?;
        self.game.audit().await?;
        info!("All {} agents stopped", reports.len());
        Ok(reports)
    }
}
