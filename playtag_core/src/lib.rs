//! PlayTag Core - a concurrent predator/prey tag game
//!
//! Teams chase each other around a fixed hunt cycle (fox hunts chicken,
//! chicken hunts snake, snake hunts fox). Every player is an autonomous agent
//! and all agents share one game record:
//! 1. **Topology**: who hunts whom, validated at startup to be a permutation
//!    without fixed points or mutual pairs
//! 2. **Game State**: roster flags plus one capture bucket per team, guarded by
//!    a single lock
//! 3. **Operations**: hunt, rescue, betrayal and base moves, each one atomic
//!    transition reported to a [`MetricsSink`]
//! 4. **Agent Runtime**: the per-player decision loop

pub mod agent_runtime;
pub mod config;
pub mod game_state;
pub mod metrics;
pub mod operations;
pub mod selector;
pub mod topology;

// Re-export key types for convenience
pub use agent_runtime::{play_turn, AgentReport, Dice, PlayerAgent, TurnOutcome};
pub use config::{ConfigError, GameConfig, HuntPause};
pub use game_state::{
    Game, GameSnapshot, InvariantViolation, Player, PlayerSnapshot, PlayerState, SharedGame,
    Spawn, TeamCensus,
};
pub use metrics::{
    FanoutSink, MetricEvent, MetricsError, MetricsSink, NoopSink, PrometheusSink, RecordingSink,
    TeamTally,
};
pub use operations::OperationError;
pub use selector::find_target;
pub use topology::{Topology, TopologyError};
