//! Game configuration: population size, decision probabilities and pacing.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Where the post-capture pause is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HuntPause {
    /// The hunter pauses while still holding the game lock, so every other
    /// agent waits for the capture to finish.
    InsideLock,

    /// The pause is taken after the lock is released. Only throughput changes.
    AfterRelease,
}

impl HuntPause {
    /// Returns the CLI spelling.
    pub fn name(&self) -> &'static str {
        match self {
            HuntPause::InsideLock => "inside-lock",
            HuntPause::AfterRelease => "after-release",
        }
    }
}

impl std::fmt::Display for HuntPause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for HuntPause {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inside-lock" | "inside_lock" | "inside" => Ok(HuntPause::InsideLock),
            "after-release" | "after_release" | "after" => Ok(HuntPause::AfterRelease),
            _ => Err(format!("Unknown hunt pause mode: {}", s)),
        }
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("the game needs at least one player")]
    NoPlayers,

    #[error("{name} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },
}

/// Configuration shared by every player agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Number of players, assigned round-robin over the teams (default: 120)
    pub num_players: usize,

    /// Chance that a free player with a target attempts the hunt (default: 0.5)
    pub hunt_chance: f64,

    /// Chance that a free player attempts a rescue (default: 0.01)
    pub rescue_chance: f64,

    /// Chance to enter or leave base, drawn independently each way (default: 0.2)
    pub base_chance: f64,

    /// Upper bound (exclusive) of every randomized pause, in ms (default: 500)
    pub max_pause_ms: u64,

    /// Where the post-capture pause happens (default: inside the lock)
    pub hunt_pause: HuntPause,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            num_players: 120,
            hunt_chance: 0.5,
            rescue_chance: 0.01,
            base_chance: 0.2,
            max_pause_ms: 500,
            hunt_pause: HuntPause::InsideLock,
        }
    }
}

impl GameConfig {
    /// Sets the number of players.
    pub fn with_players(mut self, num_players: usize) -> Self {
        self.num_players = num_players;
        self
    }

    /// Sets the maximum pause.
    pub fn with_max_pause_ms(mut self, max_pause_ms: u64) -> Self {
        self.max_pause_ms = max_pause_ms;
        self
    }

    /// Sets the hunt pause placement.
    pub fn with_hunt_pause(mut self, hunt_pause: HuntPause) -> Self {
        self.hunt_pause = hunt_pause;
        self
    }

    /// Overrides the three decision probabilities.
    pub fn with_chances(mut self, hunt: f64, rescue: f64, base: f64) -> Self {
        self.hunt_chance = hunt;
        self.rescue_chance = rescue;
        self.base_chance = base;
        self
    }

    /// Checks the configuration before any agent starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_players == 0 {
            return Err(ConfigError::NoPlayers);
        }
        for (name, value) in [
            ("hunt_chance", self.hunt_chance),
            ("rescue_chance", self.rescue_chance),
            ("base_chance", self.base_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { name, value });
            }
        }
        Ok(())
    }

    /// Upper bound of a randomized pause as a `Duration`.
    pub fn max_pause(&self) -> Duration {
        Duration::from_millis(self.max_pause_ms)
    }
}
