//! Common identifier types shared by every PlayTag crate.

use serde::{Deserialize, Serialize};

/// Unique identifier for a player.
///
/// Ids are assigned once at startup, starting at 1, in roster order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// Returns the raw numeric id.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dense index of a team inside its topology.
///
/// Only meaningful together with the topology that issued it; the team's
/// human-readable name lives there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub usize);

impl TeamId {
    /// Returns the index as a `usize`.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "team#{}", self.0)
    }
}
