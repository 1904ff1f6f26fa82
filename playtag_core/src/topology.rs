//! Team Topology - the fixed predator/prey relation between teams.
//!
//! Every team preys on exactly one other team and is hunted by exactly one
//! other team. The relation must be a permutation with no fixed points and no
//! 2-cycles; the canonical configuration is the rock-paper-scissors triangle
//!
//! ```text
//!   fox ──► chicken ──► snake
//!    ▲                    │
//!    └────────────────────┘
//! ```
//!
//! Malformed configurations are rejected at construction time, so a
//! [`Topology`] value is always valid.

use playtag_env::TeamId;
use std::collections::HashMap;
use thiserror::Error;

/// Reasons a topology declaration is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("topology declares no teams")]
    Empty,

    #[error("team '{0}' is declared more than once")]
    DuplicateTeam(String),

    #[error("team '{team}' preys on '{prey}', which has no entry of its own")]
    MissingEntry { team: String, prey: String },

    #[error("team '{0}' is its own prey")]
    SelfLoop(String),

    #[error("team '{prey}' is prey to both '{first}' and '{second}'")]
    SharedPrey {
        prey: String,
        first: String,
        second: String,
    },

    #[error("teams '{0}' and '{1}' prey on each other")]
    TwoCycle(String, String),
}

/// A validated hunt relation over a fixed set of teams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    names: Vec<String>,
    prey: Vec<TeamId>,
    hunter: Vec<TeamId>,
}

impl Topology {
    /// Builds a topology from `(team, prey)` name pairs.
    ///
    /// Team ids are assigned in declaration order.
    pub fn from_pairs<I, A, B>(pairs: I) -> Result<Self, TopologyError>
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(team, prey)| (team.into(), prey.into()))
            .collect();

        if pairs.is_empty() {
            return Err(TopologyError::Empty);
        }

        let mut index: HashMap<&str, TeamId> = HashMap::with_capacity(pairs.len());
        for (i, (team, _)) in pairs.iter().enumerate() {
            if index.insert(team.as_str(), TeamId(i)).is_some() {
                return Err(TopologyError::DuplicateTeam(team.clone()));
            }
        }

        let mut prey = Vec::with_capacity(pairs.len());
        for (team, target) in &pairs {
            let Some(&target_id) = index.get(target.as_str()) else {
                return Err(TopologyError::MissingEntry {
                    team: team.clone(),
                    prey: target.clone(),
                });
            };
            if team == target {
                return Err(TopologyError::SelfLoop(team.clone()));
            }
            prey.push(target_id);
        }

        let names: Vec<String> = pairs.into_iter().map(|(team, _)| team).collect();

        let mut hunter: Vec<Option<TeamId>> = vec![None; names.len()];
        for (i, target) in prey.iter().enumerate() {
            if let Some(first) = hunter[target.0] {
                return Err(TopologyError::SharedPrey {
                    prey: names[target.0].clone(),
                    first: names[first.0].clone(),
                    second: names[i].clone(),
                });
            }
            hunter[target.0] = Some(TeamId(i));
        }

        for (i, target) in prey.iter().enumerate() {
            if prey[target.0] == TeamId(i) && target.0 > i {
                return Err(TopologyError::TwoCycle(
                    names[i].clone(),
                    names[target.0].clone(),
                ));
            }
        }

        // n distinct prey over n teams: every slot is filled
        let hunter = hunter.into_iter().flatten().collect();

        Ok(Self {
            names,
            prey,
            hunter,
        })
    }

    /// The `fox → chicken → snake → fox` triangle.
    pub fn canonical() -> Self {
        Self {
            names: vec!["fox".into(), "chicken".into(), "snake".into()],
            prey: vec![TeamId(1), TeamId(2), TeamId(0)],
            hunter: vec![TeamId(2), TeamId(0), TeamId(1)],
        }
    }

    /// Parses a comma-separated list of `team>prey` declarations,
    /// e.g. `"fox>chicken,chicken>snake,snake>fox"`.
    pub fn parse(declaration: &str) -> Result<Self, TopologyError> {
        let pairs = declaration
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('>') {
                Some((team, prey)) => (team.trim().to_string(), prey.trim().to_string()),
                None => (entry.to_string(), String::new()),
            })
            .collect::<Vec<_>>();
        Self::from_pairs(pairs)
    }

    /// Number of teams.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a validated topology.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All team ids in declaration order.
    pub fn teams(&self) -> impl Iterator<Item = TeamId> + '_ {
        (0..self.names.len()).map(TeamId)
    }

    /// The team that `team` hunts.
    pub fn prey(&self, team: TeamId) -> TeamId {
        self.prey[team.0]
    }

    /// The team that hunts `team`.
    pub fn hunter(&self, team: TeamId) -> TeamId {
        self.hunter[team.0]
    }

    /// Human-readable team name, used for labels and logs.
    pub fn name(&self, team: TeamId) -> &str {
        &self.names[team.0]
    }

    /// Looks a team up by name.
    pub fn lookup(&self, name: &str) -> Option<TeamId> {
        self.names.iter().position(|n| n == name).map(TeamId)
    }

    /// Cycle decomposition of the hunt relation, each cycle starting at its
    /// lowest team id.
    pub fn cycles(&self) -> Vec<Vec<TeamId>> {
        let mut seen = vec![false; self.len()];
        let mut cycles = Vec::new();
        for start in self.teams() {
            if seen[start.0] {
                continue;
            }
            let mut cycle = Vec::new();
            let mut current = start;
            while !seen[current.0] {
                seen[current.0] = true;
                cycle.push(current);
                current = self.prey(current);
            }
            cycles.push(cycle);
        }
        cycles
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::canonical()
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for team in self.teams() {
            if !first {
                write!(f, ",")?;
            }
            first = false;
            write!(f, "{}>{}", self.name(team), self.name(self.prey(team)))?;
        }
        Ok(())
    }
}
