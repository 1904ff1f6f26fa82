//! Game State - roster, capture pool and the single coordinating lock.
//!
//! [`Game`] is the plain mutable record. It is only reachable by agents
//! through [`SharedGame`], which wraps it in one async mutex: every read used
//! for a decision and every mutation of the `hunted`/`in_base` flags or the
//! capture pool happens while that lock is held.
//!
//! An async mutex is used because a hunter may pause while holding the lock
//! (see [`HuntPause::InsideLock`](crate::config::HuntPause::InsideLock)).

use crate::topology::Topology;

use playtag_env::{PlayerId, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

/// Derived per-player state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    /// Outside base and not captured: can act and can be targeted
    Free,
    /// Safe in base: cannot be targeted, cannot act offensively
    InBase,
    /// Captured by an enemy team: does nothing until released
    Hunted,
}

/// One player of the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    id: PlayerId,
    team: TeamId,
    pub(crate) hunted: bool,
    pub(crate) in_base: bool,
}

impl Player {
    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn team(&self) -> TeamId {
        self.team
    }

    pub fn is_hunted(&self) -> bool {
        self.hunted
    }

    pub fn is_in_base(&self) -> bool {
        self.in_base
    }

    /// Free, in base, or hunted.
    pub fn state(&self) -> PlayerState {
        if self.hunted {
            PlayerState::Hunted
        } else if self.in_base {
            PlayerState::InBase
        } else {
            PlayerState::Free
        }
    }
}

/// Where players are placed when the roster is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spawn {
    /// Everybody starts in base (the normal start)
    InBase,
    /// Everybody starts outside, visible
    InField,
}

/// A bookkeeping inconsistency found by [`Game::audit`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("player {0} is marked hunted but no team holds it")]
    HuntedButNotHeld(PlayerId),

    #[error("player {0} is held by team {1} but not marked hunted")]
    HeldButNotHunted(PlayerId, String),

    #[error("player {0} is held {1} times")]
    HeldMoreThanOnce(PlayerId, usize),

    #[error("player {0} is in base while held by team {1}")]
    HeldInBase(PlayerId, String),

    #[error("player {player} of team {team} is held by {holder}, which does not hunt that team")]
    WrongHolder {
        player: PlayerId,
        team: String,
        holder: String,
    },

    #[error("capture pool references unknown player {0}")]
    UnknownCaptive(PlayerId),
}

/// The shared game record: roster plus one capture bucket per team.
#[derive(Debug, Clone)]
pub struct Game {
    topology: Arc<Topology>,

    /// Roster, ascending by id; player `n` lives at index `n - 1`
    players: Vec<Player>,

    /// `capture_pool[t]` = players currently held by members of team `t`
    capture_pool: Vec<Vec<PlayerId>>,
}

impl Game {
    /// Creates `num_players` players (ids `1..=num_players`), assigned to
    /// teams round-robin in topology order, with empty capture buckets.
    pub fn new(topology: Arc<Topology>, num_players: usize, spawn: Spawn) -> Self {
        let teams = topology.len();
        let players = (0..num_players)
            .map(|i| Player {
                id: PlayerId(i as u32 + 1),
                team: TeamId(i % teams),
                hunted: false,
                in_base: spawn == Spawn::InBase,
            })
            .collect();

        Self {
            capture_pool: vec![Vec::new(); teams],
            topology,
            players,
        }
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    /// The roster in ascending id order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.index_of(id).map(|i| &self.players[i])
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        let index = self.index_of(id)?;
        Some(&mut self.players[index])
    }

    fn index_of(&self, id: PlayerId) -> Option<usize> {
        let index = (id.0 as usize).checked_sub(1)?;
        (index < self.players.len()).then_some(index)
    }

    /// Players currently held by members of `team`, in capture order.
    pub fn captives_of(&self, team: TeamId) -> &[PlayerId] {
        &self.capture_pool[team.0]
    }

    pub(crate) fn bucket_mut(&mut self, team: TeamId) -> &mut Vec<PlayerId> {
        &mut self.capture_pool[team.0]
    }

    /// Team name for labels and logs.
    pub fn team_name(&self, team: TeamId) -> &str {
        self.topology.name(team)
    }

    /// The other members of `id`'s team.
    pub fn teammates(&self, id: PlayerId) -> impl Iterator<Item = &Player> + '_ {
        let team = self.player(id).map(Player::team);
        self.players
            .iter()
            .filter(move |p| Some(p.team) == team && p.id != id)
    }

    /// Number of members of `team` in each state.
    pub fn census(&self, team: TeamId) -> TeamCensus {
        let mut census = TeamCensus::default();
        for player in self.players.iter().filter(|p| p.team == team) {
            match player.state() {
                PlayerState::Free => census.free += 1,
                PlayerState::InBase => census.in_base += 1,
                PlayerState::Hunted => census.hunted += 1,
            }
        }
        census
    }

    /// Checks the capture bookkeeping:
    ///
    /// - a player is hunted iff exactly one bucket holds it
    /// - no player in base is held
    /// - a bucket only holds members of its team's prey
    pub fn audit(&self) -> Result<(), InvariantViolation> {
        let mut holders: Vec<Vec<TeamId>> = vec![Vec::new(); self.players.len()];

        for team in self.topology.teams() {
            for &captive in self.captives_of(team) {
                let Some(index) = self.index_of(captive) else {
                    return Err(InvariantViolation::UnknownCaptive(captive));
                };
                holders[index].push(team);
            }
        }

        for (player, held_by) in self.players.iter().zip(&holders) {
            match (player.hunted, held_by.as_slice()) {
                (true, []) => return Err(InvariantViolation::HuntedButNotHeld(player.id)),
                (false, [holder, ..]) => {
                    return Err(InvariantViolation::HeldButNotHunted(
                        player.id,
                        self.team_name(*holder).to_string(),
                    ))
                }
                (_, [holder]) => {
                    if player.in_base {
                        return Err(InvariantViolation::HeldInBase(
                            player.id,
                            self.team_name(*holder).to_string(),
                        ));
                    }
                    if self.topology.prey(*holder) != player.team {
                        return Err(InvariantViolation::WrongHolder {
                            player: player.id,
                            team: self.team_name(player.team).to_string(),
                            holder: self.team_name(*holder).to_string(),
                        });
                    }
                }
                (_, []) => {}
                (_, many) => {
                    return Err(InvariantViolation::HeldMoreThanOnce(player.id, many.len()))
                }
            }
        }

        Ok(())
    }

    /// Serializable copy of the current state.
    pub fn snapshot(&self) -> GameSnapshot {
        let players = self
            .players
            .iter()
            .map(|p| PlayerSnapshot {
                id: p.id,
                team: self.team_name(p.team).to_string(),
                state: p.state(),
            })
            .collect();

        let capture_pool = self
            .topology
            .teams()
            .map(|t| (self.team_name(t).to_string(), self.captives_of(t).to_vec()))
            .collect();

        GameSnapshot {
            players,
            capture_pool,
        }
    }
}

/// Head count of one team by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCensus {
    pub free: usize,
    pub in_base: usize,
    pub hunted: usize,
}

/// One row of a [`GameSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub team: String,
    pub state: PlayerState,
}

/// Point-in-time copy of a [`Game`], keyed by team name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub players: Vec<PlayerSnapshot>,
    pub capture_pool: BTreeMap<String, Vec<PlayerId>>,
}

/// The lock-guarded game shared by every agent.
#[derive(Debug, Clone)]
pub struct SharedGame {
    topology: Arc<Topology>,
    inner: Arc<Mutex<Game>>,
}

impl SharedGame {
    pub fn new(game: Game) -> Self {
        Self {
            topology: game.topology().clone(),
            inner: Arc::new(Mutex::new(game)),
        }
    }

    /// The immutable topology, readable without the lock.
    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    /// Acquires the game lock. The lock is released when the guard drops.
    pub async fn lock(&self) -> MutexGuard<'_, Game> {
        self.inner.lock().await
    }

    /// Runs `f` with exclusive access to the game.
    pub async fn critical_section<R>(&self, f: impl FnOnce(&mut Game) -> R) -> R {
        let mut game = self.inner.lock().await;
        f(&mut game)
    }

    /// Audits the bookkeeping under the lock.
    pub async fn audit(&self) -> Result<(), InvariantViolation> {
        self.critical_section(|game| game.audit()).await
    }

    /// Takes a snapshot under the lock.
    pub async fn snapshot(&self) -> GameSnapshot {
        self.critical_section(|game| game.snapshot()).await
    }
}
