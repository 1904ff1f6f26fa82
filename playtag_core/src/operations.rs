//! Capture and release operations.
//!
//! Each operation is one complete transition of the [`Game`]: it runs while
//! the caller holds the game lock, mutates flags and capture buckets together,
//! and reports to the metrics sink before returning, so no other agent can
//! observe a half-applied capture or release.

use crate::game_state::Game;
use crate::metrics::MetricsSink;

use playtag_env::PlayerId;
use thiserror::Error;
use tracing::debug;

/// A transition was requested whose preconditions do not hold.
/// The game is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("player {0} is captured and cannot act")]
    Captured(PlayerId),

    #[error("player {0} cannot hunt from inside base")]
    InBase(PlayerId),

    #[error("player {target} is not a valid target for player {hunter}")]
    IneligibleTarget { hunter: PlayerId, target: PlayerId },
}

impl Game {
    /// Reports the starting in-base population to the sink.
    pub fn publish_initial_gauges(&self, sink: &dyn MetricsSink) {
        for player in self.players().iter().filter(|p| p.is_in_base()) {
            sink.in_base_changed(self.team_name(player.team()), player.id(), 1);
        }
    }

    /// Moves a free player into base. Returns false if it already was there.
    pub fn enter_base(
        &mut self,
        id: PlayerId,
        sink: &dyn MetricsSink,
    ) -> Result<bool, OperationError> {
        let player = self.player_mut(id).ok_or(OperationError::UnknownPlayer(id))?;
        if player.hunted {
            return Err(OperationError::Captured(id));
        }
        if player.in_base {
            return Ok(false);
        }
        player.in_base = true;
        let team = player.team();

        debug!("Player {} from team {} returns to base", id, self.team_name(team));
        sink.in_base_changed(self.team_name(team), id, 1);
        Ok(true)
    }

    /// Moves a player out of base. Returns false if it was not in base.
    pub fn leave_base(
        &mut self,
        id: PlayerId,
        sink: &dyn MetricsSink,
    ) -> Result<bool, OperationError> {
        let player = self.player_mut(id).ok_or(OperationError::UnknownPlayer(id))?;
        if !player.in_base {
            return Ok(false);
        }
        player.in_base = false;
        let team = player.team();

        debug!("Player {} from team {} leaves base", id, self.team_name(team));
        sink.in_base_changed(self.team_name(team), id, -1);
        Ok(true)
    }

    /// `hunter` captures `target`: the target is flagged hunted and appended
    /// to the bucket of the hunter's team.
    pub fn hunt(
        &mut self,
        hunter: PlayerId,
        target: PlayerId,
        sink: &dyn MetricsSink,
    ) -> Result<(), OperationError> {
        let hunter_player = self.player(hunter).ok_or(OperationError::UnknownPlayer(hunter))?;
        if hunter_player.is_hunted() {
            return Err(OperationError::Captured(hunter));
        }
        if hunter_player.is_in_base() {
            return Err(OperationError::InBase(hunter));
        }
        let hunter_team = hunter_player.team();

        let target_player = self.player(target).ok_or(OperationError::UnknownPlayer(target))?;
        let eligible = target_player.team() == self.topology().prey(hunter_team)
            && !target_player.is_hunted()
            && !target_player.is_in_base();
        if !eligible {
            return Err(OperationError::IneligibleTarget { hunter, target });
        }
        let target_team = target_player.team();

        if let Some(player) = self.player_mut(target) {
            player.hunted = true;
        }
        self.bucket_mut(hunter_team).push(target);

        let team = self.team_name(target_team);
        debug!(
            "Player {} from team {} hunted player {} from team {}",
            hunter,
            self.team_name(hunter_team),
            target,
            team
        );
        sink.player_captured(team, target, hunter);
        sink.hunted_changed(team, 1);
        Ok(())
    }

    /// `rescuer` frees its teammates: every bucket whose team preys on the
    /// rescuer's team is emptied and its captives are released.
    ///
    /// In a valid topology exactly one bucket qualifies. Returns the released
    /// players in release order.
    pub fn rescue(
        &mut self,
        rescuer: PlayerId,
        sink: &dyn MetricsSink,
    ) -> Result<Vec<PlayerId>, OperationError> {
        let team = self
            .player(rescuer)
            .ok_or(OperationError::UnknownPlayer(rescuer))?
            .team();

        let holders: Vec<_> = self
            .topology()
            .teams()
            .filter(|&bucket| self.topology().prey(bucket) == team)
            .collect();

        let mut released = Vec::new();
        for bucket in holders {
            let captives = std::mem::take(self.bucket_mut(bucket));
            for captive in captives {
                let Some(player) = self.player_mut(captive) else {
                    continue;
                };
                player.hunted = false;
                let captive_team = player.team();

                let name = self.team_name(captive_team);
                debug!(
                    "Player {} rescued teammate {} from team {}",
                    rescuer,
                    captive,
                    self.team_name(bucket)
                );
                sink.player_rescued(self.team_name(team), rescuer);
                sink.hunted_changed(name, -1);
                released.push(captive);
            }
        }

        Ok(released)
    }

    /// `traitor` frees every enemy its own team holds and records one treason.
    ///
    /// Each freed enemy is credited with a rescue under its own team and id.
    /// Returns the released players in release order.
    pub fn betray(
        &mut self,
        traitor: PlayerId,
        sink: &dyn MetricsSink,
    ) -> Result<Vec<PlayerId>, OperationError> {
        let team = self
            .player(traitor)
            .ok_or(OperationError::UnknownPlayer(traitor))?
            .team();

        let captives = std::mem::take(self.bucket_mut(team));
        let mut released = Vec::with_capacity(captives.len());
        for enemy in captives {
            let Some(player) = self.player_mut(enemy) else {
                continue;
            };
            player.hunted = false;
            let enemy_team = player.team();

            let name = self.team_name(enemy_team);
            debug!(
                "Player {} commits treason and frees {} from team {}!!!",
                traitor, enemy, name
            );
            sink.player_rescued(name, enemy);
            sink.hunted_changed(name, -1);
            released.push(enemy);
        }

        sink.treason_committed(self.team_name(team), traitor);
        Ok(released)
    }
}
