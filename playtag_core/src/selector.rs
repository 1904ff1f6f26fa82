//! Target Selector - picks the enemy a player may hunt.

use crate::game_state::Game;
use playtag_env::PlayerId;

/// Returns the first player, in ascending id order, who belongs to the
/// hunter's prey team and is neither hunted nor in base.
///
/// Reads the `hunted`/`in_base` flags, so it must run under the game lock;
/// holding a `&Game` obtained from [`SharedGame`](crate::SharedGame) guarantees that.
pub fn find_target(game: &Game, hunter: PlayerId) -> Option<PlayerId> {
    let hunter = game.player(hunter)?;
    let prey = game.topology().prey(hunter.team());

    game.players()
        .iter()
        .find(|p| p.team() == prey && !p.is_hunted() && !p.is_in_base())
        .map(|p| p.id())
}
