//! Agent Runtime - one autonomous player driven by a [`GameContext`].
//!
//! Every player runs the same loop:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        PlayerAgent                           │
//! │                                                              │
//! │   lock ──► play_turn ──► (hunt pause) ──► unlock ──► sleep   │
//! │     ▲                                                  │     │
//! │     └──────────── shutdown? ◄──────────────────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`play_turn`] is the pure decision policy: it runs against a locked
//! [`Game`] with a source of random draws ([`Dice`]) and reports what happened
//! as [`TurnOutcome`]s. [`PlayerAgent`] wraps it with locking, pacing and
//! cancellation.
//!
//! # Usage
//!
//! ```ignore
//! use playtag_core::{GameConfig, PlayerAgent, SharedGame};
//! use playtag_env::{ShutdownSignal, TokioContext};
//!
//! let shutdown = ShutdownSignal::new();
//! let agent = PlayerAgent::new(PlayerId(1), game.clone(), ctx.clone(), config, sink.clone());
//! let report = agent.run(shutdown.listener(), None).await?;
//! ```

use crate::config::{GameConfig, HuntPause};
use crate::game_state::{Game, SharedGame};
use crate::metrics::MetricsSink;
use crate::operations::OperationError;
use crate::selector::find_target;

use playtag_env::{GameContext, PlayerId, ShutdownListener};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Source of the random draws a player makes.
pub trait Dice {
    /// Uniform draw in `[0, 1)`.
    fn roll(&mut self) -> f64;

    /// Uniform whole number of milliseconds in `[0, max_ms)`; 0 when `max_ms` is 0.
    fn pause_ms(&mut self, max_ms: u64) -> u64;
}

impl<R: Rng> Dice for R {
    fn roll(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn pause_ms(&mut self, max_ms: u64) -> u64 {
        if max_ms == 0 {
            0
        } else {
            self.gen_range(0..max_ms)
        }
    }
}

/// What a single step of a turn did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnOutcome {
    /// Left base; the player may act in the same turn
    LeftBase,
    /// Freed teammates held by the hunting team
    Rescued { released: Vec<PlayerId> },
    /// Went back to base
    EnteredBase,
    /// Captured an enemy
    Hunted { target: PlayerId },
    /// Had nothing to hunt and freed the enemies held by its own team
    Betrayed { released: Vec<PlayerId> },
    /// Nothing happened
    Idle,
    /// Currently captured; the turn is a no-op
    Captive,
}

/// Runs one turn of `me` against a locked game.
///
/// Returns one outcome, or two when the player left base and then acted.
/// Draws happen in a fixed order so a seeded [`Dice`] replays a game exactly:
/// leave-base, then rescue, enter-base, hunt.
pub fn play_turn<D: Dice + ?Sized>(
    game: &mut Game,
    me: PlayerId,
    config: &GameConfig,
    dice: &mut D,
    sink: &dyn MetricsSink,
) -> Result<Vec<TurnOutcome>, OperationError> {
    let player = game.player(me).ok_or(OperationError::UnknownPlayer(me))?;
    if player.is_hunted() {
        return Ok(vec![TurnOutcome::Captive]);
    }

    let mut outcomes = Vec::with_capacity(2);
    if player.is_in_base() {
        if dice.roll() < config.base_chance {
            game.leave_base(me, sink)?;
            outcomes.push(TurnOutcome::LeftBase);
        } else {
            return Ok(vec![TurnOutcome::Idle]);
        }
    }

    let target = find_target(game, me);

    let outcome = if dice.roll() < config.rescue_chance {
        let released = game.rescue(me, sink)?;
        debug!("Player {} attempted a rescue, released {:?}", me, released);
        TurnOutcome::Rescued { released }
    } else if dice.roll() < config.base_chance {
        game.enter_base(me, sink)?;
        TurnOutcome::EnteredBase
    } else if let Some(target) = target {
        if dice.roll() < config.hunt_chance {
            game.hunt(me, target, sink)?;
            TurnOutcome::Hunted { target }
        } else {
            TurnOutcome::Idle
        }
    } else {
        let released = game.betray(me, sink)?;
        TurnOutcome::Betrayed { released }
    };

    outcomes.push(outcome);
    Ok(outcomes)
}

/// Per-agent totals, returned when the agent stops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReport {
    pub id: PlayerId,
    /// Turns played
    pub turns: u64,
    /// Enemies captured
    pub captures: u64,
    /// Rescue attempts
    pub rescues: u64,
    /// Players freed by this agent's rescues
    pub released: u64,
    /// Treasons committed
    pub betrayals: u64,
    /// Turns spent captured
    pub captive_turns: u64,
}

impl AgentReport {
    fn record(&mut self, outcomes: &[TurnOutcome]) {
        self.turns += 1;
        for outcome in outcomes {
            match outcome {
                TurnOutcome::Hunted { .. } => self.captures += 1,
                TurnOutcome::Rescued { released } => {
                    self.rescues += 1;
                    self.released += released.len() as u64;
                }
                TurnOutcome::Betrayed { .. } => self.betrayals += 1,
                TurnOutcome::Captive => self.captive_turns += 1,
                TurnOutcome::LeftBase | TurnOutcome::EnteredBase | TurnOutcome::Idle => {}
            }
        }
    }
}

/// A player agent.
///
/// Generic over the context so the same agent runs under tokio in production
/// or under a virtual clock in simulation.
pub struct PlayerAgent<Ctx: GameContext> {
    id: PlayerId,
    game: SharedGame,
    context: Arc<Ctx>,
    config: GameConfig,
    sink: Arc<dyn MetricsSink>,
    rng: ChaCha8Rng,
    report: AgentReport,
}

impl<Ctx: GameContext> PlayerAgent<Ctx> {
    /// Creates the agent for player `id`. Its RNG stream is derived from the
    /// context seed and the player id.
    pub fn new(
        id: PlayerId,
        game: SharedGame,
        context: Arc<Ctx>,
        config: GameConfig,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        let rng = context.derive_rng(u64::from(id.get()));
        Self {
            id,
            game,
            context,
            config,
            sink,
            rng,
            report: AgentReport {
                id,
                ..AgentReport::default()
            },
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Totals so far.
    pub fn report(&self) -> &AgentReport {
        &self.report
    }

    /// Plays one turn under the game lock.
    ///
    /// After a capture the hunter pauses; with [`HuntPause::InsideLock`] the
    /// lock stays held during the pause.
    pub async fn turn(&mut self) -> Result<Vec<TurnOutcome>, OperationError> {
        let mut game = self.game.lock().await;
        let outcomes = play_turn(
            &mut game,
            self.id,
            &self.config,
            &mut self.rng,
            self.sink.as_ref(),
        )?;

        if outcomes.iter().any(|o| matches!(o, TurnOutcome::Hunted { .. })) {
            let pause = Duration::from_millis(self.rng.pause_ms(self.config.max_pause_ms));
            match self.config.hunt_pause {
                HuntPause::InsideLock => {
                    self.context.sleep(pause).await;
                    drop(game);
                }
                HuntPause::AfterRelease => {
                    drop(game);
                    self.context.sleep(pause).await;
                }
            }
        } else {
            drop(game);
        }

        self.report.record(&outcomes);
        Ok(outcomes)
    }

    /// Plays turns until shutdown is signalled or `max_turns` is reached.
    pub async fn run(
        mut self,
        mut shutdown: ShutdownListener,
        max_turns: Option<u64>,
    ) -> Result<AgentReport, OperationError> {
        debug!("Player {} joins the game", self.id);

        loop {
            if shutdown.is_triggered() {
                break;
            }
            if max_turns.is_some_and(|max| self.report.turns >= max) {
                break;
            }

            self.turn().await?;

            let rest = Duration::from_millis(self.rng.pause_ms(self.config.max_pause_ms));
            tokio::select! {
                _ = self.context.sleep(rest) => {}
                _ = shutdown.triggered() => break,
            }
        }

        debug!("Player {} stops after {} turns", self.id, self.report.turns);
        Ok(self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::Spawn;
    use crate::metrics::RecordingSink;
    use crate::topology::Topology;
    use async_trait::async_trait;
    use playtag_env::{ShutdownSignal, TokioContext};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Mutex;
    use tokio::task::JoinHandle;

    /// Replays a fixed list of draws.
    struct ScriptedDice {
        rolls: VecDeque<f64>,
    }

    impl ScriptedDice {
        fn new(rolls: &[f64]) -> Self {
            Self {
                rolls: rolls.iter().copied().collect(),
            }
        }
    }

    impl Dice for ScriptedDice {
        fn roll(&mut self) -> f64 {
            self.rolls.pop_front().expect("script ran out of draws")
        }

        fn pause_ms(&mut self, _max_ms: u64) -> u64 {
            0
        }
    }

    fn game(spawn: Spawn) -> Game {
        Game::new(Arc::new(Topology::canonical()), 3, spawn)
    }

    /// Tokio context whose `sleep` records whether the game lock was free.
    struct LockWatch {
        inner: TokioContext,
        game: SharedGame,
        free_during_sleep: Mutex<Vec<bool>>,
    }

    #[async_trait]
    impl GameContext for LockWatch {
        fn now(&self) -> Duration {
            self.inner.now()
        }

        async fn sleep(&self, duration: Duration) {
            let free = tokio::time::timeout(Duration::from_millis(20), self.game.lock())
                .await
                .is_ok();
            self.free_during_sleep.lock().unwrap().push(free);
            self.inner.sleep(duration).await;
        }

        fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<F::Output>
        where
            F: Future + Send + 'static,
            F::Output: Send + 'static,
        {
            self.inner.spawn(name, future)
        }

        fn derive_rng(&self, seed_extension: u64) -> ChaCha8Rng {
            self.inner.derive_rng(seed_extension)
        }

        fn seed(&self) -> u64 {
            self.inner.seed()
        }
    }

    /// Plays fox 1 until it captures, returning what the pause saw.
    async fn lock_state_during_hunt_pause(hunt_pause: HuntPause) -> Vec<bool> {
        let shared = SharedGame::new(game(Spawn::InField));
        let ctx = Arc::new(LockWatch {
            inner: TokioContext::seeded(17),
            game: shared.clone(),
            free_during_sleep: Mutex::new(Vec::new()),
        });
        let config = GameConfig::default()
            .with_chances(1.0, 0.0, 0.0)
            .with_max_pause_ms(0)
            .with_hunt_pause(hunt_pause);
        let mut agent = PlayerAgent::new(
            PlayerId(1),
            shared.clone(),
            ctx.clone(),
            config,
            Arc::new(RecordingSink::new()),
        );

        let mut hunted = false;
        for _ in 0..100 {
            let outcomes = agent.turn().await.unwrap();
            if outcomes
                .iter()
                .any(|o| matches!(o, TurnOutcome::Hunted { .. }))
            {
                hunted = true;
                break;
            }
        }
        assert!(hunted, "fox never captured");
        assert!(shared.lock().await.player(PlayerId(2)).unwrap().is_hunted());

        let seen = ctx.free_during_sleep.lock().unwrap().clone();
        seen
    }

    const STAY: f64 = 0.99;
    const GO: f64 = 0.0;

    #[test]
    fn test_in_base_player_stays_on_high_draw() {
        let mut game = game(Spawn::InBase);
        let sink = RecordingSink::new();
        let mut dice = ScriptedDice::new(&[STAY]);

        let outcomes = play_turn(
            &mut game,
            PlayerId(1),
            &GameConfig::default(),
            &mut dice,
            &sink,
        );
        assert_eq!(outcomes, Ok(vec![TurnOutcome::Idle]));
        assert!(game.player(PlayerId(1)).unwrap().is_in_base());
    }

    #[test]
    fn test_leaving_base_then_acting_in_same_turn() {
        let mut game = game(Spawn::InBase);
        game.leave_base(PlayerId(2), &RecordingSink::new()).unwrap();
        let sink = RecordingSink::new();
        // leave, skip rescue, skip base, hunt
        let mut dice = ScriptedDice::new(&[GO, STAY, STAY, GO]);

        let outcomes =
            play_turn(&mut game, PlayerId(1), &GameConfig::default(), &mut dice, &sink).unwrap();

        assert_eq!(
            outcomes,
            vec![
                TurnOutcome::LeftBase,
                TurnOutcome::Hunted {
                    target: PlayerId(2)
                }
            ]
        );
        assert_eq!(sink.tally("fox").in_base_now, -1);
        assert!(game.audit().is_ok());
    }

    #[test]
    fn test_rescue_wins_over_everything() {
        let mut game = game(Spawn::InField);
        let mut dice = ScriptedDice::new(&[GO]);
        let outcomes = play_turn(
            &mut game,
            PlayerId(3),
            &GameConfig::default(),
            &mut dice,
            &RecordingSink::new(),
        );
        assert_eq!(
            outcomes,
            Ok(vec![TurnOutcome::Rescued { released: vec![] }])
        );
    }

    #[test]
    fn test_enter_base_before_hunt() {
        let mut game = game(Spawn::InField);
        let mut dice = ScriptedDice::new(&[STAY, GO]);
        let outcomes = play_turn(
            &mut game,
            PlayerId(1),
            &GameConfig::default(),
            &mut dice,
            &RecordingSink::new(),
        );
        assert_eq!(outcomes, Ok(vec![TurnOutcome::EnteredBase]));
        assert!(game.player(PlayerId(1)).unwrap().is_in_base());
    }

    #[test]
    fn test_failed_hunt_draw_is_idle() {
        let mut game = game(Spawn::InField);
        let mut dice = ScriptedDice::new(&[STAY, STAY, STAY]);
        let outcomes = play_turn(
            &mut game,
            PlayerId(1),
            &GameConfig::default(),
            &mut dice,
            &RecordingSink::new(),
        );
        assert_eq!(outcomes, Ok(vec![TurnOutcome::Idle]));
        assert!(game.captives_of(playtag_env::TeamId(0)).is_empty());
    }

    #[test]
    fn test_betrays_when_no_target() {
        let mut game = game(Spawn::InField);
        let sink = RecordingSink::new();
        game.hunt(PlayerId(1), PlayerId(2), &sink).unwrap();

        // the only chicken is captured: fox 1 has nothing to hunt
        let mut dice = ScriptedDice::new(&[STAY, STAY]);
        let outcomes =
            play_turn(&mut game, PlayerId(1), &GameConfig::default(), &mut dice, &sink).unwrap();

        assert_eq!(
            outcomes,
            vec![TurnOutcome::Betrayed {
                released: vec![PlayerId(2)]
            }]
        );
        assert_eq!(sink.tally("fox").treasons, 1);
        assert!(game.audit().is_ok());
    }

    #[test]
    fn test_captive_turn_draws_nothing() {
        let mut game = game(Spawn::InField);
        game.hunt(PlayerId(1), PlayerId(2), &RecordingSink::new()).unwrap();

        let mut dice = ScriptedDice::new(&[]);
        let outcomes = play_turn(
            &mut game,
            PlayerId(2),
            &GameConfig::default(),
            &mut dice,
            &RecordingSink::new(),
        );
        assert_eq!(outcomes, Ok(vec![TurnOutcome::Captive]));
    }

    #[test]
    fn test_unknown_player_is_an_error() {
        let mut game = game(Spawn::InField);
        let mut dice = ScriptedDice::new(&[]);
        let result = play_turn(
            &mut game,
            PlayerId(42),
            &GameConfig::default(),
            &mut dice,
            &RecordingSink::new(),
        );
        assert_eq!(result, Err(OperationError::UnknownPlayer(PlayerId(42))));
    }

    #[test]
    fn test_rng_dice_pause_bounds() {
        let mut rng = TokioContext::seeded(7).derive_rng(1);
        assert_eq!(rng.pause_ms(0), 0);
        for _ in 0..100 {
            assert!(rng.pause_ms(5) < 5);
            let roll = rng.roll();
            assert!((0.0..1.0).contains(&roll));
        }
    }

    #[tokio::test]
    async fn test_agents_stop_after_max_turns() {
        let shared = SharedGame::new(Game::new(Arc::new(Topology::canonical()), 6, Spawn::InBase));
        let ctx = TokioContext::shared(11);
        let sink = Arc::new(RecordingSink::new());
        let config = GameConfig::default().with_players(6).with_max_pause_ms(0);
        let shutdown = ShutdownSignal::new();

        let mut handles = Vec::new();
        for id in 1..=6 {
            let agent = PlayerAgent::new(
                PlayerId(id),
                shared.clone(),
                ctx.clone(),
                config.clone(),
                sink.clone(),
            );
            handles.push(tokio::spawn(agent.run(shutdown.listener(), Some(50))));
        }

        for handle in handles {
            let report = handle.await.unwrap().unwrap();
            assert_eq!(report.turns, 50);
        }
        assert!(shared.audit().await.is_ok());
    }

    #[tokio::test]
    async fn test_agent_stops_on_shutdown() {
        let shared = SharedGame::new(game(Spawn::InBase));
        let ctx = TokioContext::shared(3);
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let agent = PlayerAgent::new(
            PlayerId(1),
            shared,
            ctx,
            GameConfig::default(),
            Arc::new(RecordingSink::new()),
        );
        let report = agent.run(shutdown.listener(), None).await.unwrap();
        assert_eq!(report.turns, 0);
    }

    #[tokio::test]
    async fn test_hunt_pause_inside_lock_holds_the_game() {
        let seen = lock_state_during_hunt_pause(HuntPause::InsideLock).await;
        assert_eq!(seen, vec![false]);
    }

    #[tokio::test]
    async fn test_hunt_pause_after_release_frees_the_game() {
        let seen = lock_state_during_hunt_pause(HuntPause::AfterRelease).await;
        assert_eq!(seen, vec![true]);
    }

    #[test]
    fn test_same_seed_same_draws() {
        let mut a = TokioContext::seeded(99).derive_rng(4);
        let mut b = TokioContext::seeded(99).derive_rng(4);
        for _ in 0..20 {
            assert_eq!(a.roll(), b.roll());
        }
    }
}
