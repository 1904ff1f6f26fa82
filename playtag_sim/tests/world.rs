//! Many agents sharing one game, checked by a concurrent auditor.

use playtag_core::{
    Game, GameConfig, HuntPause, MetricEvent, PlayerState, RecordingSink, Spawn, Topology,
};
use playtag_env::{PlayerId, ShutdownSignal, TokioContext};
use playtag_sim::{GameWorld, SimContext};
use std::sync::Arc;
use std::time::Duration;

async fn run_with_auditor<Ctx: playtag_env::GameContext>(
    context: Arc<Ctx>,
    config: GameConfig,
    turns: u64,
) -> (u64, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::tallies_only());
    let mut world = GameWorld::new(Topology::canonical(), config, context, sink.clone()).unwrap();

    let game = world.game().clone();
    let stop = ShutdownSignal::new();
    let auditor_stop = stop.clone();
    let auditor = tokio::spawn(async move {
        let mut checkpoints = 0u64;
        while !auditor_stop.is_triggered() {
            game.audit().await.unwrap();
            checkpoints += 1;
            tokio::task::yield_now().await;
        }
        checkpoints
    });

    world.spawn_agents(Some(turns));
    let reports = world.join().await.unwrap();
    stop.trigger();
    let checkpoints = auditor.await.unwrap();

    assert!(reports.iter().all(|r| r.turns == turns));
    world.game().audit().await.unwrap();
    (checkpoints, sink)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_agents_virtual_clock_inside_lock() {
    let config = GameConfig::default().with_players(120);
    let (checkpoints, sink) = run_with_auditor(SimContext::shared(42), config, 300).await;

    assert!(checkpoints > 0);
    let captured: u64 = sink.tallies().values().map(|t| t.captured).sum();
    assert!(captured > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_agents_virtual_clock_after_release() {
    let config = GameConfig::default()
        .with_players(90)
        .with_hunt_pause(HuntPause::AfterRelease);
    let (checkpoints, _sink) = run_with_auditor(SimContext::shared(7), config, 300).await;
    assert!(checkpoints > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_agents_real_clock() {
    let config = GameConfig::default().with_players(30).with_max_pause_ms(2);
    let (checkpoints, _sink) = run_with_auditor(TokioContext::shared(5), config, 25).await;
    assert!(checkpoints > 0);
}

#[tokio::test]
async fn test_shutdown_signal_stops_every_agent() {
    let sink = Arc::new(RecordingSink::tallies_only());
    let config = GameConfig::default().with_players(24).with_max_pause_ms(5);
    let mut world =
        GameWorld::new(Topology::canonical(), config, TokioContext::shared(9), sink).unwrap();

    world.spawn_agents(None);
    tokio::time::sleep(Duration::from_millis(30)).await;

    let reports = tokio::time::timeout(Duration::from_secs(5), world.shutdown())
        .await
        .expect("agents did not stop")
        .unwrap();
    assert_eq!(reports.len(), 24);
    assert!(reports.iter().any(|r| r.turns > 0));
}

#[test]
fn test_fox_chicken_snake_walkthrough() {
    let mut game = Game::new(Arc::new(Topology::canonical()), 3, Spawn::InField);
    let sink = RecordingSink::new();

    // player 1 (fox) hunts player 2 (chicken)
    game.hunt(PlayerId(1), PlayerId(2), &sink).unwrap();
    assert_eq!(game.player(PlayerId(2)).unwrap().state(), PlayerState::Hunted);

    // player 3 (snake) is hunted by chicken, whose bucket is empty
    assert!(game.rescue(PlayerId(3), &sink).unwrap().is_empty());
    assert!(game.player(PlayerId(2)).unwrap().is_hunted());

    // with no chicken left to hunt, player 1 betrays
    sink.clear();
    let released = game.betray(PlayerId(1), &sink).unwrap();
    assert_eq!(released, vec![PlayerId(2)]);
    assert_eq!(game.player(PlayerId(2)).unwrap().state(), PlayerState::Free);
    assert!(game.audit().is_ok());

    let events = sink.events();
    let treasons = events
        .iter()
        .filter(|e| matches!(e, MetricEvent::Treason { .. }))
        .count();
    let rescues = events
        .iter()
        .filter(|e| matches!(e, MetricEvent::Rescued { .. }))
        .count();
    assert_eq!(treasons, 1);
    assert_eq!(rescues, 1);
}
