//! PlayTag Metrics Module
//! ======================
//!
//! The game engine reports what happens through the [`MetricsSink`] trait:
//! - **Counters**: captures, rescues, treasons
//! - **Gauges**: players currently hunted per team, players currently in base
//!
//! Label sets are part of the external contract: team name, and integer ids
//! rendered as decimal strings.
//!
//! Sinks provided here:
//! - [`PrometheusSink`]: exports through a `prometheus::Registry`
//! - [`RecordingSink`]: in-memory event log and per-team tallies
//! - [`FanoutSink`]: forwards to several sinks
//! - [`NoopSink`]: discards everything

use playtag_env::PlayerId;
use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Receiver of game events and gauge deltas.
///
/// Called while the game lock is held, so implementations must not block.
pub trait MetricsSink: Send + Sync + 'static {
    /// A player of `team` was captured by `hunter`.
    fn player_captured(&self, team: &str, target: PlayerId, hunter: PlayerId);

    /// One rescued-player event.
    fn player_rescued(&self, team: &str, player: PlayerId);

    /// `player` freed the captives held by its own team.
    fn treason_committed(&self, team: &str, player: PlayerId);

    /// Change of the currently-hunted population of `team`.
    fn hunted_changed(&self, team: &str, delta: i64);

    /// Change of `player`'s in-base membership.
    fn in_base_changed(&self, team: &str, player: PlayerId, delta: i64);
}

// =============================================================================
// PROMETHEUS
// =============================================================================

/// Errors raised while building or encoding the Prometheus registry.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("metrics output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Sink backed by Prometheus counters and gauges in a private registry.
pub struct PrometheusSink {
    registry: Registry,
    hunted_total: IntCounterVec,
    rescued_total: IntCounterVec,
    treasons_total: IntCounterVec,
    hunted_current: IntGaugeVec,
    in_base_current: IntGaugeVec,
}

impl PrometheusSink {
    /// Creates and registers every PlayTag metric.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let hunted_total = IntCounterVec::new(
            Opts::new("playtag_hunted_players_total", "Total number of players hunted"),
            &["team", "target", "hunter"],
        )?;
        let rescued_total = IntCounterVec::new(
            Opts::new("playtag_rescued_players_total", "Total number of players rescued"),
            &["team", "player"],
        )?;
        let treasons_total = IntCounterVec::new(
            Opts::new("playtag_commited_treasons_total", "Total number of committed treasons"),
            &["team", "player"],
        )?;
        let hunted_current = IntGaugeVec::new(
            Opts::new("playtag_hunted_players_current", "Current number of players hunted"),
            &["team"],
        )?;
        let in_base_current = IntGaugeVec::new(
            Opts::new(
                "playtag_in_base_players_current",
                "Current number of players in their base",
            ),
            &["team", "player"],
        )?;

        registry.register(Box::new(hunted_total.clone()))?;
        registry.register(Box::new(rescued_total.clone()))?;
        registry.register(Box::new(treasons_total.clone()))?;
        registry.register(Box::new(hunted_current.clone()))?;
        registry.register(Box::new(in_base_current.clone()))?;

        Ok(Self {
            registry,
            hunted_total,
            rescued_total,
            treasons_total,
            hunted_current,
            in_base_current,
        })
    }

    /// The registry holding every PlayTag metric.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Content type to serve [`encode_text`](Self::encode_text) with.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

impl MetricsSink for PrometheusSink {
    fn player_captured(&self, team: &str, target: PlayerId, hunter: PlayerId) {
        self.hunted_total
            .with_label_values(&[team, &target.to_string(), &hunter.to_string()])
            .inc();
    }

    fn player_rescued(&self, team: &str, player: PlayerId) {
        self.rescued_total
            .with_label_values(&[team, &player.to_string()])
            .inc();
    }

    fn treason_committed(&self, team: &str, player: PlayerId) {
        self.treasons_total
            .with_label_values(&[team, &player.to_string()])
            .inc();
    }

    fn hunted_changed(&self, team: &str, delta: i64) {
        self.hunted_current.with_label_values(&[team]).add(delta);
    }

    fn in_base_changed(&self, team: &str, player: PlayerId, delta: i64) {
        self.in_base_current
            .with_label_values(&[team, &player.to_string()])
            .add(delta);
    }
}

// =============================================================================
// RECORDING
// =============================================================================

/// A single notification received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricEvent {
    Captured {
        team: String,
        target: PlayerId,
        hunter: PlayerId,
    },
    Rescued {
        team: String,
        player: PlayerId,
    },
    Treason {
        team: String,
        player: PlayerId,
    },
    HuntedChanged {
        team: String,
        delta: i64,
    },
    InBaseChanged {
        team: String,
        player: PlayerId,
        delta: i64,
    },
}

/// Per-team running totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamTally {
    /// Members of this team captured
    pub captured: u64,
    /// Rescue events credited to this team
    pub rescued: u64,
    /// Treasons committed by members of this team
    pub treasons: u64,
    /// Current hunted gauge value
    pub hunted_now: i64,
    /// Current number of members in base
    pub in_base_now: i64,
}

#[derive(Debug, Default)]
struct Recording {
    events: Vec<MetricEvent>,
    tallies: BTreeMap<String, TeamTally>,
}

/// In-memory sink keeping every event and per-team tallies.
#[derive(Debug)]
pub struct RecordingSink {
    keep_events: bool,
    inner: Mutex<Recording>,
}

impl RecordingSink {
    /// Records events and tallies.
    pub fn new() -> Self {
        Self {
            keep_events: true,
            inner: Mutex::default(),
        }
    }

    /// Keeps tallies only; for long-running processes.
    pub fn tallies_only() -> Self {
        Self {
            keep_events: false,
            inner: Mutex::default(),
        }
    }

    /// Snapshot of the recorded events, oldest first.
    pub fn events(&self) -> Vec<MetricEvent> {
        self.with(|rec| rec.events.clone())
    }

    /// Snapshot of the per-team tallies, keyed by team name.
    pub fn tallies(&self) -> BTreeMap<String, TeamTally> {
        self.with(|rec| rec.tallies.clone())
    }

    /// Tally for one team (zeroed if the team never reported anything).
    pub fn tally(&self, team: &str) -> TeamTally {
        self.with(|rec| rec.tallies.get(team).cloned().unwrap_or_default())
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.with(|rec| {
            rec.events.clear();
            rec.tallies.clear();
        });
    }

    fn with<R>(&self, f: impl FnOnce(&mut Recording) -> R) -> R {
        // A poisoned recorder still holds consistent counters
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn record(&self, team: &str, event: MetricEvent, update: impl FnOnce(&mut TeamTally)) {
        let keep = self.keep_events;
        self.with(|rec| {
            update(rec.tallies.entry(team.to_string()).or_default());
            if keep {
                rec.events.push(event);
            }
        });
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for RecordingSink {
    fn player_captured(&self, team: &str, target: PlayerId, hunter: PlayerId) {
        let event = MetricEvent::Captured {
            team: team.to_string(),
            target,
            hunter,
        };
        self.record(team, event, |t| t.captured += 1);
    }

    fn player_rescued(&self, team: &str, player: PlayerId) {
        let event = MetricEvent::Rescued {
            team: team.to_string(),
            player,
        };
        self.record(team, event, |t| t.rescued += 1);
    }

    fn treason_committed(&self, team: &str, player: PlayerId) {
        let event = MetricEvent::Treason {
            team: team.to_string(),
            player,
        };
        self.record(team, event, |t| t.treasons += 1);
    }

    fn hunted_changed(&self, team: &str, delta: i64) {
        let event = MetricEvent::HuntedChanged {
            team: team.to_string(),
            delta,
        };
        self.record(team, event, |t| t.hunted_now += delta);
    }

    fn in_base_changed(&self, team: &str, player: PlayerId, delta: i64) {
        let event = MetricEvent::InBaseChanged {
            team: team.to_string(),
            player,
            delta,
        };
        self.record(team, event, |t| t.in_base_now += delta);
    }
}

// =============================================================================
// COMBINATORS
// =============================================================================

/// Forwards every notification to each inner sink in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    pub fn with(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl MetricsSink for FanoutSink {
    fn player_captured(&self, team: &str, target: PlayerId, hunter: PlayerId) {
        for sink in &self.sinks {
            sink.player_captured(team, target, hunter);
        }
    }

    fn player_rescued(&self, team: &str, player: PlayerId) {
        for sink in &self.sinks {
            sink.player_rescued(team, player);
        }
    }

    fn treason_committed(&self, team: &str, player: PlayerId) {
        for sink in &self.sinks {
            sink.treason_committed(team, player);
        }
    }

    fn hunted_changed(&self, team: &str, delta: i64) {
        for sink in &self.sinks {
            sink.hunted_changed(team, delta);
        }
    }

    fn in_base_changed(&self, team: &str, player: PlayerId, delta: i64) {
        for sink in &self.sinks {
            sink.in_base_changed(team, player, delta);
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn player_captured(&self, _team: &str, _target: PlayerId, _hunter: PlayerId) {}
    fn player_rescued(&self, _team: &str, _player: PlayerId) {}
    fn treason_committed(&self, _team: &str, _player: PlayerId) {}
    fn hunted_changed(&self, _team: &str, _delta: i64) {}
    fn in_base_changed(&self, _team: &str, _player: PlayerId, _delta: i64) {}
}

// =============================================================================
// TESTS
// =============================================================================
