//! JSON export of a finished game.
//!
//! Captures the final roster, capture pool, per-team metric tallies and
//! per-agent reports in a single document.

use playtag_core::{AgentReport, Game, GameSnapshot, RecordingSink, TeamCensus, TeamTally};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use tracing::info;

/// Per-team section of the export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    /// Metric tallies recorded during the game
    pub tally: TeamTally,

    /// Head count by state at the end
    pub census: TeamCensus,
}

/// Complete game export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name, or "live" for an open-ended run
    pub scenario: String,

    /// Seed used (0 = entropy)
    pub seed: u64,

    /// Topology as `team>prey` pairs
    pub topology: String,

    /// Clock time at the end, in seconds
    pub duration_sec: f64,

    /// Per-team tallies and census, keyed by team name
    pub teams: BTreeMap<String, TeamSummary>,

    /// Per-agent reports in id order
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub agents: Vec<AgentReport>,

    /// Final roster and capture pool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_state: Option<GameSnapshot>,

    /// Whether the final audit passed
    pub passed: bool,

    /// Audit failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, topology: impl ToString) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            topology: topology.to_string(),
            duration_sec: 0.0,
            teams: BTreeMap::new(),
            agents: Vec::new(),
            final_state: None,
            passed: false,
            failure_reason: None,
        }
    }

    /// Records the tallies of one team.
    pub fn add_team(&mut self, team: &str, tally: TeamTally, census: TeamCensus) {
        self.teams
            .insert(team.to_string(), TeamSummary { tally, census });
    }

    /// Records every team of `game`, with tallies taken from `sink`.
    pub fn add_teams(&mut self, game: &Game, sink: &RecordingSink) {
        for team in game.topology().teams() {
            let name = game.team_name(team);
            self.add_team(name, sink.tally(name), game.census(team));
        }
    }

    /// Finalizes the export.
    pub fn finalize(
        &mut self,
        duration_sec: f64,
        agents: Vec<AgentReport>,
        final_state: GameSnapshot,
        failure_reason: Option<String>,
    ) {
        self.duration_sec = duration_sec;
        self.agents = agents;
        self.final_state = Some(final_state);
        self.passed = failure_reason.is_none();
        self.failure_reason = failure_reason;
    }

    /// Logs one line per team with captures, rescues and treasons.
    pub fn log_summary(&self) {
        for (team, summary) in &self.teams {
            info!(
                "  {:<10} captured={:<5} rescued={:<5} treasons={:<5} | free={} in_base={} hunted={}",
                team,
                summary.tally.captured,
                summary.tally.rescued,
                summary.tally.treasons,
                summary.census.free,
                summary.census.in_base,
                summary.census.hunted,
            );
        }
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
