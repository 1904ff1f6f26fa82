//! Named, finite game scenarios.

use playtag_core::{HuntPause, Topology, TopologyError};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// The classic fox/chicken/snake game at default settings
    Canonical,

    /// Two disjoint triangles, many players, pause after release
    Stress,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![ScenarioId::Canonical, ScenarioId::Stress]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Canonical => "canonical",
            ScenarioId::Stress => "stress",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Canonical => "120 players, fox>chicken>snake>fox, pause inside the lock",
            ScenarioId::Stress => "600 players over two 3-cycles, pause after lock release",
        }
    }

    /// Hunt relation used by the scenario.
    pub fn topology(&self) -> Result<Topology, TopologyError> {
        match self {
            ScenarioId::Canonical => Ok(Topology::canonical()),
            ScenarioId::Stress => Topology::parse(
                "fox>chicken,chicken>snake,snake>fox,hawk>mouse,mouse>beetle,beetle>hawk",
            ),
        }
    }

    /// Default number of players.
    pub fn players(&self) -> usize {
        match self {
            ScenarioId::Canonical => 120,
            ScenarioId::Stress => 600,
        }
    }

    /// Default turns per agent.
    pub fn turns(&self) -> u64 {
        match self {
            ScenarioId::Canonical => 200,
            ScenarioId::Stress => 100,
        }
    }

    /// Where hunters pause after a capture.
    pub fn hunt_pause(&self) -> HuntPause {
        match self {
            ScenarioId::Canonical => HuntPause::InsideLock,
            ScenarioId::Stress => HuntPause::AfterRelease,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "canonical" | "classic" => Ok(ScenarioId::Canonical),
            "stress" => Ok(ScenarioId::Stress),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert!(!scenario.description().is_empty());
        }
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_scenario_topologies_are_valid() {
        assert_eq!(ScenarioId::Canonical.topology().unwrap().len(), 3);

        let stress = ScenarioId::Stress.topology().unwrap();
        assert_eq!(stress.len(), 6);
        assert_eq!(stress.cycles().len(), 2);
    }
}
