//! PlayTag Simulation and Serving Harness
//!
//! This crate hosts everything around the game engine:
//!
//! - **SimContext**: a virtual clock plus seeded per-agent RNGs, so hundreds
//!   of agents can play thousands of turns in well under a second
//! - **GameWorld**: builds the roster, spawns one agent per player and drains
//!   them on shutdown
//! - **Endpoint**: the Prometheus `/metrics` and `/health` routes
//! - **Scenarios**: finite runs with a concurrent auditor that checks the
//!   capture bookkeeping while agents play
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         GameWorld                           │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SharedGame  (one lock: roster flags + capture pool)  │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       ▲                ▲                    ▲               │
//! │  ┌────┴────┐      ┌────┴────┐          ┌────┴────┐          │
//! │  │ Player  │      │ Player  │   ...    │ Auditor │          │
//! │  │   #1    │      │   #2    │          │ (tests) │          │
//! │  └────┬────┘      └────┬────┘          └─────────┘          │
//! │       └───────┬────────┘                                    │
//! │          ┌────▼──────────┐      ┌──────────────────┐        │
//! │          │  MetricsSink  │─────►│ /metrics (axum)  │        │
//! │          └───────────────┘      └──────────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use playtag_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).with_turns(100).run(ScenarioId::Canonical);
//! assert!(result.passed);
//! ```

mod context;
pub mod endpoint;
mod exporter;
mod runner;
pub mod scenarios;
mod world;

pub use context::SimContext;
pub use endpoint::EndpointError;
pub use exporter::{SimExport, TeamSummary};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use world::{GameWorld, WorldError};
