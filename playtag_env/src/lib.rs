//! PlayTag Environment Abstraction Layer
//!
//! This crate keeps the game engine independent from the runtime it runs on.
//! Player agents never call `tokio::time` or an RNG constructor directly; they
//! go through a [`GameContext`], so the same agent code runs:
//!
//! - in **Production** under [`TokioContext`] (wall clock, real sleeps), and
//! - in **Simulation** under a virtual clock that advances instantly, which lets
//!   tests push hundreds of agents through thousands of turns in milliseconds.
//!
//! Every agent derives its own random generator from the context, so a seeded
//! context gives every agent an independent but reproducible stream of draws.
//!
//! # Example
//!
//! ```ignore
//! use playtag_env::{GameContext, ShutdownListener};
//!
//! async fn agent_loop<Ctx: GameContext>(ctx: &Ctx, mut shutdown: ShutdownListener) {
//!     while !shutdown.is_triggered() {
//!         tokio::select! {
//!             _ = ctx.sleep(Duration::from_millis(250)) => take_turn(),
//!             _ = shutdown.triggered() => break,
//!         }
//!     }
//! }
//! ```

mod context;
mod error;
mod shutdown;
mod tokio_impl;
mod types;

pub use context::GameContext;
pub use error::EnvError;
pub use shutdown::{wait_for_termination, ShutdownListener, ShutdownSignal};
pub use tokio_impl::TokioContext;
pub use types::{PlayerId, TeamId};
