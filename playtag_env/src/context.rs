//! Core environment context trait for PlayTag agents.

use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// The central interface for environment interaction.
///
/// Abstracts the runtime so that player agents can run both under a real
/// tokio runtime and under a virtual clock in tests.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, OS entropy or a fixed seed
/// - **Simulation**: `SimContext` (in `playtag_sim`) - virtual clock, seeded RNG
#[async_trait]
pub trait GameContext: Send + Sync + 'static {
    /// Returns the monotonic time elapsed since the context was created.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends the calling task for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock and yields
    async fn sleep(&self, duration: Duration);

    /// Spawns a named background task and returns its handle.
    fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static;

    /// Derives a random generator for one agent.
    ///
    /// The implementation combines the context seed with `seed_extension`
    /// (typically the player id) so that every agent samples independently.
    fn derive_rng(&self, seed_extension: u64) -> ChaCha8Rng;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// Returns 0 when the context draws from OS entropy.
    fn seed(&self) -> u64;
}
