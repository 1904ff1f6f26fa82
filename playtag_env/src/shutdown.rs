//! Cooperative shutdown signalling.
//!
//! Agents hold a [`ShutdownListener`] and check it once per turn. The process
//! owner holds the [`ShutdownSignal`] and flips it when an OS termination
//! request arrives.

use crate::error::EnvError;
use std::sync::Arc;
use tokio::sync::watch;

/// Owner side of the shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Returns a new listener observing this signal.
    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Triggers shutdown. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once [`trigger`](Self::trigger) has been called.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of the shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Non-blocking check.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been triggered.
    ///
    /// Also resolves if the owning [`ShutdownSignal`] was dropped.
    pub async fn triggered(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

/// Blocks until the process receives Ctrl-C or, on unix, SIGTERM.
///
/// Returns the name of the signal that arrived.
pub async fn wait_for_termination() -> Result<&'static str, EnvError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate()).map_err(EnvError::signal)?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.map_err(EnvError::signal)?;
                Ok("SIGINT")
            }
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map_err(EnvError::signal)?;
        Ok("ctrl-c")
    }
}
