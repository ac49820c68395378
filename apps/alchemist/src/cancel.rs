//! # Cooperative Cancellation
//!
//! A cloneable cancellation token built on `tokio::sync::watch`, plus the
//! OS signal listener that trips it.
//!
//! The discovery loop checks the token at iteration boundaries and while
//! pacing; it never interrupts an iteration in progress.

use std::sync::Arc;
use tokio::sync::watch;

/// A cloneable, one-way cancellation flag.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Cancel this token and every clone of it. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any clone of the token, so this only
        // returns once the flag is set.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Cancel `token` on Ctrl-C or, on Unix, SIGTERM.
pub fn cancel_on_shutdown_signal(token: CancellationToken) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("Shutdown signal received, finishing current iteration");
        token.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                () = ctrl_c_or_never() => {}
                Some(()) = terminate.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Cannot install SIGTERM handler: {}", e);
            ctrl_c_or_never().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    ctrl_c_or_never().await;
}

/// Resolve on Ctrl-C only. A listener that fails to install never resolves.
async fn ctrl_c_or_never() {
    hold_on_error(tokio::signal::ctrl_c().await).await;
}

async fn hold_on_error(outcome: std::io::Result<()>) {
    if let Err(e) = outcome {
        tracing::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
