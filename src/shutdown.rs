//! # Shutdown Module
//!
//! Cancellation token for the run loop, plus the SIGINT/SIGTERM hookup that
//! trips it. The signal side only ever calls [`ShutdownToken::cancel`]; it
//! never touches the mapping table or device handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{DeckbdError, Result};

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cloneable, one-way shutdown flag that can also be awaited.
///
/// # Examples
///
/// ```
/// use deckbd::shutdown::ShutdownToken;
///
/// let token = ShutdownToken::new();
/// let handle = token.clone();
/// assert!(!token.is_cancelled());
///
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    inner: Arc<Inner>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Completes once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel is not missed
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Installs SIGINT and SIGTERM handlers that cancel `token`.
///
/// The handlers stay installed for the life of the process. Signals arriving
/// after the first are logged instead of silently absorbed.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns `Signal` if either handler cannot be registered.
pub fn install_signal_handlers(token: ShutdownToken) -> Result<JoinHandle<()>> {
    watch_signals(
        token,
        [
            ("SIGINT", SignalKind::interrupt()),
            ("SIGTERM", SignalKind::terminate()),
        ],
    )
}

fn watch_signals(
    token: ShutdownToken,
    kinds: [(&'static str, SignalKind); 2],
) -> Result<JoinHandle<()>> {
    let [(first_name, first_kind), (second_name, second_kind)] = kinds;
    let mut first = signal(first_kind)
        .map_err(|e| DeckbdError::Signal(format!("{}: {}", first_name, e)))?;
    let mut second = signal(second_kind)
        .map_err(|e| DeckbdError::Signal(format!("{}: {}", second_name, e)))?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = first.recv() => first_name,
                Some(()) = second.recv() => second_name,
                else => break,
            };

            if token.is_cancelled() {
                warn!("Received {} again, shutdown already in progress", name);
            } else {
                info!("Received {}, shutting down...", name);
                token.cancel();
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_new_token_is_not_cancelled() {
        assert!(!ShutdownToken::new().is_cancelled());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = ShutdownToken::new();
        let clone = token.clone();

        clone.cancel();
        clone.cancel();

        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancelled_future_wakes_on_cancel() {
        let token = ShutdownToken::new();
        let mut waiter = task::spawn(token.cancelled());

        assert_pending!(waiter.poll());

        token.cancel();

        assert!(waiter.is_woken());
        assert_ready!(waiter.poll());
    }

    #[test]
    fn test_cancelled_future_ready_when_already_cancelled() {
        let token = ShutdownToken::new();
        token.cancel();

        let mut waiter = task::spawn(token.cancelled());
        assert_ready!(waiter.poll());
    }

    #[tokio::test]
    async fn test_signal_handlers_install() {
        let token = ShutdownToken::new();
        let handle = install_signal_handlers(token.clone()).unwrap();

        assert!(!token.is_cancelled());
        handle.abort();
    }

    #[tokio::test]
    async fn test_repeated_signals_are_still_handled() {
        let token = ShutdownToken::new();
        let handle = watch_signals(
            token.clone(),
            [
                ("SIGUSR1", SignalKind::user_defined1()),
                ("SIGUSR2", SignalKind::user_defined2()),
            ],
        )
        .unwrap();

        unsafe { libc::raise(libc::SIGUSR1) };
        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .expect("first signal did not cancel the token");

        unsafe { libc::raise(libc::SIGUSR2) };
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(token.is_cancelled());
        assert!(!handle.is_finished(), "Handler task must outlive the first signal");
        handle.abort();
    }
}
