//! Ctrl-C handling for daemon mode.
//!
//! The first interrupt cancels the token, so the scheduler stops at its next
//! sleep boundary. A second interrupt while a cycle is still running exits
//! the process immediately.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Exit status used when a second interrupt forces the process down.
pub const FORCED_EXIT_CODE: i32 = 130;

/// How the interrupt watcher finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Two interrupts arrived; the caller should exit now.
    Forced,
    /// Listening for interrupts failed.
    Unavailable,
}

/// Cancel `token` on the first signal and return on the second.
pub async fn watch_interrupts<F, Fut>(token: CancellationToken, mut next_signal: F) -> Interrupt
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = next_signal().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        return Interrupt::Unavailable;
    }
    info!("Ctrl-C received, stopping after the current cycle (press again to exit now)");
    token.cancel();

    if let Err(e) = next_signal().await {
        warn!(error = %e, "failed to listen for a second Ctrl-C");
        return Interrupt::Unavailable;
    }
    warn!("second Ctrl-C received, exiting without finishing the cycle");
    Interrupt::Forced
}

/// Watch the process's Ctrl-C in the background.
pub fn spawn_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if watch_interrupts(token, tokio::signal::ctrl_c).await == Interrupt::Forced {
            std::process::exit(FORCED_EXIT_CODE);
        }
    })
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;

    type SignalFuture = Pin<Box<dyn Future<Output = io::Result<()>> + Send>>;

    /// Each call resolves once `notify` is notified.
    fn signals(notify: &Arc<Notify>) -> impl FnMut() -> SignalFuture + Send {
        let notify = Arc::clone(notify);
        move || {
            let notify = Arc::clone(&notify);
            Box::pin(async move {
                notify.notified().await;
                Ok(())
            }) as SignalFuture
        }
    }

    #[tokio::test]
    async fn first_interrupt_cancels_second_forces_exit() {
        let notify = Arc::new(Notify::new());
        let token = CancellationToken::new();
        let watcher = tokio::spawn(watch_interrupts(token.clone(), signals(&notify)));

        notify.notify_one();
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
        assert!(!watcher.is_finished());

        notify.notify_one();
        let outcome = tokio::time::timeout(Duration::from_secs(1), watcher)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, Interrupt::Forced);
    }

    #[tokio::test]
    async fn listener_failure_leaves_token_untouched() {
        let token = CancellationToken::new();

        let outcome = watch_interrupts(token.clone(), || async {
            Err(io::Error::new(io::ErrorKind::Other, "no signal support"))
        })
        .await;

        assert_eq!(outcome, Interrupt::Unavailable);
        assert!(!token.is_cancelled());
    }
}
