//! Bridge lifecycle: the restart guard and the ordered shutdown sequences.
//!
//! A lifecycle-fatal event (disconnect, auth failure) escalates to a full
//! process restart: notify the group, close storage, wait a grace period,
//! exit non-zero. An external supervisor relaunches a fresh instance, which
//! re-displays the login QR when the session is invalid. An operator
//! interrupt takes the clean path instead and exits zero.

use ponte_channels::telegram::TelegramApi;
use ponte_core::traits::WhatsAppTransport;
use ponte_store::Store;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Grace period before the restart exit, giving the notice time to land.
const RESTART_GRACE_SECS: u64 = 3;

/// Collapses concurrent restart triggers into a single execution.
///
/// A disconnect often fires alongside an auth failure; whichever handler
/// acquires the guard first runs the sequence, the rest become no-ops.
#[derive(Default)]
pub struct RestartGuard(AtomicBool);

impl RestartGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// True exactly once, for the first caller.
    pub fn acquire(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }
}

/// Drives the shutdown-and-restart sequences.
pub struct Supervisor {
    tg: Arc<TelegramApi>,
    store: Store,
    group_id: i64,
    topic_primary: i64,
    guard: RestartGuard,
}

impl Supervisor {
    pub fn new(tg: Arc<TelegramApi>, store: Store, group_id: i64, topic_primary: i64) -> Self {
        Self {
            tg,
            store,
            group_id,
            topic_primary,
            guard: RestartGuard::new(),
        }
    }

    /// Escalate to a full process restart. Idempotent: only the first
    /// trigger executes the sequence. Does not return for that caller.
    pub async fn restart(&self, reason: &str) {
        if !self.guard.acquire() {
            return;
        }

        info!("restarting: {reason}");

        let notice = format!(
            "WhatsApp connection lost: {reason}. Restarting to generate a fresh login QR..."
        );
        if let Err(e) = self
            .tg
            .send_text(self.group_id, &notice, Some(self.topic_primary), None)
            .await
        {
            warn!("failed to post restart notice: {e}");
        }

        self.store.close().await;
        tokio::time::sleep(std::time::Duration::from_secs(RESTART_GRACE_SECS)).await;
        std::process::exit(1);
    }

    /// Clean operator shutdown: close storage and tear the WhatsApp
    /// session down. Does not pass through the restart guard.
    pub async fn shutdown(&self, wa: &Arc<dyn WhatsAppTransport>) {
        info!("shutting down...");

        self.store.close().await;
        if let Err(e) = wa.destroy().await {
            warn!("error destroying whatsapp session: {e}");
        }

        info!("shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_acquired_once() {
        let guard = RestartGuard::new();
        assert!(guard.acquire());
        assert!(!guard.acquire());
        assert!(!guard.acquire());
    }

    #[tokio::test]
    async fn test_concurrent_triggers_collapse_to_one() {
        // Disconnect firing alongside an auth failure must run exactly
        // one shutdown sequence.
        let guard = Arc::new(RestartGuard::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let guard = guard.clone();
            handles.push(tokio::spawn(async move { guard.acquire() }));
        }

        let mut acquired = 0;
        for handle in handles {
            if handle.await.unwrap() {
                acquired += 1;
            }
        }
        assert_eq!(acquired, 1);
    }
}
