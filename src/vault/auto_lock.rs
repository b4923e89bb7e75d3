//! Background timer that locks the vault when a remembered unlock expires.

use super::VaultController;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Vault shared between the caller and its expiry timer.
pub type SharedVault = Arc<Mutex<VaultController>>;

/// Schedules [`VaultController::expire`] at the current unlock deadline.
///
/// Returns `None` when there is no deadline (locked, or unlocked without
/// "remember") or when called outside a tokio runtime. Each successful unlock
/// should schedule its own timer; stale timers find a different deadline and
/// do nothing.
pub fn spawn_expiry_timer(vault: SharedVault) -> Option<JoinHandle<()>> {
    let deadline = vault.lock().unlock_until()?;

    let runtime = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(e) => {
            warn!("Cannot schedule vault auto-lock: {}", e);
            return None;
        }
    };

    let wait = (deadline - Utc::now()).to_std().unwrap_or_default();
    debug!("Vault auto-lock scheduled in {:?}", wait);

    Some(runtime.spawn(async move {
        tokio::time::sleep(wait).await;
        let expired = vault.lock().expire(deadline);
        if expired {
            info!("Vault auto-locked at {}", deadline.to_rfc3339());
        }
    }))
}
