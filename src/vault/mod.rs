//! Passcode-gated access to the hidden partition.
//!
//! The vault never encrypts anything. It decides whether hidden records may be
//! shown, based on a passcode verifier stored in the durable preference store
//! and an optional unlock expiry stored in the session store.
//!
//! Time is always passed in by the caller (`now`), so expiry behaviour can be
//! exercised without waiting on a real clock.
//!
//! # Example
//!
//! ```no_run
//! use mediashelf::prefs::PreferenceStore;
//! use mediashelf::vault::{VaultController, VaultStatus};
//! use chrono::Utc;
//! use std::sync::Arc;
//!
//! let prefs = Arc::new(PreferenceStore::in_memory());
//! let session = Arc::new(PreferenceStore::in_memory());
//! let mut vault = VaultController::load(prefs, session, 150_000)?;
//!
//! vault.setup_passcode("24680")?;
//! assert!(vault.verify_and_unlock("24680", 20, Utc::now()));
//! assert!(matches!(vault.status(Utc::now()), VaultStatus::Unlocked { .. }));
//! # Ok::<(), mediashelf::AppError>(())
//! ```

pub mod auto_lock;

use crate::constants::{PREF_VAULT, SESSION_UNLOCK_UNTIL};
use crate::crypto::{hash_passcode_with_iterations, verify_passcode, VaultConfig};
use crate::errors::{AppResult, CryptoError};
use crate::prefs::PreferenceStore;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Durable vault preferences, stored as JSON under the `vault` key.
///
/// Live unlock state is not part of this struct and is never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<VaultConfig>,
    #[serde(default = "default_blur_hidden")]
    pub blur_hidden: bool,
    #[serde(default)]
    pub remember_ttl: bool,
}

fn default_blur_hidden() -> bool {
    true
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            config: None,
            blur_hidden: default_blur_hidden(),
            remember_ttl: false,
        }
    }
}

/// Observable vault state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultStatus {
    /// No passcode has been set up.
    Unconfigured,
    Locked,
    /// `until` is `None` for an unlock that lasts until the process exits.
    Unlocked { until: Option<DateTime<Utc>> },
}

/// Owns the passcode configuration and the unlock state machine.
pub struct VaultController {
    prefs: Arc<PreferenceStore>,
    session: Arc<PreferenceStore>,
    settings: VaultSettings,
    iterations: u32,
    is_unlocked: bool,
    unlock_until: Option<DateTime<Utc>>,
    failed_attempts: u32,
}

impl std::fmt::Debug for VaultController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultController")
            .field("configured", &self.settings.config.is_some())
            .field("blur_hidden", &self.settings.blur_hidden)
            .field("remember_ttl", &self.settings.remember_ttl)
            .field("is_unlocked", &self.is_unlocked)
            .field("unlock_until", &self.unlock_until)
            .field("failed_attempts", &self.failed_attempts)
            .finish()
    }
}

impl VaultController {
    /// Loads persisted settings. The vault always starts locked; call
    /// [`hydrate_from_session`](Self::hydrate_from_session) to restore a
    /// remembered unlock.
    ///
    /// `iterations` is the PBKDF2 cost used for passcodes set up from now on.
    /// Existing verifiers keep their own count.
    ///
    /// # Errors
    ///
    /// Returns `PreferenceError::Format` if the stored settings are not valid
    /// JSON. A corrupt settings value is surfaced rather than replaced, so a
    /// broken vault cannot silently become an unconfigured one.
    pub fn load(
        prefs: Arc<PreferenceStore>,
        session: Arc<PreferenceStore>,
        iterations: u32,
    ) -> AppResult<Self> {
        let settings: VaultSettings = prefs.get_json(PREF_VAULT)?.unwrap_or_default();
        debug!(
            "Loaded vault settings (configured={}, remember={})",
            settings.config.is_some(),
            settings.remember_ttl
        );

        Ok(Self {
            prefs,
            session,
            settings,
            iterations,
            is_unlocked: false,
            unlock_until: None,
            failed_attempts: 0,
        })
    }

    pub fn settings(&self) -> &VaultSettings {
        &self.settings
    }

    pub fn config(&self) -> Option<&VaultConfig> {
        self.settings.config.as_ref()
    }

    pub fn is_configured(&self) -> bool {
        self.settings.config.is_some()
    }

    /// Raw unlock flag, without applying expiry. Prefer [`status`](Self::status).
    pub fn is_unlocked(&self) -> bool {
        self.is_unlocked
    }

    pub fn unlock_until(&self) -> Option<DateTime<Utc>> {
        self.unlock_until
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Sets the first passcode.
    ///
    /// # Errors
    ///
    /// - `CryptoError::EmptyPasscode` for a blank passcode
    /// - `CryptoError::AlreadyConfigured` if a passcode exists; use
    ///   [`reconfigure_passcode`](Self::reconfigure_passcode) to replace it
    /// - any error persisting the verifier
    pub fn setup_passcode(&mut self, code: &str) -> AppResult<()> {
        if self.settings.config.is_some() {
            return Err(CryptoError::AlreadyConfigured.into());
        }
        self.install_passcode(code)
    }

    /// Replaces an existing passcode (or sets the first one).
    ///
    /// Callers are expected to have verified the current passcode first.
    pub fn reconfigure_passcode(&mut self, code: &str) -> AppResult<()> {
        self.install_passcode(code)
    }

    fn install_passcode(&mut self, code: &str) -> AppResult<()> {
        if code.trim().is_empty() {
            return Err(CryptoError::EmptyPasscode.into());
        }

        let config = hash_passcode_with_iterations(code, self.iterations)?;
        let mut settings = self.settings.clone();
        settings.config = Some(config);
        self.prefs.set_json(PREF_VAULT, &settings)?;
        self.settings = settings;

        self.lock();
        info!("Vault passcode configured");
        Ok(())
    }

    /// Verifies `code` and unlocks on success.
    ///
    /// With "remember" enabled the unlock expires after `ttl_minutes` and the
    /// expiry is written to the session store. Otherwise the unlock has no
    /// expiry and lasts for this process only.
    ///
    /// Returns `false` and bumps the failed-attempt counter when no passcode is
    /// configured or the code does not match; the unlock state is unchanged.
    pub fn verify_and_unlock(&mut self, code: &str, ttl_minutes: u32, now: DateTime<Utc>) -> bool {
        let matched = match self.settings.config.as_ref() {
            None => {
                debug!("Unlock attempted on an unconfigured vault");
                false
            }
            Some(config) => match verify_passcode(code, config) {
                Ok(matched) => matched,
                Err(e) => {
                    warn!("Stored vault configuration is unusable: {}", e);
                    false
                }
            },
        };

        if !matched {
            self.failed_attempts = self.failed_attempts.saturating_add(1);
            debug!("Vault unlock failed ({} attempts)", self.failed_attempts);
            return false;
        }

        self.failed_attempts = 0;
        self.is_unlocked = true;
        if self.settings.remember_ttl {
            let until = now + Duration::minutes(i64::from(ttl_minutes));
            self.unlock_until = Some(until);
            self.write_session_expiry(until);
            info!("Vault unlocked until {}", until.to_rfc3339());
        } else {
            self.unlock_until = None;
            self.clear_session_expiry();
            info!("Vault unlocked for this session");
        }
        true
    }

    /// Locks and forgets any remembered expiry.
    pub fn lock(&mut self) {
        if self.is_unlocked {
            info!("Vault locked");
        }
        self.is_unlocked = false;
        self.unlock_until = None;
        self.clear_session_expiry();
    }

    /// Restores a remembered unlock from the session store, if it is still
    /// valid at `now`. Any other case ends locked with the session value
    /// cleared.
    pub fn hydrate_from_session(&mut self, now: DateTime<Utc>) {
        if !self.settings.remember_ttl {
            self.lock();
            return;
        }

        match self.read_session_expiry() {
            Some(until) if until > now => {
                self.is_unlocked = true;
                self.unlock_until = Some(until);
                debug!("Restored vault unlock until {}", until.to_rfc3339());
            }
            _ => self.lock(),
        }
    }

    /// Locks if the current expiry has passed.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        if let Some(until) = self.unlock_until {
            if now >= until {
                debug!("Vault unlock expired at {}", until.to_rfc3339());
                self.lock();
            }
        }
    }

    /// Current state after applying expiry.
    pub fn status(&mut self, now: DateTime<Utc>) -> VaultStatus {
        self.refresh(now);
        if self.settings.config.is_none() {
            VaultStatus::Unconfigured
        } else if self.is_unlocked {
            VaultStatus::Unlocked {
                until: self.unlock_until,
            }
        } else {
            VaultStatus::Locked
        }
    }

    pub fn is_unlocked_at(&mut self, now: DateTime<Utc>) -> bool {
        self.refresh(now);
        self.is_unlocked
    }

    /// Timer callback: locks only if `deadline` is still the active expiry.
    ///
    /// A later unlock moves the expiry, which turns earlier timers into no-ops.
    pub fn expire(&mut self, deadline: DateTime<Utc>) -> bool {
        if self.is_unlocked && self.unlock_until == Some(deadline) {
            self.lock();
            true
        } else {
            false
        }
    }

    /// Persists the "remember unlock" preference. Turning it off clears the
    /// session value.
    pub fn set_remember_ttl(&mut self, enabled: bool) -> AppResult<()> {
        let mut settings = self.settings.clone();
        settings.remember_ttl = enabled;
        self.prefs.set_json(PREF_VAULT, &settings)?;
        self.settings = settings;

        if !enabled {
            self.clear_session_expiry();
        }
        Ok(())
    }

    /// Persists the blur preference for hidden thumbnails.
    pub fn set_blur_hidden(&mut self, enabled: bool) -> AppResult<()> {
        let mut settings = self.settings.clone();
        settings.blur_hidden = enabled;
        self.prefs.set_json(PREF_VAULT, &settings)?;
        self.settings = settings;
        Ok(())
    }

    fn read_session_expiry(&self) -> Option<DateTime<Utc>> {
        let raw = self.session.get(SESSION_UNLOCK_UNTIL)?;
        let millis = raw.trim().parse::<i64>().ok()?;
        DateTime::<Utc>::from_timestamp_millis(millis)
    }

    fn write_session_expiry(&self, until: DateTime<Utc>) {
        if let Err(e) = self
            .session
            .set(SESSION_UNLOCK_UNTIL, &until.timestamp_millis().to_string())
        {
            warn!("Could not remember vault unlock: {}", e);
        }
    }

    fn clear_session_expiry(&self) {
        if let Err(e) = self.session.remove(SESSION_UNLOCK_UNTIL) {
            warn!("Could not clear remembered vault unlock: {}", e);
        }
    }
}
