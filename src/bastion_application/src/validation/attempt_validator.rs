use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bastion_core::{
    AttemptStore, AuthRequest, AuthenticationError, AuthenticationValidator, HashGenerator,
    Identity, PostAuthenticationValidator, PreAuthenticationValidator, Reliability, SharedUser,
    expiry_cutoff,
};
use chrono::Utc;

use super::hash_generator::{RemoteAddressHashGenerator, RequestUriHashGenerator, TokenHashGenerator};

pub const DEFAULT_MAX_TRIALS: u32 = 3;
pub const DEFAULT_BLOCKED_INTERVAL: Duration = Duration::from_secs(900);
pub const DEFAULT_MAX_INACTIVE_INTERVAL: Duration = Duration::from_secs(900);

/// How the stored trial count is compared against the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdRule {
    /// Blocks once `trials > max`.
    Exceeds,
    /// Blocks once `trials >= max`.
    Reaches,
}

impl ThresholdRule {
    pub fn blocks(self, trials: u32, max_trials: u32) -> bool {
        match self {
            ThresholdRule::Exceeds => trials > max_trials,
            ThresholdRule::Reaches => trials >= max_trials,
        }
    }
}

// Store plus key derivation, shared by every attempt-based validator
#[derive(Clone)]
struct AttemptLedger {
    store: Arc<dyn AttemptStore>,
    hash_generator: Arc<dyn HashGenerator>,
}

impl AttemptLedger {
    fn key(&self, identity: &Identity, request: &dyn AuthRequest) -> String {
        self.hash_generator.generate(identity, request)
    }
}

/// Denies identities whose attempt record reached the trial limit.
///
/// Failed authentications increment the record, a successful one deletes it.
/// Records older than the blocked interval are swept before every check.
pub struct BruteForceValidator {
    name: String,
    ledger: AttemptLedger,
    max_trials: u32,
    blocked_interval: Duration,
    rule: ThresholdRule,
    enabled: AtomicBool,
}

impl BruteForceValidator {
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn AttemptStore>,
        hash_generator: Arc<dyn HashGenerator>,
        max_trials: u32,
        blocked_interval: Duration,
        rule: ThresholdRule,
    ) -> Self {
        Self {
            name: name.into(),
            ledger: AttemptLedger {
                store,
                hash_generator,
            },
            max_trials,
            blocked_interval,
            rule,
            enabled: AtomicBool::new(true),
        }
    }

    /// Counts attempts per client address, blocking once `trials > max_trials`.
    pub fn by_client_ip(
        store: Arc<dyn AttemptStore>,
        max_trials: u32,
        blocked_interval: Duration,
    ) -> Self {
        Self::new(
            "brute-force-client-ip",
            store,
            Arc::new(RemoteAddressHashGenerator),
            max_trials,
            blocked_interval,
            ThresholdRule::Exceeds,
        )
    }

    /// Counts attempts per requested path, blocking once `trials >= max_trials`.
    pub fn by_server_uri(
        store: Arc<dyn AttemptStore>,
        max_trials: u32,
        blocked_interval: Duration,
    ) -> Self {
        Self::new(
            "brute-force-server-uri",
            store,
            Arc::new(RequestUriHashGenerator),
            max_trials,
            blocked_interval,
            ThresholdRule::Reaches,
        )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn max_trials(&self) -> u32 {
        self.max_trials
    }

    pub fn blocked_interval(&self) -> Duration {
        self.blocked_interval
    }

    pub fn rule(&self) -> ThresholdRule {
        self.rule
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

impl AuthenticationValidator for BruteForceValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PreAuthenticationValidator for BruteForceValidator {
    #[tracing::instrument(
        name = "BruteForceValidator::grant_before_authentication",
        skip_all,
        fields(validator = %self.name)
    )]
    async fn grant_before_authentication(
        &self,
        identity: &Identity,
        request: &dyn AuthRequest,
    ) -> Result<bool, AuthenticationError> {
        self.ledger.store.clear_expired(self.blocked_interval).await?;

        let hash = self.ledger.key(identity, request);
        if let Some(attempt) = self.ledger.store.get(&hash).await? {
            if self.rule.blocks(attempt.trials(), self.max_trials) {
                tracing::debug!(trials = attempt.trials(), "Blocked by attempt limit");
                return Err(AuthenticationError::FailedAttempt {
                    validator: self.name.clone(),
                    attempt: Some(attempt),
                });
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl PostAuthenticationValidator for BruteForceValidator {
    #[tracing::instrument(
        name = "BruteForceValidator::grant_after_authentication",
        skip_all,
        fields(validator = %self.name, authenticated = user.is_some())
    )]
    async fn grant_after_authentication(
        &self,
        identity: &Identity,
        user: Option<&SharedUser>,
        request: &dyn AuthRequest,
    ) -> Result<bool, AuthenticationError> {
        let hash = self.ledger.key(identity, request);
        match user {
            Some(_) => self.ledger.store.clear(&hash).await?,
            None => {
                let attempt = self.ledger.store.increment(&hash).await?;
                tracing::debug!(trials = attempt.trials(), "Recorded failed attempt");
            }
        }
        Ok(true)
    }
}

/// Inactivity timer built on the attempt store.
///
/// Every request records activity for the identity. Identities at or below
/// [`Reliability::SESSION`] are logged out once their last activity is older
/// than the configured interval. Stronger identities are exempt.
pub struct AutoLogoutValidator {
    name: String,
    ledger: AttemptLedger,
    max_inactive_interval: Duration,
    enabled: AtomicBool,
}

impl AutoLogoutValidator {
    /// Tracks activity per identity token.
    pub fn new(store: Arc<dyn AttemptStore>, max_inactive_interval: Duration) -> Self {
        Self::with_hash_generator(store, Arc::new(TokenHashGenerator), max_inactive_interval)
    }

    pub fn with_hash_generator(
        store: Arc<dyn AttemptStore>,
        hash_generator: Arc<dyn HashGenerator>,
        max_inactive_interval: Duration,
    ) -> Self {
        Self {
            name: "auto-logout".to_string(),
            ledger: AttemptLedger {
                store,
                hash_generator,
            },
            max_inactive_interval,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn max_inactive_interval(&self) -> Duration {
        self.max_inactive_interval
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

impl AuthenticationValidator for AutoLogoutValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PreAuthenticationValidator for AutoLogoutValidator {
    #[tracing::instrument(
        name = "AutoLogoutValidator::grant_before_authentication",
        skip_all,
        fields(validator = %self.name)
    )]
    async fn grant_before_authentication(
        &self,
        identity: &Identity,
        request: &dyn AuthRequest,
    ) -> Result<bool, AuthenticationError> {
        if identity.reliability() > Reliability::SESSION {
            return Ok(true);
        }

        // No sweep here: an expired record is exactly what this check looks for
        let hash = self.ledger.key(identity, request);
        if let Some(last_activity) = self.ledger.store.get(&hash).await? {
            let cutoff = expiry_cutoff(Utc::now(), self.max_inactive_interval);
            if cutoff >= last_activity.timestamp() {
                tracing::debug!(last_activity = %last_activity.timestamp(), "Session expired");
                return Err(AuthenticationError::AutoLogout {
                    validator: self.name.clone(),
                });
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl PostAuthenticationValidator for AutoLogoutValidator {
    async fn grant_after_authentication(
        &self,
        identity: &Identity,
        _user: Option<&SharedUser>,
        request: &dyn AuthRequest,
    ) -> Result<bool, AuthenticationError> {
        let hash = self.ledger.key(identity, request);
        self.ledger.store.increment(&hash).await?;
        Ok(true)
    }
}
