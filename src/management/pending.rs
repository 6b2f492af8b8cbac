use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio::sync::Mutex;

use crate::utils;

/// How long a user has to come back from the Spotify consent screen.
pub const AUTHORIZATION_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PendingError {
    #[error("unknown, expired or already used authorization state")]
    Unknown,

    #[error("authorization state belongs to another user")]
    ForeignUser,
}

/// An authorization that was started but not yet completed.
#[derive(Debug, Clone)]
pub struct PkceToken {
    pub user_id: String,
    pub code_verifier: String,
    pub created_at: Instant,
}

/// Server-side map from OAuth `state` nonces to the users that started them.
///
/// Nonces are random, single-use and expire after [`AUTHORIZATION_TTL`].
#[derive(Debug, Clone)]
pub struct PendingAuthorizations {
    inner: Arc<Mutex<HashMap<String, PkceToken>>>,
    ttl: Duration,
}

impl Default for PendingAuthorizations {
    fn default() -> Self {
        Self::new(AUTHORIZATION_TTL)
    }
}

impl PendingAuthorizations {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Registers a new authorization for `user_id`.
    ///
    /// Returns the `state` nonce and the PKCE code verifier.
    pub async fn begin(&self, user_id: &str) -> (String, String) {
        let state = utils::generate_state();
        let code_verifier = utils::generate_code_verifier();

        let mut lock = self.inner.lock().await;
        let ttl = self.ttl;
        lock.retain(|_, pending| pending.created_at.elapsed() < ttl);
        lock.insert(
            state.clone(),
            PkceToken {
                user_id: user_id.to_string(),
                code_verifier: code_verifier.clone(),
                created_at: Instant::now(),
            },
        );

        (state, code_verifier)
    }

    /// Consumes `state` and returns its code verifier.
    ///
    /// The nonce is removed whatever the outcome, so it can never be
    /// replayed.
    pub async fn complete(&self, state: &str, user_id: &str) -> Result<String, PendingError> {
        let pending = self
            .inner
            .lock()
            .await
            .remove(state)
            .ok_or(PendingError::Unknown)?;

        if pending.created_at.elapsed() >= self.ttl {
            return Err(PendingError::Unknown);
        }
        if pending.user_id != user_id {
            return Err(PendingError::ForeignUser);
        }

        Ok(pending.code_verifier)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn state_is_single_use() {
        let pending = PendingAuthorizations::default();
        let (state, verifier) = pending.begin("user-1").await;

        assert_eq!(pending.complete(&state, "user-1").await, Ok(verifier));
        assert_eq!(
            pending.complete(&state, "user-1").await,
            Err(PendingError::Unknown)
        );
    }

    #[tokio::test]
    async fn state_is_bound_to_its_user() {
        let pending = PendingAuthorizations::default();
        let (state, _) = pending.begin("user-1").await;

        assert_eq!(
            pending.complete(&state, "user-2").await,
            Err(PendingError::ForeignUser)
        );
        // the nonce is burnt even though the attempt failed
        assert_eq!(
            pending.complete(&state, "user-1").await,
            Err(PendingError::Unknown)
        );
    }

    #[tokio::test]
    async fn expired_states_are_rejected_and_pruned() {
        let pending = PendingAuthorizations::new(Duration::from_millis(10));
        let (state, _) = pending.begin("user-1").await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(
            pending.complete(&state, "user-1").await,
            Err(PendingError::Unknown)
        );

        pending.begin("user-1").await;
        pending.begin("user-2").await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        pending.begin("user-3").await;
        assert_eq!(pending.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_state_is_rejected() {
        let pending = PendingAuthorizations::default();
        assert_eq!(
            pending.complete("nope", "user-1").await,
            Err(PendingError::Unknown)
        );
    }
}
