//! Session context holding bearer credentials
//!
//! One `SessionContext` is created per client and shared (via `Arc`) with
//! the transport. Only the transport replaces tokens, and only while holding
//! the refresh lock, so concurrent 401s trigger a single refresh.

use crate::config::AuthConfig;
use crate::api::types::RefreshResponse;
use tokio::sync::{Mutex, RwLock};

/// Access/refresh token pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTokens {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

/// Explicit session state injected into the transport
#[derive(Debug, Default)]
pub struct SessionContext {
    tokens: RwLock<SessionTokens>,
    /// Serializes refresh attempts
    pub(crate) refresh_lock: Mutex<()>,
}

impl SessionContext {
    pub fn new(tokens: SessionTokens) -> Self {
        Self {
            tokens: RwLock::new(tokens),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(SessionTokens {
            access: auth.access_token.clone(),
            refresh: auth.refresh_token.clone(),
        })
    }

    /// Current access token, if any
    pub async fn access_token(&self) -> Option<String> {
        self.tokens.read().await.access.clone()
    }

    pub async fn snapshot(&self) -> SessionTokens {
        self.tokens.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.read().await.access.is_some()
    }

    /// Store the result of a refresh, keeping the old refresh token unless
    /// the backend rotated it
    pub(crate) async fn store_refreshed(&self, response: RefreshResponse) {
        let mut tokens = self.tokens.write().await;
        tokens.access = Some(response.access);
        if let Some(refresh) = response.refresh {
            tokens.refresh = Some(refresh);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config() {
        let session = SessionContext::from_config(&AuthConfig {
            access_token: Some("a1".to_string()),
            refresh_token: Some("r1".to_string()),
        });

        assert!(session.is_authenticated().await);
        assert_eq!(session.access_token().await.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_store_refreshed_keeps_unrotated_refresh_token() {
        let session = SessionContext::new(SessionTokens {
            access: Some("old".to_string()),
            refresh: Some("r1".to_string()),
        });

        session
            .store_refreshed(RefreshResponse {
                access: "new".to_string(),
                refresh: None,
            })
            .await;

        let tokens = session.snapshot().await;
        assert_eq!(tokens.access.as_deref(), Some("new"));
        assert_eq!(tokens.refresh.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_unauthenticated_by_default() {
        let session = SessionContext::default();
        assert!(!session.is_authenticated().await);
    }
}
