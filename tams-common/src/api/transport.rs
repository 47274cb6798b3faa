//! Authenticated HTTP transport for the TAMS REST backend
//!
//! Every request carries `Authorization: Bearer <access>`. A 401 response
//! triggers exactly one token refresh followed by one retry; a second 401 is
//! reported as [`TransportError::Unauthorized`]. Timeouts come from the
//! `reqwest` client built from [`BackendConfig`].

use crate::api::session::SessionContext;
use crate::api::types::{ApiErrorBody, RefreshRequest, RefreshResponse};
use crate::config::BackendConfig;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const REFRESH_PATH: &str = "/auth/token/refresh/";

/// Transport-level failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API error {status}: {}", .body.message_or_default())]
    Status { status: u16, body: ApiErrorBody },

    #[error("Decode error: {0}")]
    Decode(String),
}

impl TransportError {
    /// HTTP status for `Status` errors
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// REST transport bound to one backend and one session
pub struct ApiTransport {
    http_client: reqwest::Client,
    base_url: String,
    session: Arc<SessionContext>,
}

impl ApiTransport {
    pub fn new(config: &BackendConfig, session: Arc<SessionContext>) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path (`path` starts with `/`)
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET and decode a JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TransportError> {
        let response = self.execute(Method::GET, path, query, None).await?;
        decode(response).await
    }

    /// POST a JSON body; returns the response body if there is one
    pub async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<Value>, TransportError> {
        let body = encode(body)?;
        let response = self.execute(Method::POST, path, &[], Some(&body)).await?;
        optional_body(response).await
    }

    /// PATCH a JSON body; returns the response body if there is one
    pub async fn patch_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<Value>, TransportError> {
        let body = encode(body)?;
        let response = self.execute(Method::PATCH, path, &[], Some(&body)).await?;
        optional_body(response).await
    }

    /// Send a request, refreshing the session once on 401
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Response, TransportError> {
        let url = self.url(path);
        let mut refreshed = false;

        loop {
            let access = self.session.access_token().await;

            let mut request = self.http_client.request(method.clone(), &url);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(token) = &access {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(method = %method, url = %url, "Sending backend request");

            let response = request
                .send()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;

            let status = response.status();

            if status == StatusCode::UNAUTHORIZED {
                if refreshed {
                    warn!(url = %url, "Request still unauthorized after token refresh");
                    return Err(TransportError::Unauthorized(
                        "credentials rejected after token refresh".to_string(),
                    ));
                }
                self.refresh_session(access.as_deref()).await?;
                refreshed = true;
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                let body = ApiErrorBody::parse(&text);
                debug!(
                    url = %url,
                    status = status.as_u16(),
                    code = ?body.code,
                    "Backend returned error status"
                );
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            return Ok(response);
        }
    }

    /// Exchange the refresh token for a new access token
    ///
    /// `stale_access` is the token that was rejected. If another request
    /// already replaced it, no second refresh is issued.
    async fn refresh_session(&self, stale_access: Option<&str>) -> Result<(), TransportError> {
        let _guard = self.session.refresh_lock.lock().await;

        let current = self.session.snapshot().await;
        if current.access.is_some() && current.access.as_deref() != stale_access {
            debug!("Access token already refreshed by a concurrent request");
            return Ok(());
        }

        let refresh = current.refresh.ok_or_else(|| {
            TransportError::Unauthorized("no refresh token available".to_string())
        })?;

        let response = self
            .http_client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest { refresh })
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Token refresh rejected");
            return Err(TransportError::Unauthorized(format!(
                "token refresh rejected ({})",
                status.as_u16()
            )));
        }

        let tokens: RefreshResponse = decode(response).await?;
        self.session.store_refreshed(tokens).await;
        info!("Access token refreshed");
        Ok(())
    }
}

fn encode<B: Serialize>(body: &B) -> Result<Value, TransportError> {
    serde_json::to_value(body).map_err(|e| TransportError::Decode(e.to_string()))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let text = response
        .text()
        .await
        .map_err(|e| TransportError::Network(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))
}

async fn optional_body(response: Response) -> Result<Option<Value>, TransportError> {
    let text = response
        .text()
        .await
        .map_err(|e| TransportError::Network(e.to_string()))?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| TransportError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation_and_url() {
        let config = BackendConfig {
            base_url: "https://tams.example.edu/api/".to_string(),
            ..BackendConfig::default()
        };
        let transport = ApiTransport::new(&config, Arc::new(SessionContext::default())).unwrap();

        assert_eq!(transport.base_url(), "https://tams.example.edu/api");
        assert_eq!(
            transport.url("/exams/7/"),
            "https://tams.example.edu/api/exams/7/"
        );
    }

    #[test]
    fn test_status_error_display_uses_message() {
        let err = TransportError::Status {
            status: 409,
            body: ApiErrorBody::new("already_assigned", "Exam already has proctors"),
        };
        assert_eq!(err.to_string(), "API error 409: Exam already has proctors");
        assert_eq!(err.status(), Some(409));
        assert_eq!(TransportError::Network("x".to_string()).status(), None);
    }
}
