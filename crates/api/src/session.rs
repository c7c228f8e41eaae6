//! Session resolution at the boundary.
//!
//! The account/session component is out of scope; this module is its
//! contract. A resolved [`Session`] is an explicit value the handler threads
//! into its checks: the CSRF token travels in the request body and is
//! compared here, never read from ambient state further down.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use common::UserId;

use crate::error::ApiError;

/// A resolved session: who is calling, and the CSRF token their session
/// carries.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub csrf_token: String,
}

impl Session {
    /// Compares the CSRF token supplied in a request body against the
    /// session's.
    pub fn require_csrf(&self, supplied: &str) -> Result<(), ApiError> {
        if self.csrf_token != supplied {
            return Err(ApiError::CsrfMismatch);
        }
        Ok(())
    }
}

/// Resolves bearer tokens into sessions.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Resolves a bearer token. `None` means the token is unknown or
    /// expired.
    async fn resolve(&self, token: &str) -> Option<Session>;
}

/// Resolves the calling user from the `Authorization: Bearer` header.
pub async fn current_session(
    sessions: &dyn SessionService,
    headers: &HeaderMap,
) -> Result<Session, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("no session".to_string()))?;

    sessions
        .resolve(token)
        .await
        .ok_or_else(|| ApiError::Unauthorized("no session".to_string()))
}

/// A session issued by [`StaticSessions`].
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// The bearer token identifying the session.
    pub token: String,
    /// The CSRF token the client must echo in mutating request bodies.
    pub csrf_token: String,
}

/// In-process session store.
///
/// Stands in for the real session component in the binary and in tests.
#[derive(Debug, Default)]
pub struct StaticSessions {
    sessions: RwLock<HashMap<String, Session>>,
}

impl StaticSessions {
    /// Creates an empty session store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a session for a user and returns its tokens.
    pub fn issue(&self, user_id: UserId) -> IssuedSession {
        let token = uuid::Uuid::new_v4().to_string();
        let csrf_token = uuid::Uuid::new_v4().to_string();
        self.sessions.write().unwrap().insert(
            token.clone(),
            Session {
                user_id,
                csrf_token: csrf_token.clone(),
            },
        );
        IssuedSession { token, csrf_token }
    }
}

#[async_trait]
impl SessionService for StaticSessions {
    async fn resolve(&self, token: &str) -> Option<Session> {
        self.sessions.read().unwrap().get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issued_sessions_resolve() {
        let sessions = StaticSessions::new();
        let issued = sessions.issue(UserId::new(7));

        let session = sessions.resolve(&issued.token).await.unwrap();
        assert_eq!(session.user_id, UserId::new(7));
        assert!(session.require_csrf(&issued.csrf_token).is_ok());
        assert!(session.require_csrf("wrong").is_err());
    }

    #[tokio::test]
    async fn unknown_tokens_do_not_resolve() {
        let sessions = StaticSessions::new();
        assert!(sessions.resolve("nope").await.is_none());
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let sessions = StaticSessions::new();
        let headers = HeaderMap::new();
        let result = current_session(&sessions, &headers).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }
}
