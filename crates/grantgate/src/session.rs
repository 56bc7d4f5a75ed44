//! Patron sessions.
//!
//! Establishing a session (the OAuth exchange) happens elsewhere. The gate
//! only asks a [`SessionAuthenticator`] who, if anyone, is behind a request.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::request::ExclusiveRequest;

/// An authenticated patron.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatronSession {
    pub patron_user_id: String,
}

impl PatronSession {
    pub fn new(patron_user_id: impl Into<String>) -> Self {
        Self {
            patron_user_id: patron_user_id.into(),
        }
    }
}

/// Resolves the session behind a request.
#[async_trait]
pub trait SessionAuthenticator: Send + Sync {
    async fn authenticate(&self, request: &ExclusiveRequest) -> Option<PatronSession>;
}

/// Map-backed sessions keyed by session id.
#[derive(Debug, Default)]
pub struct StaticSessions {
    sessions: RwLock<HashMap<String, PatronSession>>,
}

impl StaticSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session_id: impl Into<String>, session: PatronSession) {
        self.sessions.write().await.insert(session_id.into(), session);
    }

    pub async fn remove(&self, session_id: &str) -> Option<PatronSession> {
        self.sessions.write().await.remove(session_id)
    }
}

#[async_trait]
impl SessionAuthenticator for StaticSessions {
    async fn authenticate(&self, request: &ExclusiveRequest) -> Option<PatronSession> {
        let session_id = request.session_id.as_deref()?;
        self.sessions.read().await.get(session_id).cloned()
    }
}
