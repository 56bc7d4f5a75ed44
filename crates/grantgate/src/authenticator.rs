//! Grant token validation.

use tracing::debug;

use grantgate_core::{now_millis, Grant};
use grantgate_store::{GrantAccess, GrantStore};

use crate::codec::GrantCodec;
use crate::error::{CredentialFailure, Result};

/// Outcome of validating the grant on a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantValidation {
    /// No token presented.
    NoCredentials,
    /// Token malformed, unknown, bound to another path, or expired.
    InvalidCredentials,
    /// Token accepted. Holds the grant with its counters already bumped.
    Valid(Grant),
}

impl GrantValidation {
    pub fn into_result(self) -> std::result::Result<Grant, CredentialFailure> {
        match self {
            GrantValidation::Valid(grant) => Ok(grant),
            GrantValidation::NoCredentials => Err(CredentialFailure::NoCredentials),
            GrantValidation::InvalidCredentials => Err(CredentialFailure::InvalidCredentials),
        }
    }
}

/// Validates grant tokens against the request path and the clock.
///
/// Parsing, the path and expiry checks, and the access-count update run as
/// one step; a token that passes has already been counted.
pub struct GrantAuthenticator<S> {
    codec: GrantCodec<S>,
}

impl<S: GrantStore> GrantAuthenticator<S> {
    pub fn new(codec: GrantCodec<S>) -> Self {
        Self { codec }
    }

    /// Validate `token` for `request_path` now.
    pub async fn validate(&self, request_path: &str, token: Option<&str>) -> Result<GrantValidation> {
        self.validate_at(request_path, token, now_millis()).await
    }

    /// Validate `token` for `request_path` as of `now`.
    ///
    /// Storage failures are errors, not rejections.
    pub async fn validate_at(
        &self,
        request_path: &str,
        token: Option<&str>,
        now: i64,
    ) -> Result<GrantValidation> {
        let Some(token) = token else {
            return Ok(GrantValidation::NoCredentials);
        };

        let info = match self.codec.parse(token) {
            Ok(info) => info,
            Err(_) => {
                debug!(path = request_path, "rejected malformed grant token");
                return Ok(GrantValidation::InvalidCredentials);
            }
        };

        let access = self
            .codec
            .store()
            .record_grant_access(info.grant_id, request_path, now)
            .await?;

        match access {
            GrantAccess::Granted(grant) => {
                debug!(
                    grant_id = %grant.id,
                    access_count = grant.access_count,
                    "accepted grant"
                );
                Ok(GrantValidation::Valid(grant))
            }
            other => {
                debug!(
                    grant_id = %info.grant_id,
                    path = request_path,
                    reason = other.as_str(),
                    "rejected grant"
                );
                Ok(GrantValidation::InvalidCredentials)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use grantgate_core::{encode_token, AuthenticatedEncrypter, GrantInfo, GrantKey, GrantType, NewGrant};
    use grantgate_store::MemoryStore;

    const KEY: GrantKey = GrantKey::from_bytes([3; 32]);

    fn setup() -> (Arc<MemoryStore>, GrantAuthenticator<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let auth = GrantAuthenticator::new(GrantCodec::new(&KEY, Arc::clone(&store)));
        (store, auth)
    }

    async fn token_for(store: &MemoryStore, path: &str, expire_time: i64) -> String {
        let grant = store
            .create_grant(NewGrant::new(path, "t", GrantType::Creator, expire_time))
            .await
            .unwrap();
        encode_token(&AuthenticatedEncrypter::new(&KEY), &GrantInfo::new(grant.id)).unwrap()
    }

    #[tokio::test]
    async fn test_missing_token() {
        let (_, auth) = setup();
        let result = auth.validate("/exclusive/a", None).await.unwrap();
        assert_eq!(result, GrantValidation::NoCredentials);
    }

    #[tokio::test]
    async fn test_valid_token_counts_access() {
        let (store, auth) = setup();
        let token = token_for(&store, "/exclusive/a", 10_000).await;

        let grant = auth
            .validate_at("/exclusive/a", Some(&token), 5_000)
            .await
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(grant.access_count, 1);
        assert_eq!(grant.last_access_time, Some(5_000));
    }

    #[tokio::test]
    async fn test_rejections_are_uniform() {
        let (store, auth) = setup();
        let token = token_for(&store, "/exclusive/a", 10_000).await;

        let wrong_path = auth.validate_at("/exclusive/b", Some(&token), 5_000).await.unwrap();
        let expired = auth.validate_at("/exclusive/a", Some(&token), 10_000).await.unwrap();
        let garbage = auth.validate_at("/exclusive/a", Some("AAAA"), 5_000).await.unwrap();

        assert_eq!(wrong_path, GrantValidation::InvalidCredentials);
        assert_eq!(expired, GrantValidation::InvalidCredentials);
        assert_eq!(garbage, GrantValidation::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_rejection_does_not_count() {
        let (store, auth) = setup();
        let token = token_for(&store, "/exclusive/a", 10_000).await;

        auth.validate_at("/exclusive/b", Some(&token), 5_000).await.unwrap();

        let grant = store.find_grant(1.into()).await.unwrap().unwrap();
        assert_eq!(grant.access_count, 0);
    }
}
