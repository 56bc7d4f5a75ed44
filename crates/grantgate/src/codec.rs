//! Minting and opening grant links.

use std::sync::Arc;

use tracing::info;
use url::Url;

use grantgate_core::{
    decode_token, encode_token, expiry_after_hours, now_millis, AuthenticatedEncrypter, Grant,
    GrantInfo, GrantKey, GrantType, NewGrant,
};
use grantgate_store::GrantStore;

use crate::error::Result;
use crate::request::GRANT_PARAM;

/// A freshly minted grant and the link that carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedGrant {
    pub grant: Grant,
    pub token: String,
    pub url: Url,
}

/// Creates grants and seals them into shareable links.
///
/// The link carries only the grant id. Everything else (path, tag, expiry)
/// stays server-side and is looked up on validation.
pub struct GrantCodec<S> {
    encrypter: AuthenticatedEncrypter,
    store: Arc<S>,
}

impl<S> Clone for GrantCodec<S> {
    fn clone(&self) -> Self {
        Self {
            encrypter: self.encrypter.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: GrantStore> GrantCodec<S> {
    pub fn new(key: &GrantKey, store: Arc<S>) -> Self {
        Self {
            encrypter: AuthenticatedEncrypter::new(key),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist a grant for `request_path` and return its canonical link.
    ///
    /// The link is `base_url` joined with `request_path`, with any existing
    /// query replaced by the single `grant` parameter. The grant is bound to
    /// the link's percent-encoded path.
    pub async fn generate_url(
        &self,
        base_url: &Url,
        request_path: &str,
        tag: &str,
        grant_type: GrantType,
        duration_hours: f32,
    ) -> Result<IssuedGrant> {
        let mut url = base_url.join(request_path)?;
        url.set_fragment(None);
        url.set_query(None);

        // Bind to the percent-encoded path, as requests arriving via the
        // link will present it.
        let expire_time = expiry_after_hours(now_millis(), duration_hours);
        let grant = self
            .store
            .create_grant(NewGrant::new(url.path(), tag, grant_type, expire_time))
            .await?;

        let token = encode_token(&self.encrypter, &GrantInfo::new(grant.id))?;
        url.query_pairs_mut().append_pair(GRANT_PARAM, &token);

        info!(
            grant_id = %grant.id,
            path = %grant.path,
            tag = %grant.tag,
            grant_type = %grant.grant_type,
            expire_time = grant.expire_time,
            "issued grant"
        );

        Ok(IssuedGrant { grant, token, url })
    }

    /// Open a sealed token. Every failure is reported as
    /// [`CoreError::InvalidToken`](grantgate_core::CoreError::InvalidToken).
    pub fn parse(&self, token: &str) -> grantgate_core::Result<GrantInfo> {
        decode_token(&self.encrypter, token)
    }

    /// Look up the grant behind a token without touching its counters.
    pub async fn find_grant(&self, token: &str) -> Result<Option<Grant>> {
        let info = self.parse(token)?;
        Ok(self.store.find_grant(info.grant_id).await?)
    }
}
