//! The gate: one entry point for exclusive-content requests.
//!
//! The gate brings together sessions, grant validation, access decisions
//! and audited delivery. A front end parses the HTTP request into an
//! [`ExclusiveRequest`], hands the gate a [`ResponseSink`], and maps any
//! [`GateError`] to a status code.

use std::borrow::Cow;
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use tracing::{debug, info};
use url::Url;

use grantgate_core::GrantType;
use grantgate_store::{AuditLog, GrantStore, SqliteStore};

use crate::authenticator::{GrantAuthenticator, GrantValidation};
use crate::codec::{GrantCodec, IssuedGrant};
use crate::config::GateConfig;
use crate::decision::{AccessDecisionEngine, AuthResult};
use crate::delivery::{ContentDeliveryPipeline, DeliveryReport};
use crate::error::{CredentialFailure, GateError, Result};
use crate::filter::{ContentFilter, PassthroughFilter};
use crate::request::{ExclusiveRequest, EXPIRES_PARAM, GRANT_PARAM, GRANT_TAG_PARAM};
use crate::response::ResponseSink;
use crate::session::{PatronSession, SessionAuthenticator, StaticSessions};

/// What the gate did with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResponse {
    /// The creator asked for a grant link; nothing was streamed.
    GrantLink(IssuedGrant),
    /// The file was streamed and its download recorded.
    Delivered(DeliveryReport),
}

/// Gates exclusive files behind sessions and grant links.
pub struct ExclusiveGate<S, F = PassthroughFilter, P = StaticSessions> {
    store: Arc<S>,
    codec: GrantCodec<S>,
    authenticator: GrantAuthenticator<S>,
    decisions: AccessDecisionEngine,
    pipeline: ContentDeliveryPipeline<S, F>,
    sessions: P,
    public_base_url: Url,
    route_prefix: String,
    default_grant_hours: f32,
}

impl ExclusiveGate<SqliteStore> {
    /// Open the configured database and build a gate with passthrough
    /// delivery and an empty session table.
    pub fn open(config: &GateConfig) -> Result<Self> {
        let store = SqliteStore::open(&config.database_path)?;
        Ok(Self::new(config, store, PassthroughFilter, StaticSessions::new()))
    }
}

impl<S, F, P> ExclusiveGate<S, F, P>
where
    S: GrantStore + AuditLog + 'static,
    F: ContentFilter,
    P: SessionAuthenticator,
{
    pub fn new(config: &GateConfig, store: S, filter: F, sessions: P) -> Self {
        let store = Arc::new(store);
        let codec = GrantCodec::new(&config.grant_key, Arc::clone(&store));

        Self {
            authenticator: GrantAuthenticator::new(codec.clone()),
            codec,
            decisions: AccessDecisionEngine::new(config.creator_id.clone()),
            pipeline: ContentDeliveryPipeline::new(
                config.exclusive_root.clone(),
                Arc::clone(&store),
                Arc::new(filter),
            ),
            sessions,
            public_base_url: config.public_base_url.clone(),
            route_prefix: config.route_prefix.clone(),
            default_grant_hours: config.default_grant_hours,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn codec(&self) -> &GrantCodec<S> {
        &self.codec
    }

    pub fn sessions(&self) -> &P {
        &self.sessions
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Requests
    // ─────────────────────────────────────────────────────────────────────────

    /// Handle one request for an exclusive file.
    ///
    /// A creator session with `grant_tag` gets a grant link back instead of
    /// the file. Otherwise the request must carry a session or a valid grant
    /// for this exact path; the file is then streamed into `sink` and the
    /// download recorded.
    pub async fn handle<W>(&self, request: &ExclusiveRequest, sink: &mut W) -> Result<GateResponse>
    where
        W: ResponseSink + ?Sized,
    {
        let file_name = self.file_name(&request.path)?;
        let session = self.sessions.authenticate(request).await;

        if let (Some(session), Some(tag)) = (&session, request.param(GRANT_TAG_PARAM)) {
            if self.decisions.is_creator(session) {
                let hours = self.grant_hours(request.param(EXPIRES_PARAM))?;
                let issued = self
                    .issue_grant(&request.path, tag, GrantType::Creator, hours)
                    .await?;
                return Ok(GateResponse::GrantLink(issued));
            }
        }

        let auth = self.authenticate(request, session).await?;
        let decision = self.decisions.decide(&auth, request)?;

        debug!(
            path = %request.path,
            access_type = %decision.access_type,
            tag = %decision.tag,
            "serving exclusive file"
        );

        let report = self
            .pipeline
            .serve(&file_name, &decision, &request.client_ip, sink)
            .await?;
        Ok(GateResponse::Delivered(report))
    }

    async fn authenticate(
        &self,
        request: &ExclusiveRequest,
        session: Option<PatronSession>,
    ) -> Result<AuthResult> {
        // A session wins; grants are not checked or counted for it.
        if let Some(session) = session {
            return Ok(AuthResult::Session(session));
        }

        let validation = self
            .authenticator
            .validate(&request.path, request.param(GRANT_PARAM))
            .await?;

        match validation {
            GrantValidation::Valid(grant) => Ok(AuthResult::Grant(grant)),
            GrantValidation::NoCredentials => {
                debug!(path = %request.path, "no credentials");
                Err(GateError::Unauthorized(CredentialFailure::NoCredentials))
            }
            GrantValidation::InvalidCredentials => {
                Err(GateError::Unauthorized(CredentialFailure::InvalidCredentials))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grants
    // ─────────────────────────────────────────────────────────────────────────

    /// Mint a grant for `request_path` and return its canonical link.
    ///
    /// Used for creator links and by purchase handlers.
    pub async fn issue_grant(
        &self,
        request_path: &str,
        tag: &str,
        grant_type: GrantType,
        duration_hours: f32,
    ) -> Result<IssuedGrant> {
        self.file_name(request_path)?;

        let issued = self
            .codec
            .generate_url(
                &self.public_base_url,
                request_path,
                tag,
                grant_type,
                duration_hours,
            )
            .await?;

        info!(
            grant_id = %issued.grant.id,
            url = %issued.url,
            "grant link ready"
        );
        Ok(issued)
    }

    fn grant_hours(&self, expires: Option<&str>) -> Result<f32> {
        let Some(raw) = expires else {
            return Ok(self.default_grant_hours);
        };

        match raw.trim().parse::<f32>() {
            Ok(hours) if hours.is_finite() => Ok(hours),
            _ => Err(GateError::InvalidParameter {
                name: EXPIRES_PARAM,
                value: raw.to_string(),
            }),
        }
    }

    /// Decoded file name under the route prefix.
    ///
    /// Grants stay bound to the raw request path; only the name handed to
    /// the pipeline is decoded.
    fn file_name<'a>(&self, request_path: &'a str) -> Result<Cow<'a, str>> {
        let not_found = || GateError::NotFound(request_path.to_string());
        let encoded = request_path
            .strip_prefix(self.route_prefix.as_str())
            .ok_or_else(not_found)?;
        percent_decode_str(encoded)
            .decode_utf8()
            .map_err(|_| not_found())
    }
}
