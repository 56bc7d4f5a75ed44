//! Deciding which identity a download is attributed to.

use tracing::error;

use grantgate_core::{AccessDecision, AccessType, Grant};

use crate::error::{GateError, Result};
use crate::request::{ExclusiveRequest, ID_PARAM};
use crate::session::PatronSession;

/// How a request was authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Session(PatronSession),
    Grant(Grant),
    /// Not authenticated. The gate never lets such a request through to
    /// delivery; reaching the decision engine with it is a bug.
    None,
}

/// Maps an authenticated request to an [`AccessDecision`].
#[derive(Debug, Clone)]
pub struct AccessDecisionEngine {
    creator_id: String,
}

impl AccessDecisionEngine {
    pub fn new(creator_id: impl Into<String>) -> Self {
        Self {
            creator_id: creator_id.into(),
        }
    }

    pub fn is_creator(&self, session: &PatronSession) -> bool {
        session.patron_user_id == self.creator_id
    }

    /// Decide the access type and tag for a download.
    ///
    /// A creator session that names an `id` is recorded as a creator access
    /// under that tag. Every other session, the creator's included, is
    /// recorded under its own user id. A grant is recorded under its tag.
    pub fn decide(&self, auth: &AuthResult, request: &ExclusiveRequest) -> Result<AccessDecision> {
        match auth {
            AuthResult::Session(session) if self.is_creator(session) => {
                match request.param(ID_PARAM) {
                    Some(tag) => Ok(AccessDecision::new(AccessType::Creator, tag)),
                    None => Ok(AccessDecision::new(
                        AccessType::User,
                        session.patron_user_id.clone(),
                    )),
                }
            }
            AuthResult::Session(session) => Ok(AccessDecision::new(
                AccessType::User,
                session.patron_user_id.clone(),
            )),
            AuthResult::Grant(grant) => Ok(AccessDecision::new(
                AccessType::from(grant.grant_type),
                grant.tag.clone(),
            )),
            AuthResult::None => {
                error!(path = %request.path, "request reached access decision without authentication");
                Err(GateError::InvariantViolation(
                    "no session or grant for download".to_string(),
                ))
            }
        }
    }
}
