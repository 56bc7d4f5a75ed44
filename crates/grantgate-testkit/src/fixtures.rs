//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use grantgate::{
    ExclusiveGate, ExclusiveRequest, GateConfig, IssuedGrant, PassthroughFilter, PatronSession,
    StaticSessions,
};
use grantgate_core::{encode_token, AuthenticatedEncrypter, GrantId, GrantInfo, GrantKey, GrantType};
use grantgate_store::{AuditLog, GrantStore, MemoryStore, RecordedDownloadEvent};
use tempfile::TempDir;
use url::Url;

pub const CREATOR_ID: &str = "creator-1";
pub const CREATOR_SESSION: &str = "creator-session";
pub const PATRON_ID: &str = "patron-42";
pub const PATRON_SESSION: &str = "patron-session";
pub const CLIENT_IP: &str = "203.0.113.9";
pub const BASE_URL: &str = "https://downloads.example.com/";

/// Key used by every fixture, so tokens are reproducible across runs.
pub const FIXTURE_KEY: GrantKey = GrantKey::from_bytes([42; 32]);

/// A gate over a temporary content root, with one creator and one patron
/// session registered.
pub struct TestFixture<S = MemoryStore> {
    pub dir: TempDir,
    pub config: GateConfig,
    pub gate: ExclusiveGate<S>,
}

impl TestFixture<MemoryStore> {
    /// Create a fixture backed by a memory store.
    pub async fn new() -> Self {
        Self::with_store(MemoryStore::new()).await
    }
}

impl<S: GrantStore + AuditLog + 'static> TestFixture<S> {
    /// Create a fixture backed by `store`.
    pub async fn with_store(store: S) -> Self {
        let dir = tempfile::tempdir().expect("create content root");
        let config = GateConfig::new(
            FIXTURE_KEY,
            CREATOR_ID,
            dir.path(),
            Url::parse(BASE_URL).expect("valid base url"),
        );

        let sessions = StaticSessions::new();
        sessions.insert(CREATOR_SESSION, PatronSession::new(CREATOR_ID)).await;
        sessions.insert(PATRON_SESSION, PatronSession::new(PATRON_ID)).await;

        let gate = ExclusiveGate::new(&config, store, PassthroughFilter, sessions);
        Self { dir, config, gate }
    }

    /// Write a file into the content root.
    pub fn write_file(&self, name: &str, contents: &[u8]) {
        std::fs::write(self.dir.path().join(name), contents).expect("write content file");
    }

    /// Request path for a file under the route prefix.
    pub fn path(&self, file_name: &str) -> String {
        format!("{}{}", self.config.route_prefix, file_name)
    }

    /// An anonymous request for `file_name`.
    pub fn request(&self, file_name: &str) -> ExclusiveRequest {
        ExclusiveRequest::new(self.path(file_name), CLIENT_IP)
    }

    /// A request for `file_name` from the creator's session.
    pub fn creator_request(&self, file_name: &str) -> ExclusiveRequest {
        self.request(file_name).with_session(CREATOR_SESSION)
    }

    /// A request for `file_name` from the patron's session.
    pub fn patron_request(&self, file_name: &str) -> ExclusiveRequest {
        self.request(file_name).with_session(PATRON_SESSION)
    }

    /// Mint a creator grant for `file_name`.
    pub async fn issue(&self, file_name: &str, tag: &str, hours: f32) -> IssuedGrant {
        self.gate
            .issue_grant(&self.path(file_name), tag, GrantType::Creator, hours)
            .await
            .expect("issue grant")
    }

    /// Seal a token for an arbitrary grant id under the fixture key.
    pub fn token_for(&self, grant_id: GrantId) -> String {
        encode_token(&AuthenticatedEncrypter::new(&FIXTURE_KEY), &GrantInfo::new(grant_id))
            .expect("encode token")
    }

    /// All recorded download events, oldest first.
    pub async fn events(&self) -> Vec<RecordedDownloadEvent> {
        self.gate
            .store()
            .list_download_events(None)
            .await
            .expect("list events")
    }
}
