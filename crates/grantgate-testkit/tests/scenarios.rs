//! End-to-end scenarios through the gate.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use grantgate::{
    AccessType, BufferedResponse, CredentialFailure, GateError, GateResponse, GrantAuthenticator,
    GrantValidation,
};
use grantgate_core::{digest_hex, now_millis, GrantType, NewGrant};
use grantgate_store::{AuditLog, GrantStore, SqliteStore};
use grantgate_testkit::{
    init_tracing, FailingSink, StallingSink, TestFixture, CLIENT_IP, CREATOR_ID, PATRON_ID,
    PATRON_SESSION,
};

const HOUR_MS: i64 = 3_600_000;

fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

async fn fixture_with_book() -> TestFixture {
    init_tracing();
    let fixture = TestFixture::new().await;
    fixture.write_file("book.pdf", &content(64 * 1024));
    fixture.write_file("other.pdf", b"another file");
    fixture
}

// ─────────────────────────────────────────────────────────────────────────────
// Grant links
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn creator_mints_grant_link() {
    let fixture = fixture_with_book().await;
    let request = fixture
        .creator_request("book.pdf")
        .with_param("grant_tag", "promo1")
        .with_param("expires", "0.5");

    let before = now_millis();
    let mut response = BufferedResponse::new();
    let GateResponse::GrantLink(issued) = fixture.gate.handle(&request, &mut response).await.unwrap()
    else {
        panic!("expected a grant link");
    };
    let after = now_millis();

    assert!(issued.url.as_str().contains("grant="));
    assert_eq!(issued.url.path(), "/exclusive/book.pdf");
    assert!(response.head().is_none());

    let token = issued
        .url
        .query_pairs()
        .find(|(k, _)| k == "grant")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    let grant = fixture.gate.codec().find_grant(&token).await.unwrap().unwrap();

    assert_eq!(grant.path, "/exclusive/book.pdf");
    assert_eq!(grant.tag, "promo1");
    assert_eq!(grant.grant_type, GrantType::Creator);
    assert!(grant.expire_time >= before + HOUR_MS / 2);
    assert!(grant.expire_time <= after + HOUR_MS / 2);
}

#[tokio::test]
async fn grant_link_defaults_to_48_hours() {
    let fixture = fixture_with_book().await;
    let request = fixture
        .creator_request("book.pdf")
        .with_param("grant_tag", "promo1");

    let before = now_millis();
    let GateResponse::GrantLink(issued) = fixture
        .gate
        .handle(&request, &mut BufferedResponse::new())
        .await
        .unwrap()
    else {
        panic!("expected a grant link");
    };

    assert!(issued.grant.expire_time >= before + 48 * HOUR_MS);
}

#[tokio::test]
async fn grant_round_trip() {
    let fixture = fixture_with_book().await;
    let issued = fixture.issue("book.pdf", "promo1", 1.0).await;

    let info = fixture.gate.codec().parse(&issued.token).unwrap();
    assert_eq!(info.grant_id, issued.grant.id);
}

#[tokio::test]
async fn grant_link_downloads_file() {
    let fixture = fixture_with_book().await;
    let issued = fixture.issue("book.pdf", "promo1", 1.0).await;

    let request = grantgate::ExclusiveRequest::from_url(&issued.url, CLIENT_IP);
    let mut response = BufferedResponse::new();
    let GateResponse::Delivered(report) = fixture.gate.handle(&request, &mut response).await.unwrap()
    else {
        panic!("expected a delivery");
    };

    assert_eq!(response.body(), content(64 * 1024).as_slice());
    assert_eq!(report.event.access_type, AccessType::Grant);
    assert_eq!(report.event.tag, "promo1");
    assert_eq!(report.event.client_ip, CLIENT_IP);

    let grant = fixture.gate.store().find_grant(issued.grant.id).await.unwrap().unwrap();
    assert_eq!(grant.access_count, 1);
    assert!(grant.last_access_time.is_some());
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn grant_is_bound_to_its_path() {
    let fixture = fixture_with_book().await;
    let issued = fixture.issue("book.pdf", "promo1", 1.0).await;

    let request = fixture
        .request("other.pdf")
        .with_param("grant", issued.token.as_str());
    let err = fixture
        .gate
        .handle(&request, &mut BufferedResponse::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GateError::Unauthorized(CredentialFailure::InvalidCredentials)
    ));
    assert!(fixture.events().await.is_empty());

    let grant = fixture.gate.store().find_grant(issued.grant.id).await.unwrap().unwrap();
    assert_eq!(grant.access_count, 0);
}

#[tokio::test]
async fn expiry_boundaries() {
    let fixture = fixture_with_book().await;
    let store = fixture.gate.store();
    let path = fixture.path("book.pdf");
    let now = now_millis();

    let expired = store
        .create_grant(NewGrant::new(&path, "old", GrantType::Creator, now - 1_000))
        .await
        .unwrap();
    let fresh = store
        .create_grant(NewGrant::new(&path, "new", GrantType::Creator, now + HOUR_MS))
        .await
        .unwrap();

    let request = fixture
        .request("book.pdf")
        .with_param("grant", fixture.token_for(expired.id));
    let err = fixture
        .gate
        .handle(&request, &mut BufferedResponse::new())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 401);

    let request = fixture
        .request("book.pdf")
        .with_param("grant", fixture.token_for(fresh.id));
    assert!(fixture
        .gate
        .handle(&request, &mut BufferedResponse::new())
        .await
        .is_ok());

    // At exactly expire_time the grant is already expired.
    let authenticator = GrantAuthenticator::new(fixture.gate.codec().clone());
    let token = fixture.token_for(fresh.id);
    let at_boundary = authenticator
        .validate_at(&path, Some(&token), fresh.expire_time)
        .await
        .unwrap();
    let just_before = authenticator
        .validate_at(&path, Some(&token), fresh.expire_time - 1)
        .await
        .unwrap();

    assert_eq!(at_boundary, GrantValidation::InvalidCredentials);
    assert!(matches!(just_before, GrantValidation::Valid(_)));
}

#[tokio::test]
async fn unauthorized_is_uniform() {
    let fixture = fixture_with_book().await;

    let none = fixture
        .gate
        .handle(&fixture.request("book.pdf"), &mut BufferedResponse::new())
        .await
        .unwrap_err();
    let bad = fixture
        .gate
        .handle(
            &fixture.request("book.pdf").with_param("grant", "not-a-token"),
            &mut BufferedResponse::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(none.status_code(), 401);
    assert_eq!(bad.status_code(), 401);
    assert_eq!(none.to_string(), bad.to_string());
    assert!(fixture.events().await.is_empty());
}

#[tokio::test]
async fn tampered_tokens_are_rejected() {
    let fixture = fixture_with_book().await;
    let issued = fixture.issue("book.pdf", "promo1", 1.0).await;
    let sealed = STANDARD.decode(&issued.token).unwrap();

    for i in 0..sealed.len() * 8 {
        let mut flipped = sealed.clone();
        flipped[i / 8] ^= 1 << (i % 8);

        let request = fixture
            .request("book.pdf")
            .with_param("grant", STANDARD.encode(&flipped));
        let err = fixture
            .gate
            .handle(&request, &mut BufferedResponse::new())
            .await
            .unwrap_err();

        assert!(
            matches!(err, GateError::Unauthorized(CredentialFailure::InvalidCredentials)),
            "bit {i}"
        );
    }

    let grant = fixture.gate.store().find_grant(issued.grant.id).await.unwrap().unwrap();
    assert_eq!(grant.access_count, 0);
}

#[tokio::test]
async fn concurrent_validations_are_all_counted() {
    init_tracing();
    let db_dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(db_dir.path().join("gate.db")).unwrap();
    let fixture = Arc::new(TestFixture::with_store(store).await);
    fixture.write_file("book.pdf", &content(4096));
    let issued = fixture.issue("book.pdf", "promo1", 1.0).await;

    const N: usize = 24;
    let before = now_millis();
    let mut handles = Vec::new();
    for _ in 0..N {
        let fixture = Arc::clone(&fixture);
        let url = issued.url.clone();
        handles.push(tokio::spawn(async move {
            let request = grantgate::ExclusiveRequest::from_url(&url, CLIENT_IP);
            fixture
                .gate
                .handle(&request, &mut BufferedResponse::new())
                .await
                .map(|_| ())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let grant = fixture.gate.store().find_grant(issued.grant.id).await.unwrap().unwrap();
    assert_eq!(grant.access_count, N as u64);
    assert!(grant.last_access_time.unwrap() >= before);
    assert_eq!(fixture.events().await.len(), N);
}

// ─────────────────────────────────────────────────────────────────────────────
// Access decisions
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn creator_override_tag() {
    let fixture = fixture_with_book().await;
    let issued = fixture.issue("book.pdf", "promo1", 1.0).await;
    let request = fixture
        .creator_request("book.pdf")
        .with_param("grant", issued.token.as_str())
        .with_param("id", "custom123");

    let GateResponse::Delivered(report) = fixture
        .gate
        .handle(&request, &mut BufferedResponse::new())
        .await
        .unwrap()
    else {
        panic!("expected a delivery");
    };

    assert_eq!(report.event.access_type, AccessType::Creator);
    assert_eq!(report.event.tag, "custom123");

    // The session authenticated the request; the grant was never consulted.
    let grant = fixture.gate.store().find_grant(issued.grant.id).await.unwrap().unwrap();
    assert_eq!(grant.access_count, 0);
}

#[tokio::test]
async fn sessions_are_attributed() {
    let fixture = fixture_with_book().await;

    let GateResponse::Delivered(creator) = fixture
        .gate
        .handle(&fixture.creator_request("other.pdf"), &mut BufferedResponse::new())
        .await
        .unwrap()
    else {
        panic!("expected a delivery");
    };
    let GateResponse::Delivered(patron) = fixture
        .gate
        .handle(
            &fixture.patron_request("other.pdf").with_param("id", "custom123"),
            &mut BufferedResponse::new(),
        )
        .await
        .unwrap()
    else {
        panic!("expected a delivery");
    };

    // Without `id` the creator is attributed like any other patron.
    assert_eq!(creator.event.access_type, AccessType::User);
    assert_eq!(creator.event.tag, CREATOR_ID);
    assert_eq!(patron.event.access_type, AccessType::User);
    assert_eq!(patron.event.tag, PATRON_ID);
}

#[tokio::test]
async fn purchase_grants_are_recorded_as_purchases() {
    let fixture = fixture_with_book().await;
    let issued = fixture
        .gate
        .issue_grant(&fixture.path("other.pdf"), "order-9", GrantType::Purchase, 2.0)
        .await
        .unwrap();

    let request = fixture
        .request("other.pdf")
        .with_param("grant", issued.token.as_str());
    let GateResponse::Delivered(report) = fixture
        .gate
        .handle(&request, &mut BufferedResponse::new())
        .await
        .unwrap()
    else {
        panic!("expected a delivery");
    };

    assert_eq!(report.event.access_type, AccessType::Purchase);
    assert_eq!(report.event.tag, "order-9");
}

// ─────────────────────────────────────────────────────────────────────────────
// Delivery and audit
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_file_is_not_audited() {
    let fixture = fixture_with_book().await;

    for name in ["missing.pdf", "..", "../book.pdf", ""] {
        let err = fixture
            .gate
            .handle(&fixture.patron_request(name), &mut BufferedResponse::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404, "{name:?}");
    }

    assert!(fixture.events().await.is_empty());
}

#[tokio::test]
async fn failed_download_is_audited_with_partial_hash() {
    let fixture = fixture_with_book().await;
    let full = content(64 * 1024);
    const SENT: usize = 10_000;

    let mut sink = FailingSink::new(SENT);
    let err = fixture
        .gate
        .handle(&fixture.patron_request("book.pdf"), &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, GateError::Transport(_)));
    assert_eq!(sink.body(), &full[..SENT]);
    assert_eq!(sink.head().unwrap().content_length, full.len() as u64);

    let events = fixture.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.file_hash, digest_hex(&full[..SENT]));
    assert_eq!(events[0].event.access_type, AccessType::User);
    assert_eq!(events[0].event.file_name, "book.pdf");
}

#[tokio::test]
async fn abandoned_download_is_audited() {
    let fixture = fixture_with_book().await;
    let full = content(64 * 1024);
    const SENT: usize = 5_000;

    let mut sink = StallingSink::new(SENT);
    let request = fixture.patron_request("book.pdf");
    let outcome = tokio::time::timeout(
        Duration::from_millis(200),
        fixture.gate.handle(&request, &mut sink),
    )
    .await;
    assert!(outcome.is_err(), "download should still be pending");
    assert_eq!(sink.body(), &full[..SENT]);

    // The audit append is spawned when the request future is dropped.
    let mut events = Vec::new();
    for _ in 0..100 {
        events = fixture.events().await;
        if !events.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.file_hash, digest_hex(&full[..SENT]));
}

#[tokio::test]
async fn file_names_with_spaces_are_served() {
    let fixture = fixture_with_book().await;
    fixture.write_file("my book.pdf", b"spaced name");

    let url = fixture
        .config
        .public_base_url
        .join(&fixture.path("my book.pdf"))
        .unwrap();
    let request = grantgate::ExclusiveRequest::from_url(&url, CLIENT_IP).with_session(PATRON_SESSION);
    let mut response = BufferedResponse::new();
    let GateResponse::Delivered(report) = fixture.gate.handle(&request, &mut response).await.unwrap()
    else {
        panic!("expected a delivery");
    };

    assert_eq!(request.path, "/exclusive/my%20book.pdf");
    assert_eq!(response.body(), b"spaced name");
    assert_eq!(report.event.file_name, "my book.pdf");

    // A grant link for the same file opens it too.
    let issued = fixture.issue("my book.pdf", "promo1", 1.0).await;
    let request = grantgate::ExclusiveRequest::from_url(&issued.url, CLIENT_IP);
    let GateResponse::Delivered(report) = fixture
        .gate
        .handle(&request, &mut BufferedResponse::new())
        .await
        .unwrap()
    else {
        panic!("expected a delivery");
    };
    assert_eq!(report.event.access_type, AccessType::Grant);
}

#[tokio::test]
async fn events_can_be_listed_per_file() {
    let fixture = fixture_with_book().await;

    for name in ["book.pdf", "other.pdf", "other.pdf"] {
        fixture
            .gate
            .handle(&fixture.patron_request(name), &mut BufferedResponse::new())
            .await
            .unwrap();
    }

    let store = fixture.gate.store();
    assert_eq!(store.list_download_events(None).await.unwrap().len(), 3);
    assert_eq!(
        store.list_download_events(Some("other.pdf")).await.unwrap().len(),
        2
    );
    assert_eq!(
        store.list_download_events(Some("other.pdf")).await.unwrap()[0]
            .event
            .file_hash,
        digest_hex(b"another file")
    );
}
