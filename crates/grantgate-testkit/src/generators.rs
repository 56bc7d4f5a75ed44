//! Proptest generators for property-based testing.

use proptest::prelude::*;

use grantgate_core::{GrantId, GrantKey, GrantType, NewGrant};

/// Generate a random grant key.
pub fn grant_key() -> impl Strategy<Value = GrantKey> {
    any::<[u8; 32]>().prop_map(GrantKey::from_bytes)
}

/// Generate a positive grant id.
pub fn grant_id() -> impl Strategy<Value = GrantId> {
    (1i64..=i64::MAX).prop_map(GrantId::new)
}

/// Generate a request path under `/exclusive/`.
pub fn request_path() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,16}\\.(pdf|zip|mp3|epub)".prop_map(|name| format!("/exclusive/{name}"))
}

/// Generate a grant tag.
pub fn tag() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,24}"
}

/// Generate a GrantType.
pub fn grant_type() -> impl Strategy<Value = GrantType> {
    prop_oneof![Just(GrantType::Creator), Just(GrantType::Purchase)]
}

/// Generate a grant duration in hours.
pub fn duration_hours() -> impl Strategy<Value = f32> {
    0.01f32..240.0
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}

/// Generate an unsaved grant.
pub fn new_grant() -> impl Strategy<Value = NewGrant> {
    (request_path(), tag(), grant_type(), timestamp())
        .prop_map(|(path, tag, grant_type, expire_time)| {
            NewGrant::new(path, tag, grant_type, expire_time)
        })
}

/// Generate file contents of at most `max_len` bytes.
pub fn file_contents(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}
