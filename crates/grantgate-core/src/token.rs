//! Grant-token wire format.
//!
//! ```text
//! token = base64( seal( pad( json({"grantId": <int>}) ) ) )
//! ```
//!
//! `pad` appends `len % 16` spaces. This does not round up to a 16-byte
//! boundary: most length classes stay distinguishable, and a plaintext whose
//! length is already a multiple of 16 gets no padding at all. The format is
//! kept as-is so existing links keep working.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::AuthenticatedEncrypter;
use crate::error::{CoreError, Result};
use crate::types::GrantId;

/// Block size used by the padding rule.
pub const PAD_BLOCK: usize = 16;

/// The payload sealed inside a grant token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantInfo {
    pub grant_id: GrantId,
}

impl GrantInfo {
    pub fn new(grant_id: GrantId) -> Self {
        Self { grant_id }
    }
}

/// Append `len % 16` spaces to `text`.
pub fn pad_plaintext(mut text: String) -> String {
    let pad = text.len() % PAD_BLOCK;
    text.extend(std::iter::repeat(' ').take(pad));
    text
}

/// Seal `info` into its URL-parameter form.
pub fn encode_token(encrypter: &AuthenticatedEncrypter, info: &GrantInfo) -> Result<String> {
    let json = serde_json::to_string(info).map_err(|e| CoreError::Serialization(e.to_string()))?;
    let padded = pad_plaintext(json);
    let sealed = encrypter.encrypt(padded.as_bytes())?;
    Ok(STANDARD.encode(sealed))
}

/// Open a token produced by [`encode_token`].
///
/// Every failure, whichever step it happens in, is reported as
/// [`CoreError::InvalidToken`].
pub fn decode_token(encrypter: &AuthenticatedEncrypter, token: &str) -> Result<GrantInfo> {
    let sealed = STANDARD
        .decode(token.trim())
        .map_err(|_| CoreError::InvalidToken)?;
    let plaintext = encrypter
        .decrypt(&sealed)
        .map_err(|_| CoreError::InvalidToken)?;
    let text = std::str::from_utf8(&plaintext).map_err(|_| CoreError::InvalidToken)?;
    serde_json::from_str(text).map_err(|_| CoreError::InvalidToken)
}
