//! Content fingerprinting for inbound notifications.
//!
//! Derives a short deterministic fingerprint from the first usable
//! identifying field of a payload. The fingerprint names the spooled
//! artifact and correlates log lines; it is not used for
//! deduplication, so identical payloads received twice are stored
//! twice.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Identifying fields tried in precedence order. The raw message wins
/// over rendered bodies; the message ID is the last resort.
pub const IDENTIFYING_FIELDS: [&str; 4] = ["RawEmail", "HtmlBody", "TextBody", "MessageID"];

/// Number of hex characters kept from the SHA-256 digest.
const FINGERPRINT_LEN: usize = 8;

/// Computes the 8-hex-character fingerprint of a notification payload.
///
/// The first field from [`IDENTIFYING_FIELDS`] that is present with a
/// string value is hashed with SHA-256 over its UTF-8 bytes, and the
/// first 8 hex characters of the digest are returned. A field present
/// with a non-string value is treated as absent.
///
/// # Errors
///
/// Returns [`Error::MalformedPayload`] if no identifying field is
/// usable.
pub fn fingerprint(payload: &Value) -> Result<String> {
    let text = IDENTIFYING_FIELDS
        .iter()
        .find_map(|field| payload.get(field).and_then(Value::as_str))
        .ok_or(Error::MalformedPayload { fields: "RawEmail, HtmlBody, TextBody, MessageID" })?;

    let digest = Sha256::digest(text.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(FINGERPRINT_LEN);
    Ok(hash)
}
