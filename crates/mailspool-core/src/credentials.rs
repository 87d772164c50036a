//! Credential index and API-key authentication.
//!
//! The index is a flat lookup table from raw API key to the owning
//! identity, expiry, and per-stream permission sets. It is built once
//! from configuration at startup, is immutable for the process
//! lifetime, and is handed to request handlers by shared reference so
//! tests can inject alternate tables.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Operations a key can be granted on a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Accept an inbound notification for the stream.
    Inbound,
    /// List spooled artifact names.
    List,
    /// Read a single spooled artifact.
    Get,
    /// Delete a single spooled artifact.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inbound => "inbound",
            Self::List => "list",
            Self::Get => "get",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// One API-key record as it appears in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    /// The raw key string presented by callers.
    pub key: String,
    /// Expiry as unix seconds; `0` means the key never expires.
    #[serde(default)]
    pub expiry: i64,
    /// Streams this key may act on, with the allowed operations per
    /// stream.
    #[serde(default)]
    pub permissions: HashMap<String, HashSet<Operation>>,
}

/// All API keys declared for one identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityCredentials {
    /// Key records owned by the identity.
    #[serde(default)]
    pub api_keys: Vec<ApiKeyRecord>,
}

/// Credential configuration: identity name to its key records.
pub type CredentialsConfig = HashMap<String, IdentityCredentials>;

/// Resolved credential data associated with one API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    /// Identity that owns the key.
    pub identity: String,
    /// Expiry as unix seconds; `0` means never.
    pub expiry: i64,
    /// Allowed operations per stream.
    pub permissions: HashMap<String, HashSet<Operation>>,
}

impl CredentialEntry {
    /// Returns whether this entry permits `operation` on `stream`.
    pub fn allows(&self, stream: &str, operation: Operation) -> bool {
        self.permissions.get(stream).is_some_and(|ops| ops.contains(&operation))
    }

    /// Returns whether the key has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry != 0 && now.timestamp() >= self.expiry
    }
}

/// Immutable lookup table from raw API key to [`CredentialEntry`].
#[derive(Debug, Clone, Default)]
pub struct CredentialIndex {
    keys: HashMap<String, CredentialEntry>,
}

impl CredentialIndex {
    /// Flattens the credential configuration into a key-indexed table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the same raw key appears more than
    /// once, across or within identities. A colliding key would make
    /// ownership ambiguous, so the process refuses to start rather
    /// than letting a later entry silently win.
    pub fn build(credentials: &CredentialsConfig) -> Result<Self> {
        let mut keys = HashMap::new();

        for (identity, creds) in credentials {
            for record in &creds.api_keys {
                let entry = CredentialEntry {
                    identity: identity.clone(),
                    expiry: record.expiry,
                    permissions: record.permissions.clone(),
                };

                if let Some(previous) = keys.insert(record.key.clone(), entry) {
                    return Err(Error::Config(format!(
                        "api key declared by both '{}' and '{}'",
                        previous.identity, identity
                    )));
                }
            }
        }

        Ok(Self { keys })
    }

    /// Looks up a raw key, ignoring expiry.
    pub fn resolve(&self, key: &str) -> Option<&CredentialEntry> {
        self.keys.get(key)
    }

    /// Number of keys in the index.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns whether the index holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Authenticates against an ordered sequence of candidate keys.
    ///
    /// Candidates are tried in the order given (the API layer passes
    /// query, then header, then cookie); the first one present in the
    /// index wins even if a later candidate would also resolve. The
    /// winning key is then checked against its expiry: an expired key
    /// is rejected outright, with no fallthrough to later candidates,
    /// since the caller clearly intended that key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if no candidate resolves or the
    /// winning key has expired.
    pub fn authenticate<I>(&self, candidates: I, now: DateTime<Utc>) -> Result<(String, &CredentialEntry)>
    where
        I: IntoIterator<Item = String>,
    {
        for candidate in candidates {
            if let Some(entry) = self.keys.get(&candidate) {
                if entry.is_expired(now) {
                    return Err(Error::Unauthorized);
                }
                return Ok((candidate, entry));
            }
        }

        Err(Error::Unauthorized)
    }
}
