//! Core domain types for the mailspool webhook receiver.
//!
//! Provides the credential index and authenticator, payload
//! fingerprinting, the durable spool store, and the spool event
//! system. The API crate builds its HTTP surface on top of these
//! primitives.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credentials;
pub mod error;
pub mod events;
pub mod hash;
pub mod spool;
pub mod time;

pub use credentials::{
    ApiKeyRecord, CredentialEntry, CredentialIndex, CredentialsConfig, IdentityCredentials,
    Operation,
};
pub use error::{Error, Result};
pub use events::{
    ArtifactStoredEvent, MulticastEventHandler, NoOpEventHandler, SpoolEvent, SpoolEventHandler,
};
pub use hash::{fingerprint, IDENTIFYING_FIELDS};
pub use spool::{SpoolStore, ARTIFACT_EXT};
pub use time::{Clock, RealClock, TestClock};
