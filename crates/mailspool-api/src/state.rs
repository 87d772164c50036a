//! Shared application state handed to request handlers.

use std::sync::Arc;

use mailspool_core::{Clock, CredentialIndex, SpoolEventHandler, SpoolStore};

/// Session-cookie settings used when (re)issuing the API-key cookie.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// Domain the cookie is scoped to.
    pub domain: String,
    /// Fixed freshness window in seconds, renewed on every successful
    /// ingestion.
    pub max_age_secs: i64,
}

/// State shared by every request handler.
///
/// The credential index is immutable after startup and read lock-free;
/// the spool store is the only mutable shared resource and carries its
/// own write-atomicity guarantees.
#[derive(Clone)]
pub struct AppState {
    /// API-key lookup table, built once at startup.
    pub index: Arc<CredentialIndex>,
    /// Durable artifact store.
    pub spool: SpoolStore,
    /// Downstream notification hook, dispatched fire-and-forget.
    pub events: Arc<dyn SpoolEventHandler>,
    /// Wall clock, injectable for tests.
    pub clock: Arc<dyn Clock>,
    /// API-key cookie settings.
    pub cookies: CookieSettings,
}
