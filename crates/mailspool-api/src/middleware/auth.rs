//! API-key authentication middleware.
//!
//! A candidate key is extracted from the query string, the `api_key`
//! header, and the `api_key` cookie, in that precedence order, and
//! resolved against the credential index. The first candidate present
//! in the index wins. On success the resolved credential entry is
//! injected as an [`AuthContext`] extension; permission scoping per
//! stream and operation stays with the handlers, which know the target
//! operation.

use std::collections::HashMap;

use axum::{
    body::Body,
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use mailspool_core::CredentialEntry;

use crate::{handlers::ApiError, state::AppState};

/// Name used for the API-key query parameter, header, and cookie.
pub const API_KEY_NAME: &str = "api_key";

/// Authenticated caller context injected for downstream handlers.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The raw key the caller authenticated with; re-issued in the
    /// session cookie on successful ingestion.
    pub api_key: String,
    /// Resolved identity, expiry, and per-stream permissions.
    pub entry: CredentialEntry,
}

/// Extraction strategies tried in precedence order. Each returns an
/// optional candidate; resolution happens in the credential index.
fn candidate_keys(req: &Request<Body>) -> impl Iterator<Item = String> {
    [query_key(req), header_key(req), cookie_key(req)].into_iter().flatten()
}

fn query_key(req: &Request<Body>) -> Option<String> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(req.uri()).ok()?;
    params.get(API_KEY_NAME).cloned()
}

fn header_key(req: &Request<Body>) -> Option<String> {
    req.headers().get(API_KEY_NAME).and_then(|v| v.to_str().ok()).map(String::from)
}

fn cookie_key(req: &Request<Body>) -> Option<String> {
    CookieJar::from_headers(req.headers()).get(API_KEY_NAME).map(|c| c.value().to_string())
}

/// Axum middleware that authenticates requests against the credential
/// index and rejects unknown or expired keys with 403.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let now = state.clock.now_utc();
    let (api_key, entry) = state.index.authenticate(candidate_keys(&req), now)?;

    let context = AuthContext { api_key, entry: entry.clone() };
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}
