//! Notification ingestion handler.
//!
//! The one durability-critical path: the mail relay treats our 200 as
//! delivery confirmation and will not retry afterwards, so the
//! response is only emitted after the payload is durably on disk.
//! Per request the pipeline is authenticate (middleware) → authorize →
//! fingerprint → durable write → respond, and a failure at any stage
//! maps to its own status class without ever acknowledging receipt.

use axum::{
    extract::{Extension, Path, State},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use mailspool_core::{
    fingerprint, ArtifactStoredEvent, Error, Operation, SpoolEvent, SpoolEventHandler, SpoolStore,
    ARTIFACT_EXT,
};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::{
    handlers::ApiError,
    middleware::auth::{AuthContext, API_KEY_NAME},
    state::AppState,
};

/// Timestamp layout for artifact names: sortable ISO 8601 at second
/// resolution, so lexical order is receipt order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Upper bound on `-{n}` suffix attempts when a computed artifact name
/// is already taken (same second, same fingerprint).
const MAX_NAME_ATTEMPTS: u32 = 32;

/// Handles `POST /inbound/{stream}/`.
///
/// Stores the notification as
/// `{spool_root}/{stream}/{timestamp}-{fingerprint}.json` and answers
/// `{"status": "all good"}` with a renewed API-key cookie once the
/// write is durable.
#[instrument(
    name = "inbound_notification",
    skip(state, auth, payload),
    fields(stream = %stream, identity = %auth.entry.identity)
)]
pub async fn inbound_notification(
    Path(stream): Path<String>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    jar: CookieJar,
    Json(payload): Json<Value>,
) -> Result<Response, ApiError> {
    if !auth.entry.allows(&stream, Operation::Inbound) {
        warn!("inbound permission denied");
        return Err(Error::Forbidden { stream, operation: Operation::Inbound.to_string() }.into());
    }

    let hash = fingerprint(&payload)?;
    let body = serde_json::to_vec(&payload)
        .map_err(|e| Error::Storage(std::io::Error::other(e)))?;
    let payload_size = body.len();

    let stored_at = state.clock.now_utc();
    let stamp = stored_at.format(TIMESTAMP_FORMAT).to_string();
    let artifact = spool_with_retry(&state.spool, &stream, &stamp, &hash, body).await?;

    info!(artifact = %artifact, fingerprint = %hash, payload_size, "notification spooled");

    // Downstream notification is fire-and-forget: the relay's response
    // never waits on subscribers.
    let events = state.events.clone();
    let event = SpoolEvent::ArtifactStored(ArtifactStoredEvent {
        stream,
        artifact,
        identity: auth.entry.identity.clone(),
        fingerprint: hash,
        payload_size,
        stored_at,
    });
    tokio::spawn(async move {
        events.handle_event(event).await;
    });

    let cookie = Cookie::build((API_KEY_NAME, auth.api_key))
        .domain(state.cookies.domain.clone())
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(state.cookies.max_age_secs))
        .build();
    let jar = jar.add(cookie);

    Ok((jar, Json(json!({ "status": "all good" }))).into_response())
}

/// Writes the payload under `{stamp}-{hash}.json`, retrying name
/// collisions with a `-{n}` suffix so both payloads are retained.
/// Returns the artifact name that was written.
async fn spool_with_retry(
    spool: &SpoolStore,
    stream: &str,
    stamp: &str,
    hash: &str,
    body: Vec<u8>,
) -> Result<String, Error> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{stamp}-{hash}.{ARTIFACT_EXT}")
        } else {
            format!("{stamp}-{hash}-{attempt}.{ARTIFACT_EXT}")
        };

        match spool.write(stream, &name, body.clone()).await {
            Ok(()) => return Ok(name),
            Err(Error::ArtifactExists { .. }) => {
                debug!(name = %name, attempt, "artifact name taken, retrying with suffix");
            },
            Err(e) => return Err(e),
        }
    }

    Err(Error::Storage(std::io::Error::other(format!(
        "exhausted {MAX_NAME_ATTEMPTS} artifact name attempts for {stamp}-{hash}"
    ))))
}
