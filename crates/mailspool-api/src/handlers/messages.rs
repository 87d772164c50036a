//! Consumer endpoints over the spool store.
//!
//! Thin wrappers around the same storage primitives as ingestion:
//! each handler checks its own operation against the caller's
//! per-stream permission set, then delegates to the store.

use axum::{
    extract::{Extension, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use mailspool_core::{Error, Operation};
use serde_json::json;
use tracing::{debug, warn};

use crate::{handlers::ApiError, middleware::auth::AuthContext, state::AppState};

fn authorize(auth: &AuthContext, stream: &str, operation: Operation) -> Result<(), ApiError> {
    if auth.entry.allows(stream, operation) {
        Ok(())
    } else {
        warn!(stream = %stream, operation = %operation, identity = %auth.entry.identity, "permission denied");
        Err(Error::Forbidden { stream: stream.to_string(), operation: operation.to_string() }
            .into())
    }
}

/// Handles `GET /list/{stream}`: artifact names in ascending receipt
/// order.
pub async fn list_messages(
    Path(stream): Path<String>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<String>>, ApiError> {
    authorize(&auth, &stream, Operation::List)?;

    let names = state.spool.list(&stream).await?;
    debug!(stream = %stream, count = names.len(), "listed spooled messages");
    Ok(Json(names))
}

/// Handles `GET /get/{stream}/{artifact}`: the stored notification,
/// byte-for-byte as spooled.
pub async fn get_message(
    Path((stream, artifact)): Path<(String, String)>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Response, ApiError> {
    authorize(&auth, &stream, Operation::Get)?;

    let body = state.spool.read(&stream, &artifact).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// Handles `DELETE /delete/{stream}/{artifact}`.
///
/// Not idempotent: deleting an absent artifact is 404, callers that
/// want idempotence ignore that status.
pub async fn delete_message(
    Path((stream, artifact)): Path<(String, String)>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Response, ApiError> {
    authorize(&auth, &stream, Operation::Delete)?;

    state.spool.delete(&stream, &artifact).await?;
    debug!(stream = %stream, artifact = %artifact, "deleted spooled message");
    Ok(Json(json!({ "status": "deleted" })).into_response())
}
