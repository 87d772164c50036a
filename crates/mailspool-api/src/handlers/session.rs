//! Root greeting and session logout.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::{middleware::auth::API_KEY_NAME, state::AppState};

/// Handles `GET /`. Nothing here, but say it.
pub async fn root() -> &'static str {
    "Hello."
}

/// Handles `GET /logout`: deletes the API-key cookie and redirects to
/// the root.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let cookie = Cookie::build((API_KEY_NAME, ""))
        .domain(state.cookies.domain.clone())
        .path("/")
        .build();
    let jar = jar.remove(cookie);

    (jar, Redirect::to("/"))
}
