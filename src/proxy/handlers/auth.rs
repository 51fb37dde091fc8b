// Session handlers: login exchange, logout, auth probe
use axum::{body::Bytes, extract::State, http::StatusCode, response::Json};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::proxy::server::AppState;
use crate::proxy::session::Credential;

#[derive(Deserialize, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Exchange an API key for a session cookie
///
/// The only route that accepts a raw credential from the browser. The key is
/// checked against the upstream before anything is stored.
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<Value>), (StatusCode, Json<Value>)> {
    // A body that is not a JSON object counts as a missing key
    let req: LoginRequest = serde_json::from_slice(&body).unwrap_or_default();
    let api_key = req
        .api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "API key is required" })),
            )
        })?;

    let credential = Credential::new(api_key);
    if !state.upstream.probe(&credential).await {
        tracing::warn!("Failed login attempt");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid API key" })),
        ));
    }

    let jar = state.credentials.set_session(jar, &credential);
    tracing::info!("Session established");
    Ok((jar, Json(json!({ "ok": true }))))
}

/// Clear the session cookie; no upstream call
pub async fn handle_logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    let jar = state.credentials.clear_session(jar);
    tracing::info!("Session cleared");
    (jar, Json(json!({ "ok": true })))
}

/// Report whether a session cookie is present; never revalidated upstream
pub async fn handle_me(State(state): State<AppState>, jar: CookieJar) -> Json<Value> {
    let authenticated = state.credentials.get_credential(&jar).is_some();
    Json(json!({ "authenticated": authenticated }))
}
