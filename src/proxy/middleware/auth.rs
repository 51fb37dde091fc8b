// Session authentication middleware for the forwarding routes
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::CookieJar;
use serde_json::json;

use crate::proxy::server::AppState;

/// Reject requests without a session credential before any upstream call
///
/// On success the [`Credential`](crate::proxy::session::Credential) is
/// attached as a request extension for the handler.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    tracing::info!("Request: {} {}", request.method(), request.uri().path());

    let jar = CookieJar::from_headers(request.headers());
    match state.credentials.get_credential(&jar) {
        Some(credential) => {
            request.extensions_mut().insert(credential);
            next.run(request).await
        }
        None => {
            tracing::debug!("No session cookie for {}", request.uri().path());
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Not authenticated" })),
            )
                .into_response()
        }
    }
}
