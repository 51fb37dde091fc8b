// Generic forwarding handler: /api/proxy/*path -> {API_URL}/*path
use axum::{
    extract::{Path, RawQuery, State},
    http::{header, Method},
    response::{IntoResponse, Json, Response},
    Extension,
};
use bytes::Bytes;
use serde_json::Value;

use crate::error::AppResult;
use crate::proxy::server::AppState;
use crate::proxy::session::Credential;
use crate::proxy::upstream::UpstreamResponse;

/// Forward GET/POST/PATCH/DELETE with method, body and path/query unchanged
pub async fn handle_forward(
    State(state): State<AppState>,
    Extension(credential): Extension<Credential>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> AppResult<Response> {
    let api_path = format!("/{}", path.trim_start_matches('/'));

    let upstream = state
        .upstream
        .forward(method.clone(), &api_path, query.as_deref(), &credential, body)
        .await?;

    tracing::info!("{} {} -> {}", method, api_path, upstream.status);
    Ok(relay(upstream))
}

/// Re-emit an upstream reply with its exact status code
fn relay(upstream: UpstreamResponse) -> Response {
    if upstream.body.is_empty() {
        return upstream.status.into_response();
    }

    match serde_json::from_slice::<Value>(&upstream.body) {
        Ok(json) => (upstream.status, Json(json)).into_response(),
        Err(_) => {
            let content_type = upstream
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string());
            (
                upstream.status,
                [(header::CONTENT_TYPE, content_type)],
                upstream.body,
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_relay_keeps_status_for_empty_body() {
        let response = relay(UpstreamResponse {
            status: StatusCode::NO_CONTENT,
            content_type: None,
            body: Bytes::new(),
        });
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_relay_passes_non_json_through() {
        let response = relay(UpstreamResponse {
            status: StatusCode::BAD_GATEWAY,
            content_type: Some("text/html".to_string()),
            body: Bytes::from_static(b"<html>bad gateway</html>"),
        });
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html"
        );
    }

    #[test]
    fn test_relay_json_with_upstream_status() {
        let response = relay(UpstreamResponse {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            content_type: Some("application/json".to_string()),
            body: Bytes::from_static(br#"{"error":{"code":"VALIDATION_ERROR","message":"url"}}"#),
        });
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
