//! Dashboard write actions
//!
//! Each action issues one request through the [`Fetcher`] and, once the write
//! has succeeded, revalidates the view that displays the affected resource.
//! Write failures are returned to the caller untouched; a failed refresh
//! afterwards is only logged since the write itself went through.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::pager::{CursorPager, Searchable};
use super::view::SyncView;
use crate::client::{fetch_json, ApiError, Fetcher};
use crate::models::{Endpoint, EndpointInput, EndpointStatus, ReplayRequest, ReplayResult};

/// Something that can be refreshed after a mutation
#[async_trait]
pub trait Refresh: Send + Sync {
    async fn refresh(&self) -> Result<(), ApiError>;
}

#[async_trait]
impl<T> Refresh for SyncView<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    async fn refresh(&self) -> Result<(), ApiError> {
        self.revalidate().await.map(|_| ())
    }
}

#[async_trait]
impl<T> Refresh for CursorPager<T>
where
    T: DeserializeOwned + Searchable + Clone + Send + Sync + 'static,
{
    async fn refresh(&self) -> Result<(), ApiError> {
        self.revalidate().await
    }
}

async fn refresh_after_write(target: &dyn Refresh) {
    if let Err(e) = target.refresh().await {
        tracing::warn!("Refresh after write failed: {}", e);
    }
}

fn to_body<B: serde::Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::validation(e.to_string()))
}

/// `POST /deliveries/{id}/cancel`
pub async fn cancel_delivery(
    fetcher: &dyn Fetcher,
    id: &str,
    view: &dyn Refresh,
) -> Result<(), ApiError> {
    fetcher
        .request(Method::POST, &format!("/deliveries/{}/cancel", id), None)
        .await?;
    tracing::info!("Cancel requested for delivery {}", id);
    refresh_after_write(view).await;
    Ok(())
}

pub async fn create_endpoint(
    fetcher: &dyn Fetcher,
    input: &EndpointInput,
    view: &dyn Refresh,
) -> Result<Endpoint, ApiError> {
    let endpoint: Endpoint =
        fetch_json(fetcher, Method::POST, "/endpoints", Some(to_body(input)?)).await?;
    tracing::info!("Created endpoint {} ({})", endpoint.id, endpoint.name);
    refresh_after_write(view).await;
    Ok(endpoint)
}

pub async fn update_endpoint(
    fetcher: &dyn Fetcher,
    id: &str,
    input: &EndpointInput,
    view: &dyn Refresh,
) -> Result<Endpoint, ApiError> {
    let endpoint: Endpoint = fetch_json(
        fetcher,
        Method::PATCH,
        &format!("/endpoints/{}", id),
        Some(to_body(input)?),
    )
    .await?;
    refresh_after_write(view).await;
    Ok(endpoint)
}

/// Flip ACTIVE <-> PAUSED based on the status the UI currently shows
pub async fn toggle_endpoint_status(
    fetcher: &dyn Fetcher,
    endpoint: &Endpoint,
    view: &dyn Refresh,
) -> Result<Endpoint, ApiError> {
    let input = EndpointInput {
        status: Some(endpoint.status.toggled()),
        ..Default::default()
    };
    let updated = update_endpoint(fetcher, &endpoint.id, &input, view).await?;
    if updated.status == EndpointStatus::Paused {
        tracing::info!("Endpoint {} paused", updated.id);
    }
    Ok(updated)
}

/// Split free-form input on newlines and commas, dropping blanks
pub fn parse_delivery_ids(input: &str) -> Vec<String> {
    input
        .split(['\n', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `POST /replays`; no request is made when `ids_text` holds no IDs
pub async fn create_replay(
    fetcher: &dyn Fetcher,
    ids_text: &str,
    dry_run: bool,
) -> Result<ReplayResult, ApiError> {
    let delivery_ids = parse_delivery_ids(ids_text);
    if delivery_ids.is_empty() {
        return Err(ApiError::validation("Enter at least one delivery ID"));
    }

    let request = ReplayRequest {
        delivery_ids,
        dry_run,
    };
    let result: ReplayResult =
        fetch_json(fetcher, Method::POST, "/replays", Some(to_body(&request)?)).await?;
    if result.dry_run {
        tracing::info!("Replay dry run: {} deliveries would be created", result.created_deliveries);
    } else {
        tracing::info!(
            "Replay batch {} created: {} deliveries queued",
            result.batch_id,
            result.created_deliveries
        );
    }
    Ok(result)
}
