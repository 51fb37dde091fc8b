// Dashboard resource bindings: one constructor per page-level view
use std::sync::Arc;
use std::time::Duration;

use super::pager::{CursorPager, ListFilter, Searchable};
use super::view::SyncView;
use crate::client::Fetcher;
use crate::models::{
    Delivery, DeliveryDetail, DeliveryStatus, Endpoint, EndpointHealth, LatencyBucket, Page,
    RatePoint, TenantInfo, VolumePoint,
};

pub const DELIVERIES_POLL: Duration = Duration::from_secs(5);
pub const DELIVERY_DETAIL_POLL: Duration = Duration::from_secs(3);
pub const ENDPOINTS_POLL: Duration = Duration::from_secs(10);
pub const ANALYTICS_POLL: Duration = Duration::from_secs(30);

/// Analytics windows are clamped upstream to one week
pub const MAX_ANALYTICS_HOURS: u32 = 168;
pub const DEFAULT_ANALYTICS_HOURS: u32 = 24;

/// Filters of the delivery list page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryFilter {
    pub status: Option<DeliveryStatus>,
    pub endpoint_id: Option<String>,
    /// Local only; never sent upstream
    pub search: Option<String>,
}

impl DeliveryFilter {
    pub fn to_list_filter(&self) -> ListFilter {
        let mut filter = ListFilter::default()
            .param("status", self.status.map(DeliveryStatus::as_str))
            .param("endpoint_id", self.endpoint_id.clone());
        filter.search = self.search.clone();
        filter
    }
}

impl Searchable for Delivery {
    fn matches_search(&self, needle: &str) -> bool {
        [&self.event_type, &self.endpoint_name, &self.id]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

fn analytics_key(path: &str, hours: u32) -> String {
    format!("{}?hours={}", path, hours.clamp(1, MAX_ANALYTICS_HOURS))
}

/// Factory for the views the dashboard pages bind to
#[derive(Clone)]
pub struct Dashboard {
    fetcher: Arc<dyn Fetcher>,
}

impl Dashboard {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> Arc<dyn Fetcher> {
        self.fetcher.clone()
    }

    pub fn deliveries(&self, filter: &DeliveryFilter) -> CursorPager<Delivery> {
        CursorPager::new(
            self.fetcher.clone(),
            "/deliveries",
            filter.to_list_filter(),
            Some(DELIVERIES_POLL),
        )
    }

    /// First page only, for the overview's "recent deliveries"
    pub fn recent_deliveries(&self) -> SyncView<Page<Delivery>> {
        SyncView::new(self.fetcher.clone(), "/deliveries", Some(DELIVERIES_POLL))
    }

    pub fn delivery(&self, id: &str) -> SyncView<DeliveryDetail> {
        SyncView::new(
            self.fetcher.clone(),
            format!("/deliveries/{}", id),
            Some(DELIVERY_DETAIL_POLL),
        )
    }

    pub fn endpoints(&self) -> SyncView<Vec<Endpoint>> {
        SyncView::new(self.fetcher.clone(), "/endpoints", Some(ENDPOINTS_POLL))
    }

    /// Loaded once; refreshed only through revalidate
    pub fn tenant(&self) -> SyncView<TenantInfo> {
        SyncView::new(self.fetcher.clone(), "/tenant", None)
    }

    pub fn delivery_volume(&self, hours: u32) -> SyncView<Vec<VolumePoint>> {
        SyncView::new(
            self.fetcher.clone(),
            analytics_key("/analytics/delivery-volume", hours),
            Some(ANALYTICS_POLL),
        )
    }

    pub fn success_rate(&self, hours: u32) -> SyncView<Vec<RatePoint>> {
        SyncView::new(
            self.fetcher.clone(),
            analytics_key("/analytics/success-rate", hours),
            Some(ANALYTICS_POLL),
        )
    }

    pub fn latency_distribution(&self) -> SyncView<Vec<LatencyBucket>> {
        SyncView::new(
            self.fetcher.clone(),
            "/analytics/latency-distribution",
            Some(ANALYTICS_POLL),
        )
    }

    pub fn endpoint_health(&self) -> SyncView<Vec<EndpointHealth>> {
        SyncView::new(
            self.fetcher.clone(),
            "/analytics/endpoint-health",
            Some(ANALYTICS_POLL),
        )
    }
}
