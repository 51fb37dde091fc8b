//! "Load more" accumulation on top of a first-page [`SyncView`]
//!
//! The visible list is `first_page.results ++ accumulated`. Every new first
//! page (a poll arrival or a key change) empties `accumulated` and takes its
//! cursor from that page, so rows from two filter contexts never mix.

use reqwest::Method;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::view::{Snapshot, SyncView};
use crate::client::{fetch_json, ApiError, Fetcher};
use crate::models::Page;

/// Rows that can be narrowed by the local free-text search
pub trait Searchable {
    /// `needle` is already lowercased and non-empty
    fn matches_search(&self, needle: &str) -> bool;
}

/// Server-side query parameters plus the local search text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub params: BTreeMap<String, String>,
    pub search: Option<String>,
}

impl ListFilter {
    pub fn param(mut self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value.map(Into::into).filter(|v: &String| !v.is_empty()) {
            Some(value) => {
                self.params.insert(name.to_string(), value);
            }
            None => {
                self.params.remove(name);
            }
        }
        self
    }

    fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// `base?k=v&...[&cursor=c]`, parameters in name order, cursor last
pub fn build_key(base_path: &str, params: &BTreeMap<String, String>, cursor: Option<&str>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in params {
        query.append_pair(name, value);
    }
    if let Some(cursor) = cursor {
        query.append_pair("cursor", cursor);
    }
    let query = query.finish();
    if query.is_empty() {
        base_path.to_string()
    } else {
        format!("{}?{}", base_path, query)
    }
}

struct PagerState<T> {
    filter: ListFilter,
    /// Version of the first page that `accumulated` extends
    base_version: u64,
    accumulated: Vec<T>,
    next_cursor: Option<String>,
    /// First-page version the running `load_more` extends
    loading: Option<u64>,
}

/// What the UI renders for a paged list
#[derive(Debug, Clone)]
pub struct PagedList<T> {
    /// First page followed by appended pages, narrowed by the search text
    pub items: Vec<T>,
    /// A "load more" affordance should be shown
    pub has_more: bool,
    pub loading_more: bool,
    pub error: Option<ApiError>,
}

pub struct CursorPager<T> {
    view: SyncView<Page<T>>,
    fetcher: Arc<dyn Fetcher>,
    base_path: String,
    state: Mutex<PagerState<T>>,
}

/// Clears the re-entrancy flag even if the load future is dropped
struct LoadingGuard<'a, T> {
    state: &'a Mutex<PagerState<T>>,
    base_version: u64,
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.loading == Some(self.base_version) {
            state.loading = None;
        }
    }
}

impl<T> CursorPager<T>
where
    T: DeserializeOwned + Searchable + Clone + Send + Sync + 'static,
{
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        base_path: impl Into<String>,
        filter: ListFilter,
        interval: Option<Duration>,
    ) -> Self {
        let base_path = base_path.into();
        let key = build_key(&base_path, &filter.params, None);
        let view = SyncView::new(fetcher.clone(), key, interval);
        Self {
            view,
            fetcher,
            base_path,
            state: Mutex::new(PagerState {
                filter,
                base_version: 0,
                accumulated: Vec::new(),
                next_cursor: None,
                loading: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PagerState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reset accumulation when the first page has been replaced
    fn reconcile(state: &mut PagerState<T>, first: &Snapshot<Page<T>>) {
        if state.base_version == first.version {
            return;
        }
        state.base_version = first.version;
        state.accumulated.clear();
        // A load for the old first page no longer blocks the new one
        state.loading = None;
        state.next_cursor = first
            .data
            .as_ref()
            .and_then(|page| page.continuation())
            .map(str::to_string);
    }

    pub fn view(&self) -> &SyncView<Page<T>> {
        &self.view
    }

    pub fn filter(&self) -> ListFilter {
        self.lock().filter.clone()
    }

    /// Apply new filters
    ///
    /// A server-side change rebinds the first-page view (dropping appended
    /// pages); a search-only change just re-projects the rows.
    pub fn set_filter(&self, filter: ListFilter) {
        let mut state = self.lock();
        let params_changed = state.filter.params != filter.params;
        state.filter = filter;
        if !params_changed {
            return;
        }
        // Rebind under the pager lock so the view key always matches the
        // params `load_more` pages with; the view never takes this lock
        self.view
            .set_key(build_key(&self.base_path, &state.filter.params, None));
    }

    /// Fetch the page after the last loaded one and append it
    ///
    /// No-op (returns 0) without a cursor or while another load is running.
    /// Returns the number of rows appended.
    pub async fn load_more(&self) -> Result<usize, ApiError> {
        let first = self.view.snapshot();
        let (key, base_version) = {
            let mut state = self.lock();
            Self::reconcile(&mut state, &first);
            if state.loading.is_some() {
                tracing::debug!("load_more already in flight");
                return Ok(0);
            }
            let Some(cursor) = state.next_cursor.clone() else {
                return Ok(0);
            };
            state.loading = Some(state.base_version);
            (
                build_key(&self.base_path, &state.filter.params, Some(&cursor)),
                state.base_version,
            )
        };

        let guard = LoadingGuard {
            state: &self.state,
            base_version,
        };
        let result = fetch_json::<Page<T>>(self.fetcher.as_ref(), Method::GET, &key, None).await;
        drop(guard);
        let page = result?;

        let first = self.view.snapshot();
        let mut state = self.lock();
        Self::reconcile(&mut state, &first);
        if state.base_version != base_version {
            tracing::debug!("Discarding page loaded for a replaced first page");
            return Ok(0);
        }

        let appended = page.results.len();
        state.next_cursor = page.continuation().map(str::to_string);
        state.accumulated.extend(page.results);
        Ok(appended)
    }

    /// Refresh the first page now (after a mutation)
    pub async fn revalidate(&self) -> Result<(), ApiError> {
        self.view.revalidate().await.map(|_| ())
    }

    pub fn has_more(&self) -> bool {
        let first = self.view.snapshot();
        let mut state = self.lock();
        Self::reconcile(&mut state, &first);
        state.next_cursor.is_some()
    }

    pub fn snapshot(&self) -> PagedList<T> {
        let first = self.view.snapshot();
        let mut state = self.lock();
        Self::reconcile(&mut state, &first);

        let needle = state.filter.needle();
        let rows = first
            .data
            .iter()
            .flat_map(|page| page.results.iter())
            .chain(state.accumulated.iter());
        let items = match needle {
            Some(needle) => rows.filter(|row| row.matches_search(&needle)).cloned().collect(),
            None => rows.cloned().collect(),
        };

        PagedList {
            items,
            has_more: state.next_cursor.is_some(),
            loading_more: state.loading.is_some(),
            error: first.error.clone(),
        }
    }
}
