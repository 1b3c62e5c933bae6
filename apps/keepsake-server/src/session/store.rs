//! Upload list storage backends
//!
//! Handlers load and save a visitor's [`UploadList`] through
//! [`UploadListStore`]. The default backend keeps the list in the `files`
//! cookie; the in-memory backend keys lists by session identifier.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::upload::is_storage_filename;

use super::upload_list::UploadList;
use super::SessionId;

/// Cookie carrying the serialized upload list
pub const FILES_COOKIE: &str = "files";

/// Visitors kept by the in-memory backend before the oldest is dropped
pub const DEFAULT_MAX_VISITORS: usize = 10_000;

// ============================================================================
// Store Trait
// ============================================================================

/// Per-visitor upload list storage
#[async_trait::async_trait]
pub trait UploadListStore: Send + Sync {
    /// Load the visitor's list; a visitor with no list gets an empty one
    async fn load(&self, jar: &CookieJar, session: &SessionId) -> Result<UploadList>;

    /// Persist the list.
    ///
    /// Returns the cookie the response must set, if the backend lives on
    /// the client. The caller writes it with its plain `Display` form: the
    /// `|` separator is a valid cookie octet and must not be percent-encoded.
    async fn save(&self, session: &SessionId, list: &UploadList) -> Result<Option<Cookie<'static>>>;

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}

// ============================================================================
// Cookie Backend
// ============================================================================

/// Keeps the list in the `files` cookie
#[derive(Debug, Clone, Default)]
pub struct CookieUploadListStore;

impl CookieUploadListStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl UploadListStore for CookieUploadListStore {
    async fn load(&self, jar: &CookieJar, _session: &SessionId) -> Result<UploadList> {
        let mut list = jar
            .get(FILES_COOKIE)
            .map(|c| UploadList::parse(c.value()))
            .unwrap_or_default();

        // The cookie is client-controlled; only keep names we could have issued
        let before = list.len();
        list.retain(|name| is_storage_filename(name));
        if list.len() != before {
            tracing::debug!(dropped = before - list.len(), "Ignored foreign entries in files cookie");
        }

        Ok(list)
    }

    async fn save(&self, _session: &SessionId, list: &UploadList) -> Result<Option<Cookie<'static>>> {
        let cookie = Cookie::build((FILES_COOKIE, list.serialize()))
            .path("/")
            .build();
        Ok(Some(cookie))
    }

    fn backend(&self) -> &'static str {
        "cookie"
    }
}

// ============================================================================
// Memory Backend
// ============================================================================

/// Keeps lists in process memory, keyed by session. Lost on restart.
///
/// Holds at most `max_visitors` lists; saving a list for a new visitor
/// past that bound drops the visitor that was first stored.
#[derive(Clone)]
pub struct MemoryUploadListStore {
    inner: Arc<RwLock<MemoryLists>>,
    max_visitors: usize,
}

#[derive(Default)]
struct MemoryLists {
    lists: HashMap<SessionId, UploadList>,
    order: VecDeque<SessionId>,
}

impl MemoryUploadListStore {
    pub fn new() -> Self {
        Self::with_max_visitors(DEFAULT_MAX_VISITORS)
    }

    pub fn with_max_visitors(max_visitors: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryLists::default())),
            max_visitors: max_visitors.max(1),
        }
    }

    /// Number of visitors with a stored list
    pub async fn visitor_count(&self) -> usize {
        self.inner.read().await.lists.len()
    }
}

impl Default for MemoryUploadListStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UploadListStore for MemoryUploadListStore {
    async fn load(&self, _jar: &CookieJar, session: &SessionId) -> Result<UploadList> {
        let inner = self.inner.read().await;
        Ok(inner.lists.get(session).cloned().unwrap_or_default())
    }

    async fn save(&self, session: &SessionId, list: &UploadList) -> Result<Option<Cookie<'static>>> {
        let mut inner = self.inner.write().await;

        if inner.lists.insert(session.clone(), list.clone()).is_none() {
            inner.order.push_back(session.clone());

            while inner.order.len() > self.max_visitors {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.lists.remove(&oldest);
                    tracing::debug!(session = %oldest, "Dropped oldest in-memory upload list");
                }
            }
        }

        Ok(None)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// Tests
// ============================================================================
