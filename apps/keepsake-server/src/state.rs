//! Application state management

use std::sync::Arc;

use crate::config::{Config, UploadListBackend};
use crate::gallery::{Gallery, RenderError};
use crate::session::{
    CookieUploadListStore, ListLimits, MemoryUploadListStore, SessionTracker, UploadListStore,
};
use crate::upload::BlobStore;

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to load page template: {0}")]
    Template(#[from] RenderError),

    #[error("Failed to prepare upload directory: {0}")]
    UploadDir(#[from] std::io::Error),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    gallery: Gallery,
    blob_store: BlobStore,
    sessions: SessionTracker,
    upload_lists: Box<dyn UploadListStore>,
    list_limits: ListLimits,
}

impl AppState {
    /// Create the application state
    ///
    /// Loads the page template and creates the upload directory.
    pub async fn new(config: Config) -> Result<Self, StateError> {
        let gallery = Gallery::load(&config.storage.template_dir).await?;
        Self::with_gallery(config, gallery).await
    }

    /// Create the application state around an already compiled gallery
    pub async fn with_gallery(config: Config, gallery: Gallery) -> Result<Self, StateError> {
        let blob_store = BlobStore::new(config.storage.upload_dir());
        blob_store.ensure_dir().await?;

        let upload_lists: Box<dyn UploadListStore> = match config.uploads.list_backend {
            UploadListBackend::Cookie => Box::new(CookieUploadListStore::new()),
            UploadListBackend::Memory => Box::new(MemoryUploadListStore::with_max_visitors(
                config.uploads.list_max_visitors,
            )),
        };

        if !config.storage.favicon_path.exists() {
            tracing::warn!(
                "Favicon not found at {}; /favicon.ico will return 404",
                config.storage.favicon_path.display()
            );
        }

        tracing::info!(
            upload_dir = %blob_store.dir().display(),
            list_backend = upload_lists.backend(),
            "Application state ready"
        );

        let list_limits = ListLimits::new(config.uploads.list_max_entries);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                gallery,
                blob_store,
                sessions: SessionTracker::new(),
                upload_lists,
                list_limits,
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the gallery renderer
    pub fn gallery(&self) -> &Gallery {
        &self.inner.gallery
    }

    /// Get the blob store
    pub fn blob_store(&self) -> &BlobStore {
        &self.inner.blob_store
    }

    /// Get the session tracker
    pub fn sessions(&self) -> &SessionTracker {
        &self.inner.sessions
    }

    /// Get the upload list store
    pub fn upload_lists(&self) -> &dyn UploadListStore {
        self.inner.upload_lists.as_ref()
    }

    /// Get the upload list bounds
    pub fn list_limits(&self) -> &ListLimits {
        &self.inner.list_limits
    }
}
