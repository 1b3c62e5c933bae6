//! Visitor tracking
//!
//! Every visitor carries an opaque `session` cookie. The first request
//! without one gets a fresh UUIDv4; later requests keep whatever value the
//! client presents.

pub mod store;
pub mod upload_list;

use std::fmt;

use axum_extra::extract::cookie::{Cookie, CookieJar};
use uuid::Uuid;

pub use store::{CookieUploadListStore, MemoryUploadListStore, UploadListStore};
pub use upload_list::{AppendOutcome, ListLimits, UploadList};

/// Cookie carrying the session identifier
pub const SESSION_COOKIE: &str = "session";

/// Opaque per-visitor identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues and reads the `session` cookie
#[derive(Debug, Clone, Default)]
pub struct SessionTracker;

impl SessionTracker {
    pub fn new() -> Self {
        Self
    }

    /// Return the visitor's identifier, issuing one on first visit.
    ///
    /// The returned jar carries the new cookie when one was created and is
    /// unchanged otherwise.
    pub fn ensure(&self, jar: CookieJar) -> (CookieJar, SessionId) {
        if let Some(existing) = jar.get(SESSION_COOKIE).filter(|c| !c.value().is_empty()) {
            let id = SessionId(existing.value().to_string());
            return (jar, id);
        }

        let id = SessionId::generate();
        tracing::debug!(session = %id, "Issued new session");

        let cookie = Cookie::build((SESSION_COOKIE, id.as_str().to_string()))
            .path("/")
            .http_only(true);

        (jar.add(cookie), id)
    }
}
