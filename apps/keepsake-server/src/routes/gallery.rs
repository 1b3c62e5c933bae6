//! Gallery page
//!
//! `GET /` renders the visitor's uploads and issues a session cookie on
//! first visit.

use axum::{extract::State, response::Html, routing::get, Router};
use axum_extra::extract::CookieJar;

use crate::error::Result;
use crate::gallery::GalleryPage;
use crate::state::AppState;

/// Create the gallery router
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

async fn index(State(state): State<AppState>, jar: CookieJar) -> Result<(CookieJar, Html<String>)> {
    let (jar, session) = state.sessions().ensure(jar);
    let list = state.upload_lists().load(&jar, &session).await?;

    let page = state.gallery().render(&GalleryPage {
        session: session.as_str(),
        images: list.entries(),
    })?;

    tracing::debug!(session = %session, images = list.len(), "Rendered gallery");

    Ok((jar, Html(page)))
}
