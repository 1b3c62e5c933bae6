//! Upload Route
//!
//! `POST /fileupload` stores the file in multipart field `nf` under its
//! content-addressed name, records the name in the visitor's upload list
//! and redirects back to the referring page. Other methods just redirect.

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{AppendHeaders, IntoResponse, Response},
    routing::post,
    Router,
};
use axum_extra::extract::CookieJar;

use crate::error::{AppError, Result};
use crate::session::AppendOutcome;
use crate::state::AppState;
use crate::upload;

/// Create the upload router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/fileupload", post(upload_file).get(redirect_back))
        .layer(DefaultBodyLimit::disable())
}

/// POST /fileupload
async fn upload_file(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let mut multipart = multipart.map_err(|e| AppError::FormParse(e.body_text()))?;
    let (jar, session) = state.sessions().ensure(jar);

    let stored = upload::receive_upload(
        &mut multipart,
        state.blob_store(),
        state.config().uploads.read_timeout(),
    )
    .await?;

    let mut list = state.upload_lists().load(&jar, &session).await?;
    match list.append(&stored.filename, state.list_limits()) {
        AppendOutcome::Added => {
            tracing::debug!(session = %session, file = %stored.filename, "Added to upload list");
        }
        AppendOutcome::AlreadyPresent => {
            tracing::debug!(session = %session, file = %stored.filename, "Already in upload list");
        }
        AppendOutcome::AddedWithEviction(evicted) => {
            tracing::warn!(
                session = %session,
                file = %stored.filename,
                evicted = evicted.len(),
                "Upload list full, dropped oldest entries"
            );
        }
    }

    // Written from the cookie's Display form; the jar would percent-encode `|`
    let files_cookie = state
        .upload_lists()
        .save(&session, &list)
        .await?
        .map(|cookie| (header::SET_COOKIE, cookie.to_string()));

    Ok((
        jar,
        AppendHeaders(files_cookie),
        redirect_back(headers).await,
    ))
}

/// Redirect to the referring page
async fn redirect_back(headers: HeaderMap) -> Response {
    let target = redirect_target(&headers);
    (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
}

/// Same-origin `Referer` path and query, or `/`
fn redirect_target(headers: &HeaderMap) -> String {
    let Some(referer) = headers.get(header::REFERER).and_then(|v| v.to_str().ok()) else {
        return "/".to_string();
    };

    let Ok(uri) = referer.parse::<Uri>() else {
        tracing::debug!(referer = %referer, "Ignoring unparseable referer");
        return "/".to_string();
    };

    if let Some(authority) = uri.authority() {
        let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());
        let same_origin = host.is_some_and(|host| authority.as_str().eq_ignore_ascii_case(host));
        if !same_origin {
            tracing::debug!(referer = %referer, "Ignoring cross-origin referer");
            return "/".to_string();
        }
    } else if uri.scheme().is_some() {
        return "/".to_string();
    }

    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    // Browsers read `//host` and `/\host` as another origin
    if !target.starts_with('/') || target.starts_with("//") || target.starts_with("/\\") {
        tracing::debug!(referer = %referer, "Ignoring referer with unsafe path");
        return "/".to_string();
    }

    target.to_string()
}
