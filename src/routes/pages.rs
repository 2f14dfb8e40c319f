//! Page record API routes
//!
//! The store contract over HTTP: records are addressed by page identity, the
//! SHA-1 of the fragment-less page URL.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::annotations::{PageIdentity, SiteRecord};
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::{self, Capacity};

/// Create the pages router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/identity", get(page_identity))
        .route("/:page_id", get(get_page).put(put_page).delete(delete_page))
        .route("/:page_id/capacity", get(page_capacity))
}

#[derive(Deserialize)]
struct IdentityQuery {
    url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentityResponse {
    page_id: PageIdentity,
}

/// Compute the identity of a page URL
async fn page_identity(Query(query): Query<IdentityQuery>) -> Result<Json<IdentityResponse>> {
    if query.url.trim().is_empty() {
        return Err(AppError::BadRequest("url must not be empty".to_string()));
    }
    Ok(Json(IdentityResponse {
        page_id: PageIdentity::from_url(&query.url),
    }))
}

/// Get the stored record of a page
async fn get_page(State(state): State<AppState>, Path(page_id): Path<String>) -> Result<Json<SiteRecord>> {
    let page = PageIdentity::parse(&page_id)?;
    let record = state
        .store()
        .load(&page)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No annotations for page: {}", page)))?;
    Ok(Json(record))
}

/// Store the record of a page.
///
/// An empty record deletes the page instead. A record that grows is checked
/// against the annotation limit first.
async fn put_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    Json(mut record): Json<SiteRecord>,
) -> Result<Json<serde_json::Value>> {
    let page = PageIdentity::parse(&page_id)?;
    record.identity = page.clone();
    let store = state.store();

    if record.is_empty() {
        store.delete(&page).await?;
        tracing::debug!("Deleted empty record for page {}", page);
        return Ok(Json(serde_json::json!({})));
    }

    if !storage::admits(store.as_ref(), &page, &record).await? {
        tracing::warn!("Annotation limit reached, refusing record for page {}", page);
        return Err(AppError::LimitReached(format!("Cannot add annotations to page {}", page)));
    }

    store.persist(&page, &record).await?;
    Ok(Json(serde_json::json!({})))
}

/// Delete the record of a page
async fn delete_page(State(state): State<AppState>, Path(page_id): Path<String>) -> Result<StatusCode> {
    let page = PageIdentity::parse(&page_id)?;
    state.store().delete(&page).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Whether one more annotation may be stored
async fn page_capacity(State(state): State<AppState>, Path(page_id): Path<String>) -> Result<Json<Capacity>> {
    let page = PageIdentity::parse(&page_id)?;
    Ok(Json(state.store().can_persist(&page).await?))
}
