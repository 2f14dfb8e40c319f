//! Server-side restore
//!
//! Takes a page as submitted by a client, marks every stored annotation of
//! its URL in it and returns the result.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::annotations::PageIdentity;
use crate::controller::AnnotationController;
use crate::dom::Document;
use crate::error::{AppError, Result};
use crate::html::sanitize_html;
use crate::state::AppState;

/// Create the render router
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(render_page))
}

#[derive(Deserialize)]
pub struct RenderRequest {
    pub url: String,
    pub html: String,
    /// Strip scripts and event handlers first; on by default
    #[serde(default)]
    pub sanitize: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    pub page_id: PageIdentity,
    pub html: String,
    pub restored: usize,
    pub skipped: usize,
}

async fn render_page(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderResponse>> {
    if request.url.trim().is_empty() {
        return Err(AppError::BadRequest("url must not be empty".to_string()));
    }

    let html = if request.sanitize.unwrap_or(true) {
        sanitize_html(&request.html)?
    } else {
        request.html
    };

    let mut controller = AnnotationController::new(
        Document::parse_html(&html),
        &request.url,
        state.store().clone(),
        state.config().engine.clone(),
    );
    let report = controller.load_and_restore().await?;

    if !report.skipped.is_empty() {
        tracing::debug!(
            "{} annotations of {} could not be placed",
            report.skipped.len(),
            controller.identity()
        );
    }

    Ok(Json(RenderResponse {
        page_id: controller.identity().clone(),
        html: controller.html(),
        restored: report.restored.len(),
        skipped: report.skipped.len(),
    }))
}
