//! Merge preview endpoint.
//!
//! `GET /api/merge-conflicts?owner=&repo=&base=&head=` compares `base` with
//! `head` and returns the three-way merge of every changed file.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, instrument};

use mergelens_core::{MergePreview, MergePreviewer};

use crate::api::status::AppError;
use crate::AppState;

const MISSING_PARAMS: &str = "Missing required parameters: owner, repo, base, head";

#[derive(Debug, Deserialize)]
pub struct MergeConflictsQuery {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub base: Option<String>,
    pub head: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/merge-conflicts", get(merge_conflicts))
}

#[instrument(skip(state))]
async fn merge_conflicts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MergeConflictsQuery>,
) -> Result<Json<MergePreview>, AppError> {
    let (owner, repo, base, head) = match (
        present(query.owner),
        present(query.repo),
        present(query.base),
        present(query.head),
    ) {
        (Some(owner), Some(repo), Some(base), Some(head)) => (owner, repo, base, head),
        _ => return Err(AppError::BadRequest(MISSING_PARAMS.into())),
    };

    let source = state
        .sources
        .source_for(&owner, &repo)
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

    let previewer = MergePreviewer::new(source, state.preview.clone());
    let preview = previewer.preview(&base, &head).await.map_err(|e| {
        error!(owner = %owner, repo = %repo, error = %e, "merge preview failed");
        AppError::Internal(e.to_string())
    })?;

    Ok(Json(preview))
}

/// Empty query values count as missing.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
