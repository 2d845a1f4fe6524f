//! Handlers for `/labels` endpoints. Both are public.

use axum::extract::State;
use knowspace_core::{model::Label, store::KnowledgeStore};

use crate::{
  AppState,
  error::ApiError,
  extract::{Json, Path},
};

/// `GET /labels/popular/{take}`: labels carried by the most articles.
pub async fn popular<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  Path(take): Path<u32>,
) -> Result<Json<Vec<Label>>, ApiError> {
  let labels = state.store.popular_labels(take).await.map_err(ApiError::store)?;
  Ok(Json(labels))
}

/// `GET /labels/{id}`
pub async fn get_one<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Label>, ApiError> {
  let label = state
    .store
    .get_label(id.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("label {id} not found")))?;
  Ok(Json(label))
}
