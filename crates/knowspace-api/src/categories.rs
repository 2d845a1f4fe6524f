//! Handlers for `/categories` endpoints.

use axum::{
  extract::State,
  response::IntoResponse,
};
use knowspace_core::{
  model::{Category, NewCategory},
  store::KnowledgeStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{Authorized, capability::CreateCategory},
  created,
  error::ApiError,
  extract::{Json, Path},
};

/// `GET /categories`: ordered by sort order.
pub async fn list<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Category>>, ApiError> {
  let categories = state.store.list_categories().await.map_err(ApiError::store)?;
  Ok(Json(categories))
}

/// `GET /categories/{id}`
pub async fn get_one<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
  let category = state
    .store
    .get_category(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("category {id} not found")))?;
  Ok(Json(category))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryBody {
  pub name:       String,
  pub seo_alias:  Option<String>,
  pub parent_id:  Option<i64>,
  pub sort_order: i64,
}

/// `POST /categories`: returns 201 + the stored category.
pub async fn create<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<CreateCategory>,
  Json(body): Json<CategoryBody>,
) -> Result<impl IntoResponse, ApiError> {
  let new = NewCategory {
    name:       body.name,
    seo_alias:  body.seo_alias,
    parent_id:  body.parent_id,
    sort_order: body.sort_order,
  };
  new.validate()?;

  let category = state.store.create_category(new).await.map_err(ApiError::store)?;
  tracing::info!(id = category.id, alias = %category.seo_alias, "created category");
  Ok(created(format!("/api/categories/{}", category.id), category))
}
