//! Handlers for `/users`. A caller may read their own profile and articles;
//! anyone else's needs `SYSTEM_USER:VIEW`.

use axum::extract::State;
use knowspace_core::{
  model::{KnowledgeBaseQuick, User},
  paging::Page,
  permission::{CommandCode, FunctionCode},
  store::KnowledgeStore,
};

use crate::{
  AppState,
  auth::Caller,
  error::ApiError,
  extract::{Json, Path, Query},
  params::PageParams,
};

fn ensure_visible(caller: &Caller, user_id: &str) -> Result<(), ApiError> {
  if user_id == caller.id() || caller.can(FunctionCode::SystemUser, CommandCode::View) {
    return Ok(());
  }
  tracing::warn!(user = %caller.user.user_name, target = %user_id, "read of foreign user");
  Err(ApiError::Forbidden("requires SYSTEM_USER:VIEW".into()))
}

/// `GET /users/{id}`
pub async fn get_one<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
  ensure_visible(&caller, &id)?;
  let user = state
    .store
    .get_user(id.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  Ok(Json(user))
}

/// `GET /users/{id}/knowledgeBases[?pageIndex=...][&pageSize=...]`: the
/// user's articles, newest first.
pub async fn knowledge_bases<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path(id): Path<String>,
  Query(params): Query<PageParams>,
) -> Result<Json<Page<KnowledgeBaseQuick>>, ApiError> {
  ensure_visible(&caller, &id)?;
  let page = params.page()?;
  let result = state
    .store
    .knowledge_bases_by_owner(id, page)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(result))
}
