//! Handlers for article votes. Every route requires an authenticated caller.

use axum::{
  extract::State,
  http::StatusCode,
};
use knowspace_core::{
  model::Vote,
  permission::{CommandCode, FunctionCode},
  store::KnowledgeStore,
};

use crate::{
  AppState,
  auth::Caller,
  error::ApiError,
  extract::{Json, Path},
};

/// `GET /knowledgebases/{id}/votes`
pub async fn list<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _caller: Caller,
  Path(id): Path<i64>,
) -> Result<Json<Vec<Vote>>, ApiError> {
  let votes = state.store.list_votes(id).await.map_err(ApiError::store)?;
  Ok(Json(votes))
}

/// `POST /knowledgebases/{id}/votes`: adds the caller's vote, or withdraws
/// it when already cast. Returns the article's new vote count.
pub async fn toggle<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path(id): Path<i64>,
) -> Result<Json<i64>, ApiError> {
  let outcome = state
    .store
    .toggle_vote(id, caller.id().to_owned())
    .await
    .map_err(ApiError::store)?;
  tracing::info!(knowledge_base = id, user = %caller.user.user_name, voted = outcome.voted, "toggled vote");
  Ok(Json(outcome.number_of_votes))
}

/// `DELETE /knowledgebases/{id}/votes/{userId}`: the voter, or a caller
/// holding `CONTENT_KNOWLEDGEBASE:UPDATE`.
pub async fn delete<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path((id, user_id)): Path<(i64, String)>,
) -> Result<StatusCode, ApiError> {
  if user_id != caller.id() && !caller.can(FunctionCode::ContentKnowledgebase, CommandCode::Update) {
    tracing::warn!(knowledge_base = id, user = %caller.user.user_name, "delete of foreign vote");
    return Err(ApiError::Forbidden("requires CONTENT_KNOWLEDGEBASE:UPDATE".into()));
  }

  state
    .store
    .delete_vote(id, user_id.clone())
    .await
    .map_err(ApiError::store)?;
  tracing::info!(knowledge_base = id, %user_id, "deleted vote");
  Ok(StatusCode::NO_CONTENT)
}
