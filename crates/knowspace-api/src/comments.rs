//! Handlers for article comments.
//!
//! Reading the flat comment list requires `CONTENT_COMMENT:VIEW`; the
//! threaded view and the recent-comments feed are public. The author of a
//! new comment is always the authenticated caller.

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use knowspace_core::{
  comment_tree::build_comment_tree,
  model::{Comment, NewComment},
  paging::Page,
  permission::{CommandCode, FunctionCode},
  store::KnowledgeStore,
  validate::Violations,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{Authorized, Caller, capability::ViewComments},
  created,
  error::ApiError,
  extract::{Json, Path, Query},
  params::FilterParams,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentBody {
  #[serde(default)]
  pub content:  String,
  pub reply_id: Option<i64>,
}

async fn require_comment<S: KnowledgeStore>(
  store: &S,
  knowledge_base_id: i64,
  comment_id: i64,
) -> Result<Comment, ApiError> {
  store
    .get_comment(knowledge_base_id, comment_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("comment {comment_id} not found")))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /knowledgebases/{id}/comments`
pub async fn list<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<ViewComments>,
  Path(id): Path<i64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
  let comments = state.store.list_comments(id).await.map_err(ApiError::store)?;
  Ok(Json(comments))
}

/// `GET /knowledgebases/{id}/comments/filter[?filter=...][&pageIndex=...][&pageSize=...]`
pub async fn filter<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<ViewComments>,
  Path(id): Path<i64>,
  Query(params): Query<FilterParams>,
) -> Result<Json<Page<Comment>>, ApiError> {
  let page = params.page()?;
  let result = state
    .store
    .search_comments(id, params.text(), page)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(result))
}

/// `GET /knowledgebases/{id}/comments/{commentId}`
pub async fn get_one<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<ViewComments>,
  Path((id, comment_id)): Path<(i64, i64)>,
) -> Result<Json<Comment>, ApiError> {
  Ok(Json(require_comment(state.store.as_ref(), id, comment_id).await?))
}

/// `GET /knowledgebases/{id}/comments/tree`: root comments with nested
/// replies.
pub async fn tree<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
  let flat = state.store.list_comments(id).await.map_err(ApiError::store)?;
  Ok(Json(build_comment_tree(flat)))
}

/// `GET /knowledgebases/comments/recent/{take}`
pub async fn recent<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  Path(take): Path<u32>,
) -> Result<Json<Vec<Comment>>, ApiError> {
  let comments = state.store.recent_comments(take).await.map_err(ApiError::store)?;
  Ok(Json(comments))
}

// ─── Writes ───────────────────────────────────────────────────────────────────

/// `POST /knowledgebases/{id}/comments`: returns 201 + the stored comment.
pub async fn create<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path(id): Path<i64>,
  Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse, ApiError> {
  let new = NewComment {
    knowledge_base_id: id,
    content:           body.content,
    owner_user_id:     caller.id().to_owned(),
    reply_id:          body.reply_id,
  };
  new.validate()?;

  let comment = state.store.create_comment(new).await.map_err(ApiError::store)?;
  tracing::info!(knowledge_base = id, comment = comment.id, "created comment");
  Ok(created(
    format!("/api/knowledgebases/{id}/comments/{}", comment.id),
    comment,
  ))
}

/// `PUT /knowledgebases/{id}/comments/{commentId}`: only the author may
/// edit.
pub async fn update<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path((id, comment_id)): Path<(i64, i64)>,
  Json(body): Json<CommentBody>,
) -> Result<StatusCode, ApiError> {
  let mut v = Violations::default();
  v.require("Content", &body.content);
  v.finish()?;

  let existing = require_comment(state.store.as_ref(), id, comment_id).await?;
  if existing.owner_user_id != caller.id() {
    tracing::warn!(comment = comment_id, user = %caller.user.user_name, "edit of foreign comment");
    return Err(ApiError::Forbidden("only the author may edit a comment".into()));
  }

  state
    .store
    .update_comment(id, comment_id, body.content)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(knowledge_base = id, comment = comment_id, "updated comment");
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /knowledgebases/{id}/comments/{commentId}`: the author, or a
/// caller holding `CONTENT_COMMENT:DELETE`. Returns the deleted comment.
pub async fn delete<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path((id, comment_id)): Path<(i64, i64)>,
) -> Result<Json<Comment>, ApiError> {
  let existing = require_comment(state.store.as_ref(), id, comment_id).await?;
  let moderator = caller.can(FunctionCode::ContentComment, CommandCode::Delete);
  if existing.owner_user_id != caller.id() && !moderator {
    tracing::warn!(comment = comment_id, user = %caller.user.user_name, "delete of foreign comment");
    return Err(ApiError::Forbidden("requires CONTENT_COMMENT:DELETE".into()));
  }

  let deleted = state
    .store
    .delete_comment(id, comment_id)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(knowledge_base = id, comment = comment_id, "deleted comment");
  Ok(Json(deleted))
}
