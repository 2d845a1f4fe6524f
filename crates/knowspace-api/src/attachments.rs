//! Handlers for article attachments. Every route requires an authenticated
//! caller.

use axum::{
  extract::State,
  response::IntoResponse,
};
use knowspace_core::{model::Attachment, store::KnowledgeStore};

use crate::{
  AppState,
  auth::Caller,
  created,
  error::ApiError,
  extract::{Json, Path},
  storage::UploadBody,
};

/// `GET /knowledgebases/{id}/attachments`
pub async fn list<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _caller: Caller,
  Path(id): Path<i64>,
) -> Result<Json<Vec<Attachment>>, ApiError> {
  let attachments = state.store.list_attachments(id).await.map_err(ApiError::store)?;
  Ok(Json(attachments))
}

/// `POST /knowledgebases/{id}/attachments`: body: [`UploadBody`].
pub async fn create<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _caller: Caller,
  Path(id): Path<i64>,
  Json(body): Json<UploadBody>,
) -> Result<impl IntoResponse, ApiError> {
  if body.file_name.trim().is_empty() {
    return Err(ApiError::Validation(vec!["FileName is required".into()]));
  }

  let saved = state.files.save(&body).await?;
  let attachment = match state.store.add_attachment(id, saved.clone()).await {
    Ok(a) => a,
    Err(e) => {
      state.files.remove_all([saved.file_path]).await;
      return Err(ApiError::store(e));
    }
  };

  tracing::info!(knowledge_base = id, attachment = attachment.id, "added attachment");
  Ok(created(format!("/api/knowledgebases/{id}/attachments"), attachment))
}

/// `DELETE /knowledgebases/{id}/attachments/{attachmentId}`: also removes
/// the stored file. Returns the deleted attachment.
pub async fn delete<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _caller: Caller,
  Path((id, attachment_id)): Path<(i64, i64)>,
) -> Result<Json<Attachment>, ApiError> {
  let attachment = state
    .store
    .delete_attachment(id, attachment_id)
    .await
    .map_err(ApiError::store)?;
  state.files.remove_all([attachment.file_path.clone()]).await;
  tracing::info!(knowledge_base = id, attachment = attachment_id, "deleted attachment");
  Ok(Json(attachment))
}
