//! Handlers for `/knowledgebases` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/knowledgebases` | Quick view of every article; `KB:VIEW` |
//! | `GET`    | `/knowledgebases/latest/{take}` | Newest first |
//! | `GET`    | `/knowledgebases/popular/{take}` | Most viewed first |
//! | `GET`    | `/knowledgebases/filter` | `?filter&categoryId&pageIndex&pageSize` |
//! | `GET`    | `/knowledgebases/tags/{labelId}` | Paged articles carrying a label |
//! | `GET`    | `/knowledgebases/{id}` | Full view with labels and attachments |
//! | `POST`   | `/knowledgebases` | Body: [`KnowledgeBaseBody`]; 201 + `Location` |
//! | `PUT`    | `/knowledgebases/{id}` | Body: [`KnowledgeBaseBody`]; 204 |
//! | `DELETE` | `/knowledgebases/{id}` | Returns the deleted article |
//! | `PUT`    | `/knowledgebases/{id}/view-count` | Returns the new view count |
//! | `POST`   | `/knowledgebases/{id}/counters/recount` | Returns the recomputed counters |
//! | `GET`    | `/knowledgebases/{id}/labels` | Labels of one article |

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use knowspace_core::{
  model::{
    Counters, KnowledgeBase, KnowledgeBaseFilter, KnowledgeBaseInput, KnowledgeBaseQuick, Label,
    NewAttachment, NewKnowledgeBase,
  },
  paging::Page,
  store::KnowledgeStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{
    Authorized,
    capability::{CreateKnowledgeBase, DeleteKnowledgeBase, UpdateKnowledgeBase, ViewKnowledgeBases},
  },
  created,
  error::ApiError,
  extract::{Json, Path, Query},
  params::{FilterParams, PageParams},
  storage::UploadBody,
};

// ─── Listings ─────────────────────────────────────────────────────────────────

/// `GET /knowledgebases`
pub async fn list<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<ViewKnowledgeBases>,
) -> Result<Json<Vec<KnowledgeBaseQuick>>, ApiError> {
  let items = state.store.list_knowledge_bases().await.map_err(ApiError::store)?;
  Ok(Json(items))
}

/// `GET /knowledgebases/latest/{take}`
pub async fn latest<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  Path(take): Path<u32>,
) -> Result<Json<Vec<KnowledgeBaseQuick>>, ApiError> {
  let items = state.store.latest_knowledge_bases(take).await.map_err(ApiError::store)?;
  Ok(Json(items))
}

/// `GET /knowledgebases/popular/{take}`
pub async fn popular<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  Path(take): Path<u32>,
) -> Result<Json<Vec<KnowledgeBaseQuick>>, ApiError> {
  let items = state.store.popular_knowledge_bases(take).await.map_err(ApiError::store)?;
  Ok(Json(items))
}

/// `GET /knowledgebases/filter[?filter=...][&categoryId=...][&pageIndex=...][&pageSize=...]`
pub async fn filter<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  Query(params): Query<FilterParams>,
) -> Result<Json<Page<KnowledgeBaseQuick>>, ApiError> {
  let page = params.page()?;
  let filter = KnowledgeBaseFilter { text: params.text(), category_id: params.category_id };
  let result = state
    .store
    .search_knowledge_bases(filter, page)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(result))
}

/// `GET /knowledgebases/tags/{labelId}[?pageIndex=...][&pageSize=...]`
pub async fn by_label<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  Path(label_id): Path<String>,
  Query(params): Query<PageParams>,
) -> Result<Json<Page<KnowledgeBaseQuick>>, ApiError> {
  let page = params.page()?;
  let result = state
    .store
    .knowledge_bases_by_label(label_id, page)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(result))
}

// ─── Single article ───────────────────────────────────────────────────────────

/// `GET /knowledgebases/{id}`
pub async fn get_one<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<KnowledgeBase>, ApiError> {
  let kb = state
    .store
    .get_knowledge_base(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("knowledge base {id} not found")))?;
  Ok(Json(kb))
}

/// `GET /knowledgebases/{id}/labels`
pub async fn labels<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Vec<Label>>, ApiError> {
  let labels = state.store.labels_of_knowledge_base(id).await.map_err(ApiError::store)?;
  Ok(Json(labels))
}

// ─── Create / update ──────────────────────────────────────────────────────────

/// JSON body accepted by `POST /knowledgebases` and `PUT /knowledgebases/{id}`.
///
/// `labels` absent leaves an article's labels untouched on update; an empty
/// list clears them. `attachments` are appended.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnowledgeBaseBody {
  pub category_id:       Option<i64>,
  pub title:             String,
  pub seo_alias:         Option<String>,
  pub description:       Option<String>,
  pub environment:       Option<String>,
  pub problem:           String,
  pub step_to_reproduce: Option<String>,
  pub error_message:     Option<String>,
  pub workaround:        Option<String>,
  pub note:              Option<String>,
  pub labels:            Option<Vec<String>>,
  pub attachments:       Vec<UploadBody>,
}

impl KnowledgeBaseBody {
  fn into_parts(self) -> (KnowledgeBaseInput, Vec<UploadBody>) {
    let input = KnowledgeBaseInput {
      category_id:       self.category_id,
      title:             self.title,
      seo_alias:         self.seo_alias,
      description:       self.description,
      environment:       self.environment,
      problem:           self.problem,
      step_to_reproduce: self.step_to_reproduce,
      error_message:     self.error_message,
      workaround:        self.workaround,
      note:              self.note,
      labels:            self.labels,
    };
    (input, self.attachments)
  }
}

fn file_paths(attachments: &[NewAttachment]) -> Vec<String> {
  attachments.iter().map(|a| a.file_path.clone()).collect()
}

/// `POST /knowledgebases`: returns 201 + the stored article.
pub async fn create<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  auth: Authorized<CreateKnowledgeBase>,
  Json(body): Json<KnowledgeBaseBody>,
) -> Result<impl IntoResponse, ApiError> {
  let (input, uploads) = body.into_parts();
  input.validate()?;

  let attachments = state.files.save_all(&uploads).await?;
  let new = NewKnowledgeBase {
    input,
    owner_user_id: auth.caller.id().to_owned(),
    attachments: attachments.clone(),
  };

  let kb = match state.store.create_knowledge_base(new).await {
    Ok(kb) => kb,
    Err(e) => {
      state.files.remove_all(file_paths(&attachments)).await;
      return Err(ApiError::store(e));
    }
  };

  tracing::info!(id = kb.id, owner = %kb.owner_user_id, "created knowledge base");
  Ok(created(format!("/api/knowledgebases/{}", kb.id), kb))
}

/// `PUT /knowledgebases/{id}`: full replace of the editable fields.
pub async fn update<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<UpdateKnowledgeBase>,
  Path(id): Path<i64>,
  Json(body): Json<KnowledgeBaseBody>,
) -> Result<StatusCode, ApiError> {
  let (input, uploads) = body.into_parts();
  input.validate()?;

  let attachments = state.files.save_all(&uploads).await?;
  if let Err(e) = state
    .store
    .update_knowledge_base(id, input, attachments.clone())
    .await
  {
    state.files.remove_all(file_paths(&attachments)).await;
    return Err(ApiError::store(e));
  }

  tracing::info!(id, "updated knowledge base");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /knowledgebases/{id}`: returns the article as it was.
pub async fn delete<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<DeleteKnowledgeBase>,
  Path(id): Path<i64>,
) -> Result<Json<KnowledgeBase>, ApiError> {
  let kb = state.store.delete_knowledge_base(id).await.map_err(ApiError::store)?;
  let stored: Vec<String> = kb.attachments.iter().map(|a| a.file_path.clone()).collect();
  state.files.remove_all(stored).await;
  tracing::info!(id, "deleted knowledge base");
  Ok(Json(kb))
}

// ─── Counters ─────────────────────────────────────────────────────────────────

/// `PUT /knowledgebases/{id}/view-count`
pub async fn view<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<i64>, ApiError> {
  let count = state.store.increment_view_count(id).await.map_err(ApiError::store)?;
  Ok(Json(count))
}

/// `POST /knowledgebases/{id}/counters/recount`
pub async fn recount<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<UpdateKnowledgeBase>,
  Path(id): Path<i64>,
) -> Result<Json<Counters>, ApiError> {
  let counters = state.store.recount_counters(id).await.map_err(ApiError::store)?;
  tracing::info!(id, ?counters, "recounted knowledge base counters");
  Ok(Json(counters))
}
