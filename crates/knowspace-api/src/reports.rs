//! Handlers for article reports.
//!
//! | Method | Path | Capability |
//! |--------|------|------------|
//! | `GET`    | `/knowledgebases/{id}/reports` | `CONTENT_REPORT:VIEW` |
//! | `GET`    | `/knowledgebases/{id}/reports/filter` | `CONTENT_REPORT:VIEW` |
//! | `GET`    | `/knowledgebases/{id}/reports/{reportId}` | `CONTENT_REPORT:VIEW` |
//! | `POST`   | `/knowledgebases/{id}/reports` | `CONTENT_REPORT:CREATE` |
//! | `DELETE` | `/knowledgebases/{id}/reports/{reportId}` | `CONTENT_REPORT:DELETE` |

use axum::{
  extract::State,
  response::IntoResponse,
};
use knowspace_core::{
  model::{NewReport, Report},
  paging::Page,
  store::KnowledgeStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{
    Authorized,
    capability::{CreateReport, DeleteReport, ViewReports},
  },
  created,
  error::ApiError,
  extract::{Json, Path, Query},
  params::FilterParams,
};

#[derive(Debug, Deserialize)]
pub struct ReportBody {
  #[serde(default)]
  pub content: String,
}

/// `GET /knowledgebases/{id}/reports`
pub async fn list<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<ViewReports>,
  Path(id): Path<i64>,
) -> Result<Json<Vec<Report>>, ApiError> {
  let reports = state.store.list_reports(id).await.map_err(ApiError::store)?;
  Ok(Json(reports))
}

/// `GET /knowledgebases/{id}/reports/filter[?filter=...][&pageIndex=...][&pageSize=...]`
pub async fn filter<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<ViewReports>,
  Path(id): Path<i64>,
  Query(params): Query<FilterParams>,
) -> Result<Json<Page<Report>>, ApiError> {
  let page = params.page()?;
  let result = state
    .store
    .search_reports(id, params.text(), page)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(result))
}

/// `GET /knowledgebases/{id}/reports/{reportId}`
pub async fn get_one<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<ViewReports>,
  Path((id, report_id)): Path<(i64, i64)>,
) -> Result<Json<Report>, ApiError> {
  let report = state
    .store
    .get_report(id, report_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("report {report_id} not found")))?;
  Ok(Json(report))
}

/// `POST /knowledgebases/{id}/reports`: the reporter is the caller.
pub async fn create<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  auth: Authorized<CreateReport>,
  Path(id): Path<i64>,
  Json(body): Json<ReportBody>,
) -> Result<impl IntoResponse, ApiError> {
  let new = NewReport {
    knowledge_base_id: id,
    content:           body.content,
    report_user_id:    auth.caller.id().to_owned(),
  };
  new.validate()?;

  let report = state.store.create_report(new).await.map_err(ApiError::store)?;
  tracing::info!(knowledge_base = id, report = report.id, "created report");
  Ok(created(
    format!("/api/knowledgebases/{id}/reports/{}", report.id),
    report,
  ))
}

/// `DELETE /knowledgebases/{id}/reports/{reportId}`: returns the deleted
/// report.
pub async fn delete<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<DeleteReport>,
  Path((id, report_id)): Path<(i64, i64)>,
) -> Result<Json<Report>, ApiError> {
  let report = state
    .store
    .delete_report(id, report_id)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(knowledge_base = id, report = report_id, "deleted report");
  Ok(Json(report))
}
