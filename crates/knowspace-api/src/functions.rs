//! Handlers for `/functions` endpoints (system function administration).
//!
//! | Method | Path | Capability |
//! |--------|------|------------|
//! | `GET`    | `/functions` | `SYSTEM_FUNCTION:VIEW` |
//! | `GET`    | `/functions/filter` | `SYSTEM_FUNCTION:VIEW` |
//! | `GET`    | `/functions/{id}` | `SYSTEM_FUNCTION:VIEW` |
//! | `GET`    | `/functions/{id}/parents` | `SYSTEM_FUNCTION:VIEW`; children of `id` |
//! | `POST`   | `/functions` | `SYSTEM_FUNCTION:CREATE` |
//! | `PUT`    | `/functions/{id}` | `SYSTEM_FUNCTION:UPDATE` |
//! | `DELETE` | `/functions/{id}` | `SYSTEM_FUNCTION:DELETE` |
//! | `GET`    | `/functions/{id}/commands` | `SYSTEM_FUNCTION:VIEW` |
//! | `POST`   | `/functions/{id}/commands` | `SYSTEM_FUNCTION:CREATE` |
//! | `DELETE` | `/functions/{id}/commands?commandIds=A,B` | `SYSTEM_FUNCTION:DELETE` |

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use knowspace_core::{
  model::{Command, Function},
  paging::Page,
  store::KnowledgeStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{
    Authorized,
    capability::{CreateFunction, DeleteFunction, UpdateFunction, ViewFunctions},
  },
  created,
  error::ApiError,
  extract::{Json, Path, Query},
  params::FilterParams,
};

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /functions`
pub async fn list<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<ViewFunctions>,
) -> Result<Json<Vec<Function>>, ApiError> {
  let functions = state.store.list_functions().await.map_err(ApiError::store)?;
  Ok(Json(functions))
}

/// `GET /functions/filter[?filter=...][&pageIndex=...][&pageSize=...]`
pub async fn filter<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<ViewFunctions>,
  Query(params): Query<FilterParams>,
) -> Result<Json<Page<Function>>, ApiError> {
  let page = params.page()?;
  let result = state
    .store
    .search_functions(params.text(), page)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(result))
}

/// `GET /functions/{id}`
pub async fn get_one<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<ViewFunctions>,
  Path(id): Path<String>,
) -> Result<Json<Function>, ApiError> {
  let function = state
    .store
    .get_function(id.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("function {id} not found")))?;
  Ok(Json(function))
}

/// `GET /functions/{id}/parents`: the functions whose parent is `id`.
pub async fn children<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<ViewFunctions>,
  Path(id): Path<String>,
) -> Result<Json<Vec<Function>>, ApiError> {
  let functions = state.store.child_functions(id).await.map_err(ApiError::store)?;
  Ok(Json(functions))
}

// ─── Writes ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /functions` and `PUT /functions/{id}`.
/// On update the id in the path wins.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FunctionBody {
  pub id:         String,
  pub name:       String,
  pub url:        String,
  pub sort_order: i64,
  pub parent_id:  Option<String>,
  pub icon:       Option<String>,
}

impl From<FunctionBody> for Function {
  fn from(b: FunctionBody) -> Self {
    Function {
      id:         b.id,
      name:       b.name,
      url:        b.url,
      sort_order: b.sort_order,
      parent_id:  b.parent_id,
      icon:       b.icon,
    }
  }
}

/// `POST /functions`: returns 201 + the stored function.
pub async fn create<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<CreateFunction>,
  Json(body): Json<FunctionBody>,
) -> Result<impl IntoResponse, ApiError> {
  let function = Function::from(body);
  function.validate()?;

  let function = state.store.create_function(function).await.map_err(ApiError::store)?;
  tracing::info!(id = %function.id, "created function");
  Ok(created(format!("/api/functions/{}", function.id), function))
}

/// `PUT /functions/{id}`
pub async fn update<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<UpdateFunction>,
  Path(id): Path<String>,
  Json(body): Json<FunctionBody>,
) -> Result<StatusCode, ApiError> {
  let function = Function { id: id.clone(), ..Function::from(body) };
  function.validate()?;

  state
    .store
    .update_function(id.clone(), function)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(%id, "updated function");
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /functions/{id}`: returns the deleted function.
pub async fn delete<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<DeleteFunction>,
  Path(id): Path<String>,
) -> Result<Json<Function>, ApiError> {
  let function = state.store.delete_function(id.clone()).await.map_err(ApiError::store)?;
  tracing::info!(%id, "deleted function");
  Ok(Json(function))
}

// ─── Commands ─────────────────────────────────────────────────────────────────

/// `GET /functions/{id}/commands`
pub async fn commands<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<ViewFunctions>,
  Path(id): Path<String>,
) -> Result<Json<Vec<Command>>, ApiError> {
  let commands = state.store.commands_in_function(id).await.map_err(ApiError::store)?;
  Ok(Json(commands))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssignCommandsBody {
  pub command_ids:          Vec<String>,
  pub add_to_all_functions: bool,
}

/// `POST /functions/{id}/commands`: returns 201 + the function's commands
/// after assignment.
pub async fn assign_commands<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<CreateFunction>,
  Path(id): Path<String>,
  Json(body): Json<AssignCommandsBody>,
) -> Result<impl IntoResponse, ApiError> {
  let command_ids = require_commands(body.command_ids)?;

  state
    .store
    .assign_commands(id.clone(), command_ids, body.add_to_all_functions)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(%id, all = body.add_to_all_functions, "assigned commands");

  let commands = state.store.commands_in_function(id.clone()).await.map_err(ApiError::store)?;
  Ok(created(format!("/api/functions/{id}/commands"), commands))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandIdsParams {
  /// Comma-separated command ids, e.g. `VIEW,DELETE`.
  pub command_ids: Option<String>,
}

/// `DELETE /functions/{id}/commands?commandIds=VIEW,DELETE`
pub async fn unassign_commands<S: KnowledgeStore + 'static>(
  State(state): State<AppState<S>>,
  _auth: Authorized<DeleteFunction>,
  Path(id): Path<String>,
  Query(params): Query<CommandIdsParams>,
) -> Result<StatusCode, ApiError> {
  let command_ids = require_commands(
    params
      .command_ids
      .map(|s| s.split(',').map(|c| c.trim().to_owned()).collect())
      .unwrap_or_default(),
  )?;

  state
    .store
    .unassign_commands(id.clone(), command_ids)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(%id, "removed commands");
  Ok(StatusCode::NO_CONTENT)
}

fn require_commands(ids: Vec<String>) -> Result<Vec<String>, ApiError> {
  let ids: Vec<String> = ids.into_iter().filter(|c| !c.trim().is_empty()).collect();
  if ids.is_empty() {
    return Err(ApiError::Validation(vec!["CommandIds is required".into()]));
  }
  Ok(ids)
}
