//! JSON REST API for Knowspace.
//!
//! Exposes an axum [`Router`] backed by any
//! [`knowspace_core::store::KnowledgeStore`]. Callers authenticate with HTTP
//! Basic; TLS and static file serving are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", knowspace_api::api_router(state))
//! ```

pub mod attachments;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod error;
pub mod extract;
pub mod functions;
pub mod knowledge_bases;
pub mod labels;
pub mod params;
pub mod reports;
pub mod storage;
pub mod users;
pub mod votes;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::DefaultBodyLimit,
  http::{StatusCode, header},
  response::IntoResponse,
  routing::{delete, get, post, put},
};
use knowspace_core::store::KnowledgeStore;
use serde::Serialize;

pub use error::ApiError;
pub use storage::FileStorage;

/// Request bodies may carry base64-encoded attachments.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Shared handler state: the store and the attachment file storage.
pub struct AppState<S> {
  pub store: Arc<S>,
  pub files: Arc<FileStorage>,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, files: FileStorage) -> Self {
    Self { store, files: Arc::new(files) }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), files: self.files.clone() }
  }
}

/// `201 Created` with a `Location` header pointing at `location`.
pub(crate) fn created<T: Serialize>(location: String, body: T) -> impl IntoResponse {
  (StatusCode::CREATED, [(header::LOCATION, location)], Json(body))
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: KnowledgeStore + 'static,
{
  use attachments as att;
  use knowledge_bases as kb;

  Router::new()
    // Knowledge bases
    .route("/knowledgebases", get(kb::list::<S>).post(kb::create::<S>))
    .route("/knowledgebases/latest/{take}", get(kb::latest::<S>))
    .route("/knowledgebases/popular/{take}", get(kb::popular::<S>))
    .route("/knowledgebases/filter", get(kb::filter::<S>))
    .route("/knowledgebases/tags/{label_id}", get(kb::by_label::<S>))
    .route(
      "/knowledgebases/{id}",
      get(kb::get_one::<S>).put(kb::update::<S>).delete(kb::delete::<S>),
    )
    .route("/knowledgebases/{id}/view-count", put(kb::view::<S>))
    .route("/knowledgebases/{id}/counters/recount", post(kb::recount::<S>))
    .route("/knowledgebases/{id}/labels", get(kb::labels::<S>))
    // Comments
    .route("/knowledgebases/comments/recent/{take}", get(comments::recent::<S>))
    .route(
      "/knowledgebases/{id}/comments",
      get(comments::list::<S>).post(comments::create::<S>),
    )
    .route("/knowledgebases/{id}/comments/filter", get(comments::filter::<S>))
    .route("/knowledgebases/{id}/comments/tree", get(comments::tree::<S>))
    .route(
      "/knowledgebases/{id}/comments/{comment_id}",
      get(comments::get_one::<S>)
        .put(comments::update::<S>)
        .delete(comments::delete::<S>),
    )
    // Votes
    .route(
      "/knowledgebases/{id}/votes",
      get(votes::list::<S>).post(votes::toggle::<S>),
    )
    .route("/knowledgebases/{id}/votes/{user_id}", delete(votes::delete::<S>))
    // Reports
    .route(
      "/knowledgebases/{id}/reports",
      get(reports::list::<S>).post(reports::create::<S>),
    )
    .route("/knowledgebases/{id}/reports/filter", get(reports::filter::<S>))
    .route(
      "/knowledgebases/{id}/reports/{report_id}",
      get(reports::get_one::<S>).delete(reports::delete::<S>),
    )
    // Attachments
    .route(
      "/knowledgebases/{id}/attachments",
      get(att::list::<S>).post(att::create::<S>),
    )
    .route(
      "/knowledgebases/{id}/attachments/{attachment_id}",
      delete(att::delete::<S>),
    )
    // Labels
    .route("/labels/popular/{take}", get(labels::popular::<S>))
    .route("/labels/{id}", get(labels::get_one::<S>))
    // Categories
    .route(
      "/categories",
      get(categories::list::<S>).post(categories::create::<S>),
    )
    .route("/categories/{id}", get(categories::get_one::<S>))
    // Functions
    .route(
      "/functions",
      get(functions::list::<S>).post(functions::create::<S>),
    )
    .route("/functions/filter", get(functions::filter::<S>))
    .route(
      "/functions/{id}",
      get(functions::get_one::<S>)
        .put(functions::update::<S>)
        .delete(functions::delete::<S>),
    )
    .route("/functions/{id}/parents", get(functions::children::<S>))
    .route(
      "/functions/{id}/commands",
      get(functions::commands::<S>)
        .post(functions::assign_commands::<S>)
        .delete(functions::unassign_commands::<S>),
    )
    // Users
    .route("/users/{id}", get(users::get_one::<S>))
    .route("/users/{id}/knowledgeBases", get(users::knowledge_bases::<S>))
    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
    .with_state(state)
}
