//! Assembled-application tests: admin bootstrap, `/api` nesting and
//! attachment file serving.

use std::sync::Arc;

use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use knowspace_api::{AppState, FileStorage, storage::UploadBody};
use knowspace_core::{
  permission::{CommandCode, FunctionCode},
  store::KnowledgeStore,
};
use knowspace_server::{app, bootstrap_admin, hash_password};
use knowspace_store_sqlite::SqliteStore;
use tower::ServiceExt;

fn temp_files() -> FileStorage {
  FileStorage::new(std::env::temp_dir().join(format!("knowspace-server-{}", uuid::Uuid::new_v4())))
}

async fn get(app: &Router, uri: &str, auth: Option<&str>) -> (StatusCode, Vec<u8>) {
  let mut req = Request::builder().uri(uri);
  if let Some(creds) = auth {
    req = req.header(header::AUTHORIZATION, format!("Basic {}", B64.encode(creds)));
  }
  let res = app.clone().oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
  let status = res.status();
  (status, to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec())
}

#[tokio::test]
async fn bootstrap_is_idempotent_and_grants_everything() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let hash = hash_password("hunter2").unwrap();

  let first = bootstrap_admin(&store, "admin", &hash).await.unwrap();
  let second = bootstrap_admin(&store, "admin", &hash).await.unwrap();
  assert_eq!(first.id, second.id);

  let permissions = store.permissions_for(first.id).await.unwrap();
  assert!(permissions.allows(FunctionCode::SystemFunction, CommandCode::Delete));
  assert!(permissions.allows(FunctionCode::ContentComment, CommandCode::Approve));
}

#[tokio::test]
async fn api_is_nested_and_admin_can_sign_in() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  bootstrap_admin(&store, "admin", &hash_password("hunter2").unwrap()).await.unwrap();
  let app = app(AppState::new(Arc::new(store), temp_files()));

  let (status, _) = get(&app, "/api/categories", None).await;
  assert_eq!(status, StatusCode::OK);

  let (status, _) = get(&app, "/api/functions", Some("admin:hunter2")).await;
  assert_eq!(status, StatusCode::OK);

  let (status, _) = get(&app, "/api/functions", Some("admin:wrong")).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = get(&app, "/categories", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stored_attachments_are_served() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let files = temp_files();
  let saved = files
    .save(&UploadBody { file_name: "readme.txt".into(), content: B64.encode("read me") })
    .await
    .unwrap();
  let app = app(AppState::new(Arc::new(store), files));

  let (status, body) = get(&app, &saved.file_path, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, b"read me");
}
