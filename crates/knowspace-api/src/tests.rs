//! Router tests: requests driven through `api_router` against an in-memory
//! SQLite store.

use std::sync::Arc;

use argon2::{
  Algorithm, Argon2, Params, PasswordHasher, Version,
  password_hash::SaltString,
};
use axum::{
  Router,
  body::{Body, to_bytes},
  http::{HeaderMap, Method, Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use knowspace_core::{
  model::NewUser,
  permission::{CommandCode, FunctionCode},
  store::KnowledgeStore,
};
use knowspace_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use strum::IntoEnumIterator;
use tower::ServiceExt;

use crate::{AppState, FileStorage, api_router};

const PASSWORD: &str = "correct horse";

struct Harness {
  router: Router,
  files:  FileStorage,
  bob_id: String,
}

fn hash(password: &str) -> String {
  // Minimal cost parameters; the PHC string carries them to the verifier.
  let params = Params::new(8, 1, 1, None).unwrap();
  let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
  let salt = SaltString::generate(&mut rand_core::OsRng);
  argon2.hash_password(password.as_bytes(), &salt).unwrap().to_string()
}

fn user(name: &str) -> NewUser {
  NewUser {
    user_name:     name.into(),
    first_name:    name.into(),
    last_name:     "Tester".into(),
    email:         format!("{name}@example.com"),
    password_hash: hash(PASSWORD),
  }
}

/// `admin` holds every capability; `bob` holds none.
async fn harness() -> Harness {
  let store = SqliteStore::open_in_memory().await.unwrap();

  let admin = store.create_user(user("admin")).await.unwrap();
  store.assign_role(admin.id, "admin".into()).await.unwrap();
  let grants = FunctionCode::iter()
    .flat_map(|f| CommandCode::iter().map(move |c| (f, c)))
    .collect();
  store.grant_permissions("admin".into(), grants).await.unwrap();

  let bob = store.create_user(user("bob")).await.unwrap();

  let dir = std::env::temp_dir().join(format!("knowspace-api-{}", uuid::Uuid::new_v4()));
  let files = FileStorage::new(dir);
  let router = api_router(AppState::new(Arc::new(store), files.clone()));
  Harness { router, files, bob_id: bob.id }
}

fn basic(user_name: &str) -> String {
  format!("Basic {}", B64.encode(format!("{user_name}:{PASSWORD}")))
}

async fn send(
  router: &Router,
  method: Method,
  uri: &str,
  auth: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
  let mut req = Request::builder().method(method).uri(uri);
  if let Some(user_name) = auth {
    req = req.header(header::AUTHORIZATION, basic(user_name));
  }
  let req = match body {
    Some(json) => req
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => req.body(Body::empty()).unwrap(),
  };

  let res = router.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let headers = res.headers().clone();
  let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
  };
  (status, headers, value)
}

async fn create_category(h: &Harness) -> i64 {
  let (status, _, body) = send(
    &h.router,
    Method::POST,
    "/categories",
    Some("admin"),
    Some(json!({ "name": "Networking", "sortOrder": 1 })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  body["id"].as_i64().unwrap()
}

async fn create_article(h: &Harness, title: &str) -> i64 {
  let category_id = create_category(h).await;
  let (status, _, body) = send(
    &h.router,
    Method::POST,
    "/knowledgebases",
    Some("admin"),
    Some(json!({
      "categoryId": category_id,
      "title": title,
      "problem": "Cannot connect",
      "note": "Restart the client",
      "labels": ["VPN", "Windows 10"],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  body["id"].as_i64().unwrap()
}

// ─── Authentication & authorisation ──────────────────────────────────────────

#[tokio::test]
async fn anonymous_write_is_challenged() {
  let h = harness().await;
  let (status, headers, body) =
    send(&h.router, Method::POST, "/knowledgebases", None, Some(json!({}))).await;

  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(headers.contains_key(header::WWW_AUTHENTICATE));
  assert_eq!(body["statusCode"], 401);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
  let h = harness().await;
  let req = Request::builder()
    .uri("/knowledgebases")
    .header(header::AUTHORIZATION, format!("Basic {}", B64.encode("admin:nope")))
    .body(Body::empty())
    .unwrap();
  let res = h.router.clone().oneshot(req).await.unwrap();
  assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_capability_is_forbidden() {
  let h = harness().await;
  let (status, _, body) = send(&h.router, Method::GET, "/knowledgebases", Some("bob"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["statusCode"], 403);

  let (status, _, _) = send(&h.router, Method::GET, "/knowledgebases", Some("admin"), None).await;
  assert_eq!(status, StatusCode::OK);
}

// ─── Knowledge bases ─────────────────────────────────────────────────────────

#[tokio::test]
async fn create_returns_location_of_full_view() {
  let h = harness().await;
  let id = create_article(&h, "VPN drops every hour").await;
  let category_id = create_category(&h).await;

  let (_, _, again) = send(
    &h.router,
    Method::POST,
    "/knowledgebases",
    Some("admin"),
    Some(json!({
      "categoryId": category_id,
      "title": "Printer offline",
      "problem": "Spooler stuck",
      "note": "Restart spooler",
    })),
  )
  .await;
  assert_eq!(again["seoAlias"], "printer-offline");

  let (status, _, kb) =
    send(&h.router, Method::GET, &format!("/knowledgebases/{id}"), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(kb["seoAlias"], "vpn-drops-every-hour");
  assert_eq!(kb["labels"], json!(["VPN", "Windows 10"]));
  assert_eq!(kb["numberOfComments"], 0);

  let (_, _, labels) =
    send(&h.router, Method::GET, &format!("/knowledgebases/{id}/labels"), None, None).await;
  assert_eq!(labels[1]["id"], "windows-10");
}

#[tokio::test]
async fn create_sets_location_header() {
  let h = harness().await;
  let category_id = create_category(&h).await;
  let (status, headers, body) = send(
    &h.router,
    Method::POST,
    "/knowledgebases",
    Some("admin"),
    Some(json!({
      "categoryId": category_id,
      "title": "Disk full",
      "problem": "No space left",
      "note": "Clean temp",
    })),
  )
  .await;

  assert_eq!(status, StatusCode::CREATED);
  let id = body["id"].as_i64().unwrap();
  assert_eq!(headers[header::LOCATION], format!("/api/knowledgebases/{id}").as_str());
}

#[tokio::test]
async fn invalid_article_lists_every_violation() {
  let h = harness().await;
  let (status, _, body) =
    send(&h.router, Method::POST, "/knowledgebases", Some("admin"), Some(json!({}))).await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["statusCode"], 400);
  assert_eq!(body["errors"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn missing_article_is_not_found() {
  let h = harness().await;
  let (status, _, body) = send(&h.router, Method::GET, "/knowledgebases/999", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["statusCode"], 404);
  assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn malformed_requests_get_the_error_payload() {
  let h = harness().await;
  let id = create_article(&h, "VPN").await;

  let (status, _, body) = send(
    &h.router,
    Method::POST,
    &format!("/knowledgebases/{id}/comments"),
    Some("bob"),
    Some(json!({ "content": 5 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["statusCode"], 400);
  assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));

  let (status, _, body) =
    send(&h.router, Method::GET, "/knowledgebases/filter?pageIndex=abc", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["statusCode"], 400);

  let (status, _, body) =
    send(&h.router, Method::GET, "/knowledgebases/notanumber", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn update_without_labels_keeps_them() {
  let h = harness().await;
  let id = create_article(&h, "VPN drops").await;
  let (_, _, kb) = send(&h.router, Method::GET, &format!("/knowledgebases/{id}"), None, None).await;

  let (status, _, _) = send(
    &h.router,
    Method::PUT,
    &format!("/knowledgebases/{id}"),
    Some("admin"),
    Some(json!({
      "categoryId": kb["categoryId"],
      "title": "VPN drops hourly",
      "problem": "Cannot connect",
      "note": "Update the client",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (_, _, kb) = send(&h.router, Method::GET, &format!("/knowledgebases/{id}"), None, None).await;
  assert_eq!(kb["title"], "VPN drops hourly");
  assert_eq!(kb["labels"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn filter_pages_and_rejects_bad_index() {
  let h = harness().await;
  for n in 0..3 {
    create_article(&h, &format!("Article {n}")).await;
  }

  let (status, _, page) = send(
    &h.router,
    Method::GET,
    "/knowledgebases/filter?filter=Article&pageIndex=2&pageSize=2",
    None,
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(page["totalRecords"], 3);
  assert_eq!(page["items"].as_array().unwrap().len(), 1);
  assert_eq!(page["items"][0]["title"], "Article 0");

  let (status, _, body) =
    send(&h.router, Method::GET, "/knowledgebases/filter?pageIndex=0", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn view_count_increments() {
  let h = harness().await;
  let id = create_article(&h, "VPN").await;
  let uri = format!("/knowledgebases/{id}/view-count");

  send(&h.router, Method::PUT, &uri, None, None).await;
  let (status, _, count) = send(&h.router, Method::PUT, &uri, None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(count, 2);
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn comment_and_reply_build_a_tree() {
  let h = harness().await;
  let id = create_article(&h, "VPN").await;
  let uri = format!("/knowledgebases/{id}/comments");

  let (status, headers, root) =
    send(&h.router, Method::POST, &uri, Some("bob"), Some(json!({ "content": "Same here" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  let root_id = root["id"].as_i64().unwrap();
  assert_eq!(headers[header::LOCATION], format!("/api{uri}/{root_id}").as_str());
  assert_eq!(root["ownerUserId"], h.bob_id.as_str());

  let (status, _, _) = send(
    &h.router,
    Method::POST,
    &uri,
    Some("admin"),
    Some(json!({ "content": "Fixed in 2.1", "replyId": root_id })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (_, _, tree) = send(&h.router, Method::GET, &format!("{uri}/tree"), None, None).await;
  let roots = tree.as_array().unwrap();
  assert_eq!(roots.len(), 1);
  assert_eq!(roots[0]["children"].as_array().unwrap().len(), 1);
  assert_eq!(roots[0]["children"][0]["content"], "Fixed in 2.1");

  let (_, _, kb) = send(&h.router, Method::GET, &format!("/knowledgebases/{id}"), None, None).await;
  assert_eq!(kb["numberOfComments"], 2);
}

#[tokio::test]
async fn only_the_author_edits_but_moderators_delete() {
  let h = harness().await;
  let id = create_article(&h, "VPN").await;
  let uri = format!("/knowledgebases/{id}/comments");
  let (_, _, comment) =
    send(&h.router, Method::POST, &uri, Some("bob"), Some(json!({ "content": "First" }))).await;
  let comment_uri = format!("{uri}/{}", comment["id"]);

  let edit = json!({ "content": "Edited" });
  let (status, _, _) =
    send(&h.router, Method::PUT, &comment_uri, Some("admin"), Some(edit.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _, _) = send(&h.router, Method::PUT, &comment_uri, Some("bob"), Some(edit)).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, _, deleted) = send(&h.router, Method::DELETE, &comment_uri, Some("admin"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(deleted["content"], "Edited");

  let (_, _, kb) = send(&h.router, Method::GET, &format!("/knowledgebases/{id}"), None, None).await;
  assert_eq!(kb["numberOfComments"], 0);
}

#[tokio::test]
async fn recent_comments_are_public() {
  let h = harness().await;
  let id = create_article(&h, "VPN").await;
  send(
    &h.router,
    Method::POST,
    &format!("/knowledgebases/{id}/comments"),
    Some("bob"),
    Some(json!({ "content": "Hello" })),
  )
  .await;

  let (status, _, recent) =
    send(&h.router, Method::GET, "/knowledgebases/comments/recent/5", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(recent[0]["knowledgeBaseTitle"], "VPN");
  assert_eq!(recent[0]["ownerName"], "bob Tester");
}

// ─── Votes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn second_vote_withdraws_the_first() {
  let h = harness().await;
  let id = create_article(&h, "VPN").await;
  let uri = format!("/knowledgebases/{id}/votes");

  let (status, _, count) = send(&h.router, Method::POST, &uri, Some("bob"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(count, 1);

  let (_, _, count) = send(&h.router, Method::POST, &uri, Some("bob"), None).await;
  assert_eq!(count, 0);

  let (status, _, _) =
    send(&h.router, Method::DELETE, &format!("{uri}/{}", h.bob_id), Some("bob"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn removing_someone_elses_vote_needs_update_capability() {
  let h = harness().await;
  let id = create_article(&h, "VPN").await;
  let uri = format!("/knowledgebases/{id}/votes");
  send(&h.router, Method::POST, &uri, Some("admin"), None).await;

  let (_, _, votes) = send(&h.router, Method::GET, &uri, Some("bob"), None).await;
  let voter = votes[0]["userId"].as_str().unwrap().to_owned();

  let (status, _, _) =
    send(&h.router, Method::DELETE, &format!("{uri}/{voter}"), Some("bob"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _, _) =
    send(&h.router, Method::DELETE, &format!("{uri}/{voter}"), Some("admin"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reports_require_capabilities() {
  let h = harness().await;
  let id = create_article(&h, "VPN").await;
  let uri = format!("/knowledgebases/{id}/reports");
  let body = json!({ "content": "Outdated" });

  let (status, _, _) = send(&h.router, Method::POST, &uri, Some("bob"), Some(body.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _, report) = send(&h.router, Method::POST, &uri, Some("admin"), Some(body)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(report["knowledgeBaseId"], id);

  let (_, _, kb) = send(&h.router, Method::GET, &format!("/knowledgebases/{id}"), None, None).await;
  assert_eq!(kb["numberOfReports"], 1);
}

// ─── Attachments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn attachment_upload_and_delete_touch_the_disk() {
  let h = harness().await;
  let id = create_article(&h, "VPN").await;
  let uri = format!("/knowledgebases/{id}/attachments");

  let (status, _, attachment) = send(
    &h.router,
    Method::POST,
    &uri,
    Some("bob"),
    Some(json!({ "fileName": "vpn.log", "content": B64.encode("timeout") })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(attachment["fileSize"], 7);
  assert_eq!(attachment["fileType"], ".log");

  let file_path = attachment["filePath"].as_str().unwrap();
  let on_disk = h.files.dir().join(file_path.rsplit('/').next().unwrap());
  assert!(on_disk.exists());

  let (status, _, _) = send(
    &h.router,
    Method::DELETE,
    &format!("{uri}/{}", attachment["id"]),
    Some("bob"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert!(!on_disk.exists());
}

#[tokio::test]
async fn deleting_an_article_removes_its_files() {
  let h = harness().await;
  let category_id = create_category(&h).await;
  let (status, _, kb) = send(
    &h.router,
    Method::POST,
    "/knowledgebases",
    Some("admin"),
    Some(json!({
      "categoryId": category_id,
      "title": "Printer offline",
      "problem": "Spooler stops",
      "note": "Restart the spooler",
      "attachments": [
        { "fileName": "spool.log", "content": B64.encode("stopped") },
        { "fileName": "event.txt", "content": B64.encode("7031") },
      ],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let on_disk: Vec<_> = kb["attachments"]
    .as_array()
    .unwrap()
    .iter()
    .map(|a| h.files.dir().join(a["filePath"].as_str().unwrap().rsplit('/').next().unwrap()))
    .collect();
  assert_eq!(on_disk.len(), 2);
  assert!(on_disk.iter().all(|p| p.exists()));

  let uri = format!("/knowledgebases/{}", kb["id"]);
  let (status, _, _) = send(&h.router, Method::DELETE, &uri, Some("admin"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(on_disk.iter().all(|p| !p.exists()));
}

#[tokio::test]
async fn attachment_for_missing_article_leaves_no_file() {
  let h = harness().await;
  let (status, _, _) = send(
    &h.router,
    Method::POST,
    "/knowledgebases/42/attachments",
    Some("bob"),
    Some(json!({ "fileName": "a.txt", "content": B64.encode("x") })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let leftovers = std::fs::read_dir(h.files.dir()).map(|d| d.count()).unwrap_or(0);
  assert_eq!(leftovers, 0);
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn users_see_their_own_profile_and_articles() {
  let h = harness().await;
  let id = create_article(&h, "VPN").await;
  let (_, _, kb) = send(&h.router, Method::GET, &format!("/knowledgebases/{id}"), None, None).await;
  let admin_id = kb["ownerUserId"].as_str().unwrap().to_owned();

  let bob_uri = format!("/users/{}", h.bob_id);
  let (status, _, me) = send(&h.router, Method::GET, &bob_uri, Some("bob"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["userName"], "bob");
  assert!(me.get("passwordHash").is_none());

  let (status, _, page) = send(
    &h.router,
    Method::GET,
    &format!("/users/{admin_id}/knowledgeBases?pageIndex=1&pageSize=5"),
    Some("admin"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(page["totalRecords"], 1);
  assert_eq!(page["items"][0]["title"], "VPN");

  let (status, _, mine) = send(
    &h.router,
    Method::GET,
    &format!("/users/{}/knowledgeBases", h.bob_id),
    Some("bob"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(mine["totalRecords"], 0);

  let (status, _, _) =
    send(&h.router, Method::GET, &format!("/users/{admin_id}"), Some("bob"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _, _) = send(&h.router, Method::GET, "/users/nobody", Some("admin"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _, _) = send(&h.router, Method::GET, &bob_uri, None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ─── Labels, categories & functions ─────────────────────────────────────────

#[tokio::test]
async fn labels_and_categories_are_public() {
  let h = harness().await;
  create_article(&h, "VPN").await;

  let (status, _, label) = send(&h.router, Method::GET, "/labels/vpn", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(label["name"], "VPN");

  let (status, _, _) = send(&h.router, Method::GET, "/labels/nope", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (_, _, tagged) = send(&h.router, Method::GET, "/knowledgebases/tags/vpn", None, None).await;
  assert_eq!(tagged["totalRecords"], 1);

  let (status, _, categories) = send(&h.router, Method::GET, "/categories", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(categories[0]["seoAlias"], "networking");
}

#[tokio::test]
async fn function_administration() {
  let h = harness().await;

  let (status, _, children) =
    send(&h.router, Method::GET, "/functions/SYSTEM/parents", Some("admin"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(children.as_array().unwrap().len(), 4);

  let (status, headers, _) = send(
    &h.router,
    Method::POST,
    "/functions",
    Some("admin"),
    Some(json!({
      "id": "REPORTING",
      "name": "Reporting",
      "url": "/reporting",
      "sortOrder": 20,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(headers[header::LOCATION], "/api/functions/REPORTING");

  let assign = |ids: Value| json!({ "commandIds": ids, "addToAllFunctions": false });
  let (status, _, commands) = send(
    &h.router,
    Method::POST,
    "/functions/REPORTING/commands",
    Some("admin"),
    Some(assign(json!(["VIEW", "APPROVE"]))),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(commands.as_array().unwrap().len(), 2);

  let (status, _, _) = send(
    &h.router,
    Method::POST,
    "/functions/REPORTING/commands",
    Some("admin"),
    Some(assign(json!(["VIEW"]))),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _, _) = send(
    &h.router,
    Method::DELETE,
    "/functions/REPORTING/commands?commandIds=APPROVE",
    Some("admin"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (_, _, commands) =
    send(&h.router, Method::GET, "/functions/REPORTING/commands", Some("admin"), None).await;
  assert_eq!(commands[0]["id"], "VIEW");
  assert_eq!(commands.as_array().unwrap().len(), 1);

  let (status, _, body) = send(
    &h.router,
    Method::POST,
    "/functions/REPORTING/commands",
    Some("admin"),
    Some(json!({ "commandIds": [] })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["errors"][0], "CommandIds is required");

  let (status, _, _) = send(&h.router, Method::GET, "/functions", Some("bob"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}
