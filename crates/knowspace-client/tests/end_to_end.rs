//! Drives `ApiClient` against a real server bound to an ephemeral port.

use std::{net::SocketAddr, sync::Arc};

use knowspace_api::{AppState, FileStorage};
use knowspace_client::{ApiClient, ApiConfig, KnowledgeBaseRequest, Upload};
use knowspace_core::{model::NewCategory, store::KnowledgeStore};
use knowspace_server::{app, bootstrap_admin, hash_password};
use knowspace_store_sqlite::SqliteStore;
use tokio::net::TcpListener;

const PASSWORD: &str = "s3cret";

/// Start a server with a seeded admin and one category.
async fn serve() -> (SocketAddr, i64) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  bootstrap_admin(&store, "admin", &hash_password(PASSWORD).unwrap()).await.unwrap();
  let category = store
    .create_category(NewCategory { name: "Mạng nội bộ".into(), ..Default::default() })
    .await
    .unwrap();

  let dir = std::env::temp_dir().join(format!("knowspace-e2e-{}", uuid::Uuid::new_v4()));
  let app = app(AppState::new(Arc::new(store), FileStorage::new(dir)));

  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  (addr, category.id)
}

fn client(addr: SocketAddr, username: &str) -> ApiClient {
  ApiClient::new(ApiConfig {
    base_url: format!("http://{addr}/"),
    username: username.into(),
    password: PASSWORD.into(),
  })
  .unwrap()
}

fn article(category_id: i64, title: &str) -> KnowledgeBaseRequest {
  KnowledgeBaseRequest {
    category_id,
    title: title.into(),
    problem: "Outlook keeps asking for the password".into(),
    note: Some("Clear cached credentials".into()),
    labels: Some(vec!["Outlook".into(), "Office 365".into()]),
    ..Default::default()
  }
}

#[tokio::test]
async fn portal_flow() {
  let (addr, category_id) = serve().await;
  let admin = client(addr, "admin");
  let anonymous = client(addr, "");

  let mut request = article(category_id, "Outlook password prompt");
  request.attachments = vec![Upload::new("trace.txt", b"401 from EWS")];
  let created = admin.create_knowledge_base(&request).await.unwrap();
  assert_eq!(created.seo_alias, "outlook-password-prompt");
  assert_eq!(created.attachments.len(), 1);

  admin.create_knowledge_base(&article(category_id, "Teams camera")).await.unwrap();

  // Listings
  let latest = anonymous.latest_knowledge_bases(5).await.unwrap();
  assert_eq!(latest[0].title, "Teams camera");
  assert_eq!(latest[0].category_alias, "mang-noi-bo");

  let by_category = anonymous.knowledge_bases_by_category(category_id, 1, 1).await.unwrap();
  assert_eq!(by_category.total_records, 2);
  assert_eq!(by_category.items.len(), 1);

  let found = anonymous.search_knowledge_bases("Outlook", 1, 10).await.unwrap();
  assert_eq!(found.total_records, 1);

  let tagged = anonymous.knowledge_bases_by_label("office-365", 1, 10).await.unwrap();
  assert_eq!(tagged.total_records, 2);

  // Views drive the popular listing.
  assert_eq!(anonymous.increment_view_count(created.id).await.unwrap(), 1);
  let popular = anonymous.popular_knowledge_bases(1).await.unwrap();
  assert_eq!(popular[0].id, created.id);

  // Discussion
  let root = admin.post_comment(created.id, "Which client version?", None).await.unwrap();
  admin.post_comment(created.id, "16.0.1", Some(root.id)).await.unwrap();
  let tree = anonymous.comment_tree(created.id).await.unwrap();
  assert_eq!(tree.len(), 1);
  assert_eq!(tree[0].children[0].content, "16.0.1");
  assert_eq!(anonymous.recent_comments(1).await.unwrap()[0].content, "16.0.1");

  assert_eq!(admin.toggle_vote(created.id).await.unwrap(), 1);
  let report = admin.post_report(created.id, "Screenshot is outdated").await.unwrap();
  assert_eq!(report.knowledge_base_id, created.id);

  let detail = anonymous.knowledge_base(created.id).await.unwrap();
  assert_eq!(detail.number_of_comments, 2);
  assert_eq!(detail.number_of_votes, 1);
  assert_eq!(detail.number_of_reports, 1);
  assert_eq!(detail.view_count, 1);

  // Labels & categories
  let labels = anonymous.labels_of_knowledge_base(created.id).await.unwrap();
  assert_eq!(labels.len(), 2);
  assert_eq!(anonymous.label("outlook").await.unwrap().name, "Outlook");
  assert_eq!(anonymous.popular_labels(10).await.unwrap().len(), 2);
  assert_eq!(anonymous.categories().await.unwrap().len(), 1);
  let category = anonymous.category(category_id).await.unwrap();
  assert_eq!(category.name, "Mạng nội bộ");
  assert_eq!(category.number_of_tickets, 2);

  // The author's own profile and articles
  let me = admin.user(&created.owner_user_id).await.unwrap();
  assert_eq!(me.user_name, "admin");
  assert_eq!(me.last_name, "Administrator");
  let mine = admin.knowledge_bases_by_user(&me.id, 1, 1).await.unwrap();
  assert_eq!(mine.total_records, 2);
  assert_eq!(mine.items[0].title, "Teams camera");

  let err = anonymous.knowledge_bases_by_user(&me.id, 1, 10).await.unwrap_err();
  assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
}

#[tokio::test]
async fn update_and_error_statuses() {
  let (addr, category_id) = serve().await;
  let admin = client(addr, "admin");
  let anonymous = client(addr, "");

  let created = admin.create_knowledge_base(&article(category_id, "VPN")).await.unwrap();
  let mut edit = article(category_id, "VPN over Wi-Fi");
  edit.labels = None;
  admin.update_knowledge_base(created.id, &edit).await.unwrap();

  let detail = anonymous.knowledge_base(created.id).await.unwrap();
  assert_eq!(detail.title, "VPN over Wi-Fi");
  assert_eq!(detail.labels.len(), 2);

  let err = anonymous.knowledge_base(9_999).await.unwrap_err();
  assert_eq!(err.status().map(|s| s.as_u16()), Some(404));

  let err = anonymous.toggle_vote(created.id).await.unwrap_err();
  assert_eq!(err.status().map(|s| s.as_u16()), Some(401));

  let err = admin
    .create_knowledge_base(&KnowledgeBaseRequest::default())
    .await
    .unwrap_err();
  match err {
    knowspace_client::ClientError::Status { status, errors, .. } => {
      assert_eq!(status.as_u16(), 400);
      assert!(errors.contains(&"Title is required".to_owned()));
    }
    other => panic!("expected a status error, got {other:?}"),
  }
}
