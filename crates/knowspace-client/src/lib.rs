//! Async HTTP client wrapping the Knowspace JSON API.
//!
//! Covers what a public portal needs: article listings and detail, labels,
//! categories, the signed-in actions (comment, vote, report, author) and the
//! caller's own profile and articles.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use knowspace_core::{
  model::{Category, Comment, KnowledgeBase, KnowledgeBaseQuick, Label, Report, User},
  paging::Page,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  /// The server answered with a non-success status.
  #[error("{status}: {message}")]
  Status {
    status:  StatusCode,
    message: String,
    errors:  Vec<String>,
  },
}

impl ClientError {
  pub fn status(&self) -> Option<StatusCode> {
    match self {
      ClientError::Status { status, .. } => Some(*status),
      ClientError::Http(e) => e.status(),
    }
  }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, Deserialize)]
struct ErrorBody {
  #[serde(default)]
  message: String,
  #[serde(default)]
  errors:  Vec<String>,
}

// ─── Request bodies ───────────────────────────────────────────────────────────

/// Article fields sent on create and update.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseRequest {
  pub category_id:       i64,
  pub title:             String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub seo_alias:         Option<String>,
  pub description:       Option<String>,
  pub environment:       Option<String>,
  pub problem:           String,
  pub step_to_reproduce: Option<String>,
  pub error_message:     Option<String>,
  pub workaround:        Option<String>,
  pub note:              Option<String>,
  /// `None` leaves labels untouched on update.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub labels:            Option<Vec<String>>,
  pub attachments:       Vec<Upload>,
}

/// A file to upload, carried base64-encoded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
  pub file_name: String,
  pub content:   String,
}

impl Upload {
  pub fn new(file_name: impl Into<String>, bytes: &[u8]) -> Self {
    Self { file_name: file_name.into(), content: B64.encode(bytes) }
  }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentRequest<'a> {
  content:  &'a str,
  reply_id: Option<i64>,
}

#[derive(Serialize)]
struct ReportRequest<'a> {
  content: &'a str,
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Connection settings for the Knowspace API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  /// Empty for anonymous access.
  pub username: String,
  pub password: String,
}

/// Async HTTP client for the Knowspace JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response> {
    let resp = self.auth(req).send().await?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let body = resp.json::<ErrorBody>().await.ok();
    let (message, errors) = match body {
      Some(b) => (b.message, b.errors),
      None => (status.canonical_reason().unwrap_or_default().to_owned(), vec![]),
    };
    Err(ClientError::Status { status, message, errors })
  }

  async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
    Ok(self.send(req).await?.json().await?)
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    self.json(self.client.get(self.url(path))).await
  }

  async fn get_page(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<Page<KnowledgeBaseQuick>> {
    self.json(self.client.get(self.url(path)).query(query)).await
  }

  // ── Knowledge bases ───────────────────────────────────────────────────────

  /// `GET /api/knowledgebases/popular/{take}`
  pub async fn popular_knowledge_bases(&self, take: u32) -> Result<Vec<KnowledgeBaseQuick>> {
    self.get(&format!("/knowledgebases/popular/{take}")).await
  }

  /// `GET /api/knowledgebases/latest/{take}`
  pub async fn latest_knowledge_bases(&self, take: u32) -> Result<Vec<KnowledgeBaseQuick>> {
    self.get(&format!("/knowledgebases/latest/{take}")).await
  }

  /// `GET /api/knowledgebases/filter?categoryId=..`
  pub async fn knowledge_bases_by_category(
    &self,
    category_id: i64,
    page_index: i64,
    page_size: i64,
  ) -> Result<Page<KnowledgeBaseQuick>> {
    self
      .get_page("/knowledgebases/filter", &[
        ("categoryId", category_id.to_string()),
        ("pageIndex", page_index.to_string()),
        ("pageSize", page_size.to_string()),
      ])
      .await
  }

  /// `GET /api/knowledgebases/filter?filter=..`
  pub async fn search_knowledge_bases(
    &self,
    keyword: &str,
    page_index: i64,
    page_size: i64,
  ) -> Result<Page<KnowledgeBaseQuick>> {
    self
      .get_page("/knowledgebases/filter", &[
        ("filter", keyword.to_owned()),
        ("pageIndex", page_index.to_string()),
        ("pageSize", page_size.to_string()),
      ])
      .await
  }

  /// `GET /api/knowledgebases/tags/{labelId}`
  pub async fn knowledge_bases_by_label(
    &self,
    label_id: &str,
    page_index: i64,
    page_size: i64,
  ) -> Result<Page<KnowledgeBaseQuick>> {
    self
      .get_page(&format!("/knowledgebases/tags/{label_id}"), &[
        ("pageIndex", page_index.to_string()),
        ("pageSize", page_size.to_string()),
      ])
      .await
  }

  /// `GET /api/knowledgebases/{id}`
  pub async fn knowledge_base(&self, id: i64) -> Result<KnowledgeBase> {
    self.get(&format!("/knowledgebases/{id}")).await
  }

  /// `GET /api/knowledgebases/{id}/labels`
  pub async fn labels_of_knowledge_base(&self, id: i64) -> Result<Vec<Label>> {
    self.get(&format!("/knowledgebases/{id}/labels")).await
  }

  /// `POST /api/knowledgebases`
  pub async fn create_knowledge_base(&self, request: &KnowledgeBaseRequest) -> Result<KnowledgeBase> {
    self
      .json(self.client.post(self.url("/knowledgebases")).json(request))
      .await
  }

  /// `PUT /api/knowledgebases/{id}`
  pub async fn update_knowledge_base(&self, id: i64, request: &KnowledgeBaseRequest) -> Result<()> {
    let url = self.url(&format!("/knowledgebases/{id}"));
    self.send(self.client.put(url).json(request)).await?;
    Ok(())
  }

  /// `PUT /api/knowledgebases/{id}/view-count`; returns the new count.
  pub async fn increment_view_count(&self, id: i64) -> Result<i64> {
    let url = self.url(&format!("/knowledgebases/{id}/view-count"));
    self.json(self.client.put(url)).await
  }

  // ── Comments, votes & reports ─────────────────────────────────────────────

  /// `GET /api/knowledgebases/comments/recent/{take}`
  pub async fn recent_comments(&self, take: u32) -> Result<Vec<Comment>> {
    self.get(&format!("/knowledgebases/comments/recent/{take}")).await
  }

  /// `GET /api/knowledgebases/{id}/comments/tree`
  pub async fn comment_tree(&self, knowledge_base_id: i64) -> Result<Vec<Comment>> {
    self.get(&format!("/knowledgebases/{knowledge_base_id}/comments/tree")).await
  }

  /// `POST /api/knowledgebases/{id}/comments`
  pub async fn post_comment(
    &self,
    knowledge_base_id: i64,
    content: &str,
    reply_id: Option<i64>,
  ) -> Result<Comment> {
    let url = self.url(&format!("/knowledgebases/{knowledge_base_id}/comments"));
    let body = CommentRequest { content, reply_id };
    self.json(self.client.post(url).json(&body)).await
  }

  /// `POST /api/knowledgebases/{id}/votes`; toggles the caller's vote and
  /// returns the new vote count.
  pub async fn toggle_vote(&self, knowledge_base_id: i64) -> Result<i64> {
    let url = self.url(&format!("/knowledgebases/{knowledge_base_id}/votes"));
    self.json(self.client.post(url)).await
  }

  /// `POST /api/knowledgebases/{id}/reports`
  pub async fn post_report(&self, knowledge_base_id: i64, content: &str) -> Result<Report> {
    let url = self.url(&format!("/knowledgebases/{knowledge_base_id}/reports"));
    self.json(self.client.post(url).json(&ReportRequest { content })).await
  }

  // ── Labels & categories ───────────────────────────────────────────────────

  /// `GET /api/labels/popular/{take}`
  pub async fn popular_labels(&self, take: u32) -> Result<Vec<Label>> {
    self.get(&format!("/labels/popular/{take}")).await
  }

  /// `GET /api/labels/{id}`
  pub async fn label(&self, id: &str) -> Result<Label> {
    self.get(&format!("/labels/{id}")).await
  }

  /// `GET /api/categories`
  pub async fn categories(&self) -> Result<Vec<Category>> { self.get("/categories").await }

  /// `GET /api/categories/{id}`
  pub async fn category(&self, id: i64) -> Result<Category> {
    self.get(&format!("/categories/{id}")).await
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  /// `GET /api/users/{id}`
  pub async fn user(&self, id: &str) -> Result<User> { self.get(&format!("/users/{id}")).await }

  /// `GET /api/users/{userId}/knowledgeBases`: articles the user wrote.
  pub async fn knowledge_bases_by_user(
    &self,
    user_id: &str,
    page_index: i64,
    page_size: i64,
  ) -> Result<Page<KnowledgeBaseQuick>> {
    self
      .get_page(&format!("/users/{user_id}/knowledgeBases"), &[
        ("pageIndex", page_index.to_string()),
        ("pageSize", page_size.to_string()),
      ])
      .await
  }
}
