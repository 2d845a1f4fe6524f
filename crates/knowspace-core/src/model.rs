//! Entities, write inputs and read models.
//!
//! Read models serialise as camelCase JSON; that is the wire shape the API
//! hands out unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  slug::{to_label_id, to_slug},
  validate::Violations,
};

// ─── Knowledge bases ─────────────────────────────────────────────────────────

/// The denormalised per-article counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
  pub number_of_votes:    i64,
  pub number_of_comments: i64,
  pub number_of_reports:  i64,
}

/// Listing shape: an article joined with its category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseQuick {
  pub id:                 i64,
  pub category_id:        i64,
  pub title:              String,
  pub seo_alias:          String,
  pub description:        Option<String>,
  pub category_alias:     String,
  pub category_name:      String,
  pub number_of_votes:    i64,
  pub number_of_comments: i64,
  pub view_count:         i64,
  pub create_date:        DateTime<Utc>,
}

/// The full detail view of a single article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
  pub id:                 i64,
  pub category_id:        i64,
  pub title:              String,
  pub seo_alias:          String,
  pub description:        Option<String>,
  pub environment:        Option<String>,
  pub problem:            String,
  pub step_to_reproduce:  Option<String>,
  pub error_message:      Option<String>,
  pub workaround:         Option<String>,
  pub note:               Option<String>,
  pub owner_user_id:      String,
  /// Label names, derived from the label join table.
  pub labels:             Vec<String>,
  pub create_date:        DateTime<Utc>,
  pub last_modified_date: Option<DateTime<Utc>>,
  pub number_of_comments: i64,
  pub number_of_votes:    i64,
  pub number_of_reports:  i64,
  pub view_count:         i64,
  pub attachments:        Vec<Attachment>,
}

/// Article fields supplied on create and on (full-replace) update.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBaseInput {
  pub category_id:       Option<i64>,
  pub title:             String,
  /// When empty, derived from `title`.
  pub seo_alias:         Option<String>,
  pub description:       Option<String>,
  pub environment:       Option<String>,
  pub problem:           String,
  pub step_to_reproduce: Option<String>,
  pub error_message:     Option<String>,
  pub workaround:        Option<String>,
  pub note:              Option<String>,
  /// Raw label texts. `None` leaves existing labels untouched on update.
  pub labels:            Option<Vec<String>>,
}

impl KnowledgeBaseInput {
  pub fn validate(&self) -> Result<()> {
    let mut v = Violations::default();
    v.check(self.category_id.is_some(), "Category is required");
    v.require("Title", &self.title);
    v.require("Problem", &self.problem);
    v.require("Note", self.note.as_deref().unwrap_or_default());
    v.finish()
  }

  /// The explicit alias if one was given, otherwise a slug of the title.
  pub fn resolved_alias(&self) -> String {
    match self.seo_alias.as_deref().map(str::trim) {
      Some(alias) if !alias.is_empty() => alias.to_owned(),
      _ => to_slug(&self.title),
    }
  }

  /// Deduplicated `(id, name)` pairs for the requested labels.
  pub fn label_pairs(&self) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for text in self.labels.iter().flatten() {
      let name = text.trim();
      let id = to_label_id(name);
      if id.is_empty() || pairs.iter().any(|(existing, _)| *existing == id) {
        continue;
      }
      pairs.push((id, name.to_owned()));
    }
    pairs
  }
}

/// Input for [`KnowledgeStore::create_knowledge_base`](crate::store::KnowledgeStore::create_knowledge_base).
#[derive(Debug, Clone)]
pub struct NewKnowledgeBase {
  pub input:         KnowledgeBaseInput,
  pub owner_user_id: String,
  pub attachments:   Vec<NewAttachment>,
}

/// Narrowing applied by the paged article search.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBaseFilter {
  /// Substring matched against the title.
  pub text:        Option<String>,
  pub category_id: Option<i64>,
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub id:                       i64,
  pub content:                  String,
  pub knowledge_base_id:        i64,
  pub knowledge_base_title:     Option<String>,
  pub knowledge_base_seo_alias: Option<String>,
  pub owner_user_id:            String,
  pub owner_name:               Option<String>,
  pub create_date:              DateTime<Utc>,
  pub last_modified_date:       Option<DateTime<Utc>>,
  pub reply_id:                 Option<i64>,
  /// Populated only by [`build_comment_tree`](crate::comment_tree::build_comment_tree).
  #[serde(default)]
  pub children:                 Vec<Comment>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
  pub knowledge_base_id: i64,
  pub content:           String,
  pub owner_user_id:     String,
  pub reply_id:          Option<i64>,
}

impl NewComment {
  pub fn validate(&self) -> Result<()> {
    let mut v = Violations::default();
    v.require("Content", &self.content);
    v.finish()
  }
}

// ─── Votes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
  pub knowledge_base_id: i64,
  pub user_id:           String,
  pub create_date:       DateTime<Utc>,
}

/// Result of toggling a user's vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
  /// `true` if the vote now exists, `false` if it was withdrawn.
  pub voted:           bool,
  pub number_of_votes: i64,
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
  pub id:                 i64,
  pub knowledge_base_id:  i64,
  pub content:            String,
  pub report_user_id:     String,
  pub is_processed:       bool,
  pub create_date:        DateTime<Utc>,
  pub last_modified_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
  pub knowledge_base_id: i64,
  pub content:           String,
  pub report_user_id:    String,
}

impl NewReport {
  pub fn validate(&self) -> Result<()> {
    let mut v = Violations::default();
    v.require("Content", &self.content);
    v.finish()
  }
}

// ─── Attachments ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
  pub id:                i64,
  pub knowledge_base_id: i64,
  pub file_name:         String,
  /// Public URL of the stored file.
  pub file_path:         String,
  pub file_size:         i64,
  pub file_type:         String,
  pub create_date:       DateTime<Utc>,
}

/// Metadata of a file already written by the storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
  pub file_name: String,
  pub file_path: String,
  pub file_size: i64,
  pub file_type: String,
}

// ─── Labels & categories ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
  pub id:   String,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
  pub id:                i64,
  pub name:              String,
  pub seo_alias:         String,
  pub parent_id:         Option<i64>,
  pub sort_order:        i64,
  /// Articles filed under this category.
  pub number_of_tickets: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewCategory {
  pub name:       String,
  pub seo_alias:  Option<String>,
  pub parent_id:  Option<i64>,
  pub sort_order: i64,
}

impl NewCategory {
  pub fn validate(&self) -> Result<()> {
    let mut v = Violations::default();
    v.require("Name", &self.name);
    v.finish()
  }

  pub fn resolved_alias(&self) -> String {
    match self.seo_alias.as_deref().map(str::trim) {
      Some(alias) if !alias.is_empty() => alias.to_owned(),
      _ => to_slug(&self.name),
    }
  }
}

// ─── System functions & commands ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
  pub id:         String,
  pub name:       String,
  pub url:        String,
  pub sort_order: i64,
  pub parent_id:  Option<String>,
  pub icon:       Option<String>,
}

impl Function {
  pub fn validate(&self) -> Result<()> {
    let mut v = Violations::default();
    v.require("Id", &self.id);
    v.require("Name", &self.name);
    v.require("Url", &self.url);
    v.check(
      self.parent_id.as_deref() != Some(self.id.as_str()),
      "A function cannot be its own parent",
    );
    v.finish()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
  pub id:   String,
  pub name: String,
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id:          String,
  pub user_name:   String,
  pub first_name:  String,
  pub last_name:   String,
  pub email:       String,
  pub create_date: DateTime<Utc>,
}

impl User {
  pub fn full_name(&self) -> String { format!("{} {}", self.first_name, self.last_name) }
}

#[derive(Debug, Clone)]
pub struct NewUser {
  pub user_name:     String,
  pub first_name:    String,
  pub last_name:     String,
  pub email:         String,
  /// argon2 PHC string.
  pub password_hash: String,
}

/// A user together with the stored password hash, for credential checks.
#[derive(Debug, Clone)]
pub struct UserCredentials {
  pub user:          User,
  pub password_hash: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn input() -> KnowledgeBaseInput {
    KnowledgeBaseInput {
      category_id: Some(1),
      title: "Lỗi kết nối VPN".into(),
      problem: "cannot connect".into(),
      note: Some("restart the client".into()),
      ..Default::default()
    }
  }

  #[test]
  fn valid_input_passes() {
    assert!(input().validate().is_ok());
  }

  #[test]
  fn missing_fields_are_all_reported() {
    let bad = KnowledgeBaseInput::default();
    let err = bad.validate().unwrap_err();
    let crate::Error::Validation(messages) = err else {
      panic!("expected validation error, got {err:?}");
    };
    assert_eq!(messages, [
      "Category is required",
      "Title is required",
      "Problem is required",
      "Note is required",
    ]);
  }

  #[test]
  fn alias_falls_back_to_title_slug() {
    assert_eq!(input().resolved_alias(), "loi-ket-noi-vpn");

    let mut explicit = input();
    explicit.seo_alias = Some("  vpn  ".into());
    assert_eq!(explicit.resolved_alias(), "vpn");
  }

  #[test]
  fn label_pairs_are_slugged_and_deduplicated() {
    let mut i = input();
    i.labels = Some(vec![
      "Windows 10".into(),
      "windows 10".into(),
      "  ".into(),
      "Mạng".into(),
      "C".into(),
      "C#".into(),
      "C++".into(),
    ]);
    assert_eq!(i.label_pairs(), [
      ("windows-10".to_string(), "Windows 10".to_string()),
      ("mang".to_string(), "Mạng".to_string()),
      ("c".to_string(), "C".to_string()),
      ("c-sharp".to_string(), "C#".to_string()),
      ("c-plus-plus".to_string(), "C++".to_string()),
    ]);
  }

  #[test]
  fn function_cannot_parent_itself() {
    let f = Function {
      id:         "CONTENT".into(),
      name:       "Content".into(),
      url:        "/content".into(),
      sort_order: 1,
      parent_id:  Some("CONTENT".into()),
      icon:       None,
    };
    assert!(f.validate().is_err());
  }

  #[test]
  fn comment_serialises_camel_case() {
    let c = Comment {
      id:                       1,
      content:                  "hi".into(),
      knowledge_base_id:        2,
      knowledge_base_title:     None,
      knowledge_base_seo_alias: None,
      owner_user_id:            "u".into(),
      owner_name:               None,
      create_date:              Utc::now(),
      last_modified_date:       None,
      reply_id:                 None,
      children:                 vec![],
    };
    let json = serde_json::to_value(&c).unwrap();
    assert!(json.get("knowledgeBaseId").is_some());
    assert!(json.get("replyId").is_some());
  }
}
