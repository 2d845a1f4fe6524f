//! Encoding and decoding helpers between domain types and SQLite rows.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond
//! precision and a `Z` suffix, so lexical order equals chronological order.
//! Each `Raw*` struct mirrors one `SELECT` column list exactly; the matching
//! `*_COLUMNS` constant must be kept in step with its `from_row`.

use chrono::{DateTime, SecondsFormat, Utc};
use knowspace_core::model::{
  Attachment, Comment, KnowledgeBase, KnowledgeBaseQuick, Report, User, Vote,
};
use rusqlite::Row;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Knowledge base listing ──────────────────────────────────────────────────

pub const QUICK_FROM: &str =
  "knowledge_bases k JOIN categories c ON c.id = k.category_id";

pub const QUICK_COLUMNS: &str = "k.id, k.category_id, k.title, k.seo_alias, \
   k.description, c.seo_alias, c.name, k.number_of_votes, \
   k.number_of_comments, k.view_count, k.create_date";

pub struct RawQuick {
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
  pub create_date:        String,
}

impl RawQuick {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      category_id:        row.get(1)?,
      title:              row.get(2)?,
      seo_alias:          row.get(3)?,
      description:        row.get(4)?,
      category_alias:     row.get(5)?,
      category_name:      row.get(6)?,
      number_of_votes:    row.get(7)?,
      number_of_comments: row.get(8)?,
      view_count:         row.get(9)?,
      create_date:        row.get(10)?,
    })
  }

  pub fn into_quick(self) -> Result<KnowledgeBaseQuick> {
    Ok(KnowledgeBaseQuick {
      id:                 self.id,
      category_id:        self.category_id,
      title:              self.title,
      seo_alias:          self.seo_alias,
      description:        self.description,
      category_alias:     self.category_alias,
      category_name:      self.category_name,
      number_of_votes:    self.number_of_votes,
      number_of_comments: self.number_of_comments,
      view_count:         self.view_count,
      create_date:        decode_dt(&self.create_date)?,
    })
  }
}

// ─── Knowledge base detail ───────────────────────────────────────────────────

pub const KNOWLEDGE_BASE_COLUMNS: &str = "id, category_id, title, seo_alias, \
   description, environment, problem, step_to_reproduce, error_message, \
   workaround, note, owner_user_id, create_date, last_modified_date, \
   number_of_comments, number_of_votes, number_of_reports, view_count";

/// An article row plus its label names and attachment rows.
pub struct RawKnowledgeBase {
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
  pub create_date:        String,
  pub last_modified_date: Option<String>,
  pub number_of_comments: i64,
  pub number_of_votes:    i64,
  pub number_of_reports:  i64,
  pub view_count:         i64,
  pub labels:             Vec<String>,
  pub attachments:        Vec<RawAttachment>,
}

impl RawKnowledgeBase {
  /// Reads the article columns; `labels` and `attachments` start empty.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      category_id:        row.get(1)?,
      title:              row.get(2)?,
      seo_alias:          row.get(3)?,
      description:        row.get(4)?,
      environment:        row.get(5)?,
      problem:            row.get(6)?,
      step_to_reproduce:  row.get(7)?,
      error_message:      row.get(8)?,
      workaround:         row.get(9)?,
      note:               row.get(10)?,
      owner_user_id:      row.get(11)?,
      create_date:        row.get(12)?,
      last_modified_date: row.get(13)?,
      number_of_comments: row.get(14)?,
      number_of_votes:    row.get(15)?,
      number_of_reports:  row.get(16)?,
      view_count:         row.get(17)?,
      labels:             Vec::new(),
      attachments:        Vec::new(),
    })
  }

  pub fn into_knowledge_base(self) -> Result<KnowledgeBase> {
    let attachments = self
      .attachments
      .into_iter()
      .map(RawAttachment::into_attachment)
      .collect::<Result<Vec<_>>>()?;

    Ok(KnowledgeBase {
      id: self.id,
      category_id: self.category_id,
      title: self.title,
      seo_alias: self.seo_alias,
      description: self.description,
      environment: self.environment,
      problem: self.problem,
      step_to_reproduce: self.step_to_reproduce,
      error_message: self.error_message,
      workaround: self.workaround,
      note: self.note,
      owner_user_id: self.owner_user_id,
      labels: self.labels,
      create_date: decode_dt(&self.create_date)?,
      last_modified_date: decode_opt_dt(self.last_modified_date)?,
      number_of_comments: self.number_of_comments,
      number_of_votes: self.number_of_votes,
      number_of_reports: self.number_of_reports,
      view_count: self.view_count,
      attachments,
    })
  }
}

// ─── Comments ────────────────────────────────────────────────────────────────

pub const COMMENT_FROM: &str = "comments cm \
   JOIN knowledge_bases k ON k.id = cm.knowledge_base_id \
   LEFT JOIN users u ON u.id = cm.owner_user_id";

/// The owner name is `NULL` when the author has no user row.
pub const COMMENT_COLUMNS: &str = "cm.id, cm.content, cm.knowledge_base_id, \
   k.title, k.seo_alias, cm.owner_user_id, u.first_name || ' ' || u.last_name, \
   cm.create_date, cm.last_modified_date, cm.reply_id";

pub struct RawComment {
  pub id:                       i64,
  pub content:                  String,
  pub knowledge_base_id:        i64,
  pub knowledge_base_title:     Option<String>,
  pub knowledge_base_seo_alias: Option<String>,
  pub owner_user_id:            String,
  pub owner_name:               Option<String>,
  pub create_date:              String,
  pub last_modified_date:       Option<String>,
  pub reply_id:                 Option<i64>,
}

impl RawComment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                       row.get(0)?,
      content:                  row.get(1)?,
      knowledge_base_id:        row.get(2)?,
      knowledge_base_title:     row.get(3)?,
      knowledge_base_seo_alias: row.get(4)?,
      owner_user_id:            row.get(5)?,
      owner_name:               row.get(6)?,
      create_date:              row.get(7)?,
      last_modified_date:       row.get(8)?,
      reply_id:                 row.get(9)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      id:                       self.id,
      content:                  self.content,
      knowledge_base_id:        self.knowledge_base_id,
      knowledge_base_title:     self.knowledge_base_title,
      knowledge_base_seo_alias: self.knowledge_base_seo_alias,
      owner_user_id:            self.owner_user_id,
      owner_name:               self.owner_name,
      create_date:              decode_dt(&self.create_date)?,
      last_modified_date:       decode_opt_dt(self.last_modified_date)?,
      reply_id:                 self.reply_id,
      children:                 Vec::new(),
    })
  }
}

// ─── Votes ───────────────────────────────────────────────────────────────────

pub const VOTE_COLUMNS: &str = "knowledge_base_id, user_id, create_date";

pub struct RawVote {
  pub knowledge_base_id: i64,
  pub user_id:           String,
  pub create_date:       String,
}

impl RawVote {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      knowledge_base_id: row.get(0)?,
      user_id:           row.get(1)?,
      create_date:       row.get(2)?,
    })
  }

  pub fn into_vote(self) -> Result<Vote> {
    Ok(Vote {
      knowledge_base_id: self.knowledge_base_id,
      user_id:           self.user_id,
      create_date:       decode_dt(&self.create_date)?,
    })
  }
}

// ─── Reports ─────────────────────────────────────────────────────────────────

pub const REPORT_COLUMNS: &str = "id, knowledge_base_id, content, \
   report_user_id, is_processed, create_date, last_modified_date";

pub struct RawReport {
  pub id:                 i64,
  pub knowledge_base_id:  i64,
  pub content:            String,
  pub report_user_id:     String,
  pub is_processed:       bool,
  pub create_date:        String,
  pub last_modified_date: Option<String>,
}

impl RawReport {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      knowledge_base_id:  row.get(1)?,
      content:            row.get(2)?,
      report_user_id:     row.get(3)?,
      is_processed:       row.get(4)?,
      create_date:        row.get(5)?,
      last_modified_date: row.get(6)?,
    })
  }

  pub fn into_report(self) -> Result<Report> {
    Ok(Report {
      id:                 self.id,
      knowledge_base_id:  self.knowledge_base_id,
      content:            self.content,
      report_user_id:     self.report_user_id,
      is_processed:       self.is_processed,
      create_date:        decode_dt(&self.create_date)?,
      last_modified_date: decode_opt_dt(self.last_modified_date)?,
    })
  }
}

// ─── Attachments ─────────────────────────────────────────────────────────────

pub const ATTACHMENT_COLUMNS: &str =
  "id, knowledge_base_id, file_name, file_path, file_size, file_type, create_date";

pub struct RawAttachment {
  pub id:                i64,
  pub knowledge_base_id: i64,
  pub file_name:         String,
  pub file_path:         String,
  pub file_size:         i64,
  pub file_type:         String,
  pub create_date:       String,
}

impl RawAttachment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      knowledge_base_id: row.get(1)?,
      file_name:         row.get(2)?,
      file_path:         row.get(3)?,
      file_size:         row.get(4)?,
      file_type:         row.get(5)?,
      create_date:       row.get(6)?,
    })
  }

  pub fn into_attachment(self) -> Result<Attachment> {
    Ok(Attachment {
      id:                self.id,
      knowledge_base_id: self.knowledge_base_id,
      file_name:         self.file_name,
      file_path:         self.file_path,
      file_size:         self.file_size,
      file_type:         self.file_type,
      create_date:       decode_dt(&self.create_date)?,
    })
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
  "id, user_name, first_name, last_name, email, create_date, password_hash";

pub struct RawUser {
  pub id:            String,
  pub user_name:     String,
  pub first_name:    String,
  pub last_name:     String,
  pub email:         String,
  pub create_date:   String,
  pub password_hash: String,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      user_name:     row.get(1)?,
      first_name:    row.get(2)?,
      last_name:     row.get(3)?,
      email:         row.get(4)?,
      create_date:   row.get(5)?,
      password_hash: row.get(6)?,
    })
  }

  /// Splits the row into the public user and its password hash.
  pub fn into_parts(self) -> Result<(User, String)> {
    let user = User {
      id:          self.id,
      user_name:   self.user_name,
      first_name:  self.first_name,
      last_name:   self.last_name,
      email:       self.email,
      create_date: decode_dt(&self.create_date)?,
    };
    Ok((user, self.password_hash))
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let earlier = Utc.with_ymd_and_hms(2024, 1, 9, 23, 59, 59).unwrap();
    let later = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
    assert!(encode_dt(earlier) < encode_dt(later));
    assert_eq!(decode_dt(&encode_dt(later)).unwrap(), later);
  }

  #[test]
  fn garbage_timestamp_is_a_parse_error() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}
