//! Error types for `knowspace-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("knowledge base not found: {0}")]
  KnowledgeBaseNotFound(i64),

  #[error("comment not found: {0}")]
  CommentNotFound(i64),

  #[error("report not found: {0}")]
  ReportNotFound(i64),

  #[error("attachment not found: {0}")]
  AttachmentNotFound(i64),

  #[error("function not found: {0}")]
  FunctionNotFound(String),

  #[error("user not found: {0}")]
  UserNotFound(String),

  #[error("user {user_id} has not voted for knowledge base {knowledge_base_id}")]
  VoteNotFound {
    knowledge_base_id: i64,
    user_id:           String,
  },

  #[error("category {0} does not exist")]
  UnknownCategory(i64),

  #[error("command {0} does not exist")]
  UnknownCommand(String),

  #[error("comment {0} is not a comment of this knowledge base")]
  InvalidReplyTarget(i64),

  #[error("function with id {0} already exists")]
  FunctionExists(String),

  #[error("command {command} is already assigned to function {function}")]
  CommandAlreadyAssigned { command: String, function: String },

  #[error("command {command} is not assigned to function {function}")]
  CommandNotAssigned { command: String, function: String },

  #[error("user name {0} is already taken")]
  UserExists(String),

  #[error("invalid page request: {0}")]
  InvalidPage(String),

  #[error("validation failed: {}", .0.join("; "))]
  Validation(Vec<String>),

  /// A write affected zero rows.
  #[error("nothing was persisted")]
  NothingPersisted,
}

impl Error {
  /// `true` for errors caused by a referenced entity being absent.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::KnowledgeBaseNotFound(_)
        | Self::CommentNotFound(_)
        | Self::ReportNotFound(_)
        | Self::AttachmentNotFound(_)
        | Self::FunctionNotFound(_)
        | Self::UserNotFound(_)
        | Self::VoteNotFound { .. }
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
