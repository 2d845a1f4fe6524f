//! The `KnowledgeStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `knowspace-store-sqlite`). The HTTP layer depends on this abstraction, not
//! on any concrete backend.
//!
//! Conventions:
//! - single-entity reads return `Ok(None)` when the entity is absent;
//! - writes and child-collection reads fail with a not-found [`Error`] when
//!   the entity or its parent article is absent;
//! - every write that touches an article's counters does so in the same
//!   transaction as the child row, using an atomic in-place increment.

use std::future::Future;

use crate::{
  Error,
  model::{
    Attachment, Category, Command, Comment, Counters, Function, KnowledgeBase,
    KnowledgeBaseFilter, KnowledgeBaseInput, KnowledgeBaseQuick, Label, NewAttachment,
    NewCategory, NewComment, NewKnowledgeBase, NewReport, NewUser, Report, User,
    UserCredentials, Vote, VoteOutcome,
  },
  paging::{Page, PageRequest},
  permission::{CommandCode, FunctionCode, PermissionSet},
};

/// Errors surfaced by a store backend.
///
/// Lets the HTTP layer tell domain failures (not found, validation, ...)
/// apart from infrastructure failures without knowing the backend type.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The domain error behind this failure, if it is one.
  fn domain(&self) -> Option<&Error>;
}

/// Abstraction over a Knowspace store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait KnowledgeStore: Send + Sync {
  type Error: StoreError;

  // ── Knowledge bases ───────────────────────────────────────────────────

  /// Insert an article, its label links and its attachment rows atomically.
  fn create_knowledge_base(
    &self,
    input: NewKnowledgeBase,
  ) -> impl Future<Output = Result<KnowledgeBase, Self::Error>> + Send + '_;

  fn list_knowledge_bases(
    &self,
  ) -> impl Future<Output = Result<Vec<KnowledgeBaseQuick>, Self::Error>> + Send + '_;

  /// Newest first.
  fn latest_knowledge_bases(
    &self,
    take: u32,
  ) -> impl Future<Output = Result<Vec<KnowledgeBaseQuick>, Self::Error>> + Send + '_;

  /// Highest view count first.
  fn popular_knowledge_bases(
    &self,
    take: u32,
  ) -> impl Future<Output = Result<Vec<KnowledgeBaseQuick>, Self::Error>> + Send + '_;

  /// Paged, newest-first listing narrowed by `filter`.
  fn search_knowledge_bases(
    &self,
    filter: KnowledgeBaseFilter,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<KnowledgeBaseQuick>, Self::Error>> + Send + '_;

  /// Paged, newest-first listing of the articles carrying a label.
  fn knowledge_bases_by_label(
    &self,
    label_id: String,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<KnowledgeBaseQuick>, Self::Error>> + Send + '_;

  /// Paged, newest-first listing of the articles a user owns.
  fn knowledge_bases_by_owner(
    &self,
    user_id: String,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<KnowledgeBaseQuick>, Self::Error>> + Send + '_;

  /// Full article view including labels and attachments.
  fn get_knowledge_base(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<KnowledgeBase>, Self::Error>> + Send + '_;

  /// Replace every editable field; appends `attachments`.
  fn update_knowledge_base(
    &self,
    id: i64,
    input: KnowledgeBaseInput,
    attachments: Vec<NewAttachment>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete an article and every child row. Returns the view as it was.
  fn delete_knowledge_base(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<KnowledgeBase, Self::Error>> + Send + '_;

  /// Atomically add one view; returns the new view count.
  fn increment_view_count(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Recompute the denormalised counters from the child tables.
  fn recount_counters(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Counters, Self::Error>> + Send + '_;

  /// Labels of one article, ordered by name.
  fn labels_of_knowledge_base(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Vec<Label>, Self::Error>> + Send + '_;

  // ── Comments ──────────────────────────────────────────────────────────

  /// All comments of an article, oldest first.
  fn list_comments(
    &self,
    knowledge_base_id: i64,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// Paged, newest-first comments whose content contains `filter`.
  fn search_comments(
    &self,
    knowledge_base_id: i64,
    filter: Option<String>,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Comment>, Self::Error>> + Send + '_;

  fn get_comment(
    &self,
    knowledge_base_id: i64,
    comment_id: i64,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  /// Insert a comment and bump the article's comment counter.
  ///
  /// `reply_id`, when set, must name a comment of the same article.
  fn create_comment(
    &self,
    input: NewComment,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  fn update_comment(
    &self,
    knowledge_base_id: i64,
    comment_id: i64,
    content: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a comment and decrement the counter. Direct replies are
  /// promoted to roots.
  fn delete_comment(
    &self,
    knowledge_base_id: i64,
    comment_id: i64,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  /// Newest comments across all articles, with article title and alias.
  fn recent_comments(
    &self,
    take: u32,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  // ── Votes ─────────────────────────────────────────────────────────────

  fn list_votes(
    &self,
    knowledge_base_id: i64,
  ) -> impl Future<Output = Result<Vec<Vote>, Self::Error>> + Send + '_;

  /// Add the user's vote, or withdraw it if it already exists.
  fn toggle_vote(
    &self,
    knowledge_base_id: i64,
    user_id: String,
  ) -> impl Future<Output = Result<VoteOutcome, Self::Error>> + Send + '_;

  fn delete_vote(
    &self,
    knowledge_base_id: i64,
    user_id: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reports ───────────────────────────────────────────────────────────

  fn list_reports(
    &self,
    knowledge_base_id: i64,
  ) -> impl Future<Output = Result<Vec<Report>, Self::Error>> + Send + '_;

  fn search_reports(
    &self,
    knowledge_base_id: i64,
    filter: Option<String>,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Report>, Self::Error>> + Send + '_;

  fn get_report(
    &self,
    knowledge_base_id: i64,
    report_id: i64,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + '_;

  fn create_report(
    &self,
    input: NewReport,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  fn delete_report(
    &self,
    knowledge_base_id: i64,
    report_id: i64,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  // ── Attachments ───────────────────────────────────────────────────────

  fn list_attachments(
    &self,
    knowledge_base_id: i64,
  ) -> impl Future<Output = Result<Vec<Attachment>, Self::Error>> + Send + '_;

  fn add_attachment(
    &self,
    knowledge_base_id: i64,
    input: NewAttachment,
  ) -> impl Future<Output = Result<Attachment, Self::Error>> + Send + '_;

  fn delete_attachment(
    &self,
    knowledge_base_id: i64,
    attachment_id: i64,
  ) -> impl Future<Output = Result<Attachment, Self::Error>> + Send + '_;

  // ── Labels & categories ───────────────────────────────────────────────

  /// Labels ordered by how many articles carry them.
  fn popular_labels(
    &self,
    take: u32,
  ) -> impl Future<Output = Result<Vec<Label>, Self::Error>> + Send + '_;

  fn get_label(
    &self,
    id: String,
  ) -> impl Future<Output = Result<Option<Label>, Self::Error>> + Send + '_;

  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  fn get_category(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  fn create_category(
    &self,
    input: NewCategory,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  // ── Functions & commands ──────────────────────────────────────────────

  fn list_functions(
    &self,
  ) -> impl Future<Output = Result<Vec<Function>, Self::Error>> + Send + '_;

  fn child_functions(
    &self,
    parent_id: String,
  ) -> impl Future<Output = Result<Vec<Function>, Self::Error>> + Send + '_;

  /// Paged functions whose id, name or url contains `filter`.
  fn search_functions(
    &self,
    filter: Option<String>,
    page: PageRequest,
  ) -> impl Future<Output = Result<Page<Function>, Self::Error>> + Send + '_;

  fn get_function(
    &self,
    id: String,
  ) -> impl Future<Output = Result<Option<Function>, Self::Error>> + Send + '_;

  fn create_function(
    &self,
    input: Function,
  ) -> impl Future<Output = Result<Function, Self::Error>> + Send + '_;

  /// Replace every field but the id.
  fn update_function(
    &self,
    id: String,
    input: Function,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a function together with its command assignments.
  fn delete_function(
    &self,
    id: String,
  ) -> impl Future<Output = Result<Function, Self::Error>> + Send + '_;

  fn commands_in_function(
    &self,
    function_id: String,
  ) -> impl Future<Output = Result<Vec<Command>, Self::Error>> + Send + '_;

  /// Assign commands to a function. Rejects commands already assigned to
  /// it. With `add_to_all_functions`, also assigns them to every other
  /// function that lacks them.
  fn assign_commands(
    &self,
    function_id: String,
    command_ids: Vec<String>,
    add_to_all_functions: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn unassign_commands(
    &self,
    function_id: String,
    command_ids: Vec<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Users & permissions ───────────────────────────────────────────────

  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_credentials(
    &self,
    user_name: String,
  ) -> impl Future<Output = Result<Option<UserCredentials>, Self::Error>> + Send + '_;

  /// Create the role if missing and give it to the user.
  fn assign_role(
    &self,
    user_id: String,
    role_id: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Grant `grants` to a role (idempotent).
  fn grant_permissions(
    &self,
    role_id: String,
    grants: Vec<(FunctionCode, CommandCode)>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Union of the permissions of every role the user holds.
  fn permissions_for(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<PermissionSet, Self::Error>> + Send + '_;
}
