//! [`SqliteStore`], the SQLite implementation of [`KnowledgeStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{
  Connection, OptionalExtension as _, Params, Row, Transaction, params, params_from_iter,
  types::Value,
};
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use knowspace_core::{
  Error as CoreError,
  model::{
    Attachment, Category, Command, Comment, Counters, Function, KnowledgeBase,
    KnowledgeBaseFilter, KnowledgeBaseInput, KnowledgeBaseQuick, Label, NewAttachment,
    NewCategory, NewComment, NewKnowledgeBase, NewReport, NewUser, Report, User,
    UserCredentials, Vote, VoteOutcome,
  },
  paging::{Page, PageRequest, normalize_filter},
  permission::{CommandCode, FunctionCode, PermissionSet},
  store::KnowledgeStore,
  validate::Violations,
};

use crate::{
  Error, Result,
  encode::{
    ATTACHMENT_COLUMNS, COMMENT_COLUMNS, COMMENT_FROM, KNOWLEDGE_BASE_COLUMNS,
    QUICK_COLUMNS, QUICK_FROM, RawAttachment, RawComment, RawKnowledgeBase, RawQuick,
    RawReport, RawUser, RawVote, REPORT_COLUMNS, USER_COLUMNS, VOTE_COLUMNS, encode_dt,
  },
  schema::SCHEMA,
};

const FUNCTION_COLUMNS: &str = "id, name, url, sort_order, parent_id, icon";

// ─── Transactions ────────────────────────────────────────────────────────────

/// What a `conn.call` closure hands back: SQL failures travel in the outer
/// result, domain rejections in the inner one.
type Call<T> = std::result::Result<knowspace_core::Result<T>, tokio_rusqlite::Error>;

enum TxError {
  Sql(rusqlite::Error),
  Domain(CoreError),
}

impl From<rusqlite::Error> for TxError {
  fn from(e: rusqlite::Error) -> Self { Self::Sql(e) }
}

impl From<CoreError> for TxError {
  fn from(e: CoreError) -> Self { Self::Domain(e) }
}

type TxResult<T> = std::result::Result<T, TxError>;

/// Run `f` inside a transaction. Commits on success; any error, domain or
/// SQL, rolls everything back when the transaction is dropped.
fn in_transaction<T>(
  conn: &mut Connection,
  f: impl FnOnce(&Transaction<'_>) -> TxResult<T>,
) -> Call<T> {
  let tx = conn.transaction()?;
  match f(&tx) {
    Ok(value) => {
      tx.commit()?;
      Ok(Ok(value))
    }
    Err(TxError::Domain(e)) => Ok(Err(e)),
    Err(TxError::Sql(e)) => Err(e.into()),
  }
}

fn reject<T>(e: CoreError) -> TxResult<T> { Err(TxError::Domain(e)) }

fn found<T>(value: Option<T>, missing: CoreError) -> TxResult<T> {
  match value {
    Some(value) => Ok(value),
    None => reject(missing),
  }
}

fn persisted(rows: usize) -> TxResult<()> {
  if rows == 0 { reject(CoreError::NothingPersisted) } else { Ok(()) }
}

// ─── Query helpers ───────────────────────────────────────────────────────────

fn exists(conn: &Connection, sql: &str, params: impl Params) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, params, |_| Ok(())).optional()?.is_some())
}

fn query_all<T>(
  conn: &Connection,
  sql: &str,
  params: impl Params,
  map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt.query_map(params, map)?.collect::<rusqlite::Result<Vec<_>>>();
  rows
}

/// `WHERE` clauses of a paged listing, with their positional `?` values.
#[derive(Default)]
struct Conditions {
  clauses: Vec<&'static str>,
  values:  Vec<Value>,
}

impl Conditions {
  fn push(&mut self, clause: &'static str, values: impl IntoIterator<Item = Value>) {
    self.clauses.push(clause);
    self.values.extend(values);
  }

  fn where_sql(&self) -> String {
    if self.clauses.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.clauses.join(" AND "))
    }
  }
}

/// Count the matching rows, then fetch the requested window of them.
fn fetch_page<T>(
  conn: &Connection,
  from: &str,
  columns: &str,
  conditions: &Conditions,
  order_by: &str,
  page: PageRequest,
  map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<(Vec<T>, i64)> {
  let where_sql = conditions.where_sql();

  let total: i64 = conn.query_row(
    &format!("SELECT COUNT(*) FROM {from} {where_sql}"),
    params_from_iter(conditions.values.iter()),
    |row| row.get(0),
  )?;
  tracing::debug!(from, total, page = page.page_index(), size = page.page_size(), "paged query");

  if page.window_len(total) == 0 {
    return Ok((Vec::new(), total));
  }

  let mut values = conditions.values.clone();
  values.push(Value::Integer(page.page_size()));
  values.push(Value::Integer(page.offset()));

  let sql = format!(
    "SELECT {columns} FROM {from} {where_sql} ORDER BY {order_by} LIMIT ? OFFSET ?"
  );
  let items = query_all(conn, &sql, params_from_iter(values.iter()), map)?;
  Ok((items, total))
}

fn text_filter(filter: Option<String>) -> Option<Value> {
  normalize_filter(filter).map(Value::Text)
}

// ─── Row loaders ─────────────────────────────────────────────────────────────

fn require_knowledge_base(conn: &Connection, id: i64) -> TxResult<()> {
  if exists(conn, "SELECT 1 FROM knowledge_bases WHERE id = ?1", params![id])? {
    Ok(())
  } else {
    reject(CoreError::KnowledgeBaseNotFound(id))
  }
}

fn require_function(conn: &Connection, id: &str) -> TxResult<()> {
  if exists(conn, "SELECT 1 FROM functions WHERE id = ?1", params![id])? {
    Ok(())
  } else {
    reject(CoreError::FunctionNotFound(id.to_owned()))
  }
}

fn load_knowledge_base(conn: &Connection, id: i64) -> rusqlite::Result<Option<RawKnowledgeBase>> {
  let sql = format!("SELECT {KNOWLEDGE_BASE_COLUMNS} FROM knowledge_bases WHERE id = ?1");
  let Some(mut raw) = conn
    .query_row(&sql, params![id], RawKnowledgeBase::from_row)
    .optional()?
  else {
    return Ok(None);
  };

  raw.labels = query_all(
    conn,
    "SELECT l.name FROM label_in_knowledge_bases lik
     JOIN labels l ON l.id = lik.label_id
     WHERE lik.knowledge_base_id = ?1
     ORDER BY l.name",
    params![id],
    |row| row.get(0),
  )?;
  raw.attachments = query_all(
    conn,
    &format!("SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE knowledge_base_id = ?1 ORDER BY id"),
    params![id],
    RawAttachment::from_row,
  )?;

  Ok(Some(raw))
}

fn load_comment(conn: &Connection, kb: i64, id: i64) -> rusqlite::Result<Option<RawComment>> {
  conn
    .query_row(
      &format!(
        "SELECT {COMMENT_COLUMNS} FROM {COMMENT_FROM} \
         WHERE cm.id = ?1 AND cm.knowledge_base_id = ?2"
      ),
      params![id, kb],
      RawComment::from_row,
    )
    .optional()
}

fn load_report(conn: &Connection, kb: i64, id: i64) -> rusqlite::Result<Option<RawReport>> {
  conn
    .query_row(
      &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1 AND knowledge_base_id = ?2"),
      params![id, kb],
      RawReport::from_row,
    )
    .optional()
}

fn load_attachment(
  conn: &Connection,
  kb: i64,
  id: i64,
) -> rusqlite::Result<Option<RawAttachment>> {
  conn
    .query_row(
      &format!(
        "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE id = ?1 AND knowledge_base_id = ?2"
      ),
      params![id, kb],
      RawAttachment::from_row,
    )
    .optional()
}

fn load_function(conn: &Connection, id: &str) -> rusqlite::Result<Option<Function>> {
  conn
    .query_row(
      &format!("SELECT {FUNCTION_COLUMNS} FROM functions WHERE id = ?1"),
      params![id],
      function_from_row,
    )
    .optional()
}

fn function_from_row(row: &Row<'_>) -> rusqlite::Result<Function> {
  Ok(Function {
    id:         row.get(0)?,
    name:       row.get(1)?,
    url:        row.get(2)?,
    sort_order: row.get(3)?,
    parent_id:  row.get(4)?,
    icon:       row.get(5)?,
  })
}

fn label_from_row(row: &Row<'_>) -> rusqlite::Result<Label> {
  Ok(Label { id: row.get(0)?, name: row.get(1)? })
}

/// Category columns; the ticket count is the number of articles filed under
/// the category.
const CATEGORY_SELECT: &str = "SELECT c.id, c.name, c.seo_alias, c.parent_id, c.sort_order,
   (SELECT COUNT(*) FROM knowledge_bases k WHERE k.category_id = c.id)
   FROM categories c";

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
  Ok(Category {
    id:                row.get(0)?,
    name:              row.get(1)?,
    seo_alias:         row.get(2)?,
    parent_id:         row.get(3)?,
    sort_order:        row.get(4)?,
    number_of_tickets: row.get(5)?,
  })
}

// ─── Writers ─────────────────────────────────────────────────────────────────

fn link_labels(conn: &Connection, kb: i64, labels: &[(String, String)]) -> rusqlite::Result<()> {
  for (id, name) in labels {
    conn.execute(
      "INSERT OR IGNORE INTO labels (id, name) VALUES (?1, ?2)",
      params![id, name],
    )?;
    conn.execute(
      "INSERT OR IGNORE INTO label_in_knowledge_bases (label_id, knowledge_base_id)
       VALUES (?1, ?2)",
      params![id, kb],
    )?;
  }
  Ok(())
}

fn insert_attachment(
  conn: &Connection,
  kb: i64,
  attachment: &NewAttachment,
  now: &str,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO attachments
       (knowledge_base_id, file_name, file_path, file_size, file_type, create_date)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    params![
      kb,
      attachment.file_name,
      attachment.file_path,
      attachment.file_size,
      attachment.file_type,
      now,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

#[derive(Debug, Clone, Copy)]
enum Counter {
  Votes,
  Comments,
  Reports,
}

impl Counter {
  fn column(self) -> &'static str {
    match self {
      Self::Votes => "number_of_votes",
      Self::Comments => "number_of_comments",
      Self::Reports => "number_of_reports",
    }
  }
}

/// Adjust a counter in place, clamped at zero. Returns the new value.
fn adjust_counter(conn: &Connection, kb: i64, counter: Counter, delta: i64) -> TxResult<i64> {
  let column = counter.column();
  let value = conn
    .query_row(
      &format!(
        "UPDATE knowledge_bases SET {column} = MAX({column} + ?2, 0)
         WHERE id = ?1 RETURNING {column}"
      ),
      params![kb, delta],
      |row| row.get::<_, i64>(0),
    )
    .optional()?;
  found(value, CoreError::KnowledgeBaseNotFound(kb))
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Knowspace store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    tracing::debug!(path = %path.as_ref().display(), "opening sqlite store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Apply the schema and seed the built-in functions and commands.
  ///
  /// A newly inserted function receives every command; existing rows and
  /// their assignments are left alone.
  async fn init_schema(&self) -> Result<()> {
    let commands: Vec<(String, &'static str)> = CommandCode::iter()
      .map(|code| (code.to_string(), code.display_name()))
      .collect();
    let functions: Vec<(String, &'static str, &'static str, i64, Option<String>)> =
      FunctionCode::iter()
        .zip(1_i64..)
        .map(|(code, order)| {
          (
            code.to_string(),
            code.display_name(),
            code.url(),
            order,
            code.parent().map(|p| p.to_string()),
          )
        })
        .collect();

    let seeded = self
      .conn
      .call(move |conn| {
        conn.execute_batch(SCHEMA)?;

        let tx = conn.transaction()?;
        for (id, name) in &commands {
          tx.execute(
            "INSERT OR IGNORE INTO commands (id, name) VALUES (?1, ?2)",
            params![id, name],
          )?;
        }
        let mut seeded = 0;
        for (id, name, url, sort_order, parent_id) in &functions {
          let inserted = tx.execute(
            "INSERT OR IGNORE INTO functions (id, name, url, sort_order, parent_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, name, url, sort_order, parent_id],
          )?;
          if inserted > 0 {
            tx.execute(
              "INSERT OR IGNORE INTO command_in_functions (command_id, function_id)
               SELECT id, ?1 FROM commands",
              params![id],
            )?;
            seeded += 1;
          }
        }
        tx.commit()?;
        Ok(seeded)
      })
      .await?;

    tracing::debug!(seeded, "schema ready");
    Ok(())
  }
}

// ─── KnowledgeStore impl ─────────────────────────────────────────────────────

impl KnowledgeStore for SqliteStore {
  type Error = Error;

  // ── Knowledge bases ───────────────────────────────────────────────────────

  async fn create_knowledge_base(&self, input: NewKnowledgeBase) -> Result<KnowledgeBase> {
    let NewKnowledgeBase { input, owner_user_id, attachments } = input;
    input.validate()?;
    let category_id = input
      .category_id
      .ok_or_else(|| CoreError::Validation(vec!["Category is required".into()]))?;
    let seo_alias = input.resolved_alias();
    let labels = input.label_pairs();
    let now = encode_dt(Utc::now());

    let id = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          if !exists(tx, "SELECT 1 FROM categories WHERE id = ?1", params![category_id])? {
            return reject(CoreError::UnknownCategory(category_id));
          }
          persisted(tx.execute(
            "INSERT INTO knowledge_bases (
               category_id, title, seo_alias, description, environment, problem,
               step_to_reproduce, error_message, workaround, note,
               owner_user_id, create_date
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
              category_id,
              input.title,
              seo_alias,
              input.description,
              input.environment,
              input.problem,
              input.step_to_reproduce,
              input.error_message,
              input.workaround,
              input.note,
              owner_user_id,
              now,
            ],
          )?)?;
          let id = tx.last_insert_rowid();
          link_labels(tx, id, &labels)?;
          for attachment in &attachments {
            insert_attachment(tx, id, attachment, &now)?;
          }
          Ok(id)
        })
      })
      .await??;

    self
      .get_knowledge_base(id)
      .await?
      .ok_or(Error::Core(CoreError::KnowledgeBaseNotFound(id)))
  }

  async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBaseQuick>> {
    let raws = self
      .conn
      .call(|conn| {
        let sql = format!("SELECT {QUICK_COLUMNS} FROM {QUICK_FROM} ORDER BY k.id");
        Ok(query_all(conn, &sql, params![], RawQuick::from_row)?)
      })
      .await?;

    raws.into_iter().map(RawQuick::into_quick).collect()
  }

  async fn latest_knowledge_bases(&self, take: u32) -> Result<Vec<KnowledgeBaseQuick>> {
    let raws = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {QUICK_COLUMNS} FROM {QUICK_FROM}
           ORDER BY k.create_date DESC, k.id DESC LIMIT ?1"
        );
        Ok(query_all(conn, &sql, params![take], RawQuick::from_row)?)
      })
      .await?;

    raws.into_iter().map(RawQuick::into_quick).collect()
  }

  async fn popular_knowledge_bases(&self, take: u32) -> Result<Vec<KnowledgeBaseQuick>> {
    let raws = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {QUICK_COLUMNS} FROM {QUICK_FROM}
           ORDER BY k.view_count DESC, k.id DESC LIMIT ?1"
        );
        Ok(query_all(conn, &sql, params![take], RawQuick::from_row)?)
      })
      .await?;

    raws.into_iter().map(RawQuick::into_quick).collect()
  }

  async fn search_knowledge_bases(
    &self,
    filter: KnowledgeBaseFilter,
    page: PageRequest,
  ) -> Result<Page<KnowledgeBaseQuick>> {
    let mut conditions = Conditions::default();
    if let Some(text) = text_filter(filter.text) {
      conditions.push("instr(k.title, ?) > 0", [text]);
    }
    if let Some(category_id) = filter.category_id {
      conditions.push("k.category_id = ?", [Value::Integer(category_id)]);
    }

    let (raws, total) = self
      .conn
      .call(move |conn| {
        Ok(fetch_page(
          conn,
          QUICK_FROM,
          QUICK_COLUMNS,
          &conditions,
          "k.create_date DESC, k.id DESC",
          page,
          RawQuick::from_row,
        )?)
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawQuick::into_quick)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(page, items, total))
  }

  async fn knowledge_bases_by_label(
    &self,
    label_id: String,
    page: PageRequest,
  ) -> Result<Page<KnowledgeBaseQuick>> {
    let mut conditions = Conditions::default();
    conditions.push("lik.label_id = ?", [Value::Text(label_id)]);

    let (raws, total) = self
      .conn
      .call(move |conn| {
        let from = format!(
          "{QUICK_FROM} JOIN label_in_knowledge_bases lik ON lik.knowledge_base_id = k.id"
        );
        Ok(fetch_page(
          conn,
          &from,
          QUICK_COLUMNS,
          &conditions,
          "k.create_date DESC, k.id DESC",
          page,
          RawQuick::from_row,
        )?)
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawQuick::into_quick)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(page, items, total))
  }

  async fn knowledge_bases_by_owner(
    &self,
    user_id: String,
    page: PageRequest,
  ) -> Result<Page<KnowledgeBaseQuick>> {
    let mut conditions = Conditions::default();
    conditions.push("k.owner_user_id = ?", [Value::Text(user_id)]);

    let (raws, total) = self
      .conn
      .call(move |conn| {
        Ok(fetch_page(
          conn,
          QUICK_FROM,
          QUICK_COLUMNS,
          &conditions,
          "k.create_date DESC, k.id DESC",
          page,
          RawQuick::from_row,
        )?)
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawQuick::into_quick)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(page, items, total))
  }

  async fn get_knowledge_base(&self, id: i64) -> Result<Option<KnowledgeBase>> {
    let raw = self
      .conn
      .call(move |conn| Ok(load_knowledge_base(conn, id)?))
      .await?;

    raw.map(RawKnowledgeBase::into_knowledge_base).transpose()
  }

  async fn update_knowledge_base(
    &self,
    id: i64,
    input: KnowledgeBaseInput,
    attachments: Vec<NewAttachment>,
  ) -> Result<()> {
    input.validate()?;
    let category_id = input
      .category_id
      .ok_or_else(|| CoreError::Validation(vec!["Category is required".into()]))?;
    let seo_alias = input.resolved_alias();
    let labels = input.labels.is_some().then(|| input.label_pairs());
    let now = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, id)?;
          if !exists(tx, "SELECT 1 FROM categories WHERE id = ?1", params![category_id])? {
            return reject(CoreError::UnknownCategory(category_id));
          }
          persisted(tx.execute(
            "UPDATE knowledge_bases SET
               category_id = ?2, title = ?3, seo_alias = ?4, description = ?5,
               environment = ?6, problem = ?7, step_to_reproduce = ?8,
               error_message = ?9, workaround = ?10, note = ?11,
               last_modified_date = ?12
             WHERE id = ?1",
            params![
              id,
              category_id,
              input.title,
              seo_alias,
              input.description,
              input.environment,
              input.problem,
              input.step_to_reproduce,
              input.error_message,
              input.workaround,
              input.note,
              now,
            ],
          )?)?;
          if let Some(labels) = &labels {
            tx.execute(
              "DELETE FROM label_in_knowledge_bases WHERE knowledge_base_id = ?1",
              params![id],
            )?;
            link_labels(tx, id, labels)?;
          }
          for attachment in &attachments {
            insert_attachment(tx, id, attachment, &now)?;
          }
          Ok(())
        })
      })
      .await??;

    Ok(())
  }

  async fn delete_knowledge_base(&self, id: i64) -> Result<KnowledgeBase> {
    let raw = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          let raw = found(load_knowledge_base(tx, id)?, CoreError::KnowledgeBaseNotFound(id))?;
          // Children go with it through ON DELETE CASCADE.
          persisted(tx.execute("DELETE FROM knowledge_bases WHERE id = ?1", params![id])?)?;
          Ok(raw)
        })
      })
      .await??;

    raw.into_knowledge_base()
  }

  async fn increment_view_count(&self, id: i64) -> Result<i64> {
    let count = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          let count = tx
            .query_row(
              "UPDATE knowledge_bases SET view_count = view_count + 1
               WHERE id = ?1 RETURNING view_count",
              params![id],
              |row| row.get::<_, i64>(0),
            )
            .optional()?;
          found(count, CoreError::KnowledgeBaseNotFound(id))
        })
      })
      .await??;

    Ok(count)
  }

  async fn recount_counters(&self, id: i64) -> Result<Counters> {
    let counters = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          let counters = tx
            .query_row(
              "UPDATE knowledge_bases SET
                 number_of_votes    = (SELECT COUNT(*) FROM votes    WHERE knowledge_base_id = ?1),
                 number_of_comments = (SELECT COUNT(*) FROM comments WHERE knowledge_base_id = ?1),
                 number_of_reports  = (SELECT COUNT(*) FROM reports  WHERE knowledge_base_id = ?1)
               WHERE id = ?1
               RETURNING number_of_votes, number_of_comments, number_of_reports",
              params![id],
              |row| {
                Ok(Counters {
                  number_of_votes:    row.get(0)?,
                  number_of_comments: row.get(1)?,
                  number_of_reports:  row.get(2)?,
                })
              },
            )
            .optional()?;
          found(counters, CoreError::KnowledgeBaseNotFound(id))
        })
      })
      .await??;

    tracing::info!(knowledge_base_id = id, ?counters, "counters recomputed");
    Ok(counters)
  }

  async fn labels_of_knowledge_base(&self, id: i64) -> Result<Vec<Label>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          in_transaction(conn, |tx| {
            require_knowledge_base(tx, id)?;
            Ok(query_all(
              tx,
              "SELECT l.id, l.name FROM label_in_knowledge_bases lik
               JOIN labels l ON l.id = lik.label_id
               WHERE lik.knowledge_base_id = ?1
               ORDER BY l.name",
              params![id],
              label_from_row,
            )?)
          })
        })
        .await??,
    )
  }

  // ── Comments ──────────────────────────────────────────────────────────────

  async fn list_comments(&self, knowledge_base_id: i64) -> Result<Vec<Comment>> {
    let raws = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, knowledge_base_id)?;
          let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM {COMMENT_FROM}
             WHERE cm.knowledge_base_id = ?1
             ORDER BY cm.create_date, cm.id"
          );
          Ok(query_all(tx, &sql, params![knowledge_base_id], RawComment::from_row)?)
        })
      })
      .await??;

    raws.into_iter().map(RawComment::into_comment).collect()
  }

  async fn search_comments(
    &self,
    knowledge_base_id: i64,
    filter: Option<String>,
    page: PageRequest,
  ) -> Result<Page<Comment>> {
    let mut conditions = Conditions::default();
    conditions.push("cm.knowledge_base_id = ?", [Value::Integer(knowledge_base_id)]);
    if let Some(text) = text_filter(filter) {
      conditions.push("instr(cm.content, ?) > 0", [text]);
    }

    let (raws, total) = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, knowledge_base_id)?;
          Ok(fetch_page(
            tx,
            COMMENT_FROM,
            COMMENT_COLUMNS,
            &conditions,
            "cm.create_date DESC, cm.id DESC",
            page,
            RawComment::from_row,
          )?)
        })
      })
      .await??;

    let items = raws
      .into_iter()
      .map(RawComment::into_comment)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(page, items, total))
  }

  async fn get_comment(&self, knowledge_base_id: i64, comment_id: i64) -> Result<Option<Comment>> {
    let raw = self
      .conn
      .call(move |conn| Ok(load_comment(conn, knowledge_base_id, comment_id)?))
      .await?;

    raw.map(RawComment::into_comment).transpose()
  }

  async fn create_comment(&self, input: NewComment) -> Result<Comment> {
    input.validate()?;
    let NewComment { knowledge_base_id: kb, content, owner_user_id, reply_id } = input;
    let now = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, kb)?;
          if let Some(reply_id) = reply_id {
            let same_article = exists(
              tx,
              "SELECT 1 FROM comments WHERE id = ?1 AND knowledge_base_id = ?2",
              params![reply_id, kb],
            )?;
            if !same_article {
              return reject(CoreError::InvalidReplyTarget(reply_id));
            }
          }
          persisted(tx.execute(
            "INSERT INTO comments (content, knowledge_base_id, owner_user_id, reply_id, create_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![content, kb, owner_user_id, reply_id, now],
          )?)?;
          let id = tx.last_insert_rowid();
          adjust_counter(tx, kb, Counter::Comments, 1)?;
          found(load_comment(tx, kb, id)?, CoreError::CommentNotFound(id))
        })
      })
      .await??;

    raw.into_comment()
  }

  async fn update_comment(
    &self,
    knowledge_base_id: i64,
    comment_id: i64,
    content: String,
  ) -> Result<()> {
    let mut v = Violations::default();
    v.require("Content", &content);
    v.finish()?;
    let now = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, knowledge_base_id)?;
          let rows = tx.execute(
            "UPDATE comments SET content = ?3, last_modified_date = ?4
             WHERE id = ?1 AND knowledge_base_id = ?2",
            params![comment_id, knowledge_base_id, content, now],
          )?;
          if rows == 0 {
            return reject(CoreError::CommentNotFound(comment_id));
          }
          Ok(())
        })
      })
      .await??;

    Ok(())
  }

  async fn delete_comment(&self, knowledge_base_id: i64, comment_id: i64) -> Result<Comment> {
    let raw = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, knowledge_base_id)?;
          let raw = found(
            load_comment(tx, knowledge_base_id, comment_id)?,
            CoreError::CommentNotFound(comment_id),
          )?;
          // Direct replies become roots through ON DELETE SET NULL.
          persisted(tx.execute("DELETE FROM comments WHERE id = ?1", params![comment_id])?)?;
          adjust_counter(tx, knowledge_base_id, Counter::Comments, -1)?;
          Ok(raw)
        })
      })
      .await??;

    raw.into_comment()
  }

  async fn recent_comments(&self, take: u32) -> Result<Vec<Comment>> {
    let raws = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {COMMENT_COLUMNS} FROM {COMMENT_FROM}
           ORDER BY cm.create_date DESC, cm.id DESC LIMIT ?1"
        );
        Ok(query_all(conn, &sql, params![take], RawComment::from_row)?)
      })
      .await?;

    raws.into_iter().map(RawComment::into_comment).collect()
  }

  // ── Votes ─────────────────────────────────────────────────────────────────

  async fn list_votes(&self, knowledge_base_id: i64) -> Result<Vec<Vote>> {
    let raws = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, knowledge_base_id)?;
          let sql = format!(
            "SELECT {VOTE_COLUMNS} FROM votes WHERE knowledge_base_id = ?1
             ORDER BY create_date, user_id"
          );
          Ok(query_all(tx, &sql, params![knowledge_base_id], RawVote::from_row)?)
        })
      })
      .await??;

    raws.into_iter().map(RawVote::into_vote).collect()
  }

  async fn toggle_vote(&self, knowledge_base_id: i64, user_id: String) -> Result<VoteOutcome> {
    let now = encode_dt(Utc::now());
    let kb = knowledge_base_id;

    Ok(
      self
        .conn
        .call(move |conn| {
          in_transaction(conn, |tx| {
            require_knowledge_base(tx, kb)?;
            let withdrawn = tx.execute(
              "DELETE FROM votes WHERE knowledge_base_id = ?1 AND user_id = ?2",
              params![kb, user_id],
            )?;
            if withdrawn > 0 {
              let number_of_votes = adjust_counter(tx, kb, Counter::Votes, -1)?;
              return Ok(VoteOutcome { voted: false, number_of_votes });
            }
            persisted(tx.execute(
              "INSERT INTO votes (knowledge_base_id, user_id, create_date) VALUES (?1, ?2, ?3)",
              params![kb, user_id, now],
            )?)?;
            let number_of_votes = adjust_counter(tx, kb, Counter::Votes, 1)?;
            Ok(VoteOutcome { voted: true, number_of_votes })
          })
        })
        .await??,
    )
  }

  async fn delete_vote(&self, knowledge_base_id: i64, user_id: String) -> Result<()> {
    let kb = knowledge_base_id;
    self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, kb)?;
          let rows = tx.execute(
            "DELETE FROM votes WHERE knowledge_base_id = ?1 AND user_id = ?2",
            params![kb, user_id],
          )?;
          if rows == 0 {
            return reject(CoreError::VoteNotFound {
              knowledge_base_id: kb,
              user_id:           user_id.clone(),
            });
          }
          adjust_counter(tx, kb, Counter::Votes, -1)?;
          Ok(())
        })
      })
      .await??;

    Ok(())
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn list_reports(&self, knowledge_base_id: i64) -> Result<Vec<Report>> {
    let raws = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, knowledge_base_id)?;
          let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE knowledge_base_id = ?1
             ORDER BY create_date DESC, id DESC"
          );
          Ok(query_all(tx, &sql, params![knowledge_base_id], RawReport::from_row)?)
        })
      })
      .await??;

    raws.into_iter().map(RawReport::into_report).collect()
  }

  async fn search_reports(
    &self,
    knowledge_base_id: i64,
    filter: Option<String>,
    page: PageRequest,
  ) -> Result<Page<Report>> {
    let mut conditions = Conditions::default();
    conditions.push("knowledge_base_id = ?", [Value::Integer(knowledge_base_id)]);
    if let Some(text) = text_filter(filter) {
      conditions.push("instr(content, ?) > 0", [text]);
    }

    let (raws, total) = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, knowledge_base_id)?;
          Ok(fetch_page(
            tx,
            "reports",
            REPORT_COLUMNS,
            &conditions,
            "create_date DESC, id DESC",
            page,
            RawReport::from_row,
          )?)
        })
      })
      .await??;

    let items = raws
      .into_iter()
      .map(RawReport::into_report)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(page, items, total))
  }

  async fn get_report(&self, knowledge_base_id: i64, report_id: i64) -> Result<Option<Report>> {
    let raw = self
      .conn
      .call(move |conn| Ok(load_report(conn, knowledge_base_id, report_id)?))
      .await?;

    raw.map(RawReport::into_report).transpose()
  }

  async fn create_report(&self, input: NewReport) -> Result<Report> {
    input.validate()?;
    let NewReport { knowledge_base_id: kb, content, report_user_id } = input;
    let now = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, kb)?;
          persisted(tx.execute(
            "INSERT INTO reports (knowledge_base_id, content, report_user_id, is_processed, create_date)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![kb, content, report_user_id, now],
          )?)?;
          let id = tx.last_insert_rowid();
          adjust_counter(tx, kb, Counter::Reports, 1)?;
          found(load_report(tx, kb, id)?, CoreError::ReportNotFound(id))
        })
      })
      .await??;

    raw.into_report()
  }

  async fn delete_report(&self, knowledge_base_id: i64, report_id: i64) -> Result<Report> {
    let raw = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, knowledge_base_id)?;
          let raw = found(
            load_report(tx, knowledge_base_id, report_id)?,
            CoreError::ReportNotFound(report_id),
          )?;
          persisted(tx.execute("DELETE FROM reports WHERE id = ?1", params![report_id])?)?;
          adjust_counter(tx, knowledge_base_id, Counter::Reports, -1)?;
          Ok(raw)
        })
      })
      .await??;

    raw.into_report()
  }

  // ── Attachments ───────────────────────────────────────────────────────────

  async fn list_attachments(&self, knowledge_base_id: i64) -> Result<Vec<Attachment>> {
    let raws = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, knowledge_base_id)?;
          let sql = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE knowledge_base_id = ?1 ORDER BY id"
          );
          Ok(query_all(tx, &sql, params![knowledge_base_id], RawAttachment::from_row)?)
        })
      })
      .await??;

    raws.into_iter().map(RawAttachment::into_attachment).collect()
  }

  async fn add_attachment(&self, knowledge_base_id: i64, input: NewAttachment) -> Result<Attachment> {
    let now = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, knowledge_base_id)?;
          let id = insert_attachment(tx, knowledge_base_id, &input, &now)?;
          found(
            load_attachment(tx, knowledge_base_id, id)?,
            CoreError::AttachmentNotFound(id),
          )
        })
      })
      .await??;

    raw.into_attachment()
  }

  async fn delete_attachment(
    &self,
    knowledge_base_id: i64,
    attachment_id: i64,
  ) -> Result<Attachment> {
    let raw = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_knowledge_base(tx, knowledge_base_id)?;
          let raw = found(
            load_attachment(tx, knowledge_base_id, attachment_id)?,
            CoreError::AttachmentNotFound(attachment_id),
          )?;
          persisted(tx.execute("DELETE FROM attachments WHERE id = ?1", params![attachment_id])?)?;
          Ok(raw)
        })
      })
      .await??;

    raw.into_attachment()
  }

  // ── Labels & categories ───────────────────────────────────────────────────

  async fn popular_labels(&self, take: u32) -> Result<Vec<Label>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(query_all(
            conn,
            "SELECT l.id, l.name FROM labels l
             JOIN label_in_knowledge_bases lik ON lik.label_id = l.id
             GROUP BY l.id, l.name
             ORDER BY COUNT(*) DESC, l.name
             LIMIT ?1",
            params![take],
            label_from_row,
          )?)
        })
        .await?,
    )
  }

  async fn get_label(&self, id: String) -> Result<Option<Label>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, name FROM labels WHERE id = ?1",
                params![id],
                label_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    Ok(
      self
        .conn
        .call(|conn| {
          Ok(query_all(
            conn,
            &format!("{CATEGORY_SELECT} ORDER BY c.sort_order, c.id"),
            params![],
            category_from_row,
          )?)
        })
        .await?,
    )
  }

  async fn get_category(&self, id: i64) -> Result<Option<Category>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!("{CATEGORY_SELECT} WHERE c.id = ?1"),
                params![id],
                category_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn create_category(&self, input: NewCategory) -> Result<Category> {
    input.validate()?;
    let seo_alias = input.resolved_alias();
    let NewCategory { name, parent_id, sort_order, .. } = input;

    Ok(
      self
        .conn
        .call(move |conn| {
          in_transaction(conn, |tx| {
            if let Some(parent) = parent_id {
              if !exists(tx, "SELECT 1 FROM categories WHERE id = ?1", params![parent])? {
                return reject(CoreError::UnknownCategory(parent));
              }
            }
            persisted(tx.execute(
              "INSERT INTO categories (name, seo_alias, parent_id, sort_order)
               VALUES (?1, ?2, ?3, ?4)",
              params![name, seo_alias, parent_id, sort_order],
            )?)?;
            Ok(Category {
              id: tx.last_insert_rowid(),
              name: name.clone(),
              seo_alias: seo_alias.clone(),
              parent_id,
              sort_order,
              number_of_tickets: 0,
            })
          })
        })
        .await??,
    )
  }

  // ── Functions & commands ──────────────────────────────────────────────────

  async fn list_functions(&self) -> Result<Vec<Function>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let sql = format!("SELECT {FUNCTION_COLUMNS} FROM functions ORDER BY sort_order, id");
          Ok(query_all(conn, &sql, params![], function_from_row)?)
        })
        .await?,
    )
  }

  async fn child_functions(&self, parent_id: String) -> Result<Vec<Function>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let sql = format!(
            "SELECT {FUNCTION_COLUMNS} FROM functions WHERE parent_id = ?1
             ORDER BY sort_order, id"
          );
          Ok(query_all(conn, &sql, params![parent_id], function_from_row)?)
        })
        .await?,
    )
  }

  async fn search_functions(
    &self,
    filter: Option<String>,
    page: PageRequest,
  ) -> Result<Page<Function>> {
    let mut conditions = Conditions::default();
    if let Some(text) = text_filter(filter) {
      conditions.push(
        "(instr(id, ?) > 0 OR instr(name, ?) > 0 OR instr(url, ?) > 0)",
        [text.clone(), text.clone(), text],
      );
    }

    let (items, total) = self
      .conn
      .call(move |conn| {
        Ok(fetch_page(
          conn,
          "functions",
          FUNCTION_COLUMNS,
          &conditions,
          "sort_order, id",
          page,
          function_from_row,
        )?)
      })
      .await?;

    Ok(Page::new(page, items, total))
  }

  async fn get_function(&self, id: String) -> Result<Option<Function>> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(load_function(conn, &id)?))
        .await?,
    )
  }

  async fn create_function(&self, input: Function) -> Result<Function> {
    input.validate()?;

    Ok(
      self
        .conn
        .call(move |conn| {
          in_transaction(conn, |tx| {
            if exists(tx, "SELECT 1 FROM functions WHERE id = ?1", params![input.id])? {
              return reject(CoreError::FunctionExists(input.id.clone()));
            }
            persisted(tx.execute(
              "INSERT INTO functions (id, name, url, sort_order, parent_id, icon)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
              params![
                input.id,
                input.name,
                input.url,
                input.sort_order,
                input.parent_id,
                input.icon,
              ],
            )?)?;
            Ok(input)
          })
        })
        .await??,
    )
  }

  async fn update_function(&self, id: String, input: Function) -> Result<()> {
    let input = Function { id, ..input };
    input.validate()?;

    self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          let rows = tx.execute(
            "UPDATE functions SET name = ?2, url = ?3, sort_order = ?4, parent_id = ?5, icon = ?6
             WHERE id = ?1",
            params![
              input.id,
              input.name,
              input.url,
              input.sort_order,
              input.parent_id,
              input.icon,
            ],
          )?;
          if rows == 0 {
            return reject(CoreError::FunctionNotFound(input.id.clone()));
          }
          Ok(())
        })
      })
      .await??;

    Ok(())
  }

  async fn delete_function(&self, id: String) -> Result<Function> {
    Ok(
      self
        .conn
        .call(move |conn| {
          in_transaction(conn, |tx| {
            let function =
              found(load_function(tx, &id)?, CoreError::FunctionNotFound(id.clone()))?;
            tx.execute(
              "UPDATE functions SET parent_id = NULL WHERE parent_id = ?1",
              params![id],
            )?;
            // Command assignments and permissions cascade.
            persisted(tx.execute("DELETE FROM functions WHERE id = ?1", params![id])?)?;
            Ok(function)
          })
        })
        .await??,
    )
  }

  async fn commands_in_function(&self, function_id: String) -> Result<Vec<Command>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          in_transaction(conn, |tx| {
            require_function(tx, &function_id)?;
            Ok(query_all(
              tx,
              "SELECT c.id, c.name FROM commands c
               JOIN command_in_functions cif ON cif.command_id = c.id
               WHERE cif.function_id = ?1
               ORDER BY c.id",
              params![function_id],
              |row| Ok(Command { id: row.get(0)?, name: row.get(1)? }),
            )?)
          })
        })
        .await??,
    )
  }

  async fn assign_commands(
    &self,
    function_id: String,
    mut command_ids: Vec<String>,
    add_to_all_functions: bool,
  ) -> Result<()> {
    let mut v = Violations::default();
    v.check(!command_ids.is_empty(), "CommandIds is required");
    v.finish()?;
    command_ids.sort();
    command_ids.dedup();

    self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_function(tx, &function_id)?;
          for command in &command_ids {
            if !exists(tx, "SELECT 1 FROM commands WHERE id = ?1", params![command])? {
              return reject(CoreError::UnknownCommand(command.clone()));
            }
            let assigned = exists(
              tx,
              "SELECT 1 FROM command_in_functions WHERE command_id = ?1 AND function_id = ?2",
              params![command, function_id],
            )?;
            if assigned {
              return reject(CoreError::CommandAlreadyAssigned {
                command:  command.clone(),
                function: function_id.clone(),
              });
            }
            tx.execute(
              "INSERT INTO command_in_functions (command_id, function_id) VALUES (?1, ?2)",
              params![command, function_id],
            )?;
            if add_to_all_functions {
              tx.execute(
                "INSERT OR IGNORE INTO command_in_functions (command_id, function_id)
                 SELECT ?1, id FROM functions WHERE id <> ?2",
                params![command, function_id],
              )?;
            }
          }
          Ok(())
        })
      })
      .await??;

    Ok(())
  }

  async fn unassign_commands(&self, function_id: String, command_ids: Vec<String>) -> Result<()> {
    let mut v = Violations::default();
    v.check(!command_ids.is_empty(), "CommandIds is required");
    v.finish()?;

    self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          require_function(tx, &function_id)?;
          for command in &command_ids {
            let rows = tx.execute(
              "DELETE FROM command_in_functions WHERE command_id = ?1 AND function_id = ?2",
              params![command, function_id],
            )?;
            if rows == 0 {
              return reject(CoreError::CommandNotAssigned {
                command:  command.clone(),
                function: function_id.clone(),
              });
            }
          }
          Ok(())
        })
      })
      .await??;

    Ok(())
  }

  // ── Users & permissions ───────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let mut v = Violations::default();
    v.require("UserName", &input.user_name);
    v.require("Password", &input.password_hash);
    v.finish()?;

    let user = User {
      id:          Uuid::new_v4().to_string(),
      user_name:   input.user_name,
      first_name:  input.first_name,
      last_name:   input.last_name,
      email:       input.email,
      create_date: Utc::now(),
    };
    let password_hash = input.password_hash;
    let now = encode_dt(user.create_date);

    Ok(
      self
        .conn
        .call(move |conn| {
          in_transaction(conn, |tx| {
            if exists(tx, "SELECT 1 FROM users WHERE user_name = ?1", params![user.user_name])? {
              return reject(CoreError::UserExists(user.user_name.clone()));
            }
            persisted(tx.execute(
              "INSERT INTO users
                 (id, user_name, first_name, last_name, email, password_hash, create_date)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
              params![
                user.id,
                user.user_name,
                user.first_name,
                user.last_name,
                user.email,
                password_hash,
                now,
              ],
            )?)?;
            Ok(user)
          })
        })
        .await??,
    )
  }

  async fn get_user(&self, id: String) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
              params![id],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(|raw| Ok::<_, Error>(raw.into_parts()?.0)).transpose()
  }

  async fn find_credentials(&self, user_name: String) -> Result<Option<UserCredentials>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE user_name = ?1"),
              params![user_name],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|raw| {
        let (user, password_hash) = raw.into_parts()?;
        Ok::<_, Error>(UserCredentials { user, password_hash })
      })
      .transpose()
  }

  async fn assign_role(&self, user_id: String, role_id: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          if !exists(tx, "SELECT 1 FROM users WHERE id = ?1", params![user_id])? {
            return reject(CoreError::UserNotFound(user_id.clone()));
          }
          tx.execute(
            "INSERT OR IGNORE INTO roles (id, name) VALUES (?1, ?1)",
            params![role_id],
          )?;
          tx.execute(
            "INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?1, ?2)",
            params![user_id, role_id],
          )?;
          Ok(())
        })
      })
      .await??;

    Ok(())
  }

  async fn grant_permissions(
    &self,
    role_id: String,
    grants: Vec<(FunctionCode, CommandCode)>,
  ) -> Result<()> {
    let grants: Vec<(String, String)> = grants
      .into_iter()
      .map(|(function, command)| (function.to_string(), command.to_string()))
      .collect();

    self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          tx.execute(
            "INSERT OR IGNORE INTO roles (id, name) VALUES (?1, ?1)",
            params![role_id],
          )?;
          for (function, command) in &grants {
            require_function(tx, function)?;
            tx.execute(
              "INSERT OR IGNORE INTO permissions (function_id, role_id, command_id)
               VALUES (?1, ?2, ?3)",
              params![function, role_id, command],
            )?;
          }
          Ok(())
        })
      })
      .await??;

    Ok(())
  }

  async fn permissions_for(&self, user_id: String) -> Result<PermissionSet> {
    let pairs = self
      .conn
      .call(move |conn| {
        Ok(query_all(
          conn,
          "SELECT DISTINCT p.function_id, p.command_id FROM permissions p
           JOIN user_roles ur ON ur.role_id = p.role_id
           WHERE ur.user_id = ?1",
          params![user_id],
          |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )?)
      })
      .await?;

    Ok(pairs.into_iter().collect())
  }
}
