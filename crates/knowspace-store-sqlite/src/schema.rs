//! SQL schema for the Knowspace SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision so later migrations can be gated on it.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Identity ──────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    user_name     TEXT NOT NULL UNIQUE,
    first_name    TEXT NOT NULL,
    last_name     TEXT NOT NULL,
    email         TEXT NOT NULL,
    password_hash TEXT NOT NULL,   -- argon2 PHC string
    create_date   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS roles (
    id   TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role_id TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, role_id)
);

-- ── Functions, commands, permissions ──────────────────────────────────────

CREATE TABLE IF NOT EXISTS functions (
    id         TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    url        TEXT NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0,
    parent_id  TEXT,               -- soft reference; cleared on parent delete
    icon       TEXT
);

CREATE TABLE IF NOT EXISTS commands (
    id   TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS command_in_functions (
    command_id  TEXT NOT NULL REFERENCES commands(id)  ON DELETE CASCADE,
    function_id TEXT NOT NULL REFERENCES functions(id) ON DELETE CASCADE,
    PRIMARY KEY (command_id, function_id)
);

CREATE TABLE IF NOT EXISTS permissions (
    function_id TEXT NOT NULL REFERENCES functions(id) ON DELETE CASCADE,
    role_id     TEXT NOT NULL REFERENCES roles(id)     ON DELETE CASCADE,
    command_id  TEXT NOT NULL REFERENCES commands(id)  ON DELETE CASCADE,
    PRIMARY KEY (function_id, role_id, command_id)
);

-- ── Content ───────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS categories (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    seo_alias  TEXT NOT NULL,
    parent_id  INTEGER REFERENCES categories(id) ON DELETE SET NULL,
    sort_order INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS knowledge_bases (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    category_id        INTEGER NOT NULL REFERENCES categories(id),
    title              TEXT NOT NULL,
    seo_alias          TEXT NOT NULL,
    description        TEXT,
    environment        TEXT,
    problem            TEXT NOT NULL,
    step_to_reproduce  TEXT,
    error_message      TEXT,
    workaround         TEXT,
    note               TEXT,
    owner_user_id      TEXT NOT NULL,
    create_date        TEXT NOT NULL,
    last_modified_date TEXT,
    number_of_comments INTEGER NOT NULL DEFAULT 0 CHECK (number_of_comments >= 0),
    number_of_votes    INTEGER NOT NULL DEFAULT 0 CHECK (number_of_votes >= 0),
    number_of_reports  INTEGER NOT NULL DEFAULT 0 CHECK (number_of_reports >= 0),
    view_count         INTEGER NOT NULL DEFAULT 0 CHECK (view_count >= 0)
);

-- Label ids are slugs of their display name.
CREATE TABLE IF NOT EXISTS labels (
    id   TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS label_in_knowledge_bases (
    label_id          TEXT    NOT NULL REFERENCES labels(id) ON DELETE CASCADE,
    knowledge_base_id INTEGER NOT NULL REFERENCES knowledge_bases(id) ON DELETE CASCADE,
    PRIMARY KEY (label_id, knowledge_base_id)
);

CREATE TABLE IF NOT EXISTS comments (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    content            TEXT NOT NULL,
    knowledge_base_id  INTEGER NOT NULL REFERENCES knowledge_bases(id) ON DELETE CASCADE,
    owner_user_id      TEXT NOT NULL,
    reply_id           INTEGER REFERENCES comments(id) ON DELETE SET NULL,
    create_date        TEXT NOT NULL,
    last_modified_date TEXT
);

CREATE TABLE IF NOT EXISTS votes (
    knowledge_base_id INTEGER NOT NULL REFERENCES knowledge_bases(id) ON DELETE CASCADE,
    user_id           TEXT NOT NULL,
    create_date       TEXT NOT NULL,
    PRIMARY KEY (knowledge_base_id, user_id)
);

CREATE TABLE IF NOT EXISTS reports (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    knowledge_base_id  INTEGER NOT NULL REFERENCES knowledge_bases(id) ON DELETE CASCADE,
    content            TEXT NOT NULL,
    report_user_id     TEXT NOT NULL,
    is_processed       INTEGER NOT NULL DEFAULT 0,
    create_date        TEXT NOT NULL,
    last_modified_date TEXT
);

CREATE TABLE IF NOT EXISTS attachments (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    knowledge_base_id INTEGER NOT NULL REFERENCES knowledge_bases(id) ON DELETE CASCADE,
    file_name         TEXT NOT NULL,
    file_path         TEXT NOT NULL,
    file_size         INTEGER NOT NULL,
    file_type         TEXT NOT NULL,
    create_date       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS knowledge_bases_created_idx  ON knowledge_bases(create_date);
CREATE INDEX IF NOT EXISTS knowledge_bases_category_idx ON knowledge_bases(category_id);
CREATE INDEX IF NOT EXISTS comments_kb_idx              ON comments(knowledge_base_id);
CREATE INDEX IF NOT EXISTS comments_reply_idx           ON comments(reply_id);
CREATE INDEX IF NOT EXISTS reports_kb_idx               ON reports(knowledge_base_id);
CREATE INDEX IF NOT EXISTS attachments_kb_idx           ON attachments(knowledge_base_id);
CREATE INDEX IF NOT EXISTS label_links_kb_idx           ON label_in_knowledge_bases(knowledge_base_id);

PRAGMA user_version = 1;
";
