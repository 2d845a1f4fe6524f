//! Server assembly for Knowspace.
//!
//! Wires the JSON API under `/api`, serves stored attachments under
//! [`ATTACHMENT_URL_PREFIX`], and seeds the configured admin account.

use std::path::{Path, PathBuf};

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::Router;
use knowspace_api::{AppState, api_router, storage::ATTACHMENT_URL_PREFIX};
use knowspace_core::{
  model::{NewUser, User},
  permission::{CommandCode, FunctionCode},
  store::KnowledgeStore,
};
use rand_core::OsRng;
use serde::Deserialize;
use strum::IntoEnumIterator;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Role seeded with every (function, command) pair.
pub const ADMIN_ROLE: &str = "admin";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `KNOWSPACE_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub base_url:            String,
  pub store_path:          PathBuf,
  pub upload_dir:          PathBuf,
  pub admin_username:      String,
  pub admin_password_hash: String,
}

impl ServerConfig {
  /// Read `path` (if it exists) and overlay `KNOWSPACE_*` environment
  /// variables, e.g. `KNOWSPACE_PORT=8080`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("KNOWSPACE"))
      .build()?
      .try_deserialize()
  }

  /// `host:port` to bind.
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// Expand a leading `~/` in the store and upload paths.
  pub fn with_home(mut self, home: Option<&Path>) -> Self {
    self.store_path = expand_home(&self.store_path, home);
    self.upload_dir = expand_home(&self.upload_dir, home);
    self
  }
}

fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
  match (path.strip_prefix("~"), home) {
    (Ok(rest), Some(home)) => home.join(rest),
    _ => path.to_path_buf(),
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete application router.
pub fn app<S>(state: AppState<S>) -> Router
where
  S: KnowledgeStore + 'static,
{
  let attachments = ServeDir::new(state.files.dir());
  Router::new()
    .nest("/api", api_router(state))
    .nest_service(ATTACHMENT_URL_PREFIX, attachments)
    .layer(TraceLayer::new_for_http())
}

// ─── Admin bootstrap ─────────────────────────────────────────────────────────

/// Ensure the admin user exists and holds every capability.
///
/// An existing user keeps its stored password; only the role and grants are
/// re-applied.
pub async fn bootstrap_admin<S: KnowledgeStore>(
  store: &S,
  user_name: &str,
  password_hash: &str,
) -> Result<User, S::Error> {
  let user = match store.find_credentials(user_name.to_owned()).await? {
    Some(existing) => existing.user,
    None => {
      let user = store
        .create_user(NewUser {
          user_name:     user_name.to_owned(),
          first_name:    "System".into(),
          last_name:     "Administrator".into(),
          email:         String::new(),
          password_hash: password_hash.to_owned(),
        })
        .await?;
      tracing::info!(%user_name, "created admin user");
      user
    }
  };

  store.assign_role(user.id.clone(), ADMIN_ROLE.to_owned()).await?;
  let grants = FunctionCode::iter()
    .flat_map(|f| CommandCode::iter().map(move |c| (f, c)))
    .collect();
  store.grant_permissions(ADMIN_ROLE.to_owned(), grants).await?;

  Ok(user)
}

/// Produce an argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}
