//! Knowspace server binary.
//!
//! Loads [`ServerConfig`] from `config.toml` (or `--config`) and `KNOWSPACE_*`
//! variables, opens the SQLite store, makes sure the admin account exists and
//! serves the API.
//!
//! `--hash-password` prints the argon2 PHC string to put in
//! `admin_password_hash`:
//!
//! ```text
//! cargo run -p knowspace-server --bin server -- --hash-password
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use knowspace_api::{AppState, FileStorage};
use knowspace_server::{ServerConfig, bootstrap_admin, hash_password};
use knowspace_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Knowspace knowledge base server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Read a password from stdin, print its argon2 hash and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  if cli.hash_password {
    return print_hash();
  }

  let home = std::env::var_os("HOME").map(PathBuf::from);
  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?
    .with_home(home.as_deref());

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  let admin = bootstrap_admin(&store, &cfg.admin_username, &cfg.admin_password_hash)
    .await
    .context("failed to seed the admin account")?;
  tracing::info!(user = %admin.user_name, "admin account ready");

  tokio::fs::create_dir_all(&cfg.upload_dir)
    .await
    .with_context(|| format!("failed to create upload dir {:?}", cfg.upload_dir))?;

  let state = AppState::new(Arc::new(store), FileStorage::new(cfg.upload_dir.clone()));
  let app = knowspace_server::app(state);

  let address = cfg.address();
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!(%address, base_url = %cfg.base_url, "serving knowspace");

  axum::serve(listener, app).await.context("server error")
}

fn print_hash() -> anyhow::Result<()> {
  use std::io::{BufRead, Write};

  print!("Password: ");
  std::io::stdout().flush().ok();
  let mut line = String::new();
  std::io::stdin().lock().read_line(&mut line)?;

  let hash = hash_password(line.trim_end_matches(['\n', '\r']))
    .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
  println!("{hash}");
  Ok(())
}
