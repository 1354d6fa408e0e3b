//! tickle-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) under `TICKLE_*`
//! environment overrides, opens the SQLite store and serves the JSON API.
//!
//! # First staff account
//!
//! ```
//! cargo run -p tickle-server -- --create-superuser admin@example.com
//! ```

use std::{io, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use tickle_api::{AppState, auth::hash_password};
use tickle_core::{person::NewPerson, store::TicketStore};
use tickle_kobra::KobraClient;
use tickle_server::ServerConfig;
use tickle_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, sync::mpsc::unbounded_channel};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tickle ticketing server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create a staff superuser with this email, reading the name and password
  /// from stdin, and exit.
  #[arg(long, value_name = "EMAIL")]
  create_superuser: Option<String>,
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
  let cfg = ServerConfig::load(&cli.config)?;

  if let Some(parent) = cfg.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  if let Some(email) = cli.create_superuser {
    return create_superuser(&store, email).await;
  }

  let (outbox, mail_rx) = unbounded_channel();
  let mut state = AppState::new(Arc::new(store), cfg.mail(), outbox);
  if let Some(kobra) = cfg.kobra.clone() {
    let client = KobraClient::new(kobra).context("failed to build Kobra client")?;
    state = state.with_kobra(client);
  } else {
    tracing::warn!("no kobra section configured; student lookup is disabled");
  }
  tokio::spawn(tickle_server::drain_outbox(mail_rx));

  let app = tickle_server::app(state);
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn create_superuser(store: &SqliteStore, email: String) -> anyhow::Result<()> {
  let first_name = prompt("First name")?;
  let last_name = prompt("Last name")?;
  let password = prompt("Password")?;
  if password.is_empty() {
    anyhow::bail!("password must not be empty");
  }

  let input = NewPerson {
    password_hash: Some(hash_password(&password)?),
    is_staff: true,
    is_superuser: true,
    ..NewPerson::new(email, first_name, last_name)
  };
  let person = store
    .add_person(input)
    .await
    .context("failed to create superuser")?;
  tracing::info!(person_id = %person.person_id, email = %person.email, "superuser created");
  Ok(())
}

/// Read one line from stdin after printing `label`.
fn prompt(label: &str) -> anyhow::Result<String> {
  use std::io::{BufRead, Write};
  print!("{label}: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
