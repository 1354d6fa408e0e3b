//! Server configuration: an optional TOML file under `TICKLE_`-prefixed
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use tickle_core::mail::MailSettings;
use tickle_kobra::KobraConfig;

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8000 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/tickle/tickle.db") }

/// Runtime server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:         String,
  #[serde(default = "default_port")]
  pub port:         u16,
  #[serde(default = "default_store_path")]
  pub store_path:   PathBuf,
  /// Host used in links inside outgoing mail, without scheme.
  pub primary_host: String,
  /// e.g. `Biljett SOF <biljett@example.com>`
  pub mail_from:    String,
  /// Kobra student lookup. Lookup routes answer 502 without it.
  #[serde(default)]
  pub kobra:        Option<KobraConfig>,
}

impl ServerConfig {
  /// Read `path` (if it exists) and layer the environment over it.
  ///
  /// Nested keys use a double underscore, e.g. `TICKLE_KOBRA__API_KEY`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("TICKLE")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .context("failed to read config file")?;

    let mut cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn mail(&self) -> MailSettings {
    MailSettings { from: self.mail_from.clone(), primary_host: self.primary_host.clone() }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
