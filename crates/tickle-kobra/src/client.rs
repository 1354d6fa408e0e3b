//! [`KobraClient`], an async HTTP client for the Kobra REST API.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tickle_core::kobra::{Student, StudentKey, StudentLookup};

use crate::{Error, Result};

fn default_timeout() -> u64 { 10 }

/// Connection settings for Kobra.
#[derive(Debug, Clone, Deserialize)]
pub struct KobraConfig {
  /// e.g. `https://kobra.karservice.se`
  pub base_url:     String,
  pub api_key:      String,
  #[serde(default = "default_timeout")]
  pub timeout_secs: u64,
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct KobraClient {
  client: Client,
  config: KobraConfig,
}

impl KobraClient {
  pub fn new(config: KobraConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self) -> String {
    format!("{}/api/v1/students/", self.config.base_url.trim_end_matches('/'))
  }

  /// `GET /api/v1/students/?<key>=<value>`
  pub async fn student(&self, key: &StudentKey) -> Result<Student> {
    let (param, value) = key.param();
    let resp = self
      .client
      .get(self.url())
      .header("Authorization", format!("Token {}", self.config.api_key))
      .query(&[(param, value)])
      .send()
      .await?;

    match resp.status() {
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized),
      StatusCode::NOT_FOUND => Err(Error::StudentNotFound),
      s if !s.is_success() => Err(Error::Status(s)),
      _ => Ok(resp.json().await?),
    }
  }
}

impl StudentLookup for KobraClient {
  async fn get_student(&self, key: &StudentKey) -> tickle_core::Result<Student> {
    let result = self.student(key).await;
    if let Err(e) = &result {
      tracing::debug!(by = key.param().0, error = %e, "kobra lookup failed");
    }
    Ok(result?)
  }
}
