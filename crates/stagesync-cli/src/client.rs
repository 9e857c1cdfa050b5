//! Async HTTP client wrapping the stagesync JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use stagesync_core::{
  classify::StageBreakdown,
  fact::RawChecklistFact,
  store::StageUpdate,
  view::PersonView,
};
use uuid::Uuid;

/// Connection settings for the stagesync API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
struct IngestResponse {
  stored: usize,
}

/// Body of `POST /api/people/{id}/reclassify`.
#[derive(Debug, Deserialize)]
pub struct Reclassified {
  pub breakdown: StageBreakdown,
  pub update:    Option<StageUpdate>,
}

/// Async HTTP client for the stagesync JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// Turn a non-2xx response into an error carrying the server's message.
  async fn check(what: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
      .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_owned());
    Err(anyhow!("{what} → {status}: {message}"))
  }

  // ── Facts ─────────────────────────────────────────────────────────────────

  /// `POST /api/facts`: returns the number stored.
  pub async fn ingest(&self, facts: &[RawChecklistFact]) -> Result<usize> {
    let resp = self
      .auth(self.client.post(self.url("/facts")))
      .json(facts)
      .send()
      .await
      .context("POST /facts failed")?;
    let body: IngestResponse = Self::check("POST /facts", resp)
      .await?
      .json()
      .await
      .context("deserialising ingest response")?;
    Ok(body.stored)
  }

  // ── People ────────────────────────────────────────────────────────────────

  /// `GET /api/people/{id}/view`
  pub async fn view(&self, person_id: u64) -> Result<PersonView> {
    let path = format!("/people/{person_id}/view");
    let resp = self
      .auth(self.client.get(self.url(&path)))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    Self::check(&format!("GET {path}"), resp)
      .await?
      .json()
      .await
      .context("deserialising view")
  }

  /// `GET /api/people/{id}/breakdown`
  pub async fn breakdown(&self, person_id: u64) -> Result<StageBreakdown> {
    let path = format!("/people/{person_id}/breakdown");
    let resp = self
      .auth(self.client.get(self.url(&path)))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    Self::check(&format!("GET {path}"), resp)
      .await?
      .json()
      .await
      .context("deserialising breakdown")
  }

  /// `POST /api/people/{id}/reclassify`
  pub async fn reclassify(&self, person_id: u64) -> Result<Reclassified> {
    let path = format!("/people/{person_id}/reclassify");
    let resp = self
      .auth(self.client.post(self.url(&path)))
      .send()
      .await
      .with_context(|| format!("POST {path} failed"))?;
    Self::check(&format!("POST {path}"), resp)
      .await?
      .json()
      .await
      .context("deserialising reclassification")
  }

  // ── Update queue ──────────────────────────────────────────────────────────

  /// `GET /api/updates?limit=<n>`
  pub async fn updates(&self, limit: usize) -> Result<Vec<StageUpdate>> {
    let resp = self
      .auth(self.client.get(self.url("/updates")))
      .query(&[("limit", limit.to_string())])
      .send()
      .await
      .context("GET /updates failed")?;
    Self::check("GET /updates", resp)
      .await?
      .json()
      .await
      .context("deserialising updates")
  }

  /// `POST /api/updates/{id}/ack`. `false` if the server no longer has it
  /// pending.
  pub async fn ack(&self, update_id: Uuid) -> Result<bool> {
    let path = format!("/updates/{update_id}/ack");
    let resp = self
      .auth(self.client.post(self.url(&path)))
      .send()
      .await
      .with_context(|| format!("POST {path} failed"))?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(false);
    }
    Self::check(&format!("POST {path}"), resp).await?;
    Ok(true)
  }
}
