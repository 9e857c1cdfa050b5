//! HTTP server for stagesync.
//!
//! Mounts the JSON API from [`stagesync_api`] under `/api`, guards every
//! route with HTTP Basic auth, and runs a background reclassification sweep
//! over any [`FactStore`].

pub mod auth;
pub mod error;
pub mod sweep;

pub use error::{Error, Result};

use std::{path::PathBuf, sync::Arc, time::Duration};

use argon2::PasswordHash;
use axum::{Router, middleware};
use serde::Deserialize;
use stagesync_core::store::FactStore;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_auth};

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_sweep_interval_secs() -> u64 { 300 }

/// Runtime server configuration, deserialised from `config.toml` and
/// `STAGESYNC_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  pub store_path:          PathBuf,
  pub auth_username:       String,
  pub auth_password_hash:  String,
  /// Seconds between background sweeps; `0` disables the sweep.
  #[serde(default = "default_sweep_interval_secs")]
  pub sweep_interval_secs: u64,
}

impl ServerConfig {
  pub fn sweep_interval(&self) -> Option<Duration> {
    (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
  }

  /// Catch credentials that could never authenticate before serving.
  pub fn validate(&self) -> Result<()> {
    if self.auth_username.is_empty() {
      return Err(Error::InvalidConfig("auth_username is empty".into()));
    }
    PasswordHash::new(&self.auth_password_hash).map_err(|e| {
      Error::InvalidConfig(format!("auth_password_hash is not a PHC string: {e}"))
    })?;
    Ok(())
  }

  pub fn auth(&self) -> AuthConfig {
    AuthConfig {
      username:      self.auth_username.clone(),
      password_hash: self.auth_password_hash.clone(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state for the router and background tasks.
#[derive(Clone)]
pub struct AppState<S: FactStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
}

impl<S> AppState<S>
where
  S: FactStore + 'static,
{
  pub fn new(store: S, config: ServerConfig) -> Self {
    Self {
      store:  Arc::new(store),
      auth:   Arc::new(config.auth()),
      config: Arc::new(config),
    }
  }

  /// Start the background sweep configured for this state, if enabled.
  pub fn spawn_sweeper(&self) -> Option<tokio::task::JoinHandle<()>> {
    sweep::spawn(self.store.clone(), self.config.sweep_interval())
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server's axum [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: FactStore + 'static,
{
  Router::new()
    .nest("/api", stagesync_api::api_router(state.store.clone()))
    .layer(middleware::from_fn_with_state(state.auth.clone(), require_auth))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use rand_core::OsRng;
  use stagesync_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  fn make_config(password: &str) -> ServerConfig {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();

    ServerConfig {
      host:                "127.0.0.1".to_string(),
      port:                8080,
      store_path:          PathBuf::from(":memory:"),
      auth_username:       "user".to_string(),
      auth_password_hash:  hash,
      sweep_interval_secs: 0,
    }
  }

  async fn make_state(password: &str) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    AppState::new(store, make_config(password))
  }

  fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn oneshot_raw(
    state:   AppState<SqliteStore>,
    method:  &str,
    uri:     &str,
    auth:    Option<&str>,
    body:    &str,
  ) -> axum::response::Response {
    let mut builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json");
    if let Some(a) = auth {
      builder = builder.header(header::AUTHORIZATION, a);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  // ── Auth ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_credentials_get_401_with_challenge() {
    let state = make_state("secret").await;
    let resp  = oneshot_raw(state, "GET", "/api/people", None, "").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let challenge = resp.headers()[header::WWW_AUTHENTICATE].to_str().unwrap();
    assert!(challenge.starts_with("Basic"), "challenge: {challenge}");
  }

  #[tokio::test]
  async fn wrong_password_is_rejected() {
    let state = make_state("secret").await;
    let auth  = auth_header("user", "nope");
    let resp  = oneshot_raw(state, "POST", "/api/classify", Some(&auth), "[]").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  // ── API through the server ──────────────────────────────────────────────────

  #[tokio::test]
  async fn authenticated_ingest_and_reclassify() {
    let state = make_state("secret").await;
    let auth  = auth_header("user", "secret");
    let facts = r#"[{"person_id": 5, "checklist_name": "Application Form", "completed_on": "2024-01-02"}]"#;

    let resp = oneshot_raw(state.clone(), "POST", "/api/facts", Some(&auth), facts).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = oneshot_raw(state.clone(), "POST", "/api/people/5/reclassify", Some(&auth), "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["breakdown"]["stage"], "Application");
    assert_eq!(body["update"]["current"]["substage"], 14);

    let resp = oneshot_raw(state, "GET", "/api/updates", Some(&auth), "").await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  // ── Config ──────────────────────────────────────────────────────────────────

  #[test]
  fn sweep_interval_zero_disables() {
    let mut config = make_config("secret");
    assert_eq!(config.sweep_interval(), None);
    config.sweep_interval_secs = 30;
    assert_eq!(config.sweep_interval(), Some(Duration::from_secs(30)));
  }

  #[test]
  fn validate_rejects_plaintext_password() {
    let mut config = make_config("secret");
    assert!(config.validate().is_ok());
    config.auth_password_hash = "secret".to_string();
    assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    config = make_config("secret");
    config.auth_username.clear();
    assert!(config.validate().is_err());
  }

  #[test]
  fn config_defaults_from_toml() {
    let cfg: ServerConfig = config::Config::builder()
      .add_source(config::File::from_str(
        r#"
          store_path = "stagesync.db"
          auth_username = "ops"
          auth_password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g"
        "#,
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.sweep_interval_secs, 300);
    assert_eq!(cfg.auth_username, "ops");
  }
}
