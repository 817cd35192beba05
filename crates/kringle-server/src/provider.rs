//! HTTP client for the identity provider.
//!
//! The provider speaks its own private scheme rather than standard OAuth
//! resource requests: `client` / `token` headers instead of Bearer auth, and
//! a `{"data": ...}` envelope around profile reads. Profiles are cached
//! in-process for a short TTL so the eligibility gate does not hammer the
//! provider on every request.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use kringle_core::{
  Error, Result,
  notify::{Notification, ProfileProvider},
  user::{RemoteIdentity, RemoteProfile},
};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::queue::DeliverNotification;

/// Connection settings for the provider.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
  /// Full URL of the OAuth token endpoint.
  pub token_url:     String,
  /// Base URL for `/users/me` and `/tracker`.
  pub api_url:       String,
  pub client_id:     String,
  pub client_secret: String,
  pub profile_ttl:   Duration,
}

/// Async client for the provider's OAuth and tracker API.
///
/// Intended to be shared behind an [`std::sync::Arc`]; the inner
/// [`reqwest::Client`] pools connections across clones of that handle.
pub struct TrackerClient {
  client:   Client,
  config:   TrackerConfig,
  profiles: DashMap<String, (Instant, RemoteIdentity)>,
}

impl TrackerClient {
  pub fn new(config: TrackerConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(|e| Error::Dependency(format!("building HTTP client: {e}")))?;
    Ok(Self { client, config, profiles: DashMap::new() })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.config.api_url.trim_end_matches('/'))
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

/// `{"data": ...}` envelope on provider reads.
#[derive(Deserialize)]
struct Envelope<T> {
  data: T,
}

#[derive(Deserialize)]
struct WireToken {
  access_token: String,
}

/// The slice of `GET /users/me` the gate consumes. Missing restriction flags
/// read as restricted, so a thin or malformed profile cannot participate.
#[derive(Deserialize)]
struct WireProfile {
  id:             i64,
  login:          String,
  #[serde(default)]
  score:          f64,
  #[serde(default)]
  rating:         f64,
  #[serde(default)]
  badges:         Vec<serde_json::Value>,
  #[serde(default = "restricted")]
  is_readonly:    bool,
  #[serde(default = "restricted", rename = "is_rc")]
  is_readcomment: bool,
}

fn restricted() -> bool { true }

impl WireProfile {
  fn into_identity(self) -> RemoteIdentity {
    RemoteIdentity {
      id:       self.id,
      username: self.login,
      profile:  RemoteProfile {
        karma:          self.score,
        rating:         self.rating,
        badges:         self.badges.len() as u32,
        is_readonly:    self.is_readonly,
        is_readcomment: self.is_readcomment,
      },
    }
  }
}

// ─── Provider calls ──────────────────────────────────────────────────────────

impl ProfileProvider for TrackerClient {
  /// `POST {token_url}` — trade the login redirect code for a bearer token.
  async fn exchange_code(&self, code: &str) -> Result<String> {
    let resp = self
      .client
      .post(&self.config.token_url)
      .form(&[
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", self.config.client_id.as_str()),
        ("client_secret", self.config.client_secret.as_str()),
      ])
      .send()
      .await
      .map_err(|e| Error::Dependency(format!("token exchange failed: {e}")))?;

    if !resp.status().is_success() {
      return Err(Error::Dependency(format!(
        "token exchange returned {}",
        resp.status()
      )));
    }
    let token: WireToken = resp
      .json()
      .await
      .map_err(|e| Error::Dependency(format!("decoding token response: {e}")))?;
    Ok(token.access_token)
  }

  /// `GET {api_url}/users/me` — fetch the profile behind a token.
  async fn fetch_profile(&self, access_token: &str) -> Result<RemoteIdentity> {
    if let Some(hit) = self.profiles.get(access_token)
      && hit.0.elapsed() < self.config.profile_ttl
    {
      return Ok(hit.1.clone());
    }

    debug!("profile cache miss, querying the provider");
    let resp = self
      .client
      .get(self.url("/users/me"))
      .header("client", &self.config.client_id)
      .header("token", access_token)
      .send()
      .await
      .map_err(|e| Error::Dependency(format!("profile fetch failed: {e}")))?;

    if !resp.status().is_success() {
      return Err(Error::Dependency(format!(
        "profile fetch returned {}",
        resp.status()
      )));
    }
    let wire: Envelope<WireProfile> = resp
      .json()
      .await
      .map_err(|e| Error::Dependency(format!("decoding profile: {e}")))?;

    let identity = wire.data.into_identity();
    self
      .profiles
      .insert(access_token.to_owned(), (Instant::now(), identity.clone()));
    Ok(identity)
  }
}

impl DeliverNotification for TrackerClient {
  /// `PUT {api_url}/tracker` — push a notification, authenticated as the
  /// recipient.
  async fn deliver(&self, notification: &Notification) -> Result<()> {
    let resp = self
      .client
      .put(self.url("/tracker"))
      .header("client", &self.config.client_id)
      .header("token", &notification.token)
      .form(&[
        ("title", notification.title.as_str()),
        ("text", notification.body.as_str()),
      ])
      .send()
      .await
      .map_err(|e| Error::Dependency(format!("delivery failed: {e}")))?;

    if !resp.status().is_success() {
      return Err(Error::Dependency(format!(
        "delivery returned {}",
        resp.status()
      )));
    }
    Ok(())
  }
}
