//! Process assembly for the Kringle server.
//!
//! This crate owns everything that only exists at runtime: the deserialised
//! [`ServerConfig`], the HTTP client for the identity provider, and the
//! notification queue worker. The `kringled` binary wires them into
//! [`kringle_api::router`].

use std::path::PathBuf;

use serde::Deserialize;

pub mod provider;
pub mod queue;

pub use provider::{TrackerClient, TrackerConfig};
pub use queue::{DeliverNotification, QueueConfig, QueueNotifier};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` merged with
/// `KRINGLE_`-prefixed environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                   String,
  pub port:                   u16,
  pub store_path:             PathBuf,
  /// Karma threshold for the participation gate.
  pub karma_limit:            f64,
  /// Full URL of the provider's OAuth token endpoint.
  pub provider_token_url:     String,
  /// Base URL of the provider's profile / tracker API.
  pub provider_api_url:       String,
  pub provider_client_id:     String,
  pub provider_client_secret: String,
  #[serde(default = "default_profile_ttl_secs")]
  pub profile_ttl_secs:       u64,
  pub auth_username:          String,
  pub auth_password_hash:     String,
  #[serde(default = "default_queue_capacity")]
  pub queue_capacity:         usize,
  #[serde(default = "default_queue_max_attempts")]
  pub queue_max_attempts:     u32,
  #[serde(default = "default_queue_retry_delay_ms")]
  pub queue_retry_delay_ms:   u64,
}

fn default_profile_ttl_secs() -> u64 { 300 }

fn default_queue_capacity() -> usize { 256 }

fn default_queue_max_attempts() -> u32 { 3 }

fn default_queue_retry_delay_ms() -> u64 { 5_000 }
