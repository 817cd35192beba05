//! kringled — the Kringle club server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, connects the identity-provider client and the notification
//! worker, and serves the club API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash` in config.toml:
//!
//! ```text
//! cargo run -p kringle-server --bin kringled -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use kringle_api::{ApiState, auth::AdminAuth};
use kringle_club::ClubService;
use kringle_server::{QueueConfig, ServerConfig, TrackerClient, TrackerConfig};
use kringle_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Kringle club server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("KRINGLE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Provider client, shared by the login path and the delivery worker.
  let tracker = Arc::new(
    TrackerClient::new(TrackerConfig {
      token_url:     server_cfg.provider_token_url.clone(),
      api_url:       server_cfg.provider_api_url.clone(),
      client_id:     server_cfg.provider_client_id.clone(),
      client_secret: server_cfg.provider_client_secret.clone(),
      profile_ttl:   Duration::from_secs(server_cfg.profile_ttl_secs),
    })
    .context("failed to build provider client")?,
  );

  // Notification queue. Dropping the handle detaches the worker task.
  let (notifier, _worker) =
    kringle_server::queue::spawn(Arc::clone(&tracker), QueueConfig {
      capacity:     server_cfg.queue_capacity,
      max_attempts: server_cfg.queue_max_attempts,
      retry_delay:  Duration::from_millis(server_cfg.queue_retry_delay_ms),
    });

  // Build application state.
  let club = ClubService::new(
    Arc::new(store),
    tracker,
    Arc::new(notifier),
    server_cfg.karma_limit,
  );
  let state = ApiState {
    club,
    admin: Arc::new(AdminAuth {
      username:      server_cfg.auth_username.clone(),
      password_hash: server_cfg.auth_password_hash.clone(),
    }),
  };

  let app = kringle_api::router(state).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
