//! JSON REST API for Kringle.
//!
//! Exposes an axum [`Router`] over a [`ClubService`]: public season cards,
//! bearer-authenticated member routes, and a Basic-authenticated admin
//! surface. TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(kringle_api::router(state))
//! ```

pub mod admin;
pub mod auth;
pub mod chat;
pub mod error;
pub mod login;
pub mod member;
pub mod seasons;

use std::sync::Arc;

use axum::{
  Router,
  http::HeaderMap,
  routing::{get, post, put},
};
use kringle_club::ClubService;
use kringle_core::{notify::ProfileProvider, store::ClubStore};

use auth::AdminAuth;

pub use error::ApiError;

/// Shared state threaded through all axum handlers.
pub struct ApiState<S, P> {
  pub club:  ClubService<S, P>,
  pub admin: Arc<AdminAuth>,
}

impl<S, P> Clone for ApiState<S, P> {
  fn clone(&self) -> Self {
    Self { club: self.club.clone(), admin: Arc::clone(&self.admin) }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn router<S, P>(state: ApiState<S, P>) -> Router<()>
where
  S: ClubStore + 'static,
  P: ProfileProvider + 'static,
{
  Router::new()
    // Public
    .route("/auth/login", post(login::login::<S, P>))
    .route("/seasons/{year}", get(seasons::summary::<S, P>))
    // Bearer-authenticated
    .route("/auth/logout", post(login::logout::<S, P>))
    .route("/seasons/{year}/member", get(member::page::<S, P>))
    .route("/seasons/{year}/signup", post(member::signup::<S, P>))
    .route("/seasons/{year}/signout", post(member::signout::<S, P>))
    .route("/seasons/{year}/send_gift", post(member::send_gift::<S, P>))
    .route("/seasons/{year}/receive_gift", post(member::receive_gift::<S, P>))
    // Chat
    .route("/seasons/{year}/chat", get(chat::get_chat::<S, P>))
    .route("/seasons/{year}/send_mail", post(chat::send_mail::<S, P>))
    .route("/seasons/{year}/read_mails", post(chat::read_mails::<S, P>))
    // Admin
    .route("/admin/seasons", post(admin::create_season::<S, P>))
    .route("/admin/seasons/{year}", put(admin::update_season::<S, P>))
    .route("/admin/seasons/{year}/match", post(admin::run_matching::<S, P>))
    .route("/admin/users/{username}/ban", post(admin::ban::<S, P>))
    .route("/admin/users/{username}/unban", post(admin::unban::<S, P>))
    .route("/admin/audit", get(admin::audit::<S, P>))
    .route("/admin/cache/clear", post(admin::clear_cache::<S, P>))
    .with_state(state)
}

/// Best-effort client address for the audit trail: the first hop of
/// `X-Forwarded-For`, or `X-Real-IP`.
pub(crate) fn client_ip(headers: &HeaderMap) -> Option<String> {
  if let Some(forwarded) = headers
    .get("x-forwarded-for")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(',').next())
  {
    let forwarded = forwarded.trim();
    if !forwarded.is_empty() {
      return Some(forwarded.to_owned());
    }
  }
  headers
    .get("x-real-ip")
    .and_then(|v| v.to_str().ok())
    .map(|v| v.trim().to_owned())
}
