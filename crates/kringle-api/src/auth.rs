//! Bearer-token and admin Basic-auth extractors.
//!
//! Members authenticate with the bearer token issued at login; admins with
//! HTTP Basic against a configured username and argon2 hash. The two schemes
//! never overlap: admin routes take [`Admin`], member routes [`CurrentUser`].

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use kringle_core::{notify::ProfileProvider, store::ClubStore, user::User};

use crate::{ApiState, error::ApiError};

// ─── Members ─────────────────────────────────────────────────────────────────

/// The authenticated member-side user, resolved from `Authorization: Bearer`.
pub struct CurrentUser(pub User);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
}

impl<S, P> FromRequestParts<ApiState<S, P>> for CurrentUser
where
  S: ClubStore,
  P: ProfileProvider,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S, P>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
    let user = state
      .club
      .authenticate(token)
      .await?
      .ok_or(ApiError::Unauthorized)?;
    Ok(CurrentUser(user))
  }
}

// ─── Admins ──────────────────────────────────────────────────────────────────

/// Credentials accepted for the admin surface.
#[derive(Clone)]
pub struct AdminAuth {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Zero-size marker: present in the handler means Basic auth succeeded.
pub struct Admin;

/// Verify admin credentials directly from headers.
pub fn verify_admin(
  headers: &HeaderMap,
  auth: &AdminAuth,
) -> Result<(), ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds =
    std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) =
    creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  if username != auth.username {
    return Err(ApiError::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&auth.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(())
}

impl<S, P> FromRequestParts<ApiState<S, P>> for Admin
where
  S: ClubStore,
  P: ProfileProvider,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S, P>,
  ) -> Result<Self, Self::Rejection> {
    verify_admin(&parts.headers, &state.admin)?;
    Ok(Admin)
  }
}
