//! Handlers for `/auth/*`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/login` | Body: `{"code":"<provider redirect code>"}` |
//! | `POST` | `/auth/logout` | Bearer auth; invalidates the token |

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode},
};
use kringle_core::{notify::ProfileProvider, store::ClubStore};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{ApiState, auth::CurrentUser, client_ip, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub code: String,
}

/// `POST /auth/login` — complete the provider redirect.
///
/// The returned `token` is the bearer credential for every member route; it
/// stays valid until the user's next login.
pub async fn login<S, P>(
  State(state): State<ApiState<S, P>>,
  headers: HeaderMap,
  Json(body): Json<LoginBody>,
) -> Result<Json<Value>, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let outcome = state.club.login(&body.code, client_ip(&headers)).await?;
  Ok(Json(json!({
    "token": outcome.user.access_token,
    "user": {
      "id":              outcome.user.id,
      "username":        outcome.user.username,
      "can_participate": outcome.can_participate,
    },
  })))
}

/// `POST /auth/logout` — stop the presented token from resolving.
pub async fn logout<S, P>(
  State(state): State<ApiState<S, P>>,
  headers: HeaderMap,
  CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  state.club.logout(&user, client_ip(&headers)).await?;
  Ok(StatusCode::NO_CONTENT)
}
