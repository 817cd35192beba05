//! Handlers for the member page and its state changes.
//!
//! All routes require a bearer token. The serialised page never includes the
//! santa's identity, only their gift flag and last visit.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/seasons/{year}/member` | 404 until signed up |
//! | `POST` | `/seasons/{year}/signup` | Body: `{"fullname","postcode","address"}` |
//! | `POST` | `/seasons/{year}/signout` | Only while signups are open, pre-draw |
//! | `POST` | `/seasons/{year}/send_gift` | Fires once |
//! | `POST` | `/seasons/{year}/receive_gift` | Fires once |

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use kringle_core::{
  member::{MemberView, SignupForm},
  notify::ProfileProvider,
  season::SeasonRef,
  store::ClubStore,
};

use crate::{ApiState, auth::CurrentUser, client_ip, error::ApiError};

// ─── Page ────────────────────────────────────────────────────────────────────

/// `GET /seasons/{year}/member`
pub async fn page<S, P>(
  State(state): State<ApiState<S, P>>,
  Path(season): Path<String>,
  CurrentUser(user): CurrentUser,
) -> Result<Json<MemberView>, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let season: SeasonRef = season.parse()?;
  let profile = state.club.member_page(&user, season).await?;
  Ok(Json(profile.view()))
}

// ─── Signup / signout ────────────────────────────────────────────────────────

/// `POST /seasons/{year}/signup`
pub async fn signup<S, P>(
  State(state): State<ApiState<S, P>>,
  Path(season): Path<String>,
  headers: HeaderMap,
  CurrentUser(user): CurrentUser,
  Json(form): Json<SignupForm>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let season: SeasonRef = season.parse()?;
  let profile = state
    .club
    .signup(&user, season, form, client_ip(&headers))
    .await?;
  Ok((StatusCode::CREATED, Json(profile.view())))
}

/// `POST /seasons/{year}/signout`
pub async fn signout<S, P>(
  State(state): State<ApiState<S, P>>,
  Path(season): Path<String>,
  headers: HeaderMap,
  CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let season: SeasonRef = season.parse()?;
  state.club.signout(&user, season, client_ip(&headers)).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Gift state ──────────────────────────────────────────────────────────────

/// `POST /seasons/{year}/send_gift`
pub async fn send_gift<S, P>(
  State(state): State<ApiState<S, P>>,
  Path(season): Path<String>,
  headers: HeaderMap,
  CurrentUser(user): CurrentUser,
) -> Result<Json<MemberView>, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let season: SeasonRef = season.parse()?;
  let profile =
    state.club.send_gift(&user, season, client_ip(&headers)).await?;
  Ok(Json(profile.view()))
}

/// `POST /seasons/{year}/receive_gift`
pub async fn receive_gift<S, P>(
  State(state): State<ApiState<S, P>>,
  Path(season): Path<String>,
  headers: HeaderMap,
  CurrentUser(user): CurrentUser,
) -> Result<Json<MemberView>, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let season: SeasonRef = season.parse()?;
  let profile =
    state.club.receive_gift(&user, season, client_ip(&headers)).await?;
  Ok(Json(profile.view()))
}
