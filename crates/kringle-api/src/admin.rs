//! Handlers for the admin surface. All routes require HTTP Basic auth.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/admin/seasons` | Body: season dates; 201 |
//! | `PUT`  | `/admin/seasons/{year}` | Closed seasons are read-only |
//! | `POST` | `/admin/seasons/{year}/match` | Runs the draw; 202 |
//! | `POST` | `/admin/users/{username}/ban` | Idempotent |
//! | `POST` | `/admin/users/{username}/unban` | Idempotent |
//! | `GET`  | `/admin/audit?limit=N` | Newest first |
//! | `POST` | `/admin/cache/clear` | 204 |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use kringle_core::{
  audit::AuditEntry,
  notify::ProfileProvider,
  season::{NewSeason, Season, SeasonPatch, SeasonRef},
  store::ClubStore,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{ApiState, auth::Admin, client_ip, error::ApiError};

// ─── Seasons ─────────────────────────────────────────────────────────────────

/// `POST /admin/seasons`
pub async fn create_season<S, P>(
  State(state): State<ApiState<S, P>>,
  _admin: Admin,
  Json(input): Json<NewSeason>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let season = state.club.create_season(input).await?;
  Ok((StatusCode::CREATED, Json(season)))
}

/// `PUT /admin/seasons/{year}`
pub async fn update_season<S, P>(
  State(state): State<ApiState<S, P>>,
  Path(year): Path<i32>,
  _admin: Admin,
  Json(patch): Json<SeasonPatch>,
) -> Result<Json<Season>, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let season = state.club.update_season(year, patch).await?;
  Ok(Json(season))
}

/// `POST /admin/seasons/{year}/match` — run the draw.
///
/// 202: the notifications fan out after the response.
pub async fn run_matching<S, P>(
  State(state): State<ApiState<S, P>>,
  Path(season): Path<String>,
  _admin: Admin,
) -> Result<impl IntoResponse, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let season: SeasonRef = season.parse()?;
  let report = state.club.run_matching(season).await?;
  Ok((
    StatusCode::ACCEPTED,
    Json(json!({ "year": report.year, "members": report.members })),
  ))
}

// ─── Moderation ──────────────────────────────────────────────────────────────

/// `POST /admin/users/{username}/ban`
pub async fn ban<S, P>(
  State(state): State<ApiState<S, P>>,
  Path(username): Path<String>,
  headers: HeaderMap,
  _admin: Admin,
) -> Result<Json<Value>, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let user = state.club.ban_user(&username, client_ip(&headers)).await?;
  Ok(Json(json!({ "username": user.username, "is_banned": user.is_banned })))
}

/// `POST /admin/users/{username}/unban`
pub async fn unban<S, P>(
  State(state): State<ApiState<S, P>>,
  Path(username): Path<String>,
  headers: HeaderMap,
  _admin: Admin,
) -> Result<Json<Value>, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let user = state.club.unban_user(&username, client_ip(&headers)).await?;
  Ok(Json(json!({ "username": user.username, "is_banned": user.is_banned })))
}

// ─── Audit & cache ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AuditParams {
  pub limit: Option<usize>,
}

/// `GET /admin/audit?limit=N`
pub async fn audit<S, P>(
  State(state): State<ApiState<S, P>>,
  Query(params): Query<AuditParams>,
  _admin: Admin,
) -> Result<Json<Vec<AuditEntry>>, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let limit = params.limit.unwrap_or(100).min(1000);
  let entries = state.club.recent_audit(limit).await?;
  Ok(Json(entries))
}

/// `POST /admin/cache/clear`
pub async fn clear_cache<S, P>(
  State(state): State<ApiState<S, P>>,
  _admin: Admin,
) -> Result<StatusCode, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  state.club.clear_cache().await?;
  Ok(StatusCode::NO_CONTENT)
}
