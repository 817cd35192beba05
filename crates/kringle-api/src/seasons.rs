//! Handler for the public season card.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/seasons/{year}` | `year` is a number or `latest`; no auth |

use axum::{
  Json,
  extract::{Path, State},
};
use kringle_core::{
  notify::ProfileProvider,
  season::{SeasonRef, SeasonSummary},
  store::ClubStore,
};

use crate::{ApiState, error::ApiError};

/// `GET /seasons/{year}`
pub async fn summary<S, P>(
  State(state): State<ApiState<S, P>>,
  Path(season): Path<String>,
) -> Result<Json<SeasonSummary>, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let season: SeasonRef = season.parse()?;
  let summary = state.club.season_summary(season).await?;
  Ok(Json(summary))
}
