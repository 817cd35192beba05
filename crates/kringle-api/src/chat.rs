//! Handlers for the santa/giftee chat.
//!
//! Mutations return the refreshed [`ChatState`] so the client repaints both
//! panes from one round trip.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/seasons/{year}/chat` | Both panes, unread counts |
//! | `POST` | `/seasons/{year}/send_mail` | Body: `{"recipient":"santa"\|"giftee","body"}` |
//! | `POST` | `/seasons/{year}/read_mails` | Body: `{"sender":"santa"\|"giftee","timestamp"}` |

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use kringle_core::{
  mail::{ChatState, MailSide},
  notify::ProfileProvider,
  season::SeasonRef,
  store::ClubStore,
};
use serde::Deserialize;

use crate::{ApiState, auth::CurrentUser, client_ip, error::ApiError};

/// `GET /seasons/{year}/chat`
pub async fn get_chat<S, P>(
  State(state): State<ApiState<S, P>>,
  Path(season): Path<String>,
  CurrentUser(user): CurrentUser,
) -> Result<Json<ChatState>, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let season: SeasonRef = season.parse()?;
  let chat = state.club.chat(&user, season).await?;
  Ok(Json(chat))
}

#[derive(Debug, Deserialize)]
pub struct SendMailBody {
  pub recipient: MailSide,
  pub body:      String,
}

/// `POST /seasons/{year}/send_mail`
pub async fn send_mail<S, P>(
  State(state): State<ApiState<S, P>>,
  Path(season): Path<String>,
  headers: HeaderMap,
  CurrentUser(user): CurrentUser,
  Json(body): Json<SendMailBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let season: SeasonRef = season.parse()?;
  state
    .club
    .send_mail(&user, season, body.recipient, &body.body, client_ip(&headers))
    .await?;
  let chat = state.club.chat(&user, season).await?;
  Ok((StatusCode::CREATED, Json(chat)))
}

#[derive(Debug, Deserialize)]
pub struct ReadMailsBody {
  pub sender:    MailSide,
  /// Unix seconds. Upper bound: messages that arrived after the page was
  /// rendered stay unread.
  #[serde(with = "chrono::serde::ts_seconds")]
  pub timestamp: DateTime<Utc>,
}

/// `POST /seasons/{year}/read_mails`
pub async fn read_mails<S, P>(
  State(state): State<ApiState<S, P>>,
  Path(season): Path<String>,
  CurrentUser(user): CurrentUser,
  Json(body): Json<ReadMailsBody>,
) -> Result<Json<ChatState>, ApiError>
where
  S: ClubStore,
  P: ProfileProvider,
{
  let season: SeasonRef = season.parse()?;
  state
    .club
    .read_mails(&user, season, body.sender, body.timestamp)
    .await?;
  let chat = state.club.chat(&user, season).await?;
  Ok(Json(chat))
}
