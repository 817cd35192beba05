//! Seasons — one yearly exchange round, keyed by calendar year.
//!
//! A season's phase is never stored; it is derived from three boundary dates
//! compared against "today" as a plain calendar date. The signup window is
//! half-open (`signups_start <= today < signups_end`), and the season stays
//! active through `ship_by` itself.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Season ──────────────────────────────────────────────────────────────────

/// One yearly exchange round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
  /// Calendar year. Doubles as the primary key and is immutable once created.
  pub year:          i32,
  pub signups_start: NaiveDate,
  /// Exclusive upper bound of the signup window.
  pub signups_end:   NaiveDate,
  pub ship_by:       NaiveDate,
  /// Optional URL of the season's gift gallery.
  pub gallery:       Option<String>,
}

impl Season {
  /// Whether signups (and signouts) are open on `today`.
  pub fn is_participatable(&self, today: NaiveDate) -> bool {
    self.signups_start <= today && today < self.signups_end
  }

  /// Whether the season is archived. `ship_by` itself is still active.
  pub fn is_closed(&self, today: NaiveDate) -> bool { today > self.ship_by }

  /// Whole days left until signups close, or `None` once they have.
  pub fn timeleft(&self, today: NaiveDate) -> Option<i64> {
    let days = (self.signups_end - today).num_days();
    (days > 0).then_some(days)
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input for creating a season.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSeason {
  pub year:          i32,
  pub signups_start: NaiveDate,
  pub signups_end:   NaiveDate,
  pub ship_by:       NaiveDate,
  pub gallery:       Option<String>,
}

impl NewSeason {
  pub fn validate(&self) -> Result<()> {
    validate_dates(self.signups_start, self.signups_end, self.ship_by)
  }
}

/// Date and gallery changes for an existing season. The year cannot change.
#[derive(Debug, Clone, Deserialize)]
pub struct SeasonPatch {
  pub signups_start: NaiveDate,
  pub signups_end:   NaiveDate,
  pub ship_by:       NaiveDate,
  pub gallery:       Option<String>,
}

impl SeasonPatch {
  pub fn validate(&self) -> Result<()> {
    validate_dates(self.signups_start, self.signups_end, self.ship_by)
  }
}

fn validate_dates(
  start: NaiveDate,
  end: NaiveDate,
  ship_by: NaiveDate,
) -> Result<()> {
  if end <= start {
    return Err(Error::Validation(
      "please allow time for registration: signups must close after they open"
        .into(),
    ));
  }
  if ship_by <= end {
    return Err(Error::Validation(
      "please allow time for shipping: the deadline cannot precede the close \
       of signups"
        .into(),
    ));
  }
  Ok(())
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// Participation counters for one season.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonStats {
  pub members:  u32,
  pub sent:     u32,
  pub received: u32,
}

/// The public season card: the season row plus counters and the phase flags
/// evaluated for a given day.
#[derive(Debug, Clone, Serialize)]
pub struct SeasonSummary {
  pub year:              i32,
  pub signups_start:     NaiveDate,
  pub signups_end:       NaiveDate,
  pub ship_by:           NaiveDate,
  pub gallery:           Option<String>,
  pub members:           u32,
  pub sent:              u32,
  pub received:          u32,
  pub timeleft:          Option<i64>,
  pub is_participatable: bool,
  pub is_closed:         bool,
}

impl SeasonSummary {
  pub fn build(season: &Season, stats: SeasonStats, today: NaiveDate) -> Self {
    Self {
      year:              season.year,
      signups_start:     season.signups_start,
      signups_end:       season.signups_end,
      ship_by:           season.ship_by,
      gallery:           season.gallery.clone(),
      members:           stats.members,
      sent:              stats.sent,
      received:          stats.received,
      timeleft:          season.timeleft(today),
      is_participatable: season.is_participatable(today),
      is_closed:         season.is_closed(today),
    }
  }
}

// ─── SeasonRef ───────────────────────────────────────────────────────────────

/// How callers name a season: a specific year, or the most recent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonRef {
  Year(i32),
  Latest,
}

impl FromStr for SeasonRef {
  type Err = Error;

  /// Anything that is neither `latest` nor a year resolves to no season.
  fn from_str(s: &str) -> Result<Self> {
    if s == "latest" {
      return Ok(Self::Latest);
    }
    s.parse::<i32>()
      .map(Self::Year)
      .map_err(|_| Error::SeasonNotFound(s.to_owned()))
  }
}

impl fmt::Display for SeasonRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Year(year) => write!(f, "{year}"),
      Self::Latest => f.write_str("latest"),
    }
  }
}
