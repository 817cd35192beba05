//! The action log: a persistent trail of notable user and admin actions.
//!
//! Entries are append-only and survive cache clears; they are the record an
//! admin reaches for when a dispute comes in months later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
  LoggedIn,
  LoggedOut,
  Enrolled,
  Unenrolled,
  GiftSent,
  GiftReceived,
  MailedSanta,
  MailedGiftee,
  Banned,
  Unbanned,
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
  pub id:          i64,
  pub action:      AuditAction,
  /// Who acted. `None` for actions taken by a config-file admin.
  pub actor:       Option<i64>,
  /// Who was acted on, where that differs from the actor.
  pub target_user: Option<i64>,
  pub year:        Option<i32>,
  pub ip:          Option<String>,
  pub at:          DateTime<Utc>,
}

/// Store input for one log line. The timestamp is set by the store.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
  pub action:      AuditAction,
  pub actor:       Option<i64>,
  pub target_user: Option<i64>,
  pub year:        Option<i32>,
  pub ip:          Option<String>,
}
