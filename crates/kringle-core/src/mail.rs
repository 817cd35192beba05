//! In-club mail between a member and their santa or giftee.
//!
//! Only those two conversations exist. Messages are addressed by role, never
//! by member id, so the anonymity of the santa side is preserved end to end.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const BODY_MAX: usize = 400;

/// Which counterpart a member is addressing (or reading).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailSide {
  /// The anonymous benefactor of the viewing member.
  Santa,
  /// The member the viewing member gives to.
  Giftee,
}

impl FromStr for MailSide {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "santa" => Ok(Self::Santa),
      "giftee" => Ok(Self::Giftee),
      other => Err(Error::Validation(format!("unknown chat side: {other:?}"))),
    }
  }
}

// ─── Mail ────────────────────────────────────────────────────────────────────

/// One stored message between two members of the same season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mail {
  pub id:           i64,
  pub sender_id:    i64,
  pub recipient_id: i64,
  pub body:         String,
  pub sent_at:      DateTime<Utc>,
  pub read_at:      Option<DateTime<Utc>>,
}

/// Store input for a new message. `sent_at` is set by the store.
#[derive(Debug, Clone)]
pub struct NewMail {
  pub sender_id:    i64,
  pub recipient_id: i64,
  pub body:         String,
}

/// Trim a message body and check it against the column limit.
pub fn validate_body(body: &str) -> Result<String> {
  let body = body.trim();
  if body.is_empty() {
    return Err(Error::Validation("the message is empty".into()));
  }
  if body.chars().count() > BODY_MAX {
    return Err(Error::Validation(format!(
      "the message must be at most {BODY_MAX} characters"
    )));
  }
  Ok(body.to_owned())
}

// ─── Chat read model ─────────────────────────────────────────────────────────

/// One message as shown in a chat pane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailView {
  /// Whether the viewer wrote this message.
  pub is_author: bool,
  pub body:      String,
  pub sent_at:   DateTime<Utc>,
  pub read_at:   Option<DateTime<Utc>>,
}

/// One chat pane: the conversation with one counterpart, oldest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatPane {
  pub mails:  Vec<MailView>,
  /// Messages from the counterpart the viewer has not read yet.
  pub unread: usize,
}

impl ChatPane {
  /// Build a pane from the viewer's perspective.
  pub fn build(viewer_member_id: i64, mails: &[Mail]) -> Self {
    let mails: Vec<MailView> = mails
      .iter()
      .map(|m| MailView {
        is_author: m.sender_id == viewer_member_id,
        body:      m.body.clone(),
        sent_at:   m.sent_at,
        read_at:   m.read_at,
      })
      .collect();
    let unread = mails
      .iter()
      .filter(|m| !m.is_author && m.read_at.is_none())
      .count();
    Self { mails, unread }
  }
}

/// Both chat panes for the member page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatState {
  pub santa:  ChatPane,
  pub giftee: ChatPane,
}
