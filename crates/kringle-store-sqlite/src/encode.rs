//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings (which order lexicographically,
//! so SQL can compare them), calendar dates as `YYYY-MM-DD`, audit actions as
//! snake_case strings. Booleans use SQLite's 0/1 integers.

use chrono::{DateTime, NaiveDate, Utc};
use kringle_core::{
  audit::{AuditAction, AuditEntry},
  mail::Mail,
  member::Member,
  season::Season,
  user::User,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_dt_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── AuditAction ─────────────────────────────────────────────────────────────

pub fn encode_action(a: AuditAction) -> &'static str {
  match a {
    AuditAction::LoggedIn => "logged_in",
    AuditAction::LoggedOut => "logged_out",
    AuditAction::Enrolled => "enrolled",
    AuditAction::Unenrolled => "unenrolled",
    AuditAction::GiftSent => "gift_sent",
    AuditAction::GiftReceived => "gift_received",
    AuditAction::MailedSanta => "mailed_santa",
    AuditAction::MailedGiftee => "mailed_giftee",
    AuditAction::Banned => "banned",
    AuditAction::Unbanned => "unbanned",
  }
}

pub fn decode_action(s: &str) -> Result<AuditAction> {
  match s {
    "logged_in" => Ok(AuditAction::LoggedIn),
    "logged_out" => Ok(AuditAction::LoggedOut),
    "enrolled" => Ok(AuditAction::Enrolled),
    "unenrolled" => Ok(AuditAction::Unenrolled),
    "gift_sent" => Ok(AuditAction::GiftSent),
    "gift_received" => Ok(AuditAction::GiftReceived),
    "mailed_santa" => Ok(AuditAction::MailedSanta),
    "mailed_giftee" => Ok(AuditAction::MailedGiftee),
    "banned" => Ok(AuditAction::Banned),
    "unbanned" => Ok(AuditAction::Unbanned),
    other => Err(Error::UnknownAction(other.to_owned())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `seasons` row.
pub struct RawSeason {
  pub year:          i32,
  pub signups_start: String,
  pub signups_end:   String,
  pub ship_by:       String,
  pub gallery:       Option<String>,
}

impl RawSeason {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      year:          row.get(0)?,
      signups_start: row.get(1)?,
      signups_end:   row.get(2)?,
      ship_by:       row.get(3)?,
      gallery:       row.get(4)?,
    })
  }

  pub fn into_season(self) -> Result<Season> {
    Ok(Season {
      year:          self.year,
      signups_start: decode_date(&self.signups_start)?,
      signups_end:   decode_date(&self.signups_end)?,
      ship_by:       decode_date(&self.ship_by)?,
      gallery:       self.gallery,
    })
  }
}

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:           i64,
  pub username:     String,
  pub access_token: String,
  pub is_oldfag:    bool,
  pub is_banned:    bool,
  pub first_login:  String,
  pub last_login:   String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      username:     row.get(1)?,
      access_token: row.get(2)?,
      is_oldfag:    row.get(3)?,
      is_banned:    row.get(4)?,
      first_login:  row.get(5)?,
      last_login:   row.get(6)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:           self.id,
      username:     self.username,
      access_token: self.access_token,
      is_oldfag:    self.is_oldfag,
      is_banned:    self.is_banned,
      first_login:  decode_dt(&self.first_login)?,
      last_login:   decode_dt(&self.last_login)?,
    })
  }
}

/// Raw values read directly from a `members` row.
pub struct RawMember {
  pub id:               i64,
  pub user_id:          i64,
  pub year:             i32,
  pub fullname:         String,
  pub postcode:         String,
  pub address:          String,
  pub giftee_id:        Option<i64>,
  pub gift_sent_at:     Option<String>,
  pub gift_received_at: Option<String>,
  pub last_visit:       String,
}

impl RawMember {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      user_id:          row.get(1)?,
      year:             row.get(2)?,
      fullname:         row.get(3)?,
      postcode:         row.get(4)?,
      address:          row.get(5)?,
      giftee_id:        row.get(6)?,
      gift_sent_at:     row.get(7)?,
      gift_received_at: row.get(8)?,
      last_visit:       row.get(9)?,
    })
  }

  pub fn into_member(self) -> Result<Member> {
    Ok(Member {
      id:               self.id,
      user_id:          self.user_id,
      year:             self.year,
      fullname:         self.fullname,
      postcode:         self.postcode,
      address:          self.address,
      giftee_id:        self.giftee_id,
      gift_sent_at:     decode_dt_opt(self.gift_sent_at.as_deref())?,
      gift_received_at: decode_dt_opt(self.gift_received_at.as_deref())?,
      last_visit:       decode_dt(&self.last_visit)?,
    })
  }
}

/// Raw values read directly from a `mails` row.
pub struct RawMail {
  pub id:           i64,
  pub sender_id:    i64,
  pub recipient_id: i64,
  pub body:         String,
  pub sent_at:      String,
  pub read_at:      Option<String>,
}

impl RawMail {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      sender_id:    row.get(1)?,
      recipient_id: row.get(2)?,
      body:         row.get(3)?,
      sent_at:      row.get(4)?,
      read_at:      row.get(5)?,
    })
  }

  pub fn into_mail(self) -> Result<Mail> {
    Ok(Mail {
      id:           self.id,
      sender_id:    self.sender_id,
      recipient_id: self.recipient_id,
      body:         self.body,
      sent_at:      decode_dt(&self.sent_at)?,
      read_at:      decode_dt_opt(self.read_at.as_deref())?,
    })
  }
}

/// Raw values read directly from an `audit_log` row.
pub struct RawAuditEntry {
  pub id:          i64,
  pub action:      String,
  pub actor:       Option<i64>,
  pub target_user: Option<i64>,
  pub year:        Option<i32>,
  pub ip:          Option<String>,
  pub at:          String,
}

impl RawAuditEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      action:      row.get(1)?,
      actor:       row.get(2)?,
      target_user: row.get(3)?,
      year:        row.get(4)?,
      ip:          row.get(5)?,
      at:          row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<AuditEntry> {
    Ok(AuditEntry {
      id:          self.id,
      action:      decode_action(&self.action)?,
      actor:       self.actor,
      target_user: self.target_user,
      year:        self.year,
      ip:          self.ip,
      at:          decode_dt(&self.at)?,
    })
  }
}
