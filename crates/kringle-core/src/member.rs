//! Members — one user's participation in one season.
//!
//! The member row carries the shipping details collected at signup and the
//! per-season gift state. The `(user, season)` pair is unique; the same user
//! re-enrols from scratch every year.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, season::Season};

pub const FULLNAME_MAX: usize = 80;
pub const POSTCODE_MAX: usize = 20;
pub const ADDRESS_MAX: usize = 200;

// ─── Member ──────────────────────────────────────────────────────────────────

/// A participant row: one user enrolled in one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
  pub id:               i64,
  pub user_id:          i64,
  pub year:             i32,
  pub fullname:         String,
  pub postcode:         String,
  pub address:          String,
  /// The member this member gives to. Written once, by the matching run.
  pub giftee_id:        Option<i64>,
  pub gift_sent_at:     Option<DateTime<Utc>>,
  pub gift_received_at: Option<DateTime<Utc>>,
  pub last_visit:       DateTime<Utc>,
}

impl Member {
  pub fn is_matched(&self) -> bool { self.giftee_id.is_some() }

  pub fn is_gift_sent(&self) -> bool { self.gift_sent_at.is_some() }

  pub fn is_gift_received(&self) -> bool { self.gift_received_at.is_some() }
}

/// Store input for enrolling a user. `last_visit` is set by the store.
#[derive(Debug, Clone)]
pub struct NewMember {
  pub user_id:  i64,
  pub year:     i32,
  pub fullname: String,
  pub postcode: String,
  pub address:  String,
}

// ─── Signup form ─────────────────────────────────────────────────────────────

/// Shipping details collected at signup.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupForm {
  pub fullname: String,
  pub postcode: String,
  pub address:  String,
}

impl SignupForm {
  /// Trim surrounding whitespace, then check presence and column limits.
  pub fn validate(mut self) -> Result<Self> {
    self.fullname = self.fullname.trim().to_owned();
    self.postcode = self.postcode.trim().to_owned();
    self.address = self.address.trim().to_owned();
    check_field("fullname", &self.fullname, FULLNAME_MAX)?;
    check_field("postcode", &self.postcode, POSTCODE_MAX)?;
    check_field("address", &self.address, ADDRESS_MAX)?;
    Ok(self)
  }
}

fn check_field(name: &str, value: &str, max: usize) -> Result<()> {
  if value.is_empty() {
    return Err(Error::Validation(format!("{name} must not be empty")));
  }
  if value.chars().count() > max {
    return Err(Error::Validation(format!(
      "{name} must be at most {max} characters"
    )));
  }
  Ok(())
}

// ─── Profile read model ──────────────────────────────────────────────────────

/// Everything the member page needs: the viewer's own row, the season it
/// belongs to, and both counterpart rows where assigned.
///
/// Deliberately holds member rows only. User rows (tokens, ban flags) rotate
/// independently of the season and are always read fresh.
#[derive(Debug, Clone)]
pub struct MemberProfile {
  pub member: Member,
  pub season: Season,
  /// The member the viewer gives to.
  pub giftee: Option<Member>,
  /// The member who gives to the viewer.
  pub santa:  Option<Member>,
}

// ─── Serialised views ────────────────────────────────────────────────────────

/// What a santa sees of their giftee. Shipping details are included so the
/// gift can actually be sent; the username never appears here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GifteeView {
  pub fullname:         String,
  pub postcode:         String,
  pub address:          String,
  pub is_gift_received: bool,
  pub last_visit:       DateTime<Utc>,
}

/// What a giftee sees of their santa. Nothing identifying: the santa stays
/// anonymous until the season's gallery reveal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SantaView {
  pub is_gift_sent: bool,
  pub last_visit:   DateTime<Utc>,
}

/// The serialised member page.
#[derive(Debug, Clone, Serialize)]
pub struct MemberView {
  pub fullname:         String,
  pub postcode:         String,
  pub address:          String,
  pub is_gift_sent:     bool,
  pub is_gift_received: bool,
  pub giftee:           Option<GifteeView>,
  pub santa:            Option<SantaView>,
}

impl MemberProfile {
  /// Project the profile into what the member themself may see.
  pub fn view(&self) -> MemberView {
    MemberView {
      fullname:         self.member.fullname.clone(),
      postcode:         self.member.postcode.clone(),
      address:          self.member.address.clone(),
      is_gift_sent:     self.member.is_gift_sent(),
      is_gift_received: self.member.is_gift_received(),
      giftee:           self.giftee.as_ref().map(|g| GifteeView {
        fullname:         g.fullname.clone(),
        postcode:         g.postcode.clone(),
        address:          g.address.clone(),
        is_gift_received: g.is_gift_received(),
        last_visit:       g.last_visit,
      }),
      santa:            self.santa.as_ref().map(|s| SantaView {
        is_gift_sent: s.is_gift_sent(),
        last_visit:   s.last_visit,
      }),
    }
  }
}
