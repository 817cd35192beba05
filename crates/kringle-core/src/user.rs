//! Users and the participation gate.
//!
//! Identity lives at the remote provider; locally a user is little more than
//! the provider-assigned id, a username, and the bearer token from their most
//! recent login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A locally known user. `id` is assigned by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id:           i64,
  pub username:     String,
  /// Bearer token from the most recent login; rotated on every login.
  pub access_token: String,
  /// Manually-flagged veteran. Veterans bypass the karma gate.
  pub is_oldfag:    bool,
  pub is_banned:    bool,
  pub first_login:  DateTime<Utc>,
  pub last_login:   DateTime<Utc>,
}

/// Login upsert input. Both timestamps are set by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub id:           i64,
  pub username:     String,
  pub access_token: String,
}

/// The slice of a provider profile the participation gate consumes.
///
/// Never persisted; fetched fresh (modulo a short provider-side cache) at the
/// moments that matter, so a karma drop takes effect immediately.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteProfile {
  pub karma:          f64,
  pub rating:         f64,
  /// Count of community badges held.
  pub badges:         u32,
  pub is_readonly:    bool,
  pub is_readcomment: bool,
}

/// A verified provider profile: the stable id plus the current username and
/// the gate-relevant fields.
#[derive(Debug, Clone)]
pub struct RemoteIdentity {
  pub id:       i64,
  pub username: String,
  pub profile:  RemoteProfile,
}

impl User {
  /// The participation gate.
  ///
  /// Banned and restricted accounts are out; veterans are always in;
  /// everyone else needs either enough karma or at least one badge.
  pub fn can_participate(
    &self,
    profile: &RemoteProfile,
    karma_limit: f64,
  ) -> bool {
    !self.is_banned
      && !profile.is_readonly
      && !profile.is_readcomment
      && (self.is_oldfag || profile.karma >= karma_limit || profile.badges > 0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user() -> User {
    User {
      id:           7,
      username:     "gifter".into(),
      access_token: "tok".into(),
      is_oldfag:    false,
      is_banned:    false,
      first_login:  Utc::now(),
      last_login:   Utc::now(),
    }
  }

  #[test]
  fn karma_at_or_above_the_limit_qualifies() {
    let u = user();
    let profile = RemoteProfile { karma: 20.0, ..Default::default() };
    assert!(u.can_participate(&profile, 20.0));

    let profile = RemoteProfile { karma: 19.9, ..Default::default() };
    assert!(!u.can_participate(&profile, 20.0));
  }

  #[test]
  fn veterans_and_badge_holders_bypass_karma() {
    let mut u = user();
    u.is_oldfag = true;
    assert!(u.can_participate(&RemoteProfile::default(), 20.0));

    let u = user();
    let profile = RemoteProfile { badges: 2, ..Default::default() };
    assert!(u.can_participate(&profile, 20.0));
  }

  #[test]
  fn restricted_accounts_never_qualify() {
    let mut u = user();
    u.is_oldfag = true;

    let readonly = RemoteProfile { is_readonly: true, ..Default::default() };
    assert!(!u.can_participate(&readonly, 20.0));

    let readcomment =
      RemoteProfile { is_readcomment: true, ..Default::default() };
    assert!(!u.can_participate(&readcomment, 20.0));

    u.is_banned = true;
    assert!(!u.can_participate(&RemoteProfile::default(), 20.0));
  }

  #[test]
  fn negative_limit_admits_negative_karma() {
    let u = user();
    let profile = RemoteProfile { karma: -10.0, ..Default::default() };
    assert!(u.can_participate(&profile, -15.0));
    assert!(!u.can_participate(&profile, 0.0));
  }
}
