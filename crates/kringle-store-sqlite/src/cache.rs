//! In-process read-through cache for the hot read models.
//!
//! Entries are dropped synchronously by the store write that invalidates
//! them; there is no TTL. Correctness rule: a write never returns while a
//! cache entry it made stale is still readable.

use std::sync::Arc;

use dashmap::DashMap;
use kringle_core::{
  mail::Mail,
  member::MemberProfile,
  season::{Season, SeasonStats},
  user::User,
};

/// Unordered member-id pair keying one conversation.
pub fn pair_key(a: i64, b: i64) -> (i64, i64) {
  if a <= b { (a, b) } else { (b, a) }
}

#[derive(Default)]
pub struct StoreCache {
  /// Season card by year.
  pub seasons:   DashMap<i32, Arc<(Season, SeasonStats)>>,
  /// Member page by `(user_id, year)`. Only hits are cached.
  pub profiles:  DashMap<(i64, i32), Arc<MemberProfile>>,
  /// Conversation by unordered member-id pair.
  pub mailboxes: DashMap<(i64, i64), Arc<Vec<Mail>>>,
  /// Bearer-token resolution, the per-request auth lookup.
  pub tokens:    DashMap<String, Arc<User>>,
}

impl StoreCache {
  pub fn clear(&self) {
    self.seasons.clear();
    self.profiles.clear();
    self.mailboxes.clear();
    self.tokens.clear();
  }

  /// Drop the cached profile of every member of `year`. Used after a draw,
  /// which touches the whole season at once.
  pub fn drop_year_profiles(&self, year: i32) {
    self.profiles.retain(|(_, y), _| *y != year);
  }
}
