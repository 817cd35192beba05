//! The `ClubStore` trait — the storage abstraction the club logic runs on.
//!
//! The trait is implemented by storage backends (e.g. `kringle-store-sqlite`).
//! Higher layers (`kringle-club`, `kringle-api`) depend on this abstraction,
//! not on any concrete backend.
//!
//! Reads marked as cached are served from the backend's read-through cache;
//! every write below names the entries it must invalidate before returning.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  audit::{AuditEntry, NewAuditEntry},
  mail::{Mail, NewMail},
  matching::Assignment,
  member::{Member, MemberProfile, NewMember},
  season::{NewSeason, Season, SeasonPatch, SeasonStats},
  user::{NewUser, User},
};

/// Abstraction over a Kringle club store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ClubStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Seasons ───────────────────────────────────────────────────────────

  /// Create a season. Fails if the year is already taken.
  fn create_season(
    &self,
    input: NewSeason,
  ) -> impl Future<Output = Result<Season, Self::Error>> + Send + '_;

  /// Update the dates and gallery of an existing season.
  /// Returns `None` if the year does not exist.
  fn update_season(
    &self,
    year: i32,
    patch: SeasonPatch,
  ) -> impl Future<Output = Result<Option<Season>, Self::Error>> + Send + '_;

  /// Retrieve a season row by year. Bypasses the cache.
  fn get_season(
    &self,
    year: i32,
  ) -> impl Future<Output = Result<Option<Season>, Self::Error>> + Send + '_;

  /// The most recent year that has a season, if any.
  fn latest_year(
    &self,
  ) -> impl Future<Output = Result<Option<i32>, Self::Error>> + Send + '_;

  /// A season together with its counters. Cached.
  fn season_with_stats(
    &self,
    year: i32,
  ) -> impl Future<Output = Result<Option<(Season, SeasonStats)>, Self::Error>>
  + Send
  + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Insert a user on first login, or rotate their token on a later one.
  /// `first_login` is preserved across upserts; both timestamps are set by
  /// the store.
  fn upsert_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user_by_username(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Resolve a bearer token to its user. Cached; this is the auth hot path.
  fn get_user_by_token(
    &self,
    token: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Set the banned flag. Returns the updated user, or `None` if missing.
  fn set_banned(
    &self,
    user_id: i64,
    banned: bool,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Blank the user's access token so it stops resolving. Returns `false`
  /// if the user does not exist or their token was already blank.
  fn clear_token(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Members ───────────────────────────────────────────────────────────

  /// Enrol a user in a season.
  fn add_member(
    &self,
    input: NewMember,
  ) -> impl Future<Output = Result<Member, Self::Error>> + Send + '_;

  /// The member page read model: the member with their season and both
  /// counterparts. Cached.
  fn member_profile(
    &self,
    user_id: i64,
    year: i32,
  ) -> impl Future<Output = Result<Option<MemberProfile>, Self::Error>>
  + Send
  + '_;

  fn list_members(
    &self,
    year: i32,
  ) -> impl Future<Output = Result<Vec<Member>, Self::Error>> + Send + '_;

  /// Remove a member. Returns `false` if the row was already gone.
  fn delete_member(
    &self,
    member_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Persist a completed draw in one transaction.
  ///
  /// Fails, leaving no partial state behind, unless every assignment updates
  /// exactly one previously unmatched member of `year`.
  fn assign_giftees(
    &self,
    year: i32,
    assignments: Vec<Assignment>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Set the one-way gift-sent timestamp. Returns `false` if it was already
  /// set (or the member is gone); the timestamp is only ever written once.
  fn mark_gift_sent(
    &self,
    member_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Set the one-way gift-received timestamp. Same contract as
  /// [`ClubStore::mark_gift_sent`].
  fn mark_gift_received(
    &self,
    member_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Stamp the member's last page visit.
  fn touch_last_visit(
    &self,
    member_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Mail ──────────────────────────────────────────────────────────────

  fn add_mail(
    &self,
    input: NewMail,
  ) -> impl Future<Output = Result<Mail, Self::Error>> + Send + '_;

  /// Both directions of the conversation between two members, oldest first.
  /// Cached under the unordered member-id pair.
  fn mails_between(
    &self,
    a: i64,
    b: i64,
  ) -> impl Future<Output = Result<Vec<Mail>, Self::Error>> + Send + '_;

  /// Mark messages from `sender_id` to `recipient_id` sent up to and
  /// including `upto` as read. Already-read messages keep their original
  /// timestamp. Returns how many were newly marked.
  fn mark_mails_read(
    &self,
    recipient_id: i64,
    sender_id: i64,
    upto: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Audit ─────────────────────────────────────────────────────────────

  fn record_audit(
    &self,
    input: NewAuditEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The newest `limit` log lines, newest first.
  fn recent_audit(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send + '_;

  // ── Cache ─────────────────────────────────────────────────────────────

  /// Drop every cached read model. Reads repopulate on demand.
  fn clear_cache(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
