//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use kringle_core::{
  audit::{AuditAction, NewAuditEntry},
  mail::NewMail,
  matching::Assignment,
  member::{Member, NewMember},
  season::{NewSeason, SeasonPatch},
  store::ClubStore,
  user::{NewUser, User},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn season_input(year: i32) -> NewSeason {
  NewSeason {
    year,
    signups_start: date(year, 11, 1),
    signups_end:   date(year, 12, 10),
    ship_by:       date(year, 12, 24),
    gallery:       None,
  }
}

async fn seed_user(s: &SqliteStore, id: i64, username: &str) -> User {
  s.upsert_user(NewUser {
    id,
    username: username.into(),
    access_token: format!("token-{id}"),
  })
  .await
  .unwrap()
}

async fn seed_member(s: &SqliteStore, user_id: i64, year: i32) -> Member {
  s.add_member(NewMember {
    user_id,
    year,
    fullname: format!("Member {user_id}"),
    postcode: "10178".into(),
    address: "Alexanderplatz 1".into(),
  })
  .await
  .unwrap()
}

/// Season 2026 with three enrolled members, returned in user-id order.
async fn seed_trio(s: &SqliteStore) -> (Member, Member, Member) {
  s.create_season(season_input(2026)).await.unwrap();
  seed_user(s, 1, "alice").await;
  seed_user(s, 2, "bob").await;
  seed_user(s, 3, "carol").await;
  let a = seed_member(s, 1, 2026).await;
  let b = seed_member(s, 2, 2026).await;
  let c = seed_member(s, 3, 2026).await;
  (a, b, c)
}

fn pair(member_id: i64, giftee_id: i64) -> Assignment {
  Assignment { member_id, giftee_id }
}

// ─── Seasons ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_season() {
  let s = store().await;

  let created = s.create_season(season_input(2026)).await.unwrap();
  assert_eq!(created.year, 2026);

  let fetched = s.get_season(2026).await.unwrap().unwrap();
  assert_eq!(fetched, created);
  assert!(s.get_season(1999).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_year_is_rejected() {
  let s = store().await;
  s.create_season(season_input(2026)).await.unwrap();

  let err = s.create_season(season_input(2026)).await.unwrap_err();
  assert!(matches!(err, Error::Database(_)));
}

#[tokio::test]
async fn update_season_replaces_dates() {
  let s = store().await;
  s.create_season(season_input(2026)).await.unwrap();

  let patch = SeasonPatch {
    signups_start: date(2026, 11, 5),
    signups_end:   date(2026, 12, 15),
    ship_by:       date(2026, 12, 30),
    gallery:       Some("https://example.org/2026".into()),
  };
  let updated = s.update_season(2026, patch.clone()).await.unwrap().unwrap();
  assert_eq!(updated.signups_end, date(2026, 12, 15));
  assert_eq!(updated.gallery.as_deref(), Some("https://example.org/2026"));

  assert!(s.update_season(1999, patch).await.unwrap().is_none());
}

#[tokio::test]
async fn season_edits_reach_cached_member_profiles() {
  let s = store().await;
  s.create_season(season_input(2026)).await.unwrap();
  seed_user(&s, 1, "alice").await;
  seed_member(&s, 1, 2026).await;

  // Prime the profile cache, then move the dates.
  let before = s.member_profile(1, 2026).await.unwrap().unwrap();
  assert_eq!(before.season.signups_end, date(2026, 12, 10));

  s.update_season(2026, SeasonPatch {
    signups_start: date(2026, 11, 1),
    signups_end:   date(2026, 12, 5),
    ship_by:       date(2026, 12, 24),
    gallery:       None,
  })
  .await
  .unwrap();

  let after = s.member_profile(1, 2026).await.unwrap().unwrap();
  assert_eq!(after.season.signups_end, date(2026, 12, 5));
}

#[tokio::test]
async fn latest_year_tracks_the_newest_season() {
  let s = store().await;
  assert_eq!(s.latest_year().await.unwrap(), None);

  s.create_season(season_input(2025)).await.unwrap();
  s.create_season(season_input(2026)).await.unwrap();
  assert_eq!(s.latest_year().await.unwrap(), Some(2026));
}

#[tokio::test]
async fn season_stats_stay_fresh_across_enrolment() {
  let s = store().await;
  s.create_season(season_input(2026)).await.unwrap();
  seed_user(&s, 1, "alice").await;
  seed_user(&s, 2, "bob").await;

  let (_, stats) = s.season_with_stats(2026).await.unwrap().unwrap();
  assert_eq!(stats.members, 0);

  // The earlier read is cached; enrolment must invalidate it.
  let a = seed_member(&s, 1, 2026).await;
  let b = seed_member(&s, 2, 2026).await;
  let (_, stats) = s.season_with_stats(2026).await.unwrap().unwrap();
  assert_eq!(stats.members, 2);

  s.assign_giftees(2026, vec![pair(a.id, b.id), pair(b.id, a.id)])
    .await
    .unwrap();
  s.mark_gift_sent(a.id).await.unwrap();
  s.mark_gift_received(b.id).await.unwrap();

  let (_, stats) = s.season_with_stats(2026).await.unwrap().unwrap();
  assert_eq!(stats.sent, 1);
  assert_eq!(stats.received, 1);
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_preserves_identity_and_rotates_token() {
  let s = store().await;

  let first = seed_user(&s, 7, "alice").await;
  let second = s
    .upsert_user(NewUser {
      id: 7,
      username: "renamed".into(),
      access_token: "fresh-token".into(),
    })
    .await
    .unwrap();

  assert_eq!(second.id, 7);
  // The provider owns the username; a rename lands on the next login.
  assert_eq!(second.username, "renamed");
  assert_eq!(second.access_token, "fresh-token");
  assert_eq!(second.first_login, first.first_login);
  assert!(second.last_login >= first.last_login);
}

#[tokio::test]
async fn rotated_tokens_stop_resolving() {
  let s = store().await;
  seed_user(&s, 7, "alice").await;

  // Prime the token cache, then rotate.
  assert!(s.get_user_by_token("token-7".into()).await.unwrap().is_some());
  s.upsert_user(NewUser {
    id: 7,
    username: "alice".into(),
    access_token: "fresh-token".into(),
  })
  .await
  .unwrap();

  assert!(s.get_user_by_token("token-7".into()).await.unwrap().is_none());
  let user = s
    .get_user_by_token("fresh-token".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(user.id, 7);
}

#[tokio::test]
async fn username_lookup_ignores_case() {
  let s = store().await;
  seed_user(&s, 7, "Alice").await;

  let user = s.get_user_by_username("alice".into()).await.unwrap().unwrap();
  assert_eq!(user.id, 7);
  assert!(s.get_user_by_username("bob".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn ban_flag_reaches_cached_token_resolution() {
  let s = store().await;
  seed_user(&s, 7, "alice").await;
  assert!(s.get_user_by_token("token-7".into()).await.unwrap().is_some());

  let banned = s.set_banned(7, true).await.unwrap().unwrap();
  assert!(banned.is_banned);

  let resolved = s.get_user_by_token("token-7".into()).await.unwrap().unwrap();
  assert!(resolved.is_banned);

  assert!(s.set_banned(99, true).await.unwrap().is_none());
}

#[tokio::test]
async fn cleared_tokens_stop_resolving() {
  let s = store().await;
  seed_user(&s, 7, "alice").await;
  assert!(s.get_user_by_token("token-7".into()).await.unwrap().is_some());

  assert!(s.clear_token(7).await.unwrap());
  assert!(s.get_user_by_token("token-7".into()).await.unwrap().is_none());

  // Already blank, and unknown ids, both report nothing to do.
  assert!(!s.clear_token(7).await.unwrap());
  assert!(!s.clear_token(99).await.unwrap());
}

// ─── Members ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn enrolling_twice_in_one_season_is_rejected() {
  let s = store().await;
  s.create_season(season_input(2026)).await.unwrap();
  seed_user(&s, 1, "alice").await;
  seed_member(&s, 1, 2026).await;

  let err = s
    .add_member(NewMember {
      user_id:  1,
      year:     2026,
      fullname: "Alice Again".into(),
      postcode: "10178".into(),
      address:  "Alexanderplatz 1".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Database(_)));
}

#[tokio::test]
async fn member_profile_composes_season_and_counterparts() {
  let s = store().await;
  let (a, b, c) = seed_trio(&s).await;

  assert!(s.member_profile(99, 2026).await.unwrap().is_none());

  let before = s.member_profile(2, 2026).await.unwrap().unwrap();
  assert_eq!(before.season.year, 2026);
  assert!(before.giftee.is_none());
  assert!(before.santa.is_none());

  s.assign_giftees(
    2026,
    vec![pair(a.id, b.id), pair(b.id, c.id), pair(c.id, a.id)],
  )
  .await
  .unwrap();

  let after = s.member_profile(2, 2026).await.unwrap().unwrap();
  assert_eq!(after.giftee.as_ref().unwrap().id, c.id);
  assert_eq!(after.santa.as_ref().unwrap().id, a.id);
}

#[tokio::test]
async fn delete_member_reports_whether_a_row_went() {
  let s = store().await;
  s.create_season(season_input(2026)).await.unwrap();
  seed_user(&s, 1, "alice").await;
  let member = seed_member(&s, 1, 2026).await;

  assert!(s.delete_member(member.id).await.unwrap());
  assert!(!s.delete_member(member.id).await.unwrap());
  assert!(s.member_profile(1, 2026).await.unwrap().is_none());
}

// ─── Matching ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn assign_giftees_links_every_member() {
  let s = store().await;
  let (a, b, c) = seed_trio(&s).await;

  s.assign_giftees(
    2026,
    vec![pair(a.id, b.id), pair(b.id, c.id), pair(c.id, a.id)],
  )
  .await
  .unwrap();

  let members = s.list_members(2026).await.unwrap();
  assert!(members.iter().all(|m| m.giftee_id.is_some()));
}

#[tokio::test]
async fn a_conflicting_draw_leaves_no_partial_state() {
  let s = store().await;
  let (a, b, c) = seed_trio(&s).await;

  // c is already matched; a full re-draw must now fail entirely.
  s.assign_giftees(2026, vec![pair(c.id, a.id)]).await.unwrap();

  let err = s
    .assign_giftees(
      2026,
      vec![pair(a.id, b.id), pair(b.id, c.id), pair(c.id, a.id)],
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::AssignmentConflict(id) if id == c.id));

  // a and b were updated before the conflict; the rollback undid them.
  let members = s.list_members(2026).await.unwrap();
  let giftee_of = |id: i64| {
    members.iter().find(|m| m.id == id).unwrap().giftee_id
  };
  assert_eq!(giftee_of(a.id), None);
  assert_eq!(giftee_of(b.id), None);
  assert_eq!(giftee_of(c.id), Some(a.id));
}

// ─── Gifts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn gift_flags_fire_exactly_once() {
  let s = store().await;
  s.create_season(season_input(2026)).await.unwrap();
  seed_user(&s, 1, "alice").await;
  let member = seed_member(&s, 1, 2026).await;

  assert!(s.mark_gift_sent(member.id).await.unwrap());
  assert!(!s.mark_gift_sent(member.id).await.unwrap());
  assert!(s.mark_gift_received(member.id).await.unwrap());
  assert!(!s.mark_gift_received(member.id).await.unwrap());
  assert!(!s.mark_gift_sent(9999).await.unwrap());

  let profile = s.member_profile(1, 2026).await.unwrap().unwrap();
  assert!(profile.member.is_gift_sent());
  assert!(profile.member.is_gift_received());
}

#[tokio::test]
async fn gift_flags_reach_the_counterpart_profile() {
  let s = store().await;
  s.create_season(season_input(2026)).await.unwrap();
  seed_user(&s, 1, "alice").await;
  seed_user(&s, 2, "bob").await;
  let a = seed_member(&s, 1, 2026).await;
  let b = seed_member(&s, 2, 2026).await;
  s.assign_giftees(2026, vec![pair(a.id, b.id), pair(b.id, a.id)])
    .await
    .unwrap();

  // Prime b's cached profile, then flip a's sent flag.
  let before = s.member_profile(2, 2026).await.unwrap().unwrap();
  assert!(!before.santa.as_ref().unwrap().is_gift_sent());

  s.mark_gift_sent(a.id).await.unwrap();

  let after = s.member_profile(2, 2026).await.unwrap().unwrap();
  assert!(after.santa.as_ref().unwrap().is_gift_sent());
}

#[tokio::test]
async fn touch_last_visit_refreshes_counterpart_views() {
  let s = store().await;
  s.create_season(season_input(2026)).await.unwrap();
  seed_user(&s, 1, "alice").await;
  seed_user(&s, 2, "bob").await;
  let a = seed_member(&s, 1, 2026).await;
  let b = seed_member(&s, 2, 2026).await;
  s.assign_giftees(2026, vec![pair(a.id, b.id), pair(b.id, a.id)])
    .await
    .unwrap();

  let before = s.member_profile(2, 2026).await.unwrap().unwrap();
  tokio::time::sleep(std::time::Duration::from_millis(10)).await;
  s.touch_last_visit(a.id).await.unwrap();

  let after = s.member_profile(2, 2026).await.unwrap().unwrap();
  assert!(
    after.santa.as_ref().unwrap().last_visit
      > before.santa.as_ref().unwrap().last_visit
  );
}

// ─── Mail ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn conversations_interleave_both_directions() {
  let s = store().await;
  s.create_season(season_input(2026)).await.unwrap();
  seed_user(&s, 1, "alice").await;
  seed_user(&s, 2, "bob").await;
  let a = seed_member(&s, 1, 2026).await;
  let b = seed_member(&s, 2, 2026).await;

  let m1 = s
    .add_mail(NewMail {
      sender_id:    a.id,
      recipient_id: b.id,
      body: "hello".into(),
    })
    .await
    .unwrap();
  let m2 = s
    .add_mail(NewMail {
      sender_id:    b.id,
      recipient_id: a.id,
      body: "hi back".into(),
    })
    .await
    .unwrap();

  // Same conversation regardless of argument order; cached after first read.
  let mails = s.mails_between(a.id, b.id).await.unwrap();
  assert_eq!(mails.iter().map(|m| m.id).collect::<Vec<_>>(), vec![
    m1.id, m2.id
  ]);
  let mails = s.mails_between(b.id, a.id).await.unwrap();
  assert_eq!(mails.len(), 2);

  // A new message must invalidate the cached conversation.
  s.add_mail(NewMail {
    sender_id:    a.id,
    recipient_id: b.id,
    body: "one more".into(),
  })
  .await
  .unwrap();
  assert_eq!(s.mails_between(a.id, b.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn mark_mails_read_is_bounded_and_idempotent() {
  let s = store().await;
  s.create_season(season_input(2026)).await.unwrap();
  seed_user(&s, 1, "alice").await;
  seed_user(&s, 2, "bob").await;
  let a = seed_member(&s, 1, 2026).await;
  let b = seed_member(&s, 2, 2026).await;

  for body in ["first", "second"] {
    s.add_mail(NewMail {
      sender_id:    b.id,
      recipient_id: a.id,
      body: body.into(),
    })
    .await
    .unwrap();
  }
  let upto = s.mails_between(a.id, b.id).await.unwrap()[1].sent_at;

  // Sent after the cutoff the reader saw; must stay unread.
  s.add_mail(NewMail {
    sender_id:    b.id,
    recipient_id: a.id,
    body: "third".into(),
  })
  .await
  .unwrap();

  assert_eq!(s.mark_mails_read(a.id, b.id, upto).await.unwrap(), 2);
  assert_eq!(s.mark_mails_read(a.id, b.id, upto).await.unwrap(), 0);

  let mails = s.mails_between(a.id, b.id).await.unwrap();
  assert!(mails[0].read_at.is_some());
  assert!(mails[1].read_at.is_some());
  assert!(mails[2].read_at.is_none());
}

// ─── Audit ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn audit_log_returns_newest_first() {
  let s = store().await;

  for (action, actor) in [
    (AuditAction::LoggedIn, 1),
    (AuditAction::Enrolled, 1),
    (AuditAction::GiftSent, 2),
  ] {
    s.record_audit(NewAuditEntry {
      action,
      actor: Some(actor),
      target_user: None,
      year: Some(2026),
      ip: Some("127.0.0.1".into()),
    })
    .await
    .unwrap();
  }

  let entries = s.recent_audit(2).await.unwrap();
  assert_eq!(entries.len(), 2);
  assert_eq!(entries[0].action, AuditAction::GiftSent);
  assert_eq!(entries[1].action, AuditAction::Enrolled);
  assert_eq!(entries[1].year, Some(2026));

  // An oversized limit reads everything rather than nothing.
  assert_eq!(s.recent_audit(usize::MAX).await.unwrap().len(), 3);
}

// ─── Cache ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn clear_cache_keeps_serving_reads() {
  let s = store().await;
  s.create_season(season_input(2026)).await.unwrap();
  seed_user(&s, 1, "alice").await;
  seed_member(&s, 1, 2026).await;

  let season_before = s.season_with_stats(2026).await.unwrap().unwrap();
  let profile_before = s.member_profile(1, 2026).await.unwrap().unwrap();

  s.clear_cache().await.unwrap();

  let season_after = s.season_with_stats(2026).await.unwrap().unwrap();
  let profile_after = s.member_profile(1, 2026).await.unwrap().unwrap();
  assert_eq!(season_after.0, season_before.0);
  assert_eq!(profile_after.member, profile_before.member);
}
