//! [`SqliteStore`] — the SQLite implementation of [`ClubStore`].

use std::{path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use kringle_core::{
  audit::{AuditEntry, NewAuditEntry},
  mail::{Mail, NewMail},
  matching::Assignment,
  member::{Member, MemberProfile, NewMember},
  season::{NewSeason, Season, SeasonPatch, SeasonStats},
  store::ClubStore,
  user::{NewUser, User},
};

use crate::{
  Error, Result,
  cache::{StoreCache, pair_key},
  encode::{
    RawAuditEntry, RawMail, RawMember, RawSeason, RawUser, encode_action,
    encode_date, encode_dt,
  },
  schema::SCHEMA,
};

const MEMBER_COLS: &str = "id, user_id, year, fullname, postcode, address, \
                           giftee_id, gift_sent_at, gift_received_at, \
                           last_visit";
const USER_COLS: &str =
  "id, username, access_token, is_oldfag, is_banned, first_login, last_login";
const SEASON_COLS: &str = "year, signups_start, signups_end, ship_by, gallery";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Kringle club store backed by a single SQLite file.
///
/// Cloning is cheap — the connection and the cache are reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  cache: Arc<StoreCache>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, cache: Arc::new(StoreCache::default()) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, cache: Arc::new(StoreCache::default()) };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

impl ClubStore for SqliteStore {
  type Error = Error;

  // ── Seasons ───────────────────────────────────────────────────────────────

  async fn create_season(&self, input: NewSeason) -> Result<Season> {
    let season = Season {
      year:          input.year,
      signups_start: input.signups_start,
      signups_end:   input.signups_end,
      ship_by:       input.ship_by,
      gallery:       input.gallery,
    };

    let year      = season.year;
    let start_str = encode_date(season.signups_start);
    let end_str   = encode_date(season.signups_end);
    let ship_str  = encode_date(season.ship_by);
    let gallery   = season.gallery.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO seasons (year, signups_start, signups_end, ship_by, \
           gallery) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![year, start_str, end_str, ship_str, gallery],
        )?;
        Ok(())
      })
      .await?;

    Ok(season)
  }

  async fn update_season(
    &self,
    year: i32,
    patch: SeasonPatch,
  ) -> Result<Option<Season>> {
    let start_str = encode_date(patch.signups_start);
    let end_str   = encode_date(patch.signups_end);
    let ship_str  = encode_date(patch.ship_by);
    let gallery   = patch.gallery;

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE seasons SET signups_start = ?2, signups_end = ?3, \
                 ship_by = ?4, gallery = ?5 WHERE year = ?1 \
                 RETURNING {SEASON_COLS}"
              ),
              rusqlite::params![year, start_str, end_str, ship_str, gallery],
              RawSeason::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    // Cached member profiles embed the season row; new dates must reach the
    // phase guards immediately.
    self.cache.seasons.remove(&year);
    self.cache.drop_year_profiles(year);
    raw.map(RawSeason::into_season).transpose()
  }

  async fn get_season(&self, year: i32) -> Result<Option<Season>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SEASON_COLS} FROM seasons WHERE year = ?1"),
              rusqlite::params![year],
              RawSeason::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSeason::into_season).transpose()
  }

  async fn latest_year(&self) -> Result<Option<i32>> {
    let latest = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT MAX(year) FROM seasons", [], |r| {
          r.get::<_, Option<i32>>(0)
        })?)
      })
      .await?;
    Ok(latest)
  }

  async fn season_with_stats(
    &self,
    year: i32,
  ) -> Result<Option<(Season, SeasonStats)>> {
    if let Some(hit) = self.cache.seasons.get(&year) {
      return Ok(Some((**hit).clone()));
    }

    let fetched = self
      .conn
      .call(move |conn| {
        let season = conn
          .query_row(
            &format!("SELECT {SEASON_COLS} FROM seasons WHERE year = ?1"),
            rusqlite::params![year],
            RawSeason::from_row,
          )
          .optional()?;
        let Some(season) = season else { return Ok(None) };

        let stats = conn.query_row(
          "SELECT COUNT(*), COUNT(gift_sent_at), COUNT(gift_received_at) \
           FROM members WHERE year = ?1",
          rusqlite::params![year],
          |r| {
            Ok(SeasonStats {
              members:  r.get(0)?,
              sent:     r.get(1)?,
              received: r.get(2)?,
            })
          },
        )?;

        Ok(Some((season, stats)))
      })
      .await?;

    let Some((raw, stats)) = fetched else { return Ok(None) };
    let entry = (raw.into_season()?, stats);
    self.cache.seasons.insert(year, Arc::new(entry.clone()));
    Ok(Some(entry))
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn upsert_user(&self, input: NewUser) -> Result<User> {
    let NewUser { id, username, access_token } = input;
    let now_str = encode_dt(Utc::now());

    let (old_token, raw) = self
      .conn
      .call(move |conn| {
        let old_token: Option<String> = conn
          .query_row(
            "SELECT access_token FROM users WHERE id = ?1",
            rusqlite::params![id],
            |r| r.get(0),
          )
          .optional()?;

        let raw = conn.query_row(
          &format!(
            "INSERT INTO users (id, username, access_token, is_oldfag, \
             is_banned, first_login, last_login) \
             VALUES (?1, ?2, ?3, 0, 0, ?4, ?4) \
             ON CONFLICT (id) DO UPDATE SET \
               username     = excluded.username, \
               access_token = excluded.access_token, \
               last_login   = excluded.last_login \
             RETURNING {USER_COLS}"
          ),
          rusqlite::params![id, username, access_token, now_str],
          RawUser::from_row,
        )?;

        Ok((old_token, raw))
      })
      .await?;

    // A rotated token must stop resolving immediately.
    if let Some(old) = old_token {
      self.cache.tokens.remove(&old);
    }
    raw.into_user()
  }

  async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
              rusqlite::params![user_id],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn get_user_by_username(
    &self,
    username: String,
  ) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {USER_COLS} FROM users \
                 WHERE username = ?1 COLLATE NOCASE"
              ),
              rusqlite::params![username],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn get_user_by_token(&self, token: String) -> Result<Option<User>> {
    if let Some(hit) = self.cache.tokens.get(&token) {
      return Ok(Some((**hit).clone()));
    }

    let key = token.clone();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLS} FROM users WHERE access_token = ?1"),
              rusqlite::params![token],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    let Some(user) = raw.map(RawUser::into_user).transpose()? else {
      return Ok(None);
    };
    self.cache.tokens.insert(key, Arc::new(user.clone()));
    Ok(Some(user))
  }

  async fn set_banned(
    &self,
    user_id: i64,
    banned: bool,
  ) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE users SET is_banned = ?2 WHERE id = ?1 \
                 RETURNING {USER_COLS}"
              ),
              rusqlite::params![user_id, banned],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    if let Some(raw) = &raw {
      self.cache.tokens.remove(&raw.access_token);
    }
    raw.map(RawUser::into_user).transpose()
  }

  async fn clear_token(&self, user_id: i64) -> Result<bool> {
    let old_token: Option<String> = self
      .conn
      .call(move |conn| {
        let old: Option<String> = conn
          .query_row(
            "SELECT access_token FROM users WHERE id = ?1",
            rusqlite::params![user_id],
            |r| r.get(0),
          )
          .optional()?;
        if old.as_deref().is_some_and(|t| !t.is_empty()) {
          conn.execute(
            "UPDATE users SET access_token = '' WHERE id = ?1",
            rusqlite::params![user_id],
          )?;
        }
        Ok(old)
      })
      .await?;

    match old_token {
      Some(old) if !old.is_empty() => {
        self.cache.tokens.remove(&old);
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  // ── Members ───────────────────────────────────────────────────────────────

  async fn add_member(&self, input: NewMember) -> Result<Member> {
    let NewMember { user_id, year, fullname, postcode, address } = input;
    let now_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "INSERT INTO members (user_id, year, fullname, postcode, \
             address, last_visit) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             RETURNING {MEMBER_COLS}"
          ),
          rusqlite::params![user_id, year, fullname, postcode, address, now_str],
          RawMember::from_row,
        )?)
      })
      .await?;

    self.cache.seasons.remove(&year);
    raw.into_member()
  }

  async fn member_profile(
    &self,
    user_id: i64,
    year: i32,
  ) -> Result<Option<MemberProfile>> {
    let key = (user_id, year);
    if let Some(hit) = self.cache.profiles.get(&key) {
      return Ok(Some((**hit).clone()));
    }

    let fetched = self
      .conn
      .call(move |conn| {
        let member = conn
          .query_row(
            &format!(
              "SELECT {MEMBER_COLS} FROM members \
               WHERE user_id = ?1 AND year = ?2"
            ),
            rusqlite::params![user_id, year],
            RawMember::from_row,
          )
          .optional()?;
        let Some(member) = member else { return Ok(None) };

        let season = conn.query_row(
          &format!("SELECT {SEASON_COLS} FROM seasons WHERE year = ?1"),
          rusqlite::params![year],
          RawSeason::from_row,
        )?;

        let giftee = match member.giftee_id {
          Some(giftee_id) => conn
            .query_row(
              &format!("SELECT {MEMBER_COLS} FROM members WHERE id = ?1"),
              rusqlite::params![giftee_id],
              RawMember::from_row,
            )
            .optional()?,
          None => None,
        };

        let santa = conn
          .query_row(
            &format!("SELECT {MEMBER_COLS} FROM members WHERE giftee_id = ?1"),
            rusqlite::params![member.id],
            RawMember::from_row,
          )
          .optional()?;

        Ok(Some((member, season, giftee, santa)))
      })
      .await?;

    let Some((member, season, giftee, santa)) = fetched else {
      return Ok(None);
    };
    let profile = MemberProfile {
      member: member.into_member()?,
      season: season.into_season()?,
      giftee: giftee.map(RawMember::into_member).transpose()?,
      santa:  santa.map(RawMember::into_member).transpose()?,
    };
    self.cache.profiles.insert(key, Arc::new(profile.clone()));
    Ok(Some(profile))
  }

  async fn list_members(&self, year: i32) -> Result<Vec<Member>> {
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MEMBER_COLS} FROM members WHERE year = ?1 ORDER BY id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![year], RawMember::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawMember::into_member).collect()
  }

  async fn delete_member(&self, member_id: i64) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "DELETE FROM members WHERE id = ?1 RETURNING user_id, year",
              rusqlite::params![member_id],
              |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i32>(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    let Some((user_id, year)) = deleted else { return Ok(false) };
    self.cache.profiles.remove(&(user_id, year));
    self.cache.seasons.remove(&year);
    Ok(true)
  }

  async fn assign_giftees(
    &self,
    year: i32,
    assignments: Vec<Assignment>,
  ) -> Result<()> {
    let conflict = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for a in &assignments {
          let changed = tx.execute(
            "UPDATE members SET giftee_id = ?3 \
             WHERE id = ?1 AND year = ?2 AND giftee_id IS NULL",
            rusqlite::params![a.member_id, year, a.giftee_id],
          )?;
          if changed != 1 {
            // Dropping the transaction rolls everything back.
            return Ok(Some(a.member_id));
          }
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    if let Some(member_id) = conflict {
      return Err(Error::AssignmentConflict(member_id));
    }
    self.cache.drop_year_profiles(year);
    self.cache.seasons.remove(&year);
    Ok(())
  }

  async fn mark_gift_sent(&self, member_id: i64) -> Result<bool> {
    let now_str = encode_dt(Utc::now());
    let applied = self
      .conn
      .call(move |conn| {
        let updated = conn
          .query_row(
            "UPDATE members SET gift_sent_at = ?2 \
             WHERE id = ?1 AND gift_sent_at IS NULL \
             RETURNING user_id, year, giftee_id",
            rusqlite::params![member_id, now_str],
            |r| {
              Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, i32>(1)?,
                r.get::<_, Option<i64>>(2)?,
              ))
            },
          )
          .optional()?;
        let Some((user_id, year, giftee_id)) = updated else {
          return Ok(None);
        };

        // The giftee's page shows the santa pane flag; find their user.
        let giftee_user: Option<i64> = match giftee_id {
          Some(giftee_id) => conn
            .query_row(
              "SELECT user_id FROM members WHERE id = ?1",
              rusqlite::params![giftee_id],
              |r| r.get(0),
            )
            .optional()?,
          None => None,
        };

        Ok(Some((user_id, year, giftee_user)))
      })
      .await?;

    let Some((user_id, year, giftee_user)) = applied else {
      return Ok(false);
    };
    self.cache.profiles.remove(&(user_id, year));
    if let Some(giftee_user) = giftee_user {
      self.cache.profiles.remove(&(giftee_user, year));
    }
    self.cache.seasons.remove(&year);
    Ok(true)
  }

  async fn mark_gift_received(&self, member_id: i64) -> Result<bool> {
    let now_str = encode_dt(Utc::now());
    let applied = self
      .conn
      .call(move |conn| {
        let updated = conn
          .query_row(
            "UPDATE members SET gift_received_at = ?2 \
             WHERE id = ?1 AND gift_received_at IS NULL \
             RETURNING user_id, year",
            rusqlite::params![member_id, now_str],
            |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i32>(1)?)),
          )
          .optional()?;
        let Some((user_id, year)) = updated else { return Ok(None) };

        // The santa's page shows the giftee pane flag; find their user.
        let santa_user: Option<i64> = conn
          .query_row(
            "SELECT user_id FROM members WHERE giftee_id = ?1",
            rusqlite::params![member_id],
            |r| r.get(0),
          )
          .optional()?;

        Ok(Some((user_id, year, santa_user)))
      })
      .await?;

    let Some((user_id, year, santa_user)) = applied else { return Ok(false) };
    self.cache.profiles.remove(&(user_id, year));
    if let Some(santa_user) = santa_user {
      self.cache.profiles.remove(&(santa_user, year));
    }
    self.cache.seasons.remove(&year);
    Ok(true)
  }

  async fn touch_last_visit(&self, member_id: i64) -> Result<()> {
    let now_str = encode_dt(Utc::now());
    let keys = self
      .conn
      .call(move |conn| {
        let updated = conn
          .query_row(
            "UPDATE members SET last_visit = ?2 WHERE id = ?1 \
             RETURNING user_id, year, giftee_id",
            rusqlite::params![member_id, now_str],
            |r| {
              Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, i32>(1)?,
                r.get::<_, Option<i64>>(2)?,
              ))
            },
          )
          .optional()?;
        let Some((user_id, year, giftee_id)) = updated else {
          return Ok(Vec::new());
        };

        // Both counterparts display this member's last visit.
        let mut keys = vec![(user_id, year)];
        if let Some(giftee_id) = giftee_id {
          let giftee_user: Option<i64> = conn
            .query_row(
              "SELECT user_id FROM members WHERE id = ?1",
              rusqlite::params![giftee_id],
              |r| r.get(0),
            )
            .optional()?;
          if let Some(giftee_user) = giftee_user {
            keys.push((giftee_user, year));
          }
        }
        let santa_user: Option<i64> = conn
          .query_row(
            "SELECT user_id FROM members WHERE giftee_id = ?1",
            rusqlite::params![member_id],
            |r| r.get(0),
          )
          .optional()?;
        if let Some(santa_user) = santa_user {
          keys.push((santa_user, year));
        }

        Ok(keys)
      })
      .await?;

    for key in keys {
      self.cache.profiles.remove(&key);
    }
    Ok(())
  }

  // ── Mail ──────────────────────────────────────────────────────────────────

  async fn add_mail(&self, input: NewMail) -> Result<Mail> {
    let NewMail { sender_id, recipient_id, body } = input;
    let sent_at = Utc::now();
    let at_str  = encode_dt(sent_at);

    let body_arg = body.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO mails (sender_id, recipient_id, body, sent_at) \
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![sender_id, recipient_id, body_arg, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    self.cache.mailboxes.remove(&pair_key(sender_id, recipient_id));
    Ok(Mail { id, sender_id, recipient_id, body, sent_at, read_at: None })
  }

  async fn mails_between(&self, a: i64, b: i64) -> Result<Vec<Mail>> {
    let key = pair_key(a, b);
    if let Some(hit) = self.cache.mailboxes.get(&key) {
      return Ok((**hit).clone());
    }

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, sender_id, recipient_id, body, sent_at, read_at \
           FROM mails \
           WHERE (sender_id = ?1 AND recipient_id = ?2) \
              OR (sender_id = ?2 AND recipient_id = ?1) \
           ORDER BY sent_at, id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![a, b], RawMail::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mails = raws
      .into_iter()
      .map(RawMail::into_mail)
      .collect::<Result<Vec<_>>>()?;
    self.cache.mailboxes.insert(key, Arc::new(mails.clone()));
    Ok(mails)
  }

  async fn mark_mails_read(
    &self,
    recipient_id: i64,
    sender_id: i64,
    upto: DateTime<Utc>,
  ) -> Result<usize> {
    let upto_str = encode_dt(upto);
    let now_str  = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE mails SET read_at = ?4 \
           WHERE recipient_id = ?1 AND sender_id = ?2 \
             AND read_at IS NULL AND sent_at <= ?3",
          rusqlite::params![recipient_id, sender_id, upto_str, now_str],
        )?)
      })
      .await?;

    self.cache.mailboxes.remove(&pair_key(recipient_id, sender_id));
    Ok(changed)
  }

  // ── Audit ─────────────────────────────────────────────────────────────────

  async fn record_audit(&self, input: NewAuditEntry) -> Result<()> {
    let NewAuditEntry { action, actor, target_user, year, ip } = input;
    let action_str = encode_action(action).to_owned();
    let at_str     = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO audit_log (action, actor, target_user, year, ip, at) \
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![action_str, actor, target_user, year, ip, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn recent_audit(&self, limit: usize) -> Result<Vec<AuditEntry>> {
    // A limit beyond i64 would wrap negative, which SQLite reads as "all".
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, action, actor, target_user, year, ip, at \
           FROM audit_log ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], RawAuditEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawAuditEntry::into_entry).collect()
  }

  // ── Cache ─────────────────────────────────────────────────────────────────

  async fn clear_cache(&self) -> Result<()> {
    self.cache.clear();
    Ok(())
  }
}
