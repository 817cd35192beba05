use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use kringle_core::{
  Error, Result,
  audit::{AuditAction, AuditEntry, NewAuditEntry},
  error::Ineligibility,
  mail::{self, ChatPane, ChatState, Mail, MailSide, NewMail},
  matching,
  member::{Member, MemberProfile, NewMember, SignupForm},
  notify::{Notification, Notifier, ProfileProvider},
  season::{NewSeason, Season, SeasonPatch, SeasonRef, SeasonSummary},
  store::ClubStore,
  user::{NewUser, User},
};
use tracing::{debug, info, warn};

/// What a completed login hands back to the HTTP layer.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
  pub user:            User,
  /// Whether the participation gate passed at login time. Advisory: the gate
  /// is re-checked at signup.
  pub can_participate: bool,
}

/// What a completed draw reports back to the admin.
#[derive(Debug, Clone, Copy)]
pub struct MatchReport {
  pub year:    i32,
  pub members: usize,
}

/// The club itself: every operation the HTTP layer exposes, with its guards,
/// audit trail and notifications in one place.
///
/// Generic over the store and the identity provider so tests can swap either
/// side out. Cloning is cheap; all state is behind [`Arc`]s.
pub struct ClubService<S, P> {
  store:       Arc<S>,
  provider:    Arc<P>,
  notifier:    Arc<dyn Notifier>,
  /// Minimum provider karma for participation, unless a badge or veteran
  /// status vouches for the user instead.
  karma_limit: f64,
}

impl<S, P> Clone for ClubService<S, P> {
  fn clone(&self) -> Self {
    Self {
      store:       Arc::clone(&self.store),
      provider:    Arc::clone(&self.provider),
      notifier:    Arc::clone(&self.notifier),
      karma_limit: self.karma_limit,
    }
  }
}

impl<S, P> ClubService<S, P>
where
  S: ClubStore,
  P: ProfileProvider,
{
  pub fn new(
    store: Arc<S>,
    provider: Arc<P>,
    notifier: Arc<dyn Notifier>,
    karma_limit: f64,
  ) -> Self {
    Self { store, provider, notifier, karma_limit }
  }

  /// The calendar date every phase check runs against.
  fn today() -> NaiveDate { Utc::now().date_naive() }

  // ─── Login & auth ──────────────────────────────────────────────────────────

  /// Complete a provider login: exchange the redirect code for a token, pull
  /// the profile behind it, and upsert the local user. The returned token is
  /// the caller's bearer credential until their next login rotates it.
  pub async fn login(
    &self,
    code: &str,
    ip: Option<String>,
  ) -> Result<LoginOutcome> {
    let token = self.provider.exchange_code(code).await?;
    let identity = self.provider.fetch_profile(&token).await?;

    let previous = self
      .store
      .get_user(identity.id)
      .await
      .map_err(Error::store)?;
    let user = self
      .store
      .upsert_user(NewUser {
        id:           identity.id,
        username:     identity.username,
        access_token: token,
      })
      .await
      .map_err(Error::store)?;
    if let Some(previous) = previous
      && previous.access_token != user.access_token
    {
      debug!(user = user.id, "access token rotated");
    }

    self
      .audit(NewAuditEntry {
        action:      AuditAction::LoggedIn,
        actor:       Some(user.id),
        target_user: None,
        year:        None,
        ip,
      })
      .await;

    let can_participate =
      user.can_participate(&identity.profile, self.karma_limit);
    Ok(LoginOutcome { user, can_participate })
  }

  /// Resolve a bearer token to its user. `None` means the token is unknown
  /// (or has been rotated away by a newer login).
  pub async fn authenticate(&self, token: &str) -> Result<Option<User>> {
    if token.is_empty() {
      return Ok(None);
    }
    let user = self
      .store
      .get_user_by_token(token.to_owned())
      .await
      .map_err(Error::store)?;
    Ok(user)
  }

  /// Blank the caller's token so it stops resolving. Idempotent; logging out
  /// twice is not an error.
  pub async fn logout(&self, user: &User, ip: Option<String>) -> Result<()> {
    let cleared =
      self.store.clear_token(user.id).await.map_err(Error::store)?;
    if cleared {
      self
        .audit(NewAuditEntry {
          action:      AuditAction::LoggedOut,
          actor:       Some(user.id),
          target_user: None,
          year:        None,
          ip,
        })
        .await;
    }
    Ok(())
  }

  // ─── Seasons ───────────────────────────────────────────────────────────────

  /// The public season card.
  pub async fn season_summary(
    &self,
    season: SeasonRef,
  ) -> Result<SeasonSummary> {
    let year = self.resolve_year(season).await?;
    let (season, stats) = self
      .store
      .season_with_stats(year)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::SeasonNotFound(year.to_string()))?;
    Ok(SeasonSummary::build(&season, stats, Self::today()))
  }

  pub async fn create_season(&self, input: NewSeason) -> Result<Season> {
    input.validate()?;
    if self
      .store
      .get_season(input.year)
      .await
      .map_err(Error::store)?
      .is_some()
    {
      return Err(Error::Validation(format!(
        "season {} already exists",
        input.year
      )));
    }
    let season = self.store.create_season(input).await.map_err(Error::store)?;
    info!(year = season.year, "season created");
    Ok(season)
  }

  /// Change the dates or gallery of a season. Archived seasons are part of
  /// the historical record and no longer editable.
  pub async fn update_season(
    &self,
    year: i32,
    patch: SeasonPatch,
  ) -> Result<Season> {
    patch.validate()?;
    let existing = self.get_season(year).await?;
    if existing.is_closed(Self::today()) {
      return Err(Ineligibility::SeasonClosed.into());
    }
    self
      .store
      .update_season(year, patch)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::SeasonNotFound(year.to_string()))
  }

  // ─── Membership ────────────────────────────────────────────────────────────

  /// The member page. Reading it counts as a visit, which the viewer's
  /// counterparts can see.
  pub async fn member_page(
    &self,
    user: &User,
    season: SeasonRef,
  ) -> Result<MemberProfile> {
    let profile = self.profile_of(user, season).await?;
    self
      .store
      .touch_last_visit(profile.member.id)
      .await
      .map_err(Error::store)?;
    Ok(profile)
  }

  /// Enrol `user` in a season.
  pub async fn signup(
    &self,
    user: &User,
    season: SeasonRef,
    form: SignupForm,
    ip: Option<String>,
  ) -> Result<MemberProfile> {
    let year = self.resolve_year(season).await?;
    let season = self.get_season(year).await?;
    if !season.is_participatable(Self::today()) {
      return Err(Ineligibility::SignupsClosed.into());
    }
    if self
      .store
      .member_profile(user.id, year)
      .await
      .map_err(Error::store)?
      .is_some()
    {
      return Err(Ineligibility::AlreadyRegistered.into());
    }

    // The gate runs against a fresh profile, not the one seen at login, so a
    // ban or karma drop since then still counts.
    let identity = self.provider.fetch_profile(&user.access_token).await?;
    if !user.can_participate(&identity.profile, self.karma_limit) {
      return Err(Ineligibility::NotInvited.into());
    }

    let form = form.validate()?;
    self
      .store
      .add_member(NewMember {
        user_id:  user.id,
        year,
        fullname: form.fullname,
        postcode: form.postcode,
        address:  form.address,
      })
      .await
      .map_err(Error::store)?;

    self
      .audit(NewAuditEntry {
        action:      AuditAction::Enrolled,
        actor:       Some(user.id),
        target_user: None,
        year:        Some(year),
        ip,
      })
      .await;

    self.profile_of(user, SeasonRef::Year(year)).await
  }

  /// Leave a season. Allowed only while signups are open and the draw has
  /// not run; after that the member is somebody's giftee.
  pub async fn signout(
    &self,
    user: &User,
    season: SeasonRef,
    ip: Option<String>,
  ) -> Result<()> {
    let profile = self.profile_of(user, season).await?;
    if profile.member.is_matched() || profile.santa.is_some() {
      return Err(Ineligibility::AlreadyMatched.into());
    }
    if !profile.season.is_participatable(Self::today()) {
      return Err(Ineligibility::SignupsClosed.into());
    }

    self
      .store
      .delete_member(profile.member.id)
      .await
      .map_err(Error::store)?;

    self
      .audit(NewAuditEntry {
        action:      AuditAction::Unenrolled,
        actor:       Some(user.id),
        target_user: None,
        year:        Some(profile.member.year),
        ip,
      })
      .await;

    Ok(())
  }

  // ─── Gifts ─────────────────────────────────────────────────────────────────

  /// Record that the viewer has shipped their gift. Fires once; the giftee
  /// is told to watch the mailbox.
  pub async fn send_gift(
    &self,
    user: &User,
    season: SeasonRef,
    ip: Option<String>,
  ) -> Result<MemberProfile> {
    let profile = self.profile_of(user, season).await?;
    if profile.season.is_closed(Self::today()) {
      return Err(Ineligibility::SeasonClosed.into());
    }
    let Some(giftee) = &profile.giftee else {
      return Err(Ineligibility::NoGiftee.into());
    };
    if !self
      .store
      .mark_gift_sent(profile.member.id)
      .await
      .map_err(Error::store)?
    {
      return Err(Ineligibility::GiftAlreadySent.into());
    }

    self
      .audit(NewAuditEntry {
        action:      AuditAction::GiftSent,
        actor:       Some(user.id),
        target_user: None,
        year:        Some(profile.member.year),
        ip,
      })
      .await;
    self
      .notify_user(
        giftee.user_id,
        "A gift is on its way to you",
        "Your santa has sent your gift. Don't forget to mark it as received \
         once it arrives.",
      )
      .await;

    self.profile_of(user, SeasonRef::Year(profile.member.year)).await
  }

  /// Record that the viewer's gift has arrived. Fires once; the santa gets
  /// the good news without losing their anonymity.
  pub async fn receive_gift(
    &self,
    user: &User,
    season: SeasonRef,
    ip: Option<String>,
  ) -> Result<MemberProfile> {
    let profile = self.profile_of(user, season).await?;
    if profile.season.is_closed(Self::today()) {
      return Err(Ineligibility::SeasonClosed.into());
    }
    let Some(santa) = &profile.santa else {
      return Err(Ineligibility::NoSanta.into());
    };
    if !self
      .store
      .mark_gift_received(profile.member.id)
      .await
      .map_err(Error::store)?
    {
      return Err(Ineligibility::GiftAlreadyReceived.into());
    }

    self
      .audit(NewAuditEntry {
        action:      AuditAction::GiftReceived,
        actor:       Some(user.id),
        target_user: None,
        year:        Some(profile.member.year),
        ip,
      })
      .await;
    self
      .notify_user(
        santa.user_id,
        "Your gift has arrived",
        "Your giftee has marked the gift as received. Well done, santa!",
      )
      .await;

    self.profile_of(user, SeasonRef::Year(profile.member.year)).await
  }

  // ─── Mail ──────────────────────────────────────────────────────────────────

  /// Send a message to the viewer's santa or giftee.
  pub async fn send_mail(
    &self,
    user: &User,
    season: SeasonRef,
    side: MailSide,
    body: &str,
    ip: Option<String>,
  ) -> Result<Mail> {
    let profile = self.profile_of(user, season).await?;
    if profile.season.is_closed(Self::today()) {
      return Err(Ineligibility::SeasonClosed.into());
    }
    let body = mail::validate_body(body)?;
    let (recipient, action) = match side {
      MailSide::Santa => (
        profile.santa.as_ref().ok_or(Ineligibility::NoSanta)?,
        AuditAction::MailedSanta,
      ),
      MailSide::Giftee => (
        profile.giftee.as_ref().ok_or(Ineligibility::NoGiftee)?,
        AuditAction::MailedGiftee,
      ),
    };

    let mail = self
      .store
      .add_mail(NewMail {
        sender_id:    profile.member.id,
        recipient_id: recipient.id,
        body,
      })
      .await
      .map_err(Error::store)?;

    self
      .audit(NewAuditEntry {
        action,
        actor: Some(user.id),
        target_user: None,
        year: Some(profile.member.year),
        ip,
      })
      .await;

    // The recipient sees the sender's role from their own side of the table.
    let (title, text) = match side {
      MailSide::Santa => (
        "New message from your giftee",
        "Your giftee has written to you. Open your member page to reply.",
      ),
      MailSide::Giftee => (
        "New message from your santa",
        "Your santa has written to you. Open your member page to reply.",
      ),
    };
    self.notify_user(recipient.user_id, title, text).await;

    Ok(mail)
  }

  /// Mark the counterpart's messages sent up to `upto` as read. The bound
  /// keeps a slow page load from eating messages that arrived after it was
  /// rendered.
  pub async fn read_mails(
    &self,
    user: &User,
    season: SeasonRef,
    side: MailSide,
    upto: DateTime<Utc>,
  ) -> Result<usize> {
    let profile = self.profile_of(user, season).await?;
    if profile.season.is_closed(Self::today()) {
      return Err(Ineligibility::SeasonClosed.into());
    }
    let sender = match side {
      MailSide::Santa => profile.santa.as_ref().ok_or(Ineligibility::NoSanta)?,
      MailSide::Giftee => {
        profile.giftee.as_ref().ok_or(Ineligibility::NoGiftee)?
      }
    };
    let marked = self
      .store
      .mark_mails_read(profile.member.id, sender.id, upto)
      .await
      .map_err(Error::store)?;
    Ok(marked)
  }

  /// Both chat panes for the member page. Counts as a visit, like
  /// [`ClubService::member_page`].
  pub async fn chat(
    &self,
    user: &User,
    season: SeasonRef,
  ) -> Result<ChatState> {
    let profile = self.profile_of(user, season).await?;
    self
      .store
      .touch_last_visit(profile.member.id)
      .await
      .map_err(Error::store)?;

    let viewer = profile.member.id;
    let santa = match &profile.santa {
      Some(santa) => self.pane(viewer, santa.id).await?,
      None => ChatPane::default(),
    };
    let giftee = match &profile.giftee {
      Some(giftee) => self.pane(viewer, giftee.id).await?,
      None => ChatPane::default(),
    };
    Ok(ChatState { santa, giftee })
  }

  // ─── Matching ──────────────────────────────────────────────────────────────

  /// Run the draw for a season: shuffle the members into one giving cycle
  /// and persist it atomically, then tell everyone to come look.
  pub async fn run_matching(&self, season: SeasonRef) -> Result<MatchReport> {
    let year = self.resolve_year(season).await?;
    let season = self.get_season(year).await?;
    if season.is_closed(Self::today()) {
      return Err(Ineligibility::SeasonClosed.into());
    }

    let members = self.store.list_members(year).await.map_err(Error::store)?;
    if members.iter().any(Member::is_matched) {
      return Err(Ineligibility::AlreadyMatched.into());
    }

    let ids: Vec<i64> = members.iter().map(|m| m.id).collect();
    let assignments = matching::draw_cycle(&ids, &mut rand::rng())?;
    self
      .store
      .assign_giftees(year, assignments)
      .await
      .map_err(Error::store)?;
    info!(year, members = members.len(), "season matched");

    // Only after the draw is committed.
    for member in &members {
      self
        .notify_user(
          member.user_id,
          "The draw is done!",
          format!(
            "Season {year} is matched: your giftee's name and address are \
             waiting on your member page."
          ),
        )
        .await;
    }

    Ok(MatchReport { year, members: members.len() })
  }

  // ─── Moderation ────────────────────────────────────────────────────────────

  /// Ban a user from the club. Idempotent; the notification fires only on
  /// the actual state change.
  pub async fn ban_user(
    &self,
    username: &str,
    ip: Option<String>,
  ) -> Result<User> {
    self.set_ban(username, true, ip).await
  }

  /// Lift a ban. Idempotent, like [`ClubService::ban_user`].
  pub async fn unban_user(
    &self,
    username: &str,
    ip: Option<String>,
  ) -> Result<User> {
    self.set_ban(username, false, ip).await
  }

  async fn set_ban(
    &self,
    username: &str,
    banned: bool,
    ip: Option<String>,
  ) -> Result<User> {
    let user = self
      .store
      .get_user_by_username(username.to_owned())
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::UserNotFound(username.to_owned()))?;
    if user.is_banned == banned {
      return Ok(user);
    }

    let user = self
      .store
      .set_banned(user.id, banned)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::UserNotFound(username.to_owned()))?;

    let action =
      if banned { AuditAction::Banned } else { AuditAction::Unbanned };
    self
      .audit(NewAuditEntry {
        action,
        // Config-file admins have no user id of their own.
        actor: None,
        target_user: Some(user.id),
        year: None,
        ip,
      })
      .await;

    let (title, body) = if banned {
      (
        "Your club account has been suspended",
        "An administrator has suspended your participation. Contact the club \
         admins if you believe this is a mistake.",
      )
    } else {
      (
        "Your club account is active again",
        "An administrator has lifted your suspension. Happy holidays!",
      )
    };
    self.notifier.enqueue(Notification::to_user(&user, title, body));
    info!(username, banned, "ban flag changed");

    Ok(user)
  }

  // ─── Admin plumbing ────────────────────────────────────────────────────────

  pub async fn recent_audit(&self, limit: usize) -> Result<Vec<AuditEntry>> {
    let entries =
      self.store.recent_audit(limit).await.map_err(Error::store)?;
    Ok(entries)
  }

  pub async fn clear_cache(&self) -> Result<()> {
    self.store.clear_cache().await.map_err(Error::store)?;
    info!("store cache cleared");
    Ok(())
  }

  // ─── Internals ─────────────────────────────────────────────────────────────

  async fn resolve_year(&self, season: SeasonRef) -> Result<i32> {
    match season {
      SeasonRef::Year(year) => Ok(year),
      SeasonRef::Latest => self
        .store
        .latest_year()
        .await
        .map_err(Error::store)?
        .ok_or_else(|| Error::SeasonNotFound(SeasonRef::Latest.to_string())),
    }
  }

  async fn get_season(&self, year: i32) -> Result<Season> {
    self
      .store
      .get_season(year)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::SeasonNotFound(year.to_string()))
  }

  /// The viewer's profile in `season`, or [`Error::NotAMember`].
  async fn profile_of(
    &self,
    user: &User,
    season: SeasonRef,
  ) -> Result<MemberProfile> {
    let year = self.resolve_year(season).await?;
    self
      .store
      .member_profile(user.id, year)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotAMember(year))
  }

  async fn pane(&self, viewer: i64, counterpart: i64) -> Result<ChatPane> {
    let mails = self
      .store
      .mails_between(viewer, counterpart)
      .await
      .map_err(Error::store)?;
    Ok(ChatPane::build(viewer, &mails))
  }

  /// Audit writes never fail the operation they describe.
  async fn audit(&self, entry: NewAuditEntry) {
    if let Err(error) = self.store.record_audit(entry).await {
      warn!(%error, "failed to record audit entry");
    }
  }

  /// Look the user up fresh (their token may have rotated since any cached
  /// read) and enqueue a notification. Never fails the calling operation.
  async fn notify_user(
    &self,
    user_id: i64,
    title: impl Into<String>,
    body: impl Into<String>,
  ) {
    match self.store.get_user(user_id).await {
      Ok(Some(user)) => {
        self.notifier.enqueue(Notification::to_user(&user, title, body));
      }
      Ok(None) => warn!(user_id, "cannot notify an unknown user"),
      Err(error) => {
        warn!(%error, user_id, "failed to load user for notification");
      }
    }
  }
}
