//! Error types for `kringle-core`.

use thiserror::Error;

/// A club rule that forbids an action for the current caller.
///
/// Distinct from [`Error::Validation`]: the request is well-formed, the
/// rules just say no for this caller right now. Each variant carries the
/// message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Ineligibility {
  #[error("signups for this season are not open")]
  SignupsClosed,

  #[error("this season is closed")]
  SeasonClosed,

  #[error("you are already participating in this season")]
  AlreadyRegistered,

  #[error("your account does not qualify for participation")]
  NotInvited,

  #[error("participants have already been matched")]
  AlreadyMatched,

  #[error("you do not have a giftee yet")]
  NoGiftee,

  #[error("you do not have a santa yet")]
  NoSanta,

  #[error("your gift is already marked as sent")]
  GiftAlreadySent,

  #[error("your gift is already marked as received")]
  GiftAlreadyReceived,

  #[error("not enough participants to run the draw")]
  NotEnoughMembers,
}

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or out-of-range input: dates in the wrong order, text over a
  /// column limit, an unknown chat side, and so on.
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Ineligible(Ineligibility),

  #[error("season not found: {0}")]
  SeasonNotFound(String),

  /// The user exists but is not enrolled in the season in question.
  #[error("you are not a member of season {0}")]
  NotAMember(i32),

  #[error("user not found: {0}")]
  UserNotFound(String),

  /// The identity provider (or another upstream service) failed or answered
  /// with something we could not use.
  #[error("upstream service error: {0}")]
  Dependency(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend-specific store error.
  pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(err))
  }
}

impl From<Ineligibility> for Error {
  fn from(reason: Ineligibility) -> Self { Self::Ineligible(reason) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
