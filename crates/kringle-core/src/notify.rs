//! Outbound collaborators: the identity provider and the notification sink.

use std::future::Future;

use crate::{Result, user::{RemoteIdentity, User}};

/// A message pushed to a user through the provider's tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  /// Provider id of the addressee.
  pub user_id: i64,
  /// The addressee's current bearer token; delivery happens on their behalf.
  pub token:   String,
  pub title:   String,
  pub body:    String,
}

impl Notification {
  pub fn to_user(
    user: &User,
    title: impl Into<String>,
    body: impl Into<String>,
  ) -> Self {
    Self {
      user_id: user.id,
      token:   user.access_token.clone(),
      title:   title.into(),
      body:    body.into(),
    }
  }
}

/// Fire-and-forget notification sink.
///
/// `enqueue` must not block: implementations hand the notification to a
/// background worker and return. A full queue drops the notification rather
/// than stalling the request that triggered it.
pub trait Notifier: Send + Sync {
  fn enqueue(&self, notification: Notification);
}

/// The remote identity provider.
pub trait ProfileProvider: Send + Sync {
  /// Exchange a login redirect code for a bearer token.
  fn exchange_code<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<String>> + Send + 'a;

  /// Fetch the profile behind a bearer token.
  fn fetch_profile<'a>(
    &'a self,
    access_token: &'a str,
  ) -> impl Future<Output = Result<RemoteIdentity>> + Send + 'a;
}
