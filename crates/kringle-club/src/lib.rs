//! Club orchestration for Kringle.
//!
//! [`ClubService`] ties the store, the community profile provider and the
//! notification queue together into the operations the HTTP layer exposes:
//! login, enrolment, the giftee draw, gift tracking, anonymous mail and the
//! admin surface. Every operation returns [`kringle_core::Error`] so callers
//! get one error vocabulary regardless of which backend misbehaved.

mod service;

pub use service::{ClubService, LoginOutcome, MatchReport};
