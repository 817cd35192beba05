//! The draw: arranging every member of a season into a single gift cycle.

use rand::{Rng, seq::SliceRandom};

use crate::{Result, error::Ineligibility};

/// One santa→giftee edge produced by the draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
  pub member_id: i64,
  pub giftee_id: i64,
}

/// Arrange `member_ids` into one gift cycle.
///
/// Shuffles the members and links each to its successor, wrapping the last
/// back to the first. Every member therefore gives exactly once and receives
/// exactly once, nobody is their own giftee, and no subgroup is isolated
/// from the rest.
///
/// Fails with [`Ineligibility::NotEnoughMembers`] for fewer than two members.
pub fn draw_cycle<R: Rng + ?Sized>(
  member_ids: &[i64],
  rng: &mut R,
) -> Result<Vec<Assignment>> {
  if member_ids.len() < 2 {
    return Err(Ineligibility::NotEnoughMembers.into());
  }

  let mut order = member_ids.to_vec();
  order.shuffle(rng);

  let n = order.len();
  Ok(
    (0..n)
      .map(|i| Assignment {
        member_id: order[i],
        giftee_id: order[(i + 1) % n],
      })
      .collect(),
  )
}
