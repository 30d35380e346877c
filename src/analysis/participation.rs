//! Participation and completeness figures for a session.

use crate::error::Result;
use crate::models::*;
use crate::store::{Database, Population};
use serde::Serialize;
use tracing::debug;

/// Participants as a percentage of `eligible`. Zero for an empty population.
pub fn rate(participants: usize, eligible: usize) -> f64 {
    if eligible == 0 {
        return 0.0;
    }
    participants as f64 / eligible as f64 * 100.0
}

/// Percentage of users in `population` who cast at least one vote in
/// `session`. Unrounded.
pub fn participation_rate(db: &Database, session: SessionId, population: Population) -> Result<f64> {
    let eligible = db.count_users(population)?;
    let participants = db.count_participants(session, population)?;
    debug!(
        "Participation in session {} for {:?}: {}/{}",
        session, population, participants, eligible
    );
    Ok(rate(participants, eligible))
}

/// Whether everyone expected to vote has voted.
///
/// Eligibility counts engineers and team leaders only, while participants
/// are every distinct voter in the session. A vote from a manager therefore
/// counts towards completion even though managers are not eligible.
pub fn is_session_complete(db: &Database, session: SessionId) -> Result<bool> {
    let eligible = db.count_users_with_roles(&Role::VOTING)?;
    let participants = db.count_distinct_voters(session)?;
    Ok(eligible == participants)
}

/// How far a single user is through a session's active cards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VotingProgress {
    pub total_cards: usize,
    pub voted: usize,
    pub completion_pct: f64,
}

pub fn voting_progress(db: &Database, user: UserId, session: SessionId) -> Result<VotingProgress> {
    let total_cards = db.list_cards(true)?.len();
    let voted = db.user_active_card_votes(user, session)?;
    Ok(VotingProgress {
        total_cards,
        voted,
        completion_pct: rate(voted, total_cards),
    })
}
