//! Aggregation engine.
//!
//! The classifier holds the shared majority-wins rules. The aggregator turns
//! votes into team summaries and team summaries into department summaries.
//! Trend and participation figures are read-only views over the results.

pub mod aggregator;
pub mod classifier;
pub mod participation;
pub mod recompute;
pub mod trend;

pub use aggregator::{
    card_vote_distribution, cards_needing_attention, department_health, team_health,
    AggregationOptions, Aggregator, RecomputeStats, Rollup, RollupChange, TeamUpdate, VoteRollup,
};
pub use classifier::{classify, classify_progress, classify_trend, overall_health};
pub use participation::{is_session_complete, participation_rate, voting_progress, VotingProgress};
pub use trend::{calculate_trend, has_improved, vote_trend, Trended};
