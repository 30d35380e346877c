//! Data models for the health check engine.
//!
//! This module contains the organisation hierarchy (departments, teams,
//! users), the voting calendar (sessions, cards), individual votes and the
//! derived team/department summaries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Primary key of a [`Department`].
    DepartmentId
);
id_type!(
    /// Primary key of a [`Team`].
    TeamId
);
id_type!(
    /// Primary key of a [`User`].
    UserId
);
id_type!(
    /// Primary key of a [`Session`].
    SessionId
);
id_type!(
    /// Primary key of a [`Card`].
    CardId
);
id_type!(VoteId);

/// Traffic-light value of a vote or summary.
///
/// Out-of-range values never reach the engine: the CLI parses them with
/// `clap::ValueEnum` and the store rejects unknown text when decoding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLight {
    Green,
    Amber,
    Red,
}

impl TrafficLight {
    pub const ALL: [TrafficLight; 3] = [TrafficLight::Green, TrafficLight::Amber, TrafficLight::Red];

    /// Numeric score used for trend comparisons: green 3, amber 2, red 1.
    pub fn score(self) -> u8 {
        match self {
            TrafficLight::Green => 3,
            TrafficLight::Amber => 2,
            TrafficLight::Red => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrafficLight::Green => "green",
            TrafficLight::Amber => "amber",
            TrafficLight::Red => "red",
        }
    }

    /// Returns an emoji representation of the light.
    pub fn emoji(self) -> &'static str {
        match self {
            TrafficLight::Green => "🟢",
            TrafficLight::Amber => "🟠",
            TrafficLight::Red => "🔴",
        }
    }

    /// True when `self` is as bad as, or worse than, `threshold`.
    pub fn at_or_below(self, threshold: TrafficLight) -> bool {
        self.score() <= threshold.score()
    }
}

impl fmt::Display for TrafficLight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrafficLight {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "green" => Ok(TrafficLight::Green),
            "amber" => Ok(TrafficLight::Amber),
            "red" => Ok(TrafficLight::Red),
            other => Err(format!("unknown vote value '{}'", other)),
        }
    }
}

/// A voter's sense of direction since the previous session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProgressNote {
    Better,
    Same,
    Worse,
}

impl ProgressNote {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressNote::Better => "better",
            ProgressNote::Same => "same",
            ProgressNote::Worse => "worse",
        }
    }
}

impl fmt::Display for ProgressNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressNote {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "better" => Ok(ProgressNote::Better),
            "same" => Ok(ProgressNote::Same),
            "worse" => Ok(ProgressNote::Worse),
            other => Err(format!("unknown progress note '{}'", other)),
        }
    }
}

/// Movement of an entity's status between two sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Improving => "↑",
            Trend::Declining => "↓",
            Trend::Stable => "→",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Improving => write!(f, "improving"),
            Trend::Declining => write!(f, "declining"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

/// Organisational role of a user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Engineer,
    TeamLeader,
    DepartmentLeader,
    SeniorManager,
    Admin,
}

impl Role {
    /// Roles expected to vote in every session.
    pub const VOTING: [Role; 2] = [Role::Engineer, Role::TeamLeader];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Engineer => "engineer",
            Role::TeamLeader => "team_leader",
            Role::DepartmentLeader => "department_leader",
            Role::SeniorManager => "senior_manager",
            Role::Admin => "admin",
        }
    }

    fn is_org_wide(self) -> bool {
        matches!(self, Role::Admin | Role::SeniorManager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "engineer" => Ok(Role::Engineer),
            "team_leader" => Ok(Role::TeamLeader),
            "department_leader" => Ok(Role::DepartmentLeader),
            "senior_manager" => Ok(Role::SeniorManager),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Top level of the organisation hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A team, optionally owned by a department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub department: Option<DepartmentId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub department: Option<DepartmentId>,
    pub team: Option<TeamId>,
}

impl User {
    /// Whether this user may manage `team`.
    ///
    /// Admins and senior managers manage every team, department leaders the
    /// teams of their own department, team leaders only their own team.
    pub fn can_manage_team(&self, team: &Team) -> bool {
        match self.role {
            role if role.is_org_wide() => true,
            Role::DepartmentLeader => {
                self.department.is_some() && team.department == self.department
            }
            Role::TeamLeader => self.team == Some(team.id),
            _ => false,
        }
    }

    /// Whether this user may read the summaries of `department`.
    pub fn can_view_department_summary(&self, department: DepartmentId) -> bool {
        match self.role {
            role if role.is_org_wide() => true,
            Role::DepartmentLeader => self.department == Some(department),
            _ => false,
        }
    }
}

/// A time-boxed voting round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    pub date: NaiveDate,
    pub description: String,
    pub is_active: bool,
}

/// An evaluation category voted on in every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub description: String,
    pub order: u32,
    pub active: bool,
}

/// One user's evaluation of one card in one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub user: UserId,
    pub card: CardId,
    pub session: SessionId,
    pub value: TrafficLight,
    pub progress_note: ProgressNote,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Percentage split of votes across the three lights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub green: f64,
    pub amber: f64,
    pub red: f64,
}

impl Distribution {
    /// Converts raw counts into percentages. All zero when there are no votes.
    pub fn from_counts(green: usize, amber: usize, red: usize) -> Self {
        let total = green + amber + red;
        if total == 0 {
            return Self::default();
        }

        let pct = |count: usize| (count as f64 / total as f64) * 100.0;
        Self {
            green: pct(green),
            amber: pct(amber),
            red: pct(red),
        }
    }

    pub fn total(&self) -> f64 {
        self.green + self.amber + self.red
    }
}

/// Rollup of a team's votes for one card in one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub team: TeamId,
    pub session: SessionId,
    pub card: CardId,
    pub average_vote: TrafficLight,
    pub progress_summary: ProgressNote,
    pub green_pct: f64,
    pub amber_pct: f64,
    pub red_pct: f64,
}

impl TeamSummary {
    pub fn distribution(&self) -> Distribution {
        Distribution {
            green: self.green_pct,
            amber: self.amber_pct,
            red: self.red_pct,
        }
    }
}

/// Rollup of a department's team summaries for one card in one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentSummary {
    pub department: DepartmentId,
    pub session: SessionId,
    pub card: CardId,
    pub average_vote: TrafficLight,
    pub progress_summary: ProgressNote,
    pub green_pct: f64,
    pub amber_pct: f64,
    pub red_pct: f64,
}

impl DepartmentSummary {
    pub fn distribution(&self) -> Distribution {
        Distribution {
            green: self.green_pct,
            amber: self.amber_pct,
            red: self.red_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, department: Option<i64>, team: Option<i64>) -> User {
        User {
            id: UserId(1),
            username: "someone".to_string(),
            role,
            department: department.map(DepartmentId),
            team: team.map(TeamId),
        }
    }

    fn team(id: i64, department: Option<i64>) -> Team {
        Team {
            id: TeamId(id),
            name: format!("Team {}", id),
            description: None,
            department: department.map(DepartmentId),
        }
    }

    #[test]
    fn test_traffic_light_scores() {
        assert_eq!(TrafficLight::Green.score(), 3);
        assert_eq!(TrafficLight::Amber.score(), 2);
        assert_eq!(TrafficLight::Red.score(), 1);
        assert!(TrafficLight::Red.at_or_below(TrafficLight::Amber));
        assert!(!TrafficLight::Green.at_or_below(TrafficLight::Amber));
    }

    #[test]
    fn test_enum_text_round_trip() {
        for light in TrafficLight::ALL {
            assert_eq!(light.as_str().parse::<TrafficLight>(), Ok(light));
        }
        assert_eq!("team_leader".parse::<Role>(), Ok(Role::TeamLeader));
        assert!("purple".parse::<TrafficLight>().is_err());
        assert!("sideways".parse::<ProgressNote>().is_err());
    }

    #[test]
    fn test_distribution_from_counts() {
        let dist = Distribution::from_counts(2, 1, 0);
        assert!((dist.green - 66.666).abs() < 0.01);
        assert!((dist.amber - 33.333).abs() < 0.01);
        assert_eq!(dist.red, 0.0);
        assert!((dist.total() - 100.0).abs() < 1e-9);

        assert_eq!(Distribution::from_counts(0, 0, 0), Distribution::default());
    }

    #[test]
    fn test_can_manage_team() {
        let backend = team(1, Some(10));

        assert!(user(Role::Admin, None, None).can_manage_team(&backend));
        assert!(user(Role::SeniorManager, None, None).can_manage_team(&backend));
        assert!(user(Role::DepartmentLeader, Some(10), None).can_manage_team(&backend));
        assert!(!user(Role::DepartmentLeader, Some(11), None).can_manage_team(&backend));
        assert!(!user(Role::DepartmentLeader, None, None).can_manage_team(&team(2, None)));
        assert!(user(Role::TeamLeader, Some(10), Some(1)).can_manage_team(&backend));
        assert!(!user(Role::TeamLeader, Some(10), Some(2)).can_manage_team(&backend));
        assert!(!user(Role::Engineer, Some(10), Some(1)).can_manage_team(&backend));
    }

    #[test]
    fn test_can_view_department_summary() {
        let dept = DepartmentId(10);

        assert!(user(Role::Admin, None, None).can_view_department_summary(dept));
        assert!(user(Role::DepartmentLeader, Some(10), None).can_view_department_summary(dept));
        assert!(!user(Role::DepartmentLeader, Some(11), None).can_view_department_summary(dept));
        assert!(!user(Role::TeamLeader, Some(10), Some(1)).can_view_department_summary(dept));
        assert!(!user(Role::Engineer, Some(10), Some(1)).can_view_department_summary(dept));
    }
}
