use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetitionState {
    Open,
    Closed,
    Rejected,
}

impl PetitionState {
    pub const ALL: [PetitionState; 3] = [
        PetitionState::Open,
        PetitionState::Closed,
        PetitionState::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PetitionState::Open => "open",
            PetitionState::Closed => "closed",
            PetitionState::Rejected => "rejected",
        }
    }

    /// Optional milestones a petition in this state may carry.
    pub fn applicable_milestones(&self) -> &'static [Milestone] {
        match self {
            PetitionState::Open => &[
                Milestone::Opened,
                Milestone::Threshold10k,
                Milestone::Threshold100k,
                Milestone::GovernmentResponse,
                Milestone::DebateScheduled,
                Milestone::Debated,
            ],
            PetitionState::Closed => &[
                Milestone::Opened,
                Milestone::Threshold10k,
                Milestone::Threshold100k,
                Milestone::GovernmentResponse,
                Milestone::DebateScheduled,
                Milestone::Debated,
                Milestone::Closed,
            ],
            PetitionState::Rejected => &[Milestone::Rejected],
        }
    }
}

impl fmt::Display for PetitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PetitionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(PetitionState::Open),
            "closed" => Ok(PetitionState::Closed),
            "rejected" => Ok(PetitionState::Rejected),
            other => Err(format!("unknown petition state {other:?}")),
        }
    }
}

/// Lifecycle points a petition can pass through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    Created,
    Opened,
    Threshold10k,
    Threshold100k,
    GovernmentResponse,
    DebateScheduled,
    Debated,
    Closed,
    Rejected,
}

impl Milestone {
    /// Every milestone except `Created`, which is mandatory.
    pub const OPTIONAL: [Milestone; 8] = [
        Milestone::Opened,
        Milestone::Threshold10k,
        Milestone::Threshold100k,
        Milestone::GovernmentResponse,
        Milestone::DebateScheduled,
        Milestone::Debated,
        Milestone::Closed,
        Milestone::Rejected,
    ];

    pub fn field_name(&self) -> &'static str {
        match self {
            Milestone::Created => "created_at",
            Milestone::Opened => "opened_at",
            Milestone::Threshold10k => "threshold_10k_reached_at",
            Milestone::Threshold100k => "threshold_100k_reached_at",
            Milestone::GovernmentResponse => "government_response_at",
            Milestone::DebateScheduled => "debate_scheduled_at",
            Milestone::Debated => "debated_at",
            Milestone::Closed => "closed_at",
            Milestone::Rejected => "rejected_at",
        }
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Non-fatal data quality findings attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordWarning {
    OutOfOrder { earlier: Milestone, later: Milestone },
    InapplicableField { field: Milestone, state: PetitionState },
    UnparseableTimestamp { field: Milestone, value: String },
    /// An optional nested attribute had an unexpected shape and was dropped.
    UnreadableField { field: String, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DebateLinks {
    pub video_url: Option<String>,
    pub transcript_url: Option<String>,
    pub research_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetitionRecord {
    pub id: i64,
    pub title: String,
    pub state: PetitionState,
    pub signature_count: u64,
    pub created_at: DateTime<Utc>,
    pub opened_at: Option<DateTime<Utc>>,
    pub threshold_10k_reached_at: Option<DateTime<Utc>>,
    pub threshold_100k_reached_at: Option<DateTime<Utc>>,
    pub government_response_at: Option<DateTime<Utc>>,
    pub debate_scheduled_at: Option<DateTime<Utc>>,
    pub debated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_code: Option<String>,
    pub departments: Vec<String>,
    pub url: Option<String>,
    pub government_response_summary: Option<String>,
    pub debate_links: DebateLinks,
    pub warnings: Vec<RecordWarning>,
}

impl PetitionRecord {
    pub fn milestone(&self, milestone: Milestone) -> Option<DateTime<Utc>> {
        match milestone {
            Milestone::Created => Some(self.created_at),
            Milestone::Opened => self.opened_at,
            Milestone::Threshold10k => self.threshold_10k_reached_at,
            Milestone::Threshold100k => self.threshold_100k_reached_at,
            Milestone::GovernmentResponse => self.government_response_at,
            Milestone::DebateScheduled => self.debate_scheduled_at,
            Milestone::Debated => self.debated_at,
            Milestone::Closed => self.closed_at,
            Milestone::Rejected => self.rejected_at,
        }
    }

    /// First listed department, or "Unassigned".
    pub fn primary_department(&self) -> &str {
        self.departments
            .first()
            .map(String::as_str)
            .unwrap_or(UNASSIGNED_DEPARTMENT)
    }
}

pub const UNASSIGNED_DEPARTMENT: &str = "Unassigned";
