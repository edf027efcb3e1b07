use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use common::time::days_between;
use normalizer::{Milestone, PetitionRecord};
use serde::Serialize;

/// A (start, end) milestone pair whose gap, in whole days, is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MilestonePair {
    #[serde(rename = "created_to_opened")]
    CreatedToOpened,
    #[serde(rename = "created_to_10k")]
    CreatedToThreshold10k,
    #[serde(rename = "opened_to_10k")]
    OpenedToThreshold10k,
    #[serde(rename = "opened_to_100k")]
    OpenedToThreshold100k,
    #[serde(rename = "10k_to_100k")]
    Threshold10kToThreshold100k,
    #[serde(rename = "10k_to_government_response")]
    Threshold10kToGovernmentResponse,
    #[serde(rename = "100k_to_government_response")]
    Threshold100kToGovernmentResponse,
    #[serde(rename = "100k_to_debate_scheduled")]
    Threshold100kToDebateScheduled,
    #[serde(rename = "debate_scheduled_to_debated")]
    DebateScheduledToDebated,
}

impl MilestonePair {
    pub const ALL: [MilestonePair; 9] = [
        MilestonePair::CreatedToOpened,
        MilestonePair::CreatedToThreshold10k,
        MilestonePair::OpenedToThreshold10k,
        MilestonePair::OpenedToThreshold100k,
        MilestonePair::Threshold10kToThreshold100k,
        MilestonePair::Threshold10kToGovernmentResponse,
        MilestonePair::Threshold100kToGovernmentResponse,
        MilestonePair::Threshold100kToDebateScheduled,
        MilestonePair::DebateScheduledToDebated,
    ];

    pub fn endpoints(&self) -> (Milestone, Milestone) {
        use Milestone::*;
        match self {
            MilestonePair::CreatedToOpened => (Created, Opened),
            MilestonePair::CreatedToThreshold10k => (Created, Threshold10k),
            MilestonePair::OpenedToThreshold10k => (Opened, Threshold10k),
            MilestonePair::OpenedToThreshold100k => (Opened, Threshold100k),
            MilestonePair::Threshold10kToThreshold100k => (Threshold10k, Threshold100k),
            MilestonePair::Threshold10kToGovernmentResponse => (Threshold10k, GovernmentResponse),
            MilestonePair::Threshold100kToGovernmentResponse => {
                (Threshold100k, GovernmentResponse)
            }
            MilestonePair::Threshold100kToDebateScheduled => (Threshold100k, DebateScheduled),
            MilestonePair::DebateScheduledToDebated => (DebateScheduled, Debated),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MilestonePair::CreatedToOpened => "created_to_opened",
            MilestonePair::CreatedToThreshold10k => "created_to_10k",
            MilestonePair::OpenedToThreshold10k => "opened_to_10k",
            MilestonePair::OpenedToThreshold100k => "opened_to_100k",
            MilestonePair::Threshold10kToThreshold100k => "10k_to_100k",
            MilestonePair::Threshold10kToGovernmentResponse => "10k_to_government_response",
            MilestonePair::Threshold100kToGovernmentResponse => "100k_to_government_response",
            MilestonePair::Threshold100kToDebateScheduled => "100k_to_debate_scheduled",
            MilestonePair::DebateScheduledToDebated => "debate_scheduled_to_debated",
        }
    }

    /// Days from start to end; omitted when either end is missing or the end
    /// precedes the start.
    pub fn days(&self, record: &PetitionRecord) -> Option<i64> {
        let (start, end) = self.endpoints();
        days_between(record.milestone(start)?, record.milestone(end)?)
    }
}

impl fmt::Display for MilestonePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MilestonePair {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MilestonePair::ALL
            .into_iter()
            .find(|pair| pair.as_str() == s)
            .ok_or_else(|| format!("unknown milestone pair {s:?}"))
    }
}

pub fn durations_for(record: &PetitionRecord) -> BTreeMap<MilestonePair, i64> {
    MilestonePair::ALL
        .into_iter()
        .filter_map(|pair| pair.days(record).map(|days| (pair, days)))
        .collect()
}
