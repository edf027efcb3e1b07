use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::time::days_between;
use normalizer::PetitionRecord;
use serde::Serialize;

use crate::distribution::Distribution;
use crate::stats::canonical_records;

/// Something a petition is still waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitingKind {
    /// Reached 10k signatures, no government response yet.
    GovernmentResponse,
    /// Reached 100k signatures, no debate date yet.
    DebateScheduling,
    /// Debate date has passed, no outcome recorded yet.
    DebateOutcome,
}

impl WaitingKind {
    pub const ALL: [WaitingKind; 3] = [
        WaitingKind::GovernmentResponse,
        WaitingKind::DebateScheduling,
        WaitingKind::DebateOutcome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WaitingKind::GovernmentResponse => "government_response",
            WaitingKind::DebateScheduling => "debate_scheduling",
            WaitingKind::DebateOutcome => "debate_outcome",
        }
    }
}

impl fmt::Display for WaitingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaitingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WaitingKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown waiting kind {s:?}"))
    }
}

/// Whole days `record` has been waiting on `kind` as of `now`, or `None` when
/// it is not waiting.
pub fn waiting_days(record: &PetitionRecord, kind: WaitingKind, now: DateTime<Utc>) -> Option<i64> {
    let since = match kind {
        WaitingKind::GovernmentResponse if record.government_response_at.is_none() => {
            record.threshold_10k_reached_at
        }
        WaitingKind::DebateScheduling if record.debate_scheduled_at.is_none() => {
            record.threshold_100k_reached_at
        }
        WaitingKind::DebateOutcome if record.debated_at.is_none() => record
            .debate_scheduled_at
            .filter(|scheduled| *scheduled < now),
        _ => None,
    }?;
    days_between(since, now)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacklogStats {
    pub as_of: DateTime<Utc>,
    pub waiting: BTreeMap<WaitingKind, Distribution>,
}

pub fn backlog<'a, I>(records: I, now: DateTime<Utc>) -> BacklogStats
where
    I: IntoIterator<Item = &'a PetitionRecord>,
{
    let unique = canonical_records(records);
    let waiting = WaitingKind::ALL
        .into_iter()
        .map(|kind| {
            let days = unique
                .iter()
                .filter_map(|record| waiting_days(record, kind, now))
                .map(|d| d as f64);
            (kind, Distribution::from_values(days))
        })
        .collect();
    BacklogStats { as_of: now, waiting }
}
