use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use normalizer::{Milestone, PetitionRecord};
use serde::{Serialize, Serializer};

use crate::backlog::{waiting_days, WaitingKind};
use crate::durations::MilestonePair;
use crate::stats::canonical_records;

/// What petitions are ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Signatures,
    Duration(MilestonePair),
    Waiting(WaitingKind),
}

impl Metric {
    pub fn value(&self, record: &PetitionRecord, now: DateTime<Utc>) -> Option<i64> {
        match self {
            Metric::Signatures => i64::try_from(record.signature_count).ok(),
            Metric::Duration(pair) => pair.days(record),
            Metric::Waiting(kind) => waiting_days(record, *kind, now),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Signatures => f.write_str("signatures"),
            Metric::Duration(pair) => write!(f, "{pair}"),
            Metric::Waiting(kind) => write!(f, "waiting_{kind}"),
        }
    }
}

/// Accepts `signatures`, a milestone pair name (`10k_to_100k`) or
/// `waiting_<kind>`.
impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "signatures" {
            return Ok(Metric::Signatures);
        }
        if let Some(kind) = s.strip_prefix("waiting_") {
            return kind.parse().map(Metric::Waiting);
        }
        s.parse()
            .map(Metric::Duration)
            .map_err(|_| format!("unknown metric {s:?}"))
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            other => Err(format!("unknown sort order {other:?}")),
        }
    }
}

/// Column a petition listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Title,
    Milestone(Milestone),
    Metric(Metric),
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Metric(Metric::Signatures)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum KeyValue<'a> {
    Int(i64),
    Text(&'a str),
    Time(DateTime<Utc>),
}

impl SortKey {
    fn value<'a>(&self, record: &'a PetitionRecord, now: DateTime<Utc>) -> Option<KeyValue<'a>> {
        match self {
            SortKey::Id => Some(KeyValue::Int(record.id)),
            SortKey::Title => Some(KeyValue::Text(&record.title)),
            SortKey::Milestone(milestone) => record.milestone(*milestone).map(KeyValue::Time),
            SortKey::Metric(metric) => metric.value(record, now).map(KeyValue::Int),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Id => f.write_str("id"),
            SortKey::Title => f.write_str("title"),
            SortKey::Milestone(milestone) => write!(f, "{milestone}"),
            SortKey::Metric(metric) => write!(f, "{metric}"),
        }
    }
}

/// Accepts `id`, `title`, a milestone field name (`created_at`,
/// `government_response_at`, ...) or any [`Metric`] name.
impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "id" => return Ok(SortKey::Id),
            "title" => return Ok(SortKey::Title),
            _ => {}
        }
        let milestone = std::iter::once(Milestone::Created)
            .chain(Milestone::OPTIONAL)
            .find(|milestone| milestone.field_name() == s);
        if let Some(milestone) = milestone {
            return Ok(SortKey::Milestone(milestone));
        }
        s.parse()
            .map(SortKey::Metric)
            .map_err(|_| format!("unknown sort column {s:?}"))
    }
}

impl Serialize for SortKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Orders records by `key`. Records where the key is undefined go last in
/// either direction and ties fall back to ascending id.
pub fn sort_records(
    records: &mut [&PetitionRecord],
    key: SortKey,
    order: SortOrder,
    now: DateTime<Utc>,
) {
    records.sort_by(|a, b| {
        let by_key = match (key.value(a, now), key.value(b, now)) {
            (Some(x), Some(y)) => match order {
                SortOrder::Ascending => x.cmp(&y),
                SortOrder::Descending => y.cmp(&x),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_key.then(a.id.cmp(&b.id))
    });
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedPetition {
    pub id: i64,
    pub title: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPetitions {
    pub metric: Metric,
    pub order: SortOrder,
    /// Mean across every record where the metric is defined, not just the
    /// returned items.
    pub mean: Option<f64>,
    pub defined_count: usize,
    pub items: Vec<RankedPetition>,
}

pub fn top_petitions<'a, I>(
    records: I,
    metric: Metric,
    order: SortOrder,
    limit: usize,
    now: DateTime<Utc>,
) -> TopPetitions
where
    I: IntoIterator<Item = &'a PetitionRecord>,
{
    let mut ranked: Vec<RankedPetition> = canonical_records(records)
        .into_iter()
        .filter_map(|record| {
            metric.value(record, now).map(|value| RankedPetition {
                id: record.id,
                title: record.title.clone(),
                value,
            })
        })
        .collect();

    let defined_count = ranked.len();
    let mean = (defined_count > 0)
        .then(|| ranked.iter().map(|item| item.value as f64).sum::<f64>() / defined_count as f64);

    // ties fall back to id so equal values rank stably
    ranked.sort_by(|a, b| {
        let by_value = match order {
            SortOrder::Ascending => a.value.cmp(&b.value),
            SortOrder::Descending => b.value.cmp(&a.value),
        };
        by_value.then(a.id.cmp(&b.id))
    });
    ranked.truncate(limit);

    TopPetitions {
        metric,
        order,
        mean,
        defined_count,
        items: ranked,
    }
}
