use chrono::{DateTime, Utc};
use common::text::public_page_url;
use common::time::parse_timestamp;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::MalformedRecordError;
use crate::models::{DebateLinks, Milestone, PetitionRecord, PetitionState, RecordWarning};
use crate::payloads::{
    AttributesPayload, DebatePayload, DepartmentPayload, GovernmentResponsePayload,
    PetitionPayload, RejectionPayload, ResourceLinks,
};

/// Milestone chains whose present members must be non-decreasing.
const ORDERED_CHAINS: [&[Milestone]; 2] = [
    &[
        Milestone::Created,
        Milestone::Threshold10k,
        Milestone::Threshold100k,
        Milestone::GovernmentResponse,
    ],
    &[
        Milestone::Created,
        Milestone::DebateScheduled,
        Milestone::Debated,
        Milestone::Closed,
    ],
];

pub fn normalize(raw: &Value) -> Result<PetitionRecord, MalformedRecordError> {
    let id_hint = raw.get("id").and_then(coerce_i64);
    let payload = PetitionPayload::deserialize(raw).map_err(|err| MalformedRecordError::Decode {
        id: id_hint,
        reason: err.to_string(),
    })?;

    let id = match payload.id.as_ref() {
        None | Some(Value::Null) => return Err(MalformedRecordError::missing(None, "id")),
        Some(value) => coerce_i64(value)
            .ok_or_else(|| MalformedRecordError::invalid(None, "id", "not an integer"))?,
    };
    let attrs = payload
        .attributes
        .ok_or_else(|| MalformedRecordError::missing(Some(id), "attributes"))?;

    let title = required_title(id, attrs.action.as_ref())?;
    let state = required_state(id, attrs.state.as_ref())?;
    let signature_count = required_count(id, attrs.signature_count.as_ref())?;
    let created_at = required_timestamp(id, attrs.created_at.as_ref())?;

    let mut warnings = Vec::new();
    let mut stamps = Stamps::parse(&attrs, &mut warnings);
    stamps.restrict_to(state, &mut warnings);
    check_ordering(created_at, &stamps, &mut warnings);

    let extras = Extras::from_attributes(state, &attrs, &mut warnings);
    let url = lenient::<ResourceLinks>("links", payload.links.as_ref(), &mut warnings)
        .and_then(|links| links.self_link)
        .map(|link| public_page_url(&link));

    if !warnings.is_empty() {
        debug!(id, warnings = warnings.len(), "petition record has warnings");
    }

    Ok(PetitionRecord {
        id,
        title,
        state,
        signature_count,
        created_at,
        opened_at: stamps.opened,
        threshold_10k_reached_at: stamps.threshold_10k,
        threshold_100k_reached_at: stamps.threshold_100k,
        government_response_at: stamps.government_response,
        debate_scheduled_at: stamps.debate_scheduled,
        debated_at: stamps.debated,
        closed_at: stamps.closed,
        rejected_at: stamps.rejected,
        rejection_code: extras.rejection_code,
        departments: extras.departments,
        url,
        government_response_summary: extras.government_response_summary,
        debate_links: extras.debate_links,
        warnings,
    })
}

#[derive(Debug, Clone)]
pub struct BatchEntry {
    /// Index of the raw record in the fetched sequence.
    pub position: usize,
    pub id: Option<i64>,
    pub result: Result<PetitionRecord, MalformedRecordError>,
}

/// Per-record outcome of normalizing one fetch. One bad record never fails
/// the batch.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub entries: Vec<BatchEntry>,
}

impl NormalizedBatch {
    pub fn records(&self) -> impl Iterator<Item = &PetitionRecord> {
        self.entries.iter().filter_map(|entry| entry.result.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = (usize, &MalformedRecordError)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.result.as_ref().err().map(|err| (entry.position, err)))
    }

    pub fn skipped_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.result.is_err()).count()
    }

    pub fn valid_count(&self) -> usize {
        self.entries.len() - self.skipped_count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn normalize_batch(raws: &[Value]) -> NormalizedBatch {
    let entries = raws
        .iter()
        .enumerate()
        .map(|(position, raw)| {
            let result = normalize(raw);
            let id = match &result {
                Ok(record) => Some(record.id),
                Err(err) => {
                    warn!(position, id = ?err.id(), error = %err, "skipping malformed petition record");
                    err.id()
                }
            };
            BatchEntry {
                position,
                id,
                result,
            }
        })
        .collect();
    NormalizedBatch { entries }
}

#[derive(Debug, Default)]
struct Stamps {
    opened: Option<DateTime<Utc>>,
    threshold_10k: Option<DateTime<Utc>>,
    threshold_100k: Option<DateTime<Utc>>,
    government_response: Option<DateTime<Utc>>,
    debate_scheduled: Option<DateTime<Utc>>,
    debated: Option<DateTime<Utc>>,
    closed: Option<DateTime<Utc>>,
    rejected: Option<DateTime<Utc>>,
}

impl Stamps {
    fn parse(attrs: &AttributesPayload, warnings: &mut Vec<RecordWarning>) -> Self {
        let mut read = |milestone: Milestone, value: &Option<Value>| {
            optional_timestamp(milestone, value.as_ref(), warnings)
        };
        Self {
            opened: read(Milestone::Opened, &attrs.opened_at),
            threshold_10k: read(Milestone::Threshold10k, &attrs.response_threshold_reached_at),
            threshold_100k: read(Milestone::Threshold100k, &attrs.debate_threshold_reached_at),
            government_response: read(Milestone::GovernmentResponse, &attrs.government_response_at),
            debate_scheduled: read(Milestone::DebateScheduled, &attrs.scheduled_debate_date),
            debated: read(Milestone::Debated, &attrs.debate_outcome_at),
            closed: read(Milestone::Closed, &attrs.closed_at),
            rejected: read(Milestone::Rejected, &attrs.rejected_at),
        }
    }

    fn slot(&mut self, milestone: Milestone) -> Option<&mut Option<DateTime<Utc>>> {
        match milestone {
            Milestone::Created => None,
            Milestone::Opened => Some(&mut self.opened),
            Milestone::Threshold10k => Some(&mut self.threshold_10k),
            Milestone::Threshold100k => Some(&mut self.threshold_100k),
            Milestone::GovernmentResponse => Some(&mut self.government_response),
            Milestone::DebateScheduled => Some(&mut self.debate_scheduled),
            Milestone::Debated => Some(&mut self.debated),
            Milestone::Closed => Some(&mut self.closed),
            Milestone::Rejected => Some(&mut self.rejected),
        }
    }

    fn get(&self, milestone: Milestone) -> Option<DateTime<Utc>> {
        match milestone {
            Milestone::Created => None,
            Milestone::Opened => self.opened,
            Milestone::Threshold10k => self.threshold_10k,
            Milestone::Threshold100k => self.threshold_100k,
            Milestone::GovernmentResponse => self.government_response,
            Milestone::DebateScheduled => self.debate_scheduled,
            Milestone::Debated => self.debated,
            Milestone::Closed => self.closed,
            Milestone::Rejected => self.rejected,
        }
    }

    /// Clears milestones the state cannot carry, warning for each one the
    /// upstream populated anyway.
    fn restrict_to(&mut self, state: PetitionState, warnings: &mut Vec<RecordWarning>) {
        let allowed = state.applicable_milestones();
        for milestone in Milestone::OPTIONAL {
            if allowed.contains(&milestone) {
                continue;
            }
            if let Some(slot) = self.slot(milestone) {
                if slot.take().is_some() {
                    warnings.push(RecordWarning::InapplicableField {
                        field: milestone,
                        state,
                    });
                }
            }
        }
    }
}

fn check_ordering(created_at: DateTime<Utc>, stamps: &Stamps, warnings: &mut Vec<RecordWarning>) {
    for chain in ORDERED_CHAINS {
        let mut previous: Option<(Milestone, DateTime<Utc>)> = None;
        for &milestone in chain {
            let at = match milestone {
                Milestone::Created => Some(created_at),
                other => stamps.get(other),
            };
            let Some(at) = at else { continue };
            if let Some((earlier, earlier_at)) = previous {
                if at < earlier_at {
                    warnings.push(RecordWarning::OutOfOrder {
                        earlier,
                        later: milestone,
                    });
                }
            }
            previous = Some((milestone, at));
        }
    }
}

struct Extras {
    departments: Vec<String>,
    government_response_summary: Option<String>,
    debate_links: DebateLinks,
    rejection_code: Option<String>,
}

impl Extras {
    fn from_attributes(
        state: PetitionState,
        attrs: &AttributesPayload,
        warnings: &mut Vec<RecordWarning>,
    ) -> Self {
        let departments = lenient::<Vec<DepartmentPayload>>(
            "departments",
            attrs.departments.as_ref(),
            warnings,
        )
        .unwrap_or_default()
        .into_iter()
        .filter_map(|dept| dept.name.or(dept.acronym))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

        match state {
            PetitionState::Rejected => Self {
                departments,
                government_response_summary: None,
                debate_links: DebateLinks::default(),
                rejection_code: lenient::<RejectionPayload>(
                    "rejection",
                    attrs.rejection.as_ref(),
                    warnings,
                )
                .and_then(|r| non_empty(&r.code)),
            },
            PetitionState::Open | PetitionState::Closed => Self {
                departments,
                government_response_summary: lenient::<GovernmentResponsePayload>(
                    "government_response",
                    attrs.government_response.as_ref(),
                    warnings,
                )
                .and_then(|r| non_empty(&r.summary)),
                debate_links: lenient::<DebatePayload>("debate", attrs.debate.as_ref(), warnings)
                    .map(|debate| DebateLinks {
                        video_url: non_empty(&debate.video_url),
                        transcript_url: non_empty(&debate.transcript_url),
                        research_url: non_empty(&debate.debate_pack_url),
                    })
                    .unwrap_or_default(),
                rejection_code: None,
            },
        }
    }
}

/// Decodes an optional nested attribute, dropping it with a warning when its
/// shape is not the expected one.
fn lenient<T: DeserializeOwned>(
    field: &str,
    value: Option<&Value>,
    warnings: &mut Vec<RecordWarning>,
) -> Option<T> {
    match value {
        None | Some(Value::Null) => None,
        Some(value) => match T::deserialize(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warnings.push(RecordWarning::UnreadableField {
                    field: field.to_string(),
                    reason: err.to_string(),
                });
                None
            }
        },
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn required_title(id: i64, value: Option<&Value>) -> Result<String, MalformedRecordError> {
    match value {
        None | Some(Value::Null) => Err(MalformedRecordError::missing(Some(id), "title")),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(MalformedRecordError::invalid(Some(id), "title", "empty")),
        Some(_) => Err(MalformedRecordError::invalid(
            Some(id),
            "title",
            "not a string",
        )),
    }
}

fn required_state(id: i64, value: Option<&Value>) -> Result<PetitionState, MalformedRecordError> {
    match value {
        None | Some(Value::Null) => Err(MalformedRecordError::missing(Some(id), "state")),
        Some(Value::String(s)) => s
            .parse()
            .map_err(|reason: String| MalformedRecordError::invalid(Some(id), "state", reason)),
        Some(_) => Err(MalformedRecordError::invalid(
            Some(id),
            "state",
            "not a string",
        )),
    }
}

fn required_count(id: i64, value: Option<&Value>) -> Result<u64, MalformedRecordError> {
    let field = "signature_count";
    match value {
        None | Some(Value::Null) => Err(MalformedRecordError::missing(Some(id), field)),
        Some(Value::Number(n)) => match (n.as_u64(), n.as_i64()) {
            (Some(count), _) => Ok(count),
            (None, Some(_)) => Err(MalformedRecordError::invalid(Some(id), field, "negative")),
            (None, None) => Err(MalformedRecordError::invalid(
                Some(id),
                field,
                "not an integer",
            )),
        },
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| MalformedRecordError::invalid(Some(id), field, "not a non-negative integer")),
        Some(_) => Err(MalformedRecordError::invalid(
            Some(id),
            field,
            "not an integer",
        )),
    }
}

fn required_timestamp(
    id: i64,
    value: Option<&Value>,
) -> Result<DateTime<Utc>, MalformedRecordError> {
    let field = "created_at";
    match value {
        None | Some(Value::Null) => Err(MalformedRecordError::missing(Some(id), field)),
        Some(Value::String(s)) => parse_timestamp(s)
            .map_err(|err| MalformedRecordError::invalid(Some(id), field, err.to_string())),
        Some(_) => Err(MalformedRecordError::invalid(
            Some(id),
            field,
            "not a string",
        )),
    }
}

fn optional_timestamp(
    milestone: Milestone,
    value: Option<&Value>,
    warnings: &mut Vec<RecordWarning>,
) -> Option<DateTime<Utc>> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => match parse_timestamp(s) {
            Ok(ts) => Some(ts),
            Err(_) => {
                warnings.push(RecordWarning::UnparseableTimestamp {
                    field: milestone,
                    value: s.clone(),
                });
                None
            }
        },
        Some(other) => {
            warnings.push(RecordWarning::UnparseableTimestamp {
                field: milestone,
                value: other.to_string(),
            });
            None
        }
    }
}
