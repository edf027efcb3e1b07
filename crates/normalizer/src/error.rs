use serde::Serialize;

/// Why a raw record could not become a [`crate::PetitionRecord`]. Carries the
/// upstream id whenever it was recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MalformedRecordError {
    #[error("record could not be decoded: {reason}")]
    Decode { id: Option<i64>, reason: String },
    #[error("missing required field `{field}`")]
    MissingField { id: Option<i64>, field: &'static str },
    #[error("field `{field}` is invalid: {reason}")]
    InvalidField {
        id: Option<i64>,
        field: &'static str,
        reason: String,
    },
}

impl MalformedRecordError {
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Decode { id, .. }
            | Self::MissingField { id, .. }
            | Self::InvalidField { id, .. } => *id,
        }
    }

    pub(crate) fn missing(id: Option<i64>, field: &'static str) -> Self {
        Self::MissingField { id, field }
    }

    pub(crate) fn invalid(id: Option<i64>, field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            id,
            field,
            reason: reason.into(),
        }
    }
}
