pub mod error;
pub mod models;
pub mod payloads;
pub mod transform;

pub use error::MalformedRecordError;
pub use models::{
    DebateLinks, Milestone, PetitionRecord, PetitionState, RecordWarning, UNASSIGNED_DEPARTMENT,
};
pub use payloads::PetitionPayload;
pub use transform::{normalize, normalize_batch, BatchEntry, NormalizedBatch};
