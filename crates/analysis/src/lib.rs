pub mod backlog;
pub mod distribution;
pub mod durations;
pub mod filter;
pub mod ranking;
pub mod stats;

pub use backlog::{backlog, waiting_days, BacklogStats, WaitingKind};
pub use distribution::Distribution;
pub use durations::{durations_for, MilestonePair};
pub use filter::{FilterError, PetitionFilter, TitleSearch};
pub use ranking::{
    sort_records, top_petitions, Metric, RankedPetition, SortKey, SortOrder, TopPetitions,
};
pub use stats::{
    aggregate, aggregate_batch, canonical_records, AggregateStats, MilestoneCounts,
    PetitionDurations, SignatureBand,
};
