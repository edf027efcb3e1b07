use std::cmp::Ordering;
use std::collections::BTreeMap;

use normalizer::{Milestone, NormalizedBatch, PetitionRecord, PetitionState};
use serde::Serialize;
use tracing::debug;

use crate::distribution::Distribution;
use crate::durations::{durations_for, MilestonePair};

/// Signature-count histogram buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SignatureBand {
    #[serde(rename = "under_100")]
    Under100,
    #[serde(rename = "100_to_999")]
    Hundreds,
    #[serde(rename = "1k_to_9999")]
    Thousands,
    #[serde(rename = "10k_to_99999")]
    TensOfThousands,
    #[serde(rename = "100k_plus")]
    HundredThousandPlus,
}

impl SignatureBand {
    pub const ALL: [SignatureBand; 5] = [
        SignatureBand::Under100,
        SignatureBand::Hundreds,
        SignatureBand::Thousands,
        SignatureBand::TensOfThousands,
        SignatureBand::HundredThousandPlus,
    ];

    pub fn of(count: u64) -> Self {
        match count {
            0..=99 => SignatureBand::Under100,
            100..=999 => SignatureBand::Hundreds,
            1_000..=9_999 => SignatureBand::Thousands,
            10_000..=99_999 => SignatureBand::TensOfThousands,
            _ => SignatureBand::HundredThousandPlus,
        }
    }
}

/// How many petitions have reached each lifecycle milestone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MilestoneCounts {
    pub threshold_10k: usize,
    pub threshold_100k: usize,
    pub government_response: usize,
    pub debate_scheduled: usize,
    pub debated: usize,
    pub open_or_closed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PetitionDurations {
    pub id: i64,
    pub durations: BTreeMap<MilestonePair, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    /// Distinct petitions aggregated.
    pub total: usize,
    /// Raw records that failed normalization.
    pub skipped_count: usize,
    /// Extra snapshots of an id already seen in the same input.
    pub duplicate_count: usize,
    pub by_state: BTreeMap<PetitionState, usize>,
    pub by_department: BTreeMap<String, usize>,
    pub signatures: Distribution,
    pub signature_bands: BTreeMap<SignatureBand, usize>,
    pub milestones: MilestoneCounts,
    pub durations: BTreeMap<MilestonePair, Distribution>,
    pub per_petition: Vec<PetitionDurations>,
    pub warning_count: usize,
}

impl AggregateStats {
    fn empty() -> Self {
        Self {
            total: 0,
            skipped_count: 0,
            duplicate_count: 0,
            by_state: PetitionState::ALL.into_iter().map(|s| (s, 0)).collect(),
            by_department: BTreeMap::new(),
            signatures: Distribution::default(),
            signature_bands: SignatureBand::ALL.into_iter().map(|b| (b, 0)).collect(),
            milestones: MilestoneCounts::default(),
            durations: MilestonePair::ALL
                .into_iter()
                .map(|pair| (pair, Distribution::default()))
                .collect(),
            per_petition: Vec::new(),
            warning_count: 0,
        }
    }
}

/// Orders records by id and keeps one snapshot per id, preferring the highest
/// signature count. The result is independent of input order.
pub fn canonical_records<'a, I>(records: I) -> Vec<&'a PetitionRecord>
where
    I: IntoIterator<Item = &'a PetitionRecord>,
{
    let mut sorted: Vec<&PetitionRecord> = records.into_iter().collect();
    sorted.sort_by(|a, b| canonical_cmp(a, b));
    let mut unique: Vec<&PetitionRecord> = Vec::with_capacity(sorted.len());
    for record in sorted {
        match unique.last_mut() {
            Some(last) if last.id == record.id => *last = record,
            _ => unique.push(record),
        }
    }
    unique
}

/// Total order over every record field, so two snapshots only compare equal
/// when they are identical.
fn canonical_cmp(a: &PetitionRecord, b: &PetitionRecord) -> Ordering {
    let milestones = |record: &PetitionRecord| {
        Milestone::OPTIONAL
            .into_iter()
            .map(|milestone| record.milestone(milestone))
            .collect::<Vec<_>>()
    };
    a.id.cmp(&b.id)
        .then(a.signature_count.cmp(&b.signature_count))
        .then(a.state.cmp(&b.state))
        .then(a.created_at.cmp(&b.created_at))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| milestones(a).cmp(&milestones(b)))
        .then_with(|| a.departments.cmp(&b.departments))
        .then_with(|| a.rejection_code.cmp(&b.rejection_code))
        .then_with(|| a.url.cmp(&b.url))
        .then_with(|| a.government_response_summary.cmp(&b.government_response_summary))
        .then_with(|| a.debate_links.cmp(&b.debate_links))
        .then_with(|| a.warnings.cmp(&b.warnings))
}

pub fn aggregate<'a, I>(records: I) -> AggregateStats
where
    I: IntoIterator<Item = &'a PetitionRecord>,
{
    let input: Vec<&PetitionRecord> = records.into_iter().collect();
    let input_len = input.len();
    let unique = canonical_records(input);

    let mut stats = AggregateStats::empty();
    stats.total = unique.len();
    stats.duplicate_count = input_len - unique.len();
    if stats.duplicate_count > 0 {
        debug!(duplicates = stats.duplicate_count, "collapsed duplicate petition snapshots");
    }

    let mut duration_samples: BTreeMap<MilestonePair, Vec<f64>> = BTreeMap::new();
    for record in &unique {
        *stats.by_state.entry(record.state).or_default() += 1;
        *stats
            .by_department
            .entry(record.primary_department().to_string())
            .or_default() += 1;
        *stats
            .signature_bands
            .entry(SignatureBand::of(record.signature_count))
            .or_default() += 1;
        stats.warning_count += record.warnings.len();
        count_milestones(&mut stats.milestones, record);

        let durations = durations_for(record);
        for (pair, days) in &durations {
            duration_samples.entry(*pair).or_default().push(*days as f64);
        }
        stats.per_petition.push(PetitionDurations {
            id: record.id,
            durations,
        });
    }

    stats.signatures =
        Distribution::from_values(unique.iter().map(|record| record.signature_count as f64));
    for (pair, samples) in duration_samples {
        stats.durations.insert(pair, Distribution::from_values(samples));
    }
    stats
}

/// Aggregates the valid subset of a batch and reports how many raw records
/// were skipped.
pub fn aggregate_batch(batch: &NormalizedBatch) -> AggregateStats {
    let mut stats = aggregate(batch.records());
    stats.skipped_count = batch.skipped_count();
    stats
}

fn count_milestones(counts: &mut MilestoneCounts, record: &PetitionRecord) {
    counts.threshold_10k += usize::from(record.threshold_10k_reached_at.is_some());
    counts.threshold_100k += usize::from(record.threshold_100k_reached_at.is_some());
    counts.government_response += usize::from(record.government_response_at.is_some());
    counts.debate_scheduled += usize::from(record.debate_scheduled_at.is_some());
    counts.debated += usize::from(record.debated_at.is_some());
    counts.open_or_closed += usize::from(matches!(
        record.state,
        PetitionState::Open | PetitionState::Closed
    ));
}
