use analysis::{SortKey, SortOrder};
use collector::FilterState;
use normalizer::{MalformedRecordError, PetitionRecord};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MalformedEntryDto {
    /// Index of the raw record in the upstream listing.
    pub position: usize,
    pub error: MalformedRecordError,
}

impl MalformedEntryDto {
    pub fn new(position: usize, error: &MalformedRecordError) -> Self {
        Self {
            position,
            error: error.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PetitionsPageDto {
    pub state: FilterState,
    pub sort: SortKey,
    pub order: SortOrder,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub total_matching: usize,
    pub skipped_count: usize,
    pub items: Vec<PetitionRecord>,
    pub errors: Vec<MalformedEntryDto>,
}

impl PetitionsPageDto {
    /// Slices an already sorted list. `page` is 1-based and clamped to the
    /// available range.
    pub fn paginate(
        state: FilterState,
        sorted: &[&PetitionRecord],
        page: usize,
        per_page: usize,
        errors: Vec<MalformedEntryDto>,
    ) -> Self {
        let total_matching = sorted.len();
        let total_pages = total_matching.div_ceil(per_page).max(1);
        let page = page.clamp(1, total_pages);
        let items = sorted
            .iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .map(|record| (*record).clone())
            .collect();
        Self {
            state,
            sort: SortKey::default(),
            order: SortOrder::default(),
            page,
            per_page,
            total_pages,
            total_matching,
            skipped_count: errors.len(),
            items,
            errors,
        }
    }

    /// Records the ordering the items were sorted with.
    pub fn sorted_by(mut self, sort: SortKey, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshDto {
    pub invalidated: usize,
}
