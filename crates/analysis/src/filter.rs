use std::collections::BTreeSet;

use common::text::{contains_folded, fold_for_search};
use normalizer::{PetitionRecord, PetitionState};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("min_signatures ({min}) is greater than max_signatures ({max})")]
    InvertedSignatureRange { min: u64, max: u64 },
}

/// Title matching. Exact matching compares whole folded titles against a
/// list; substring matching looks for one folded needle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleSearch {
    Exact(Vec<String>),
    Contains(String),
}

impl TitleSearch {
    fn matches(&self, title: &str) -> bool {
        match self {
            TitleSearch::Exact(titles) => {
                let folded = fold_for_search(title);
                titles.iter().any(|candidate| fold_for_search(candidate) == folded)
            }
            TitleSearch::Contains(needle) => contains_folded(title, needle),
        }
    }
}

/// Record-level filter. Empty sets and `None` bounds match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PetitionFilter {
    pub states: BTreeSet<PetitionState>,
    pub departments: BTreeSet<String>,
    pub min_signatures: Option<u64>,
    pub max_signatures: Option<u64>,
    pub search: Option<TitleSearch>,
}

impl PetitionFilter {
    pub fn validate(&self) -> Result<(), FilterError> {
        match (self.min_signatures, self.max_signatures) {
            (Some(min), Some(max)) if min > max => {
                Err(FilterError::InvertedSignatureRange { min, max })
            }
            _ => Ok(()),
        }
    }

    pub fn matches(&self, record: &PetitionRecord) -> bool {
        if !self.states.is_empty() && !self.states.contains(&record.state) {
            return false;
        }
        if !self.departments.is_empty()
            && !self.departments.contains(record.primary_department())
        {
            return false;
        }
        if self.min_signatures.is_some_and(|min| record.signature_count < min) {
            return false;
        }
        if self.max_signatures.is_some_and(|max| record.signature_count > max) {
            return false;
        }
        self.search
            .as_ref()
            .map_or(true, |search| search.matches(&record.title))
    }

    pub fn apply<'a, I>(&self, records: I) -> Result<Vec<&'a PetitionRecord>, FilterError>
    where
        I: IntoIterator<Item = &'a PetitionRecord>,
    {
        self.validate()?;
        Ok(records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect())
    }
}
