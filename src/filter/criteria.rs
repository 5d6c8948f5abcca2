use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{JournalError, Result};
use crate::types::Strategy;

/// Tag id meaning "no tag filter": every trade passes and keeps its full tag
/// list, untagged trades included.
pub const NO_TAG_FILTER: &str = "no_tag";

/// Inclusive day-key range. `0..0` means all time and an `end` of zero
/// leaves the range open-ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: i64,
    pub end: i64,
}

impl DateRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn is_all_time(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.end != 0 && self.start > self.end {
            return Err(JournalError::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn contains(&self, day_key: i64) -> bool {
        if self.is_all_time() {
            return true;
        }
        self.start <= day_key && (self.end == 0 || day_key <= self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub date_range: DateRange,
    /// Accounts to include. An empty set matches nothing.
    pub accounts: HashSet<String>,
    pub positions: HashSet<Strategy>,
    pub selected_tag_ids: HashSet<String>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            date_range: DateRange::all_time(),
            accounts: HashSet::new(),
            positions: Strategy::all().into_iter().collect(),
            selected_tag_ids: HashSet::new(),
        }
    }
}

impl FilterCriteria {
    /// All time, both directions, no tag filter, over the given accounts.
    pub fn for_accounts<I, S>(accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accounts: accounts.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    pub fn with_positions(mut self, positions: impl IntoIterator<Item = Strategy>) -> Self {
        self.positions = positions.into_iter().collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tag_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_tag_ids = tag_ids.into_iter().map(Into::into).collect();
        self
    }

    /// True when tags do not restrict the selection.
    pub fn tag_filter_disabled(&self) -> bool {
        self.selected_tag_ids.is_empty() || self.selected_tag_ids.contains(NO_TAG_FILTER)
    }

    pub fn validate(&self) -> Result<()> {
        self.date_range.validate()
    }
}
