pub mod snapshot;

pub use snapshot::*;

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::DateRange;
use crate::types::{Excursion, Satisfaction, TagAssignment, TagGroup, TradeDay};

/// Journal backend the store pulls its raw data from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JournalSource: Send + Sync {
    async fn fetch_trades(&self, date_range: DateRange, accounts: Vec<String>) -> Result<Vec<TradeDay>>;
    async fn fetch_tag_assignments(&self) -> Result<Vec<TagAssignment>>;
    async fn fetch_tag_definitions(&self) -> Result<Vec<TagGroup>>;
    async fn fetch_excursions(&self) -> Result<Vec<Excursion>>;
    async fn fetch_satisfactions(&self) -> Result<Vec<Satisfaction>>;
}
