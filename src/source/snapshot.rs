use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::JournalSource;
use crate::error::{JournalError, Result};
use crate::filter::DateRange;
use crate::types::{Excursion, JournalLookups, Satisfaction, TagAssignment, TagGroup, TradeDay};

/// Everything the analytics pipeline reads from the journal backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalSnapshot {
    pub days: Vec<TradeDay>,
    pub tag_assignments: Vec<TagAssignment>,
    pub tag_groups: Vec<TagGroup>,
    pub excursions: Vec<Excursion>,
    pub satisfactions: Vec<Satisfaction>,
}

impl JournalSnapshot {
    pub fn lookups(&self) -> JournalLookups {
        JournalLookups::new(
            &self.tag_assignments,
            &self.tag_groups,
            &self.excursions,
            &self.satisfactions,
        )
    }

    pub fn trade_count(&self) -> usize {
        self.days.iter().map(|d| d.trades.len()).sum()
    }

    /// Pull a full snapshot through `source`.
    pub async fn fetch(source: &dyn JournalSource, date_range: DateRange, accounts: Vec<String>) -> Result<Self> {
        Ok(Self {
            days: source.fetch_trades(date_range, accounts).await?,
            tag_assignments: source.fetch_tag_assignments().await?,
            tag_groups: source.fetch_tag_definitions().await?,
            excursions: source.fetch_excursions().await?,
            satisfactions: source.fetch_satisfactions().await?,
        })
    }
}

/// `JournalSource` over a JSON export of the journal. The file is re-read on
/// every fetch so edits are picked up by the next refresh.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    path: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<JournalSnapshot> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| JournalError::ReadFile {
                path: self.path.display().to_string(),
                source,
            })?;
        let snapshot: JournalSnapshot = serde_json::from_str(&raw)?;
        debug!(
            "Loaded snapshot {}: {} days, {} trades",
            self.path.display(),
            snapshot.days.len(),
            snapshot.trade_count()
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl JournalSource for JsonSnapshotSource {
    async fn fetch_trades(&self, date_range: DateRange, accounts: Vec<String>) -> Result<Vec<TradeDay>> {
        let snapshot = self.load().await?;
        let days: Vec<TradeDay> = snapshot
            .days
            .into_iter()
            .filter(|day| date_range.contains(day.date_unix))
            .filter_map(|mut day| {
                if !accounts.is_empty() {
                    day.trades.retain(|t| accounts.contains(&t.account));
                }
                (!day.trades.is_empty()).then_some(day)
            })
            .collect();
        info!("Fetched {} trading days from {}", days.len(), self.path.display());
        Ok(days)
    }

    async fn fetch_tag_assignments(&self) -> Result<Vec<TagAssignment>> {
        Ok(self.load().await?.tag_assignments)
    }

    async fn fetch_tag_definitions(&self) -> Result<Vec<TagGroup>> {
        Ok(self.load().await?.tag_groups)
    }

    async fn fetch_excursions(&self) -> Result<Vec<Excursion>> {
        Ok(self.load().await?.excursions)
    }

    async fn fetch_satisfactions(&self) -> Result<Vec<Satisfaction>> {
        Ok(self.load().await?.satisfactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "days": [
            {"date_unix": 1704690000, "trades": [
                {"id": "t1", "symbol": "AAPL", "account": "main", "strategy": "long", "entry_time": 1704724200, "gross_proceeds": 100.0},
                {"id": "t2", "symbol": "MSFT", "account": "ira", "strategy": "short", "entry_time": 1704724300, "gross_proceeds": null}
            ]},
            {"date_unix": 1704776400, "trades": [
                {"id": "t3", "symbol": "TSLA", "account": "main", "entry_time": 1704810600}
            ]}
        ],
        "tag_assignments": [{"trade_id": "t1", "tags": ["a"]}],
        "tag_groups": [{"id": "g", "name": "Setups", "tags": [{"id": "a", "name": "Breakout"}]}],
        "excursions": [{"trade_id": "t1", "mfe_price": 12.5}],
        "satisfactions": [{"trade_id": "t1", "satisfaction": true}]
    }"#;

    fn write_snapshot(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("journal_snapshot_{}_{}.json", name, std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_snapshot() {
        let path = write_snapshot("load", SNAPSHOT);
        let source = JsonSnapshotSource::new(&path);
        let snapshot = source.load().await.unwrap();
        assert_eq!(snapshot.days.len(), 2);
        assert_eq!(snapshot.trade_count(), 3);
        assert_eq!(snapshot.lookups().resolve_tag("a", &[]).name, "Breakout");
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_fetch_trades_applies_range_and_accounts() {
        let path = write_snapshot("fetch", SNAPSHOT);
        let source = JsonSnapshotSource::new(&path);

        let days = source
            .fetch_trades(DateRange::new(1704690000, 1704690000), vec!["main".to_string()])
            .await
            .unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].trades.len(), 1);
        assert_eq!(days[0].trades[0].id, "t1");

        let all = source.fetch_trades(DateRange::all_time(), Vec::new()).await.unwrap();
        assert_eq!(all.iter().map(|d| d.trades.len()).sum::<usize>(), 3);
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let source = JsonSnapshotSource::new("/nonexistent/journal.json");
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, JournalError::ReadFile { .. }));
    }

    #[tokio::test]
    async fn test_malformed_file_is_parse_error() {
        let path = write_snapshot("bad", "{ not json");
        let err = JsonSnapshotSource::new(&path).load().await.unwrap_err();
        assert!(matches!(err, JournalError::Parse(_)));
        std::fs::remove_file(path).ok();
    }
}
