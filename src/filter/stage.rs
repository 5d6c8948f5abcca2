use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, error};

use super::criteria::FilterCriteria;
use crate::error::Result;
use crate::types::{JournalLookups, Trade, TradeDay, TradeTag};

/// Output of the filter stage. `flat_trades` follows the order of `days`
/// (newest day first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilteredTrades {
    pub days: Vec<TradeDay>,
    pub flat_trades: Vec<Trade>,
    pub has_data: bool,
}

impl FilteredTrades {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn trade_count(&self) -> usize {
        self.flat_trades.len()
    }
}

/// Select and enrich the trades matching `criteria`.
///
/// Never fails: an invalid criteria set is logged and produces the empty
/// result, exactly like a selection with no matches.
pub fn filter_trades(days: &[TradeDay], criteria: &FilterCriteria, lookups: &JournalLookups) -> FilteredTrades {
    match try_filter(days, criteria, lookups) {
        Ok(filtered) => filtered,
        Err(e) => {
            error!("Trade filtering failed: {}", e);
            FilteredTrades::empty()
        }
    }
}

fn try_filter(days: &[TradeDay], criteria: &FilterCriteria, lookups: &JournalLookups) -> Result<FilteredTrades> {
    criteria.validate()?;

    let mut selected: Vec<TradeDay> = days
        .iter()
        .filter(|day| criteria.date_range.contains(day.date_unix))
        .filter_map(|day| {
            let trades: Vec<Trade> = day
                .trades
                .iter()
                .filter_map(|trade| select_trade(trade, day.date_unix, criteria, lookups))
                .collect();
            if trades.is_empty() {
                return None;
            }
            Some(TradeDay {
                date_unix: day.date_unix,
                trades,
                satisfaction: day.satisfaction,
                p_and_l: day.p_and_l.clone(),
                blotter: day.blotter.clone(),
            })
        })
        .collect();

    selected.sort_by(|a, b| b.date_unix.cmp(&a.date_unix));

    let flat_trades: Vec<Trade> = selected
        .iter()
        .flat_map(|day| day.trades.iter().cloned())
        .collect();

    debug!(
        "Filter kept {} trades across {} of {} days",
        flat_trades.len(),
        selected.len(),
        days.len()
    );

    Ok(FilteredTrades {
        has_data: !flat_trades.is_empty(),
        days: selected,
        flat_trades,
    })
}

/// Enriched copy of `trade` if it passes the account, direction and tag
/// tests.
fn select_trade(trade: &Trade, day_key: i64, criteria: &FilterCriteria, lookups: &JournalLookups) -> Option<Trade> {
    let direction_selected = trade
        .strategy
        .map_or(false, |direction| criteria.positions.contains(&direction));
    if !criteria.accounts.contains(&trade.account) || !direction_selected {
        return None;
    }

    let resolved = resolve_tags(trade, day_key, lookups);
    let tags = if criteria.tag_filter_disabled() {
        resolved
    } else {
        let matching: Vec<TradeTag> = resolved
            .into_iter()
            .filter(|tag| criteria.selected_tag_ids.contains(&tag.id))
            .collect();
        if matching.is_empty() {
            return None;
        }
        matching
    };

    let excursion = lookups.excursion(&trade.id);
    Some(Trade {
        td: Some(day_key),
        tags,
        satisfaction: lookups.satisfaction(&trade.id, day_key),
        stop_loss: excursion.and_then(|e| e.stop_loss),
        mae_price: excursion.and_then(|e| e.mae_price),
        mfe_price: excursion.and_then(|e| e.mfe_price),
        ..trade.clone()
    })
}

/// Tag ids from the trade's assignment, else its day's assignment, else
/// the tags already on the record. Each id is resolved once.
fn resolve_tags(trade: &Trade, day_key: i64, lookups: &JournalLookups) -> Vec<TradeTag> {
    let ids: Vec<&str> = match lookups.assigned_tags(&trade.id, day_key) {
        Some(ids) => ids.iter().map(String::as_str).collect(),
        None => trade.tag_ids().collect(),
    };

    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(*id))
        .map(|id| lookups.resolve_tag(id, &trade.tags))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::totals::tests::closed_trade;
    use crate::filter::criteria::{DateRange, NO_TAG_FILTER};
    use crate::types::{Excursion, Satisfaction, Strategy, TagAssignment, TagDefinition, TagGroup};

    const DAY1: i64 = 1_704_690_000;
    const DAY2: i64 = DAY1 + 86_400;
    const DAY3: i64 = DAY2 + 86_400;

    fn journal() -> Vec<TradeDay> {
        let mut short = closed_trade("t3", DAY2, Strategy::Short, 20.0, 19.0, 50.0, 1.0);
        short.account = "ira".to_string();
        vec![
            TradeDay::new(
                DAY1,
                vec![
                    closed_trade("t1", DAY1, Strategy::Long, 10.0, 11.0, 100.0, 1.0),
                    closed_trade("t2", DAY1, Strategy::Long, 10.0, 9.0, 100.0, 1.0),
                ],
            ),
            TradeDay::new(DAY2, vec![short]),
            TradeDay::new(DAY3, vec![closed_trade("t4", DAY3, Strategy::Long, 5.0, 6.0, 10.0, 0.0)]),
        ]
    }

    fn lookups() -> JournalLookups {
        JournalLookups::new(
            &[
                TagAssignment { trade_id: "t1".into(), tags: vec!["a".into(), "b".into(), "a".into()] },
                TagAssignment { trade_id: DAY3.to_string(), tags: vec!["b".into()] },
            ],
            &[TagGroup {
                id: "g".into(),
                name: "Setups".into(),
                color: None,
                tags: vec![
                    TagDefinition { id: "a".into(), name: "Breakout".into() },
                    TagDefinition { id: "b".into(), name: "Pullback".into() },
                ],
            }],
            &[Excursion {
                trade_id: "t1".into(),
                date_unix: Some(DAY1),
                stop_loss: Some(9.5),
                mae_price: Some(9.8),
                mfe_price: Some(11.5),
            }],
            &[
                Satisfaction { date_unix: Some(DAY1), trade_id: None, satisfaction: false },
                Satisfaction { date_unix: None, trade_id: Some("t1".into()), satisfaction: true },
            ],
        )
    }

    fn ids(filtered: &FilteredTrades) -> Vec<&str> {
        filtered.flat_trades.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_all_time_selection_sorted_newest_first() {
        let criteria = FilterCriteria::for_accounts(["main", "ira"]);
        let filtered = filter_trades(&journal(), &criteria, &lookups());
        assert!(filtered.has_data);
        assert_eq!(filtered.days.len(), 3);
        assert_eq!(filtered.days[0].date_unix, DAY3);
        assert_eq!(ids(&filtered), vec!["t4", "t3", "t1", "t2"]);
    }

    #[test]
    fn test_empty_account_set_has_no_data() {
        let filtered = filter_trades(&journal(), &FilterCriteria::default(), &lookups());
        assert!(!filtered.has_data);
        assert!(filtered.days.is_empty());
        assert!(filtered.flat_trades.is_empty());
    }

    #[test]
    fn test_account_and_direction_filters() {
        let criteria = FilterCriteria::for_accounts(["main", "ira"]).with_positions([Strategy::Short]);
        let filtered = filter_trades(&journal(), &criteria, &lookups());
        assert_eq!(ids(&filtered), vec!["t3"]);

        let criteria = FilterCriteria::for_accounts(["main"]);
        let filtered = filter_trades(&journal(), &criteria, &lookups());
        assert_eq!(ids(&filtered), vec!["t4", "t1", "t2"]);
    }

    #[test]
    fn test_trade_without_direction_is_excluded() {
        let mut days = journal();
        days[0].trades[1].strategy = None;

        let both = FilterCriteria::for_accounts(["main"]);
        assert_eq!(ids(&filter_trades(&days, &both, &lookups())), vec!["t4", "t1"]);

        let long_only = FilterCriteria::for_accounts(["main"]).with_positions([Strategy::Long]);
        assert_eq!(ids(&filter_trades(&days, &long_only, &lookups())), vec!["t4", "t1"]);
    }

    #[test]
    fn test_date_range_on_day_key() {
        let criteria = FilterCriteria::for_accounts(["main", "ira"]).with_date_range(DateRange::new(DAY2, DAY2));
        assert_eq!(ids(&filter_trades(&journal(), &criteria, &lookups())), vec!["t3"]);

        let criteria = FilterCriteria::for_accounts(["main", "ira"]).with_date_range(DateRange::new(DAY2, 0));
        assert_eq!(ids(&filter_trades(&journal(), &criteria, &lookups())), vec!["t4", "t3"]);
    }

    #[test]
    fn test_invalid_range_yields_empty_result() {
        let criteria = FilterCriteria::for_accounts(["main"]).with_date_range(DateRange::new(DAY3, DAY1));
        let filtered = filter_trades(&journal(), &criteria, &lookups());
        assert_eq!(filtered, FilteredTrades::empty());
    }

    #[test]
    fn test_tag_filter_keeps_intersection() {
        let criteria = FilterCriteria::for_accounts(["main"]).with_tags(["b"]);
        let filtered = filter_trades(&journal(), &criteria, &lookups());
        // t1 via its own assignment, t4 via the day-level assignment.
        assert_eq!(ids(&filtered), vec!["t4", "t1"]);
        let t1 = &filtered.flat_trades[1];
        assert_eq!(t1.tags.len(), 1);
        assert_eq!(t1.tags[0].name, "Pullback");
    }

    #[test]
    fn test_no_tag_sentinel_keeps_full_tag_list() {
        let criteria = FilterCriteria::for_accounts(["main"]).with_tags([NO_TAG_FILTER]);
        let filtered = filter_trades(&journal(), &criteria, &lookups());
        assert_eq!(filtered.trade_count(), 3);
        let t1 = filtered.flat_trades.iter().find(|t| t.id == "t1").unwrap();
        let names: Vec<&str> = t1.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Breakout", "Pullback"]);
        let t2 = filtered.flat_trades.iter().find(|t| t.id == "t2").unwrap();
        assert!(t2.tags.is_empty());
    }

    #[test]
    fn test_raw_tags_used_without_assignment() {
        let mut days = journal();
        days[0].trades[1].tags = vec![TradeTag::unresolved("raw")];
        let criteria = FilterCriteria::for_accounts(["main"]).with_tags(["raw"]);
        let filtered = filter_trades(&days, &criteria, &lookups());
        assert_eq!(ids(&filtered), vec!["t2"]);
    }

    #[test]
    fn test_enrichment() {
        let mut days = journal();
        days[0].trades[1].td = None;
        days[0].trades[1].mfe_price = Some(99.0);
        let criteria = FilterCriteria::for_accounts(["main"]);
        let filtered = filter_trades(&days, &criteria, &lookups());

        let t1 = filtered.flat_trades.iter().find(|t| t.id == "t1").unwrap();
        assert_eq!(t1.satisfaction, Some(true));
        assert_eq!(t1.stop_loss, Some(9.5));
        assert_eq!(t1.mfe_price, Some(11.5));

        let t2 = filtered.flat_trades.iter().find(|t| t.id == "t2").unwrap();
        assert_eq!(t2.td, Some(DAY1));
        assert_eq!(t2.satisfaction, Some(false));
        assert_eq!(t2.mfe_price, None);
    }
}
