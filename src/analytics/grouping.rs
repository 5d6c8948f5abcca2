use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use super::guard::finite;
use super::totals::{compute_totals, day_key, TotalsRecord};
use crate::config::GroupingSettings;
use crate::types::Trade;

pub const NO_TAGS_BUCKET: &str = "no_tags";
pub const UNGROUPED_BUCKET: &str = "ungrouped";

const WEEKDAYS: [&str; 7] = ["Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"];

/// Upper bounds in seconds, lower bound inclusive.
const DURATION_BANDS: [(i64, &str); 7] = [
    (60, "0-1m"),
    (120, "1-2m"),
    (300, "2-5m"),
    (600, "5-10m"),
    (1_200, "10-20m"),
    (2_400, "20-40m"),
    (3_600, "40-60m"),
];

const MARKET_CAP_BANDS: [(i64, &str); 4] = [
    (50_000_000, "nano"),
    (300_000_000, "micro"),
    (2_000_000_000, "small"),
    (10_000_000_000, "mid"),
];

const FLOAT_BANDS: [(i64, &str); 7] = [
    (5_000_000, "0-5M"),
    (10_000_000, "5-10M"),
    (15_000_000, "10-15M"),
    (20_000_000, "15-20M"),
    (30_000_000, "20-30M"),
    (40_000_000, "30-40M"),
    (50_000_000, "40-50M"),
];

const ENTRY_PRICE_BANDS: [(i64, &str); 6] = [
    (5, "0-5"),
    (10, "5-10"),
    (15, "10-15"),
    (20, "15-20"),
    (25, "20-25"),
    (30, "25-30"),
];

const TRADES_PER_DAY_BAND: usize = 5;
const TRADES_PER_DAY_CAP: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupDimension {
    DayOfWeek,
    TimeOfDay,
    Duration,
    TradesPerDay,
    Executions,
    Symbol,
    MarketCap,
    PublicFloat,
    EntryPrice,
    Tags,
    TagGroups,
}

impl GroupDimension {
    pub fn all() -> [GroupDimension; 11] {
        [
            GroupDimension::DayOfWeek,
            GroupDimension::TimeOfDay,
            GroupDimension::Duration,
            GroupDimension::TradesPerDay,
            GroupDimension::Executions,
            GroupDimension::Symbol,
            GroupDimension::MarketCap,
            GroupDimension::PublicFloat,
            GroupDimension::EntryPrice,
            GroupDimension::Tags,
            GroupDimension::TagGroups,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupDimension::DayOfWeek => "day_of_week",
            GroupDimension::TimeOfDay => "time_of_day",
            GroupDimension::Duration => "duration",
            GroupDimension::TradesPerDay => "trades_per_day",
            GroupDimension::Executions => "executions",
            GroupDimension::Symbol => "symbol",
            GroupDimension::MarketCap => "market_cap",
            GroupDimension::PublicFloat => "public_float",
            GroupDimension::EntryPrice => "entry_price",
            GroupDimension::Tags => "tags",
            GroupDimension::TagGroups => "tag_groups",
        }
    }

    /// Whether every trade lands in at most one bucket. Tag dimensions fan
    /// out instead.
    pub fn is_partition(&self) -> bool {
        !matches!(self, GroupDimension::Tags | GroupDimension::TagGroups)
    }
}

impl fmt::Display for GroupDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trades sharing one bucket key within a dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupBucket {
    pub key: String,
    /// Natural sort position of the bucket within its dimension.
    pub rank: i64,
    pub trades: Vec<Trade>,
    pub totals: TotalsRecord,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Groupings {
    pub dimensions: BTreeMap<GroupDimension, Vec<GroupBucket>>,
}

impl Groupings {
    pub fn buckets(&self, dimension: GroupDimension) -> &[GroupBucket] {
        self.dimensions
            .get(&dimension)
            .map(|b| b.as_slice())
            .unwrap_or(&[])
    }

    pub fn bucket(&self, dimension: GroupDimension, key: &str) -> Option<&GroupBucket> {
        self.buckets(dimension).iter().find(|b| b.key == key)
    }
}

/// Every grouping dimension over the same trade set.
pub fn compute_groupings(trades: &[Trade], settings: &GroupingSettings, tz: Tz) -> Groupings {
    let dimensions = GroupDimension::all()
        .into_iter()
        .map(|dimension| (dimension, group_by(dimension, trades, settings, tz)))
        .collect();
    Groupings { dimensions }
}

/// Buckets of one dimension, in natural order.
pub fn group_by(
    dimension: GroupDimension,
    trades: &[Trade],
    settings: &GroupingSettings,
    tz: Tz,
) -> Vec<GroupBucket> {
    let mut buckets: BTreeMap<(i64, String), Vec<Trade>> = BTreeMap::new();

    match dimension {
        GroupDimension::TradesPerDay => {
            let mut per_day: HashMap<i64, usize> = HashMap::new();
            for trade in trades {
                *per_day.entry(day_key(trade, tz)).or_default() += 1;
            }
            for trade in trades {
                let key = trades_per_day_band(per_day[&day_key(trade, tz)]);
                buckets.entry(key).or_default().push(trade.clone());
            }
        }
        GroupDimension::Tags | GroupDimension::TagGroups => {
            for trade in trades {
                for key in tag_keys(dimension, trade) {
                    buckets.entry((0, key)).or_default().push(trade.clone());
                }
            }
        }
        _ => {
            for trade in trades {
                if let Some(key) = bucket_key(dimension, trade, settings, tz) {
                    buckets.entry(key).or_default().push(trade.clone());
                }
            }
        }
    }

    buckets
        .into_iter()
        .map(|((rank, key), trades)| {
            let totals = compute_totals(&trades);
            GroupBucket { key, rank, trades, totals }
        })
        .collect()
}

/// `(rank, label)` of a trade in a single-membership dimension, or `None`
/// when the trade lacks the field the dimension bands on.
fn bucket_key(
    dimension: GroupDimension,
    trade: &Trade,
    settings: &GroupingSettings,
    tz: Tz,
) -> Option<(i64, String)> {
    match dimension {
        GroupDimension::DayOfWeek => {
            let local = local_time(trade.entry_time, tz)?;
            let day = local.weekday().num_days_from_sunday() as usize;
            Some((day as i64, WEEKDAYS[day].to_string()))
        }
        GroupDimension::TimeOfDay => {
            let local = local_time(trade.entry_time, tz)?;
            let frame = settings.time_frame_minutes.max(1);
            let minutes = local.hour() * 60 + local.minute();
            let floored = minutes - minutes % frame;
            Some((floored as i64, format!("{:02}:{:02}", floored / 60, floored % 60)))
        }
        GroupDimension::Duration => {
            let secs = trade.duration_secs().filter(|s| *s >= 0)?;
            let rank = DURATION_BANDS
                .iter()
                .position(|(upper, _)| secs < *upper)
                .unwrap_or(DURATION_BANDS.len());
            let label = DURATION_BANDS
                .get(rank)
                .map(|(_, label)| label.to_string())
                .unwrap_or_else(|| "+60m".to_string());
            Some((rank as i64, label))
        }
        GroupDimension::Executions => {
            let count = trade.executions_count?;
            Some((count as i64, count.to_string()))
        }
        GroupDimension::Symbol => Some((0, trade.symbol.clone())),
        GroupDimension::MarketCap => {
            band(finite(trade.market_cap())?, &MARKET_CAP_BANDS, "big")
        }
        GroupDimension::PublicFloat => {
            band(finite(trade.public_float())?, &FLOAT_BANDS, "+50M")
        }
        GroupDimension::EntryPrice => {
            band(finite(trade.entry_price)?, &ENTRY_PRICE_BANDS, "+30")
        }
        GroupDimension::TradesPerDay | GroupDimension::Tags | GroupDimension::TagGroups => None,
    }
}

fn band(value: Decimal, bands: &[(i64, &str)], overflow: &str) -> Option<(i64, String)> {
    if value < Decimal::ZERO {
        return None;
    }
    let position = bands
        .iter()
        .position(|(upper, _)| value < Decimal::from(*upper));
    Some(match position {
        Some(rank) => (rank as i64, bands[rank].1.to_string()),
        None => (bands.len() as i64, overflow.to_string()),
    })
}

/// Ceiling band: 1-5 trades → "5", 6-10 → "10", …, more than 30 → "+30".
fn trades_per_day_band(count: usize) -> (i64, String) {
    if count > TRADES_PER_DAY_CAP {
        return ((TRADES_PER_DAY_CAP + 1) as i64, format!("+{}", TRADES_PER_DAY_CAP));
    }
    let ceiling = count.div_ceil(TRADES_PER_DAY_BAND).max(1) * TRADES_PER_DAY_BAND;
    (ceiling as i64, ceiling.to_string())
}

fn tag_keys(dimension: GroupDimension, trade: &Trade) -> BTreeSet<String> {
    if trade.tags.is_empty() {
        return BTreeSet::from([NO_TAGS_BUCKET.to_string()]);
    }
    trade
        .tags
        .iter()
        .map(|tag| match dimension {
            GroupDimension::TagGroups => tag
                .group_name
                .clone()
                .unwrap_or_else(|| UNGROUPED_BUCKET.to_string()),
            _ if tag.name.is_empty() => tag.id.clone(),
            _ => tag.name.clone(),
        })
        .collect()
}

fn local_time(epoch_secs: i64, tz: Tz) -> Option<DateTime<Tz>> {
    Utc.timestamp_opt(epoch_secs, 0)
        .single()
        .map(|utc| utc.with_timezone(&tz))
}
