use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::guard::{count_ratio, guard, guard_count, ratio};
use crate::types::{AmountCase, CaseAmounts, Outcome, Trade};

const SECONDS_PER_DAY: i64 = 86_400;

/// Aggregate of one amount case (gross or net) over a set of trades.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseTotals {
    pub proceeds: Decimal,
    pub wins: Decimal,
    pub loss: Decimal,
    pub share_pl: Decimal,
    pub share_pl_wins: Decimal,
    pub share_pl_loss: Decimal,
    /// Best per-share win of any single trade, never below zero.
    pub high_share_pl_win: Decimal,
    /// Worst per-share loss of any single trade, never above zero.
    pub high_share_pl_loss: Decimal,

    pub wins_count: u64,
    pub loss_count: u64,
    pub breakeven_count: u64,
    pub wins_quantity: Decimal,
    pub loss_quantity: Decimal,

    // Derived
    pub prob_wins: Decimal,
    pub prob_loss: Decimal,
    pub prob_breakeven: Decimal,
    pub avg_wins: Decimal,
    pub avg_loss: Decimal,
    pub profit_factor: Decimal,
}

impl CaseTotals {
    fn add(&mut self, amounts: CaseAmounts, shares: Decimal) {
        let proceeds = guard(amounts.proceeds);
        let share_pl_wins = guard(amounts.share_pl_wins);
        let share_pl_loss = guard(amounts.share_pl_loss);

        self.proceeds += proceeds;
        self.wins += guard(amounts.wins);
        self.loss += guard(amounts.loss);
        self.share_pl += guard(amounts.share_pl);
        self.share_pl_wins += share_pl_wins;
        self.share_pl_loss += share_pl_loss;
        self.high_share_pl_win = self.high_share_pl_win.max(share_pl_wins);
        self.high_share_pl_loss = self.high_share_pl_loss.min(share_pl_loss);

        match outcome(proceeds) {
            Outcome::Win => {
                self.wins_count += 1;
                self.wins_quantity += shares;
            }
            Outcome::Loss => {
                self.loss_count += 1;
                self.loss_quantity += shares;
            }
            Outcome::Breakeven => self.breakeven_count += 1,
        }
    }

    fn finish(&mut self, trades: u64) {
        self.prob_wins = count_ratio(self.wins_count, trades);
        self.prob_loss = count_ratio(self.loss_count, trades);
        self.prob_breakeven = count_ratio(self.breakeven_count, trades);
        self.avg_wins = ratio(self.wins, Decimal::from(self.wins_count));
        self.avg_loss = ratio(self.loss, Decimal::from(self.loss_count));
        self.profit_factor = ratio(self.wins, self.loss.abs());
    }
}

/// Flat aggregate over a set of trades. Always built in one pass from
/// scratch; never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalsRecord {
    pub trades: u64,
    /// Sum of the upstream per-record `trades_count`.
    pub trades_count: u64,
    pub executions: u64,
    pub quantity: Decimal,
    pub commission: Decimal,
    pub sec: Decimal,
    pub taf: Decimal,
    pub nscc: Decimal,
    pub nasdaq: Decimal,
    /// `sec + taf + nscc + nasdaq`
    pub fees: Decimal,
    pub gross: CaseTotals,
    pub net: CaseTotals,
}

impl TotalsRecord {
    pub fn case(&self, case: AmountCase) -> &CaseTotals {
        match case {
            AmountCase::Gross => &self.gross,
            AmountCase::Net => &self.net,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trades == 0
    }

    fn add(&mut self, trade: &Trade) {
        let sec = guard(trade.sec);
        let taf = guard(trade.taf);
        let nscc = guard(trade.nscc);
        let nasdaq = guard(trade.nasdaq);
        let shares = guard(trade.buy_quantity);

        self.trades += 1;
        self.trades_count += guard_count(trade.trades_count);
        self.executions += guard_count(trade.executions_count);
        self.quantity += shares + guard(trade.sell_quantity);
        self.commission += guard(trade.commission);
        self.sec += sec;
        self.taf += taf;
        self.nscc += nscc;
        self.nasdaq += nasdaq;
        self.fees += sec + taf + nscc + nasdaq;

        self.gross.add(trade.amounts(AmountCase::Gross), shares);
        self.net.add(trade.amounts(AmountCase::Net), shares);
    }

    fn finish(mut self) -> Self {
        let trades = self.trades;
        self.gross.finish(trades);
        self.net.finish(trades);
        self
    }
}

pub fn outcome(proceeds: Decimal) -> Outcome {
    if proceeds > Decimal::ZERO {
        Outcome::Win
    } else if proceeds < Decimal::ZERO {
        Outcome::Loss
    } else {
        Outcome::Breakeven
    }
}

/// Day key a trade is bucketed under: its owning day, or the local midnight
/// of its entry in `tz` for trades that never went through the filter stage.
pub fn day_key(trade: &Trade, tz: Tz) -> i64 {
    trade.td.unwrap_or_else(|| {
        local_midnight(trade.entry_time, tz)
            .unwrap_or_else(|| trade.entry_time - trade.entry_time.rem_euclid(SECONDS_PER_DAY))
    })
}

fn local_midnight(epoch_secs: i64, tz: Tz) -> Option<i64> {
    let local = Utc.timestamp_opt(epoch_secs, 0).single()?.with_timezone(&tz);
    let midnight = local.date_naive().and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp())
}

/// Global totals over `trades`.
pub fn compute_totals(trades: &[Trade]) -> TotalsRecord {
    let mut totals = TotalsRecord::default();
    for trade in trades {
        totals.add(trade);
    }
    totals.finish()
}

/// Totals per day key. The trades are regrouped by their own day key rather
/// than by any grouping they arrived in.
pub fn compute_totals_by_date(trades: &[Trade], tz: Tz) -> BTreeMap<i64, TotalsRecord> {
    let mut by_day: BTreeMap<i64, TotalsRecord> = BTreeMap::new();
    for trade in trades {
        by_day.entry(day_key(trade, tz)).or_default().add(trade);
    }
    by_day
        .into_iter()
        .map(|(day, totals)| (day, totals.finish()))
        .collect()
}
