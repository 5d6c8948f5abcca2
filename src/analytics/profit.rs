use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::guard::{finite, ratio};
use super::totals::TotalsRecord;
use crate::config::RLadderSettings;
use crate::types::{AmountCase, Excursion, TradeDay};

/// Per-share profit metrics of one amount case plus the optimizer's
/// recommendation for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseProfit {
    pub av_win_per_share: Decimal,
    /// Positive magnitude of the average per-share loss.
    pub av_loss_per_share: Decimal,
    pub high_win_per_share: Decimal,
    pub high_loss_per_share: Decimal,
    /// Average win per share over average loss per share ("R").
    pub win_loss_ratio: Decimal,
    pub profit_factor: Decimal,
    /// `win_loss_ratio × prob_wins`: what the trader actually captured per
    /// unit of risk.
    pub actual_expected_return: Decimal,
    /// Recommended fixed take-profit in multiples of the average loss.
    /// `None` when no ladder level beats the actual expected return.
    pub mfe_r: Option<Decimal>,
    pub mfe_expected_return: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitAnalysis {
    pub gross: CaseProfit,
    pub net: CaseProfit,
    /// Trades that had a usable MFE price.
    pub mfe_samples: usize,
}

impl ProfitAnalysis {
    pub fn case(&self, case: AmountCase) -> &CaseProfit {
        match case {
            AmountCase::Gross => &self.gross,
            AmountCase::Net => &self.net,
        }
    }

    pub fn gross_mfe_r(&self) -> Option<Decimal> {
        self.gross.mfe_r
    }

    pub fn net_mfe_r(&self) -> Option<Decimal> {
        self.net.mfe_r
    }
}

/// Favourable move per share of a trade, at its MFE peak.
#[derive(Debug, Clone, Copy)]
struct MfeSample {
    favourable_move: Decimal,
}

pub fn compute_profit_analysis(
    totals: &TotalsRecord,
    excursions: &[Excursion],
    days: &[TradeDay],
    ladder: &RLadderSettings,
) -> ProfitAnalysis {
    let samples = mfe_samples(excursions, days);
    let levels = ladder.levels();

    let mut analysis = ProfitAnalysis {
        mfe_samples: samples.len(),
        ..Default::default()
    };
    for case in AmountCase::all() {
        let profit = case_profit(totals, case, &samples, &levels);
        match case {
            AmountCase::Gross => analysis.gross = profit,
            AmountCase::Net => analysis.net = profit,
        }
    }
    analysis
}

fn case_profit(totals: &TotalsRecord, case: AmountCase, samples: &[MfeSample], levels: &[Decimal]) -> CaseProfit {
    let t = totals.case(case);
    let av_win_per_share = ratio(t.wins, t.wins_quantity);
    let av_loss_per_share = ratio(t.loss.abs(), t.loss_quantity);
    let win_loss_ratio = ratio(av_win_per_share, av_loss_per_share);
    let actual_expected_return = win_loss_ratio * t.prob_wins;

    let mut profit = CaseProfit {
        av_win_per_share,
        av_loss_per_share,
        high_win_per_share: t.high_share_pl_win,
        high_loss_per_share: t.high_share_pl_loss,
        win_loss_ratio,
        profit_factor: t.profit_factor,
        actual_expected_return,
        mfe_r: None,
        mfe_expected_return: None,
    };

    if av_loss_per_share.is_zero() || samples.is_empty() {
        debug!("{} R optimizer skipped: no average loss or no MFE data", case);
        return profit;
    }

    let mfe_rs: Vec<Decimal> = samples
        .iter()
        .map(|s| s.favourable_move / av_loss_per_share)
        .collect();

    if let Some((level, expected)) = best_level(&mfe_rs, levels) {
        if expected > actual_expected_return {
            profit.mfe_r = Some(level);
            profit.mfe_expected_return = Some(expected);
        } else {
            debug!(
                "{} R optimizer: best level {}R ({}) does not beat actual {}",
                case, level, expected, actual_expected_return
            );
        }
    }
    profit
}

/// Brute-force scan of the ladder: the level maximising
/// `P(mfe_r >= level) × level`. Ties keep the lowest level.
pub fn best_level(mfe_rs: &[Decimal], levels: &[Decimal]) -> Option<(Decimal, Decimal)> {
    if mfe_rs.is_empty() {
        return None;
    }
    let n = Decimal::from(mfe_rs.len());
    let mut best: Option<(Decimal, Decimal)> = None;
    for &level in levels {
        let reached = mfe_rs.iter().filter(|r| **r >= level).count();
        let expected = Decimal::from(reached) / n * level;
        if best.map_or(true, |(_, best_expected)| expected > best_expected) {
            best = Some((level, expected));
        }
    }
    best
}

/// One sample per trade with both an entry price and an MFE price. The
/// excursion table wins over an MFE already attached to the trade.
fn mfe_samples(excursions: &[Excursion], days: &[TradeDay]) -> Vec<MfeSample> {
    let by_trade: HashMap<&str, &Excursion> = excursions
        .iter()
        .map(|e| (e.trade_id.as_str(), e))
        .collect();

    days.iter()
        .flat_map(|day| day.trades.iter())
        .filter_map(|trade| {
            let mfe = by_trade
                .get(trade.id.as_str())
                .and_then(|e| finite(e.mfe_price))
                .or_else(|| finite(trade.mfe_price))?;
            let entry = finite(trade.entry_price)?;
            let sign = Decimal::from(trade.strategy().sign());
            Some(MfeSample {
                favourable_move: (mfe - entry) * sign,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::totals::compute_totals;
    use crate::analytics::totals::tests::closed_trade;
    use crate::types::{Strategy, Trade};
    use rust_decimal_macros::dec;

    const DAY: i64 = 1_704_690_000;

    fn excursion(trade_id: &str, mfe: f64) -> Excursion {
        Excursion {
            trade_id: trade_id.to_string(),
            date_unix: Some(DAY),
            stop_loss: None,
            mae_price: None,
            mfe_price: Some(mfe),
        }
    }

    fn analyze(trades: Vec<Trade>, excursions: &[Excursion]) -> ProfitAnalysis {
        let totals = compute_totals(&trades);
        let days = vec![TradeDay::new(DAY, trades)];
        compute_profit_analysis(&totals, excursions, &days, &RLadderSettings::default())
    }

    #[test]
    fn test_per_share_metrics() {
        let analysis = analyze(
            vec![
                closed_trade("w", DAY, Strategy::Long, 10.0, 12.0, 100.0, 0.0),
                closed_trade("l", DAY, Strategy::Long, 10.0, 9.0, 100.0, 0.0),
            ],
            &[],
        );
        assert_eq!(analysis.gross.av_win_per_share, dec!(2));
        assert_eq!(analysis.gross.av_loss_per_share, dec!(1));
        assert_eq!(analysis.gross.win_loss_ratio, dec!(2));
        assert_eq!(analysis.gross.profit_factor, dec!(2));
        assert_eq!(analysis.gross.high_win_per_share, dec!(2));
        assert_eq!(analysis.gross.high_loss_per_share, dec!(-1));
        assert_eq!(analysis.gross.actual_expected_return, dec!(1));
        assert_eq!(analysis.mfe_samples, 0);
        assert_eq!(analysis.gross_mfe_r(), None);
    }

    #[test]
    fn test_recommends_level_beating_actual() {
        let analysis = analyze(
            vec![
                closed_trade("w", DAY, Strategy::Long, 10.0, 12.0, 100.0, 0.0),
                closed_trade("l", DAY, Strategy::Long, 10.0, 9.0, 100.0, 0.0),
            ],
            &[excursion("w", 15.0), excursion("l", 10.5)],
        );
        assert_eq!(analysis.mfe_samples, 2);
        assert_eq!(analysis.gross_mfe_r(), Some(dec!(5)));
        assert_eq!(analysis.gross.mfe_expected_return, Some(dec!(2.5)));
        assert_eq!(analysis.net_mfe_r(), Some(dec!(5)));
    }

    #[test]
    fn test_no_recommendation_when_actual_is_better() {
        let analysis = analyze(
            vec![
                closed_trade("w", DAY, Strategy::Long, 10.0, 30.0, 100.0, 0.0),
                closed_trade("l", DAY, Strategy::Long, 10.0, 9.0, 100.0, 0.0),
            ],
            &[excursion("w", 15.0), excursion("l", 10.5)],
        );
        assert_eq!(analysis.gross.actual_expected_return, dec!(10));
        assert_eq!(analysis.gross_mfe_r(), None);
        assert_eq!(analysis.net_mfe_r(), None);
    }

    #[test]
    fn test_short_trades_flip_mfe() {
        let mut short_win = closed_trade("s", DAY, Strategy::Short, 50.0, 48.0, 100.0, 0.0);
        short_win.mfe_price = Some(44.0);
        let analysis = analyze(
            vec![short_win, closed_trade("l", DAY, Strategy::Short, 50.0, 51.0, 100.0, 0.0)],
            &[],
        );
        // Avg loss 1/share, short MFE 6 below entry → 6R reached by 1 of 1 sample.
        assert_eq!(analysis.mfe_samples, 1);
        assert_eq!(analysis.gross_mfe_r(), Some(dec!(6)));
    }

    #[test]
    fn test_without_losses_nothing_is_recommended() {
        let analysis = analyze(
            vec![closed_trade("w", DAY, Strategy::Long, 10.0, 12.0, 100.0, 0.0)],
            &[excursion("w", 20.0)],
        );
        assert_eq!(analysis.gross.av_loss_per_share, Decimal::ZERO);
        assert_eq!(analysis.gross_mfe_r(), None);
    }

    #[test]
    fn test_best_level_prefers_first_on_ties() {
        // 1R: both reach it, 2 * 1 / 2 = 1. 2R: one reaches it, 1 * 2 / 2 = 1.
        let mfe_rs = vec![dec!(2), dec!(1)];
        let best = best_level(&mfe_rs, &[dec!(1), dec!(2)]);
        assert_eq!(best, Some((dec!(1), dec!(1))));
        assert_eq!(best_level(&[], &[dec!(1)]), None);
    }
}
