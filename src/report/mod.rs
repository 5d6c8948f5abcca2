use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::fmt::Write;

use crate::analytics::{CaseProfit, CaseTotals, GroupDimension, PortfolioRisk, PositionAnalytics};
use crate::store::AnalyticsState;
use crate::types::AmountCase;

const WIDTH: usize = 60;

fn rule(out: &mut String, c: char) {
    let _ = writeln!(out, "{}", c.to_string().repeat(WIDTH));
}

fn day_label(day_key: i64, tz: Tz) -> String {
    Utc.timestamp_opt(day_key, 0)
        .single()
        .map(|d| d.with_timezone(&tz).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| day_key.to_string())
}

fn opt(value: Option<Decimal>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

/// Plain-text summary of an analytics state. Day keys are labelled in `tz`.
pub fn render_report(state: &AnalyticsState, tz: Tz) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    rule(&mut out, '=');
    let _ = writeln!(out, "                  TRADE JOURNAL ANALYTICS");
    rule(&mut out, '=');

    if !state.has_data() {
        let _ = writeln!(out, "No trades match the current filters.");
        rule(&mut out, '=');
        return out;
    }

    let totals = &state.totals;
    if let (Some(first), Some(last)) = (state.totals_by_date.keys().next(), state.totals_by_date.keys().last()) {
        let _ = writeln!(out, "Period:             {} to {}", day_label(*first, tz), day_label(*last, tz));
    }
    let _ = writeln!(out, "Trading Days:       {}", state.totals_by_date.len());
    let _ = writeln!(out, "Trades:             {}", totals.trades);
    let _ = writeln!(out, "Upstream Trades:    {}", totals.trades_count);
    let _ = writeln!(out, "Executions:         {}", totals.executions);
    let _ = writeln!(out, "Shares Traded:      {}", totals.quantity);
    let _ = writeln!(out, "Commission:         ${:.2}", totals.commission);
    let _ = writeln!(out, "Fees:               ${:.2}", totals.fees);

    for case in AmountCase::all() {
        rule(&mut out, '-');
        let _ = writeln!(out, "{}", case.as_str().to_uppercase());
        write_case(&mut out, totals.case(case), state.profit_analysis.case(case));
    }

    rule(&mut out, '-');
    let _ = writeln!(out, "BY DAY (net)");
    for (day, day_totals) in state.totals_by_date.iter().rev() {
        let _ = writeln!(
            out,
            "  {}  {:>4} trades  ${:>12.2}",
            day_label(*day, tz),
            day_totals.trades,
            day_totals.net.proceeds
        );
    }

    for dimension in GroupDimension::all() {
        let buckets = state.groupings.buckets(dimension);
        if buckets.is_empty() {
            continue;
        }
        rule(&mut out, '-');
        let _ = writeln!(out, "BY {}", dimension.as_str().to_uppercase());
        for bucket in buckets {
            let _ = writeln!(
                out,
                "  {:<16} {:>4} trades  ${:>12.2}  win {:>5.1}%",
                bucket.key,
                bucket.totals.trades,
                bucket.totals.net.proceeds,
                bucket.totals.net.prob_wins * Decimal::ONE_HUNDRED
            );
        }
    }
    rule(&mut out, '=');
    out
}

fn write_case(out: &mut String, totals: &CaseTotals, profit: &CaseProfit) {
    let _ = writeln!(out, "  P&L:                ${:.2}", totals.proceeds);
    let _ = writeln!(
        out,
        "  Wins / Losses / BE:  {} / {} / {}",
        totals.wins_count, totals.loss_count, totals.breakeven_count
    );
    let _ = writeln!(out, "  Win Rate:           {:.1}%", totals.prob_wins * Decimal::ONE_HUNDRED);
    let _ = writeln!(out, "  Average Win:        ${:.2}", totals.avg_wins);
    let _ = writeln!(out, "  Average Loss:       ${:.2}", totals.avg_loss);
    let _ = writeln!(out, "  Profit Factor:      {:.2}", totals.profit_factor);
    let _ = writeln!(out, "  Avg Win / Share:    ${:.2}", profit.av_win_per_share);
    let _ = writeln!(out, "  Avg Loss / Share:   ${:.2}", profit.av_loss_per_share);
    let _ = writeln!(out, "  Best / Worst Share: ${:.2} / ${:.2}", profit.high_win_per_share, profit.high_loss_per_share);
    let _ = writeln!(out, "  R (win/loss):       {:.2}", profit.win_loss_ratio);
    match profit.mfe_r {
        Some(level) => {
            let _ = writeln!(
                out,
                "  MFE Target:         {}R (expected {:.2} vs actual {:.2})",
                level,
                profit.mfe_expected_return.unwrap_or_default(),
                profit.actual_expected_return
            );
        }
        None => {
            let _ = writeln!(out, "  MFE Target:         none better than current exits");
        }
    }
}

/// Plain-text table of open positions and their combined risk.
pub fn render_positions(positions: &[PositionAnalytics], portfolio: &PortfolioRisk) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    rule(&mut out, '=');
    let _ = writeln!(out, "                      OPEN POSITIONS");
    rule(&mut out, '=');
    let _ = writeln!(
        out,
        "  {:<8} {:<6} {:>9} {:>9} {:>11} {:>11} {:>6}",
        "SYMBOL", "SIDE", "TARGET", "STOP", "PROFIT", "RISK", "R:R"
    );
    for p in positions {
        let _ = writeln!(
            out,
            "  {:<8} {:<6} {:>9} {:>9} {:>11} {:>11} {:>6}",
            p.symbol,
            p.direction.map(|d| d.as_str()).unwrap_or("-"),
            opt(p.target_price),
            opt(p.stop_price),
            opt(p.potential_profit),
            opt(p.stop_loss_risk),
            opt(p.risk_reward)
        );
    }
    rule(&mut out, '-');
    let _ = writeln!(out, "Positions:          {}", portfolio.positions);
    let _ = writeln!(out, "Without Stop:       {}", portfolio.unprotected_positions);
    let _ = writeln!(out, "Position Value:     ${:.2}", portfolio.total_position_value);
    let _ = writeln!(out, "Potential Profit:   ${:.2}", portfolio.total_potential_profit);
    let _ = writeln!(out, "Stop-Loss Risk:     ${:.2}", portfolio.total_stop_loss_risk);
    rule(&mut out, '=');
    out
}
