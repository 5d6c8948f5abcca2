use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Order, OrderType, Strategy, SymbolPosition};

/// Derived prices and P&L figures for one open position. Every figure is
/// `None` when the position lacks the orders it depends on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionAnalytics {
    pub symbol: String,
    pub direction: Option<Strategy>,
    pub target_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub potential_profit: Option<Decimal>,
    /// Signed P&L if every stop fills; negative for stops on the losing side.
    pub stop_loss_risk: Option<Decimal>,
    pub risk_reward: Option<Decimal>,
    pub position_value: Option<Decimal>,
}

/// Sums across every open position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRisk {
    pub positions: usize,
    pub unprotected_positions: usize,
    pub total_stop_loss_risk: Decimal,
    pub total_potential_profit: Decimal,
    pub total_position_value: Decimal,
}

/// A closing child order reduced to what the calculators need.
#[derive(Debug, Clone, Copy)]
struct Leg {
    price: Decimal,
    quantity: Decimal,
}

pub fn analyze_position(position: &SymbolPosition) -> PositionAnalytics {
    let direction = position.direction();
    let mut analytics = PositionAnalytics {
        symbol: position.symbol.clone(),
        direction: Some(direction),
        ..Default::default()
    };

    let Some(entry) = position.entry_price() else {
        debug!("{}: entry order has no limit price, skipping", position.symbol);
        return analytics;
    };
    let quantity = position.main_order.total_quantity;

    let targets = target_legs(position, entry);
    let stops = stop_legs(position, entry);

    analytics.position_value = Some(entry * quantity);
    analytics.target_price = blended_price(&targets);
    analytics.stop_price = blended_price(&stops);
    analytics.potential_profit = potential_profit(&targets, entry, quantity, direction);
    analytics.stop_loss_risk = stop_loss_risk(&stops, entry, quantity, direction);
    analytics.risk_reward = risk_reward(analytics.potential_profit, analytics.stop_loss_risk);
    analytics
}

pub fn summarize_positions(positions: &[SymbolPosition]) -> PortfolioRisk {
    let mut summary = PortfolioRisk {
        positions: positions.len(),
        ..Default::default()
    };
    for position in positions {
        let analytics = analyze_position(position);
        match analytics.stop_loss_risk {
            Some(risk) => summary.total_stop_loss_risk += risk,
            None => summary.unprotected_positions += 1,
        }
        summary.total_potential_profit += analytics.potential_profit.unwrap_or(Decimal::ZERO);
        summary.total_position_value += analytics.position_value.unwrap_or(Decimal::ZERO);
    }
    summary
}

pub fn risk_reward(profit: Option<Decimal>, risk: Option<Decimal>) -> Option<Decimal> {
    match (profit, risk) {
        (Some(profit), Some(risk)) if !risk.is_zero() => Some((profit / risk).abs()),
        _ => None,
    }
}

/// `true` when `price` is on the profitable side of `entry`.
fn is_better(price: Decimal, entry: Decimal, direction: Strategy) -> bool {
    match direction {
        Strategy::Long => price > entry,
        Strategy::Short => price < entry,
    }
}

fn closing_orders(position: &SymbolPosition) -> impl Iterator<Item = &Order> {
    let closing = position.main_order.action.opposite();
    position.live_sub_orders().filter(move |o| o.action == closing)
}

fn target_legs(position: &SymbolPosition, entry: Decimal) -> Vec<Leg> {
    let direction = position.direction();
    closing_orders(position)
        .filter(|o| o.order_type == OrderType::Limit)
        .filter_map(leg)
        .filter(|l| is_better(l.price, entry, direction))
        .collect()
}

/// True stop orders when any exist, otherwise limit orders priced on the
/// losing side of entry.
fn stop_legs(position: &SymbolPosition, entry: Decimal) -> Vec<Leg> {
    let direction = position.direction();
    let stops: Vec<Leg> = closing_orders(position)
        .filter(|o| o.order_type == OrderType::Stop)
        .filter_map(leg)
        .collect();
    if !stops.is_empty() {
        return stops;
    }
    closing_orders(position)
        .filter(|o| o.order_type == OrderType::Limit)
        .filter_map(leg)
        .filter(|l| !is_better(l.price, entry, direction) && l.price != entry)
        .collect()
}

fn leg(order: &Order) -> Option<Leg> {
    order.trigger_price().map(|price| Leg {
        price,
        quantity: order.total_quantity,
    })
}

/// Single leg → its price; several → quantity-weighted average.
fn blended_price(legs: &[Leg]) -> Option<Decimal> {
    match legs {
        [] => None,
        [single] => Some(single.price),
        _ => {
            let quantity: Decimal = legs.iter().map(|l| l.quantity).sum();
            if quantity.is_zero() {
                return None;
            }
            let notional: Decimal = legs.iter().map(|l| l.price * l.quantity).sum();
            Some(notional / quantity)
        }
    }
}

/// Walk `legs` in order, filling against `quantity`; whatever the legs do
/// not cover is priced at `fallback`.
fn consume(legs: &[Leg], entry: Decimal, quantity: Decimal, direction: Strategy, fallback: Decimal) -> Decimal {
    let sign = Decimal::from(direction.sign());
    let mut remaining = quantity;
    let mut pnl = Decimal::ZERO;
    for leg in legs {
        if remaining <= Decimal::ZERO {
            break;
        }
        let filled = leg.quantity.min(remaining);
        pnl += (leg.price - entry) * filled * sign;
        remaining -= filled;
    }
    if remaining > Decimal::ZERO {
        pnl += (fallback - entry) * remaining * sign;
    }
    pnl
}

fn potential_profit(targets: &[Leg], entry: Decimal, quantity: Decimal, direction: Strategy) -> Option<Decimal> {
    let blended = blended_price(targets)?;
    let mut sorted = targets.to_vec();
    // Best target first.
    sorted.sort_by(|a, b| match direction {
        Strategy::Long => b.price.cmp(&a.price),
        Strategy::Short => a.price.cmp(&b.price),
    });
    Some(consume(&sorted, entry, quantity, direction, blended))
}

fn stop_loss_risk(stops: &[Leg], entry: Decimal, quantity: Decimal, direction: Strategy) -> Option<Decimal> {
    let mut sorted = stops.to_vec();
    // Worst stop first.
    sorted.sort_by(|a, b| match direction {
        Strategy::Long => a.price.cmp(&b.price),
        Strategy::Short => b.price.cmp(&a.price),
    });
    let worst = sorted.first()?.price;
    Some(consume(&sorted, entry, quantity, direction, worst))
}
