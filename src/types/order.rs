use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderAction {
    Buy,
    Sell,
}

impl OrderAction {
    pub fn opposite(&self) -> Self {
        match self {
            OrderAction::Buy => OrderAction::Sell,
            OrderAction::Sell => OrderAction::Buy,
        }
    }

    /// Direction of the position an entry order with this action opens.
    pub fn direction(&self) -> Strategy {
        match self {
            OrderAction::Buy => Strategy::Long,
            OrderAction::Sell => Strategy::Short,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAction::Buy => "BUY",
            OrderAction::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    #[serde(rename = "LMT")]
    Limit,
    #[serde(rename = "STP")]
    Stop,
    #[serde(rename = "MKT")]
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "LMT",
            OrderType::Stop => "STP",
            OrderType::Market => "MKT",
        }
    }
}

/// Broker order status. Only `PendingCancel` changes how an order is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    PendingSubmit,
    PreSubmitted,
    Submitted,
    Filled,
    PendingCancel,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Orders awaiting cancellation are soft-deleted.
    pub fn is_live(&self) -> bool {
        !matches!(self, OrderStatus::PendingCancel)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Submitted
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub action: OrderAction,
    pub order_type: OrderType,
    #[serde(default)]
    pub limit_price: Option<Decimal>,
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    pub total_quantity: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
}

impl Order {
    pub fn limit(action: OrderAction, price: Decimal, quantity: Decimal) -> Self {
        Self {
            action,
            order_type: OrderType::Limit,
            limit_price: Some(price),
            stop_price: None,
            total_quantity: quantity,
            status: OrderStatus::Submitted,
        }
    }

    pub fn stop(action: OrderAction, stop_price: Decimal, quantity: Decimal) -> Self {
        Self {
            action,
            order_type: OrderType::Stop,
            limit_price: None,
            stop_price: Some(stop_price),
            total_quantity: quantity,
            status: OrderStatus::Submitted,
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// Trigger price of a stop order, falling back to its limit price.
    pub fn trigger_price(&self) -> Option<Decimal> {
        match self.order_type {
            OrderType::Stop => self.stop_price.or(self.limit_price),
            _ => self.limit_price,
        }
    }
}

/// An open position: the entry order plus its child profit-target and stop
/// orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolPosition {
    pub symbol: String,
    pub main_order: Order,
    #[serde(default)]
    pub sub_orders: Vec<Order>,
}

impl SymbolPosition {
    pub fn direction(&self) -> Strategy {
        self.main_order.action.direction()
    }

    pub fn entry_price(&self) -> Option<Decimal> {
        self.main_order.limit_price
    }

    /// Child orders still in force.
    pub fn live_sub_orders(&self) -> impl Iterator<Item = &Order> {
        self.sub_orders.iter().filter(|o| o.status.is_live())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_parses_broker_json() {
        let json = r#"{
            "action": "SELL",
            "order_type": "STP",
            "stop_price": 95.5,
            "total_quantity": 100,
            "status": "PendingCancel"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.action, OrderAction::Sell);
        assert_eq!(order.order_type, OrderType::Stop);
        assert_eq!(order.trigger_price(), Some(dec!(95.5)));
        assert!(!order.status.is_live());
    }

    #[test]
    fn test_unknown_status_is_live() {
        let order: Order = serde_json::from_str(
            r#"{"action":"BUY","order_type":"LMT","limit_price":10,"total_quantity":1,"status":"Inactive"}"#,
        )
        .unwrap();
        assert_eq!(order.status, OrderStatus::Unknown);
        assert!(order.status.is_live());
    }

    #[test]
    fn test_live_sub_orders_skip_pending_cancel() {
        let position = SymbolPosition {
            symbol: "MSFT".to_string(),
            main_order: Order::limit(OrderAction::Buy, dec!(100), dec!(10)),
            sub_orders: vec![
                Order::limit(OrderAction::Sell, dec!(110), dec!(10)),
                Order::stop(OrderAction::Sell, dec!(95), dec!(10))
                    .with_status(OrderStatus::PendingCancel),
            ],
        };
        assert_eq!(position.direction(), Strategy::Long);
        assert_eq!(position.live_sub_orders().count(), 1);
    }
}
