use serde::{Deserialize, Serialize};

use super::{AmountCase, Strategy};

/// Fundamentals attached to a trade's symbol at the time of the trade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub public_float: Option<f64>,
}

/// A tag resolved against the tag-definition table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeTag {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
}

impl TradeTag {
    pub fn unresolved(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            group_id: None,
            group_name: None,
        }
    }
}

/// One realized round trip (or partial) as delivered by the journal backend.
///
/// Numeric fields are optional because upstream records are frequently
/// incomplete; reducers coerce them through the numeric guard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub account: String,
    pub strategy: Option<Strategy>,
    /// Day key of the owning trade day. Filled in by the filter stage.
    pub td: Option<i64>,
    pub entry_time: i64,
    pub exit_time: Option<i64>,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub buy_quantity: Option<f64>,
    pub sell_quantity: Option<f64>,

    pub commission: Option<f64>,
    pub sec: Option<f64>,
    pub taf: Option<f64>,
    pub nscc: Option<f64>,
    pub nasdaq: Option<f64>,

    pub gross_proceeds: Option<f64>,
    pub gross_wins: Option<f64>,
    pub gross_loss: Option<f64>,
    pub gross_share_pl: Option<f64>,
    pub gross_share_pl_wins: Option<f64>,
    pub gross_share_pl_loss: Option<f64>,

    pub net_proceeds: Option<f64>,
    pub net_wins: Option<f64>,
    pub net_loss: Option<f64>,
    pub net_share_pl: Option<f64>,
    pub net_share_pl_wins: Option<f64>,
    pub net_share_pl_loss: Option<f64>,

    pub executions_count: Option<u32>,
    pub trades_count: Option<u32>,
    pub financials: Option<Financials>,

    pub tags: Vec<TradeTag>,
    pub satisfaction: Option<bool>,
    pub stop_loss: Option<f64>,
    pub mae_price: Option<f64>,
    pub mfe_price: Option<f64>,
}

/// The raw amount fields of one case, borrowed from a trade.
#[derive(Debug, Clone, Copy)]
pub struct CaseAmounts {
    pub proceeds: Option<f64>,
    pub wins: Option<f64>,
    pub loss: Option<f64>,
    pub share_pl: Option<f64>,
    pub share_pl_wins: Option<f64>,
    pub share_pl_loss: Option<f64>,
}

impl Trade {
    pub fn amounts(&self, case: AmountCase) -> CaseAmounts {
        match case {
            AmountCase::Gross => CaseAmounts {
                proceeds: self.gross_proceeds,
                wins: self.gross_wins,
                loss: self.gross_loss,
                share_pl: self.gross_share_pl,
                share_pl_wins: self.gross_share_pl_wins,
                share_pl_loss: self.gross_share_pl_loss,
            },
            AmountCase::Net => CaseAmounts {
                proceeds: self.net_proceeds,
                wins: self.net_wins,
                loss: self.net_loss,
                share_pl: self.net_share_pl,
                share_pl_wins: self.net_share_pl_wins,
                share_pl_loss: self.net_share_pl_loss,
            },
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy.unwrap_or(Strategy::Long)
    }

    pub fn market_cap(&self) -> Option<f64> {
        self.financials.as_ref().and_then(|f| f.market_cap)
    }

    pub fn public_float(&self) -> Option<f64> {
        self.financials.as_ref().and_then(|f| f.public_float)
    }

    /// Holding time in seconds, when the trade has been closed.
    pub fn duration_secs(&self) -> Option<i64> {
        self.exit_time.map(|exit| exit - self.entry_time)
    }

    pub fn tag_ids(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.id.as_str())
    }
}

/// All trades sharing one day key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeDay {
    pub date_unix: i64,
    #[serde(default)]
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub satisfaction: Option<bool>,
    /// Day-level P&L summary as computed by the backend; passed through.
    #[serde(default)]
    pub p_and_l: Option<serde_json::Value>,
    #[serde(default)]
    pub blotter: Option<serde_json::Value>,
}

impl TradeDay {
    pub fn new(date_unix: i64, trades: Vec<Trade>) -> Self {
        Self {
            date_unix,
            trades,
            ..Default::default()
        }
    }
}
