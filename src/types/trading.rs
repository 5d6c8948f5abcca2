use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction as recorded by the journal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Long,
    Short,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Long => "long",
            Strategy::Short => "short",
        }
    }

    /// +1 for long, -1 for short. Multiply a price difference by this to get
    /// the P&L per share in the trade's favour.
    pub fn sign(&self) -> i64 {
        match self {
            Strategy::Long => 1,
            Strategy::Short => -1,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "long" => Some(Strategy::Long),
            "short" => Some(Strategy::Short),
            _ => None,
        }
    }

    pub fn all() -> Vec<Strategy> {
        vec![Strategy::Long, Strategy::Short]
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Selects between the fee-exclusive (gross) and fee-inclusive (net) view of
/// every amount field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountCase {
    Gross,
    Net,
}

impl AmountCase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmountCase::Gross => "gross",
            AmountCase::Net => "net",
        }
    }

    pub fn all() -> [AmountCase; 2] {
        [AmountCase::Gross, AmountCase::Net]
    }
}

impl fmt::Display for AmountCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a trade for one amount case, decided by the sign of proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Breakeven,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(Strategy::from_str("LONG"), Some(Strategy::Long));
        assert_eq!(Strategy::from_str("short"), Some(Strategy::Short));
        assert_eq!(Strategy::from_str("flat"), None);
        assert_eq!(Strategy::Short.sign(), -1);
    }

    #[test]
    fn test_strategy_serde_is_lowercase() {
        let json = serde_json::to_string(&Strategy::Long).unwrap();
        assert_eq!(json, "\"long\"");
        let parsed: Strategy = serde_json::from_str("\"short\"").unwrap();
        assert_eq!(parsed, Strategy::Short);
    }
}
