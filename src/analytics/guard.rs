use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Coerce an optional upstream float to a `Decimal`. Missing, NaN and
/// infinite values become zero.
pub fn guard(value: Option<f64>) -> Decimal {
    value
        .filter(|v| v.is_finite())
        .and_then(Decimal::from_f64)
        .unwrap_or(Decimal::ZERO)
}

/// Finite value or `None`. Used where absence must stay distinguishable from
/// zero, such as banding fields and excursion prices.
pub fn finite(value: Option<f64>) -> Option<Decimal> {
    value.filter(|v| v.is_finite()).and_then(Decimal::from_f64)
}

pub fn guard_count(value: Option<u32>) -> u64 {
    value.map(u64::from).unwrap_or(0)
}

/// `numerator / denominator`, or zero when the denominator is zero.
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

pub fn count_ratio(numerator: u64, denominator: u64) -> Decimal {
    ratio(Decimal::from(numerator), Decimal::from(denominator))
}
