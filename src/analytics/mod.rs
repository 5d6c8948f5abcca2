//! Journal analytics: aggregate totals, dimensional groupings, per-share
//! profit metrics with the R-multiple optimizer, and open-position risk.

pub mod guard;
pub mod totals;
pub mod grouping;
pub mod profit;
pub mod position;

pub use guard::*;
pub use totals::*;
pub use grouping::*;
pub use profit::*;
pub use position::*;
