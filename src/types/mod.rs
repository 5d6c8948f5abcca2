pub mod trading;
pub mod trade;
pub mod order;
pub mod journal;

pub use trading::*;
pub use trade::*;
pub use order::*;
pub use journal::*;
