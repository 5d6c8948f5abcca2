pub mod criteria;
pub mod stage;

pub use criteria::*;
pub use stage::*;
