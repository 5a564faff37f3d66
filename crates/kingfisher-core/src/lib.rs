pub mod counters;
pub mod error;
pub mod types;

pub use counters::{Counters, CountersSnapshot};
pub use error::{KingfisherError, Result};
pub use types::*;
