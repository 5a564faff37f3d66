pub mod classify;
pub mod extract;
pub mod patterns;

pub use classify::{Disposition, classify};
pub use extract::{FieldMap, extract, message_timestamp};
