//! Domain types: bars, values, and category records.

pub mod bar;
pub mod record;
pub mod value;

pub use bar::{Bar, Interval};
pub use record::{CategoryRecord, IndicatorResult, SortPolicy, EARNINGS_TBA, OWNED_CATEGORY};
pub use value::Value;
