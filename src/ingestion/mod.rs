//! Loaders for the three input sources: delimited orders, JSON users and the
//! restaurants `INSERT` dump.

pub mod dump;
pub mod structured;
pub mod tabular;

pub use dump::{extract_from_str, extract_restaurants, Extraction, ExtractionMode};
pub use structured::{load_json_records, parse_json_records};
pub use tabular::load_delimited;
