pub mod config;
pub mod constants;
pub mod error;
pub mod ingestion;
pub mod join;
pub mod logging;
pub mod observer;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod table;

pub use config::PipelineConfig;
pub use error::{MergeError, Result};
pub use pipeline::{merge_tables, MergePipeline, PipelineResult};
pub use table::{Table, Value};
