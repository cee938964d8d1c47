//! Task support types: outputs and output schemas.

pub mod output_schema;
pub mod task_output;

pub use output_schema::{OutputSchema, SchemaError, BLOG_RECORD_SCHEMA};
pub use task_output::TaskOutput;
