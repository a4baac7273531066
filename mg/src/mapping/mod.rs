//! Mapping tables
//!
//! Parses the tabular column-mapping table and groups its rows into
//! pipeline descriptors, the unit handed to the prompt composer.

mod descriptor;
mod error;
mod parser;

pub use descriptor::{ColumnMapping, PipelineDescriptor, build, pipeline_id};
pub use error::MappingError;
pub use parser::{MappingRow, ParseOptions, REQUIRED_COLUMNS, parse, parse_with};
