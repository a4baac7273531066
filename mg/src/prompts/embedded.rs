//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

use super::PatternKind;

/// Plain PySpark read-transform-write pattern
pub const PYSPARK: &str = include_str!("../../prompts/pyspark.pmt");

/// Delta MERGE (upsert) pattern
pub const MERGE: &str = include_str!("../../prompts/merge.pmt");

/// Slowly Changing Dimension Type 2 pattern
pub const SCD2: &str = include_str!("../../prompts/scd2.pmt");

/// Fallback instructions for anything else
pub const DEFAULT: &str = include_str!("../../prompts/default.pmt");

/// Wraps the instructions and the mapping payload
pub const ENVELOPE: &str = include_str!("../../prompts/envelope.pmt");

/// Get the embedded baseline template for a pattern
pub fn get_embedded(pattern: PatternKind) -> &'static str {
    debug!(%pattern, "get_embedded: called");
    match pattern {
        PatternKind::Pyspark => PYSPARK,
        PatternKind::Merge => MERGE,
        PatternKind::Scd2 => SCD2,
        PatternKind::Default => DEFAULT,
    }
}
