//! Generation patterns

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which kind of script to ask the model for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    #[default]
    Pyspark,
    Merge,
    Scd2,
    Default,
}

impl PatternKind {
    /// Every supported pattern, in display order
    pub const ALL: [PatternKind; 4] = [Self::Pyspark, Self::Merge, Self::Scd2, Self::Default];

    /// Parse a pattern name strictly; `None` for anything unrecognized
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pyspark" => Some(Self::Pyspark),
            "merge" => Some(Self::Merge),
            "scd2" => Some(Self::Scd2),
            "default" => Some(Self::Default),
            _ => None,
        }
    }

    /// Parse a pattern name, falling back to [`PatternKind::Default`]
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            debug!(%name, "PatternKind::from_name: unrecognized, using default");
            Self::Default
        })
    }

    /// Canonical name, also the template file stem
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pyspark => "pyspark",
            Self::Merge => "merge",
            Self::Scd2 => "scd2",
            Self::Default => "default",
        }
    }

    /// One-line description for listings
    pub fn description(&self) -> &'static str {
        match self {
            Self::Pyspark => "read, transform per column, overwrite Delta target",
            Self::Merge => "Delta MERGE upsert on merge keys",
            Self::Scd2 => "slowly changing dimension type 2 with history columns",
            Self::Default => "generic mapping-driven Delta load",
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
