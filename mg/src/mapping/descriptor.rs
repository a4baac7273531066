//! Pipeline descriptors
//!
//! Groups mapping rows into one [`PipelineDescriptor`] per source table,
//! preserving first-appearance order of source tables and row order within
//! each group.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MappingError, MappingRow};

/// Characters replaced by `_` when deriving a pipeline id
const ID_SEPARATORS: [char; 4] = ['.', '/', '-', ' '];

/// A single column rule inside a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    pub transformation: String,
}

impl From<MappingRow> for ColumnMapping {
    fn from(row: MappingRow) -> Self {
        Self {
            source_column: row.source_column,
            target_table: row.target_table,
            target_column: row.target_column,
            transformation: row.transformation,
        }
    }
}

/// One generation unit: a source table and the columns mapped out of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDescriptor {
    pub pipeline_id: String,
    pub source_path_or_table: String,
    /// First non-empty target table seen for this source; advisory only
    pub target_table_hint: String,
    pub columns: Vec<ColumnMapping>,
}

/// Derive a pipeline id from a source table name
///
/// `cat.sch.tbl1` becomes `cat_sch_tbl1`.
pub fn pipeline_id(source_table: &str) -> String {
    source_table
        .chars()
        .map(|c| if ID_SEPARATORS.contains(&c) { '_' } else { c })
        .collect()
}

/// Group rows into descriptors
///
/// Rows with an empty `source_table` are ignored. Fails with
/// [`MappingError::NoMappingRows`] when nothing is left to group.
pub fn build(rows: Vec<MappingRow>) -> Result<Vec<PipelineDescriptor>, MappingError> {
    debug!(row_count = rows.len(), "build: called");
    let mut descriptors: Vec<PipelineDescriptor> = Vec::new();

    for row in rows.into_iter().filter(|r| !r.source_table.is_empty()) {
        // Linear lookup keeps first-appearance order without a side index
        let existing = descriptors
            .iter_mut()
            .find(|d| d.source_path_or_table == row.source_table);

        match existing {
            Some(descriptor) => {
                if descriptor.target_table_hint.is_empty() && !row.target_table.is_empty() {
                    descriptor.target_table_hint = row.target_table.clone();
                }
                descriptor.columns.push(row.into());
            }
            None => {
                debug!(source_table = %row.source_table, "build: new pipeline");
                descriptors.push(PipelineDescriptor {
                    pipeline_id: pipeline_id(&row.source_table),
                    source_path_or_table: row.source_table.clone(),
                    target_table_hint: row.target_table.clone(),
                    columns: vec![row.into()],
                });
            }
        }
    }

    if descriptors.is_empty() {
        debug!("build: no descriptors");
        return Err(MappingError::NoMappingRows);
    }

    debug!(descriptor_count = descriptors.len(), "build: done");
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::parse;
    use proptest::prelude::*;

    fn row(src: &str, col: &str, tgt: &str) -> MappingRow {
        MappingRow {
            source_table: src.to_string(),
            source_column: col.to_string(),
            target_table: tgt.to_string(),
            target_column: col.to_uppercase(),
            transformation: String::new(),
        }
    }

    #[test]
    fn test_pipeline_id_replaces_separators() {
        assert_eq!(pipeline_id("cat.sch.tbl1"), "cat_sch_tbl1");
        assert_eq!(pipeline_id("/Volumes/cat/raw/orders"), "_Volumes_cat_raw_orders");
        assert_eq!(pipeline_id("plain"), "plain");
    }

    #[test]
    fn test_end_to_end_single_descriptor() {
        let csv = "Source_Table,Source_Column,Target_Table,Target_Column,Transformation\n\
                   cat.sch.tbl1,a,cat.sch.out1,A,a*2\n\
                   cat.sch.tbl1,b,cat.sch.out1,B,\n";
        let descriptors = build(parse(csv).unwrap()).unwrap();

        assert_eq!(descriptors.len(), 1);
        let d = &descriptors[0];
        assert_eq!(d.pipeline_id, "cat_sch_tbl1");
        assert_eq!(d.source_path_or_table, "cat.sch.tbl1");
        assert_eq!(d.target_table_hint, "cat.sch.out1");
        assert_eq!(d.columns.len(), 2);
        assert_eq!(d.columns[0].transformation, "a*2");
        assert_eq!(d.columns[1].transformation, "");
    }

    #[test]
    fn test_first_appearance_order_not_lexicographic() {
        let rows = vec![row("zeta", "a", "t"), row("alpha", "b", "t"), row("zeta", "c", "t")];
        let descriptors = build(rows).unwrap();

        let sources: Vec<_> = descriptors.iter().map(|d| d.source_path_or_table.as_str()).collect();
        assert_eq!(sources, vec!["zeta", "alpha"]);
        let zeta_cols: Vec<_> = descriptors[0].columns.iter().map(|c| c.source_column.as_str()).collect();
        assert_eq!(zeta_cols, vec!["a", "c"]);
    }

    #[test]
    fn test_target_hint_is_first_non_empty() {
        let rows = vec![row("src", "a", ""), row("src", "b", "out2"), row("src", "c", "out3")];
        let descriptors = build(rows).unwrap();

        assert_eq!(descriptors[0].target_table_hint, "out2");
    }

    #[test]
    fn test_target_hint_empty_when_never_set() {
        let descriptors = build(vec![row("src", "a", "")]).unwrap();
        assert_eq!(descriptors[0].target_table_hint, "");
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(build(vec![]), Err(MappingError::NoMappingRows)));
        assert!(matches!(build(vec![row("", "a", "t")]), Err(MappingError::NoMappingRows)));
    }

    proptest! {
        #[test]
        fn prop_grouping_counts(tables in prop::collection::vec(0usize..5, 1..40)) {
            let header = "Source_Table,Source_Column,Target_Table,Target_Column,Transformation";
            let mut csv = String::from(header);
            for (i, t) in tables.iter().enumerate() {
                csv.push_str(&format!("\ndb.tbl{t},c{i},out.tbl{t},C{i},"));
            }
            let mut distinct = tables.clone();
            distinct.sort_unstable();
            distinct.dedup();

            let descriptors = build(parse(&csv).unwrap()).unwrap();
            prop_assert_eq!(descriptors.len(), distinct.len());
            let total: usize = descriptors.iter().map(|d| d.columns.len()).sum();
            prop_assert_eq!(total, tables.len());
            prop_assert!(descriptors.iter().all(|d| !d.columns.is_empty()));
        }
    }
}
