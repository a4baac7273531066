//! Mapping table parser
//!
//! Reads the `Source_Table,Source_Column,Target_Table,Target_Column,Transformation`
//! table into [`MappingRow`] records, in file order.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::MappingError;

/// Header names every mapping table must carry (case-sensitive, any order)
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "Source_Table",
    "Source_Column",
    "Target_Table",
    "Target_Column",
    "Transformation",
];

/// Minimum number of fields a data line needs to be considered a row
const MIN_FIELDS: usize = 5;

/// One source-column-to-target-column rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRow {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    /// Expression to compute the target column; empty means passthrough
    pub transformation: String,
}

/// Parser behaviour switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Fail on short data lines instead of skipping them
    pub strict: bool,
}

/// Column positions resolved from the header line
#[derive(Debug, Clone, Copy)]
struct HeaderIndex {
    source_table: usize,
    source_column: usize,
    target_table: usize,
    target_column: usize,
    transformation: usize,
}

impl HeaderIndex {
    fn from_record(header: &csv::StringRecord) -> Result<Self, MappingError> {
        debug!(field_count = header.len(), "HeaderIndex::from_record: called");
        let names: Vec<&str> = header
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}'))
            .collect();
        let position = |name: &str| names.iter().position(|h| *h == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| position(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            debug!(?missing, "HeaderIndex::from_record: missing required columns");
            return Err(MappingError::MissingColumns(missing));
        }

        // All five were found above
        let at = |name: &str| position(name).unwrap_or_default();
        Ok(Self {
            source_table: at("Source_Table"),
            source_column: at("Source_Column"),
            target_table: at("Target_Table"),
            target_column: at("Target_Column"),
            transformation: at("Transformation"),
        })
    }

    fn row(&self, record: &csv::StringRecord) -> MappingRow {
        let field = |idx: usize| record.get(idx).unwrap_or_default().trim().to_string();
        MappingRow {
            source_table: field(self.source_table),
            source_column: field(self.source_column),
            target_table: field(self.target_table),
            target_column: field(self.target_column),
            transformation: field(self.transformation),
        }
    }
}

/// Parse a mapping table with lenient defaults
pub fn parse(raw_text: &str) -> Result<Vec<MappingRow>, MappingError> {
    parse_with(raw_text, ParseOptions::default())
}

/// Parse a mapping table
///
/// Short data lines are skipped unless `options.strict` is set. Rows whose
/// `Source_Table` is empty after trimming are dropped.
pub fn parse_with(raw_text: &str, options: ParseOptions) -> Result<Vec<MappingRow>, MappingError> {
    debug!(len = raw_text.len(), strict = options.strict, "parse_with: called");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(raw_text.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => {
            debug!("parse_with: empty input, no header");
            return Err(MappingError::MissingColumns(
                REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            ));
        }
    };
    let index = HeaderIndex::from_record(&header)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in records {
        let record = record?;
        if record.len() < MIN_FIELDS {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            if options.strict {
                debug!(line, fields = record.len(), "parse_with: short row in strict mode");
                return Err(MappingError::MalformedRow {
                    line,
                    fields: record.len(),
                });
            }
            debug!(line, fields = record.len(), "parse_with: skipping short row");
            skipped += 1;
            continue;
        }

        let row = index.row(&record);
        if row.source_table.is_empty() {
            debug!(target_column = %row.target_column, "parse_with: dropping row without source table");
            skipped += 1;
            continue;
        }
        rows.push(row);
    }

    if skipped > 0 {
        warn!(skipped, kept = rows.len(), "parse_with: skipped unusable mapping rows");
    }
    debug!(row_count = rows.len(), "parse_with: done");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Source_Table,Source_Column,Target_Table,Target_Column,Transformation";

    #[test]
    fn test_parse_basic_rows_in_order() {
        let text = format!("{HEADER}\ncat.sch.tbl1,a,cat.sch.out1,A,a*2\ncat.sch.tbl1,b,cat.sch.out1,B,\n");
        let rows = parse(&text).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].source_table, "cat.sch.tbl1");
        assert_eq!(rows[0].transformation, "a*2");
        assert_eq!(rows[1].target_column, "B");
        assert_eq!(rows[1].transformation, "");
    }

    #[test]
    fn test_header_order_independent() {
        let text = "Target_Column,Transformation,Source_Table,Target_Table,Source_Column\nX,upper(x),src,dst,x\n";
        let rows = parse(text).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source_table, "src");
        assert_eq!(rows[0].source_column, "x");
        assert_eq!(rows[0].target_table, "dst");
        assert_eq!(rows[0].target_column, "X");
        assert_eq!(rows[0].transformation, "upper(x)");
    }

    #[test]
    fn test_missing_columns_reported() {
        let text = "Source_Table,Source_Column,Target_Column\nsrc,a,A\n";
        match parse(text) {
            Err(MappingError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["Target_Table".to_string(), "Transformation".to_string()]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_header_is_case_sensitive() {
        let text = "source_table,Source_Column,Target_Table,Target_Column,Transformation\nsrc,a,t,A,\n";
        assert!(matches!(parse(text), Err(MappingError::MissingColumns(m)) if m == vec!["Source_Table"]));
    }

    #[test]
    fn test_empty_input_is_missing_everything() {
        match parse("") {
            Err(MappingError::MissingColumns(missing)) => assert_eq!(missing.len(), 5),
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_short_rows_skipped_when_lenient() {
        let text = format!("{HEADER}\nsrc,a,t,A,\nsrc,b\n\n\nsrc,c,t,C,c+1\n");
        let rows = parse(&text).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].source_column, "c");
    }

    #[test]
    fn test_short_rows_fail_when_strict() {
        let text = format!("{HEADER}\nsrc,a,t,A,\nsrc,b\n");
        let result = parse_with(&text, ParseOptions { strict: true });

        assert!(matches!(result, Err(MappingError::MalformedRow { line: 3, fields: 2 })));
    }

    #[test]
    fn test_fields_are_trimmed_and_empty_source_dropped() {
        let text = format!("{HEADER}\n  src  , a ,  t , A ,  a + 1 \n   ,x,t,X,\n");
        let rows = parse(&text).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            MappingRow {
                source_table: "src".to_string(),
                source_column: "a".to_string(),
                target_table: "t".to_string(),
                target_column: "A".to_string(),
                transformation: "a + 1".to_string(),
            }
        );
    }

    #[test]
    fn test_quoted_field_keeps_delimiter() {
        let text = format!("{HEADER}\nsrc,a,t,A,\"concat(a, '-', b)\"\n");
        let rows = parse(&text).unwrap();

        assert_eq!(rows[0].transformation, "concat(a, '-', b)");
    }

    #[test]
    fn test_header_only_yields_no_rows() {
        assert!(parse(HEADER).unwrap().is_empty());
    }
}
