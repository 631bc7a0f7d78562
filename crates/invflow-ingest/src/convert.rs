//! TSV to JSON conversion
//!
//! The first non-blank line is the header; every following line becomes one
//! [`Record`] keyed by header name in header order. Values stay as text.
//! Cells may be double-quoted, in which case they can contain tabs and
//! newlines.

use csv::{ReaderBuilder, StringRecord};
use invflow_common::{fs, InventoryDataset, InvflowError, Record, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// What to do with a data row whose field count differs from the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldCountPolicy {
    /// Any mismatch is a `RaggedRow` error
    #[default]
    Strict,
    /// Missing trailing fields become empty strings; extra fields are still an error
    PadShort,
}

/// Parses tab-delimited text into an [`InventoryDataset`]
#[derive(Debug, Clone, Default)]
pub struct TsvToJsonConverter {
    policy: FieldCountPolicy,
}

impl TsvToJsonConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: FieldCountPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FieldCountPolicy {
        self.policy
    }

    pub fn convert(&self, text: &str) -> Result<InventoryDataset> {
        if text.trim().is_empty() {
            return Err(InvflowError::EmptyInput);
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let header = reader.headers().map_err(tsv_error)?.clone();
        let columns = header_columns(&header)?;

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(tsv_error)?;
            records.push(self.to_record(&columns, &row)?);
        }

        debug!(
            columns = columns.len(),
            records = records.len(),
            "Converted TSV"
        );

        Ok(InventoryDataset::new(records))
    }

    fn to_record(&self, columns: &[String], row: &StringRecord) -> Result<Record> {
        let expected = columns.len();
        let found = row.len();
        let short_allowed = self.policy == FieldCountPolicy::PadShort && found < expected;

        if found != expected && !short_allowed {
            return Err(InvflowError::RaggedRow {
                line: row.position().map_or(0, |p| p.line()),
                expected,
                found,
            });
        }

        let mut record = Record::with_capacity(expected);
        for (index, column) in columns.iter().enumerate() {
            record.insert(column.as_str(), row.get(index).unwrap_or(""));
        }
        Ok(record)
    }
}

fn header_columns(header: &StringRecord) -> Result<Vec<String>> {
    if header.is_empty() {
        return Err(InvflowError::EmptyInput);
    }

    let mut seen = HashSet::new();
    header
        .iter()
        .map(|name| {
            if seen.insert(name) {
                Ok(name.to_string())
            } else {
                Err(InvflowError::malformed(format!("duplicate column '{}' in header", name)))
            }
        })
        .collect()
}

fn tsv_error(error: csv::Error) -> InvflowError {
    InvflowError::malformed(format!("invalid TSV: {}", error))
}

/// Persist `dataset` as an indented JSON array, replacing `path` atomically.
///
/// Returns the number of bytes written.
pub fn write_dataset(dataset: &InventoryDataset, path: impl AsRef<Path>) -> Result<u64> {
    fs::write_json_atomic(path.as_ref(), dataset, true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const INVENTORY: &str = "Item\tAisle\tVolume 2015\n\
                             apples\t3\t120.5\n\
                             pears\t3\t80\n\
                             flour\t7\t1000\n";

    fn convert(text: &str) -> Result<InventoryDataset> {
        TsvToJsonConverter::new().convert(text)
    }

    #[test]
    fn test_rows_and_header_order() {
        let dataset = convert(INVENTORY).unwrap();

        assert_eq!(dataset.len(), 3);
        let first = &dataset.records()[0];
        assert_eq!(first.keys().collect::<Vec<_>>(), vec!["Item", "Aisle", "Volume 2015"]);
        assert_eq!(first.get("Volume 2015"), Some("120.5"));
        assert_eq!(
            dataset.column_values("Item").unwrap(),
            vec!["apples", "pears", "flour"]
        );
    }

    #[test]
    fn test_values_stay_text() {
        let dataset = convert("code\tqty\n007\t1e3\n").unwrap();
        let record = &dataset.records()[0];
        assert_eq!(record.get("code"), Some("007"));
        assert_eq!(record.get("qty"), Some("1e3"));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(convert(""), Err(InvflowError::EmptyInput)));
        assert!(matches!(convert("\n\n  \n"), Err(InvflowError::EmptyInput)));
    }

    #[test]
    fn test_header_only_yields_no_records() {
        let dataset = convert("Item\tVolume 2015\n").unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let dataset = convert("a\tb\r\n1\t2\r\n\r\n3\t4\r\n").unwrap();
        assert_eq!(dataset.column_values("b").unwrap(), vec!["2", "4"]);
    }

    #[test]
    fn test_quoted_cell_with_tab() {
        let dataset = convert("name\tqty\n\"big\tbox\"\t4\n").unwrap();
        assert_eq!(dataset.records()[0].get("name"), Some("big\tbox"));
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let err = convert("qty\tqty\n1\t2\n").unwrap_err();
        assert!(matches!(err, InvflowError::MalformedData(ref m) if m.contains("qty")));
    }

    #[test]
    fn test_strict_short_row_is_error() {
        let err = convert("a\tb\tc\n1\t2\t3\n4\t5\n").unwrap_err();
        match err {
            InvflowError::RaggedRow {
                line,
                expected,
                found,
            } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            },
            other => panic!("expected RaggedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_pad_short_fills_empty_strings() {
        let dataset = TsvToJsonConverter::new()
            .with_policy(FieldCountPolicy::PadShort)
            .convert("a\tb\tc\n4\t5\n")
            .unwrap();

        let record = &dataset.records()[0];
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(record.get("c"), Some(""));
    }

    #[test]
    fn test_extra_fields_rejected_under_both_policies() {
        for policy in [FieldCountPolicy::Strict, FieldCountPolicy::PadShort] {
            let err = TsvToJsonConverter::new()
                .with_policy(policy)
                .convert("a\tb\n1\t2\t3\n")
                .unwrap_err();
            assert!(
                matches!(err, InvflowError::RaggedRow { expected: 2, found: 3, .. }),
                "policy {:?}",
                policy
            );
        }
    }

    #[test]
    fn test_write_dataset_preserves_row_and_key_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        let dataset = convert("z\ta\n2\t1\n1\t2\n").unwrap();

        write_dataset(&dataset, &path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!([{"z": "2", "a": "1"}, {"z": "1", "a": "2"}])
        );
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.find("\"z\"").unwrap() < raw.find("\"a\"").unwrap());
    }

    proptest! {
        #[test]
        fn prop_row_count_and_key_set(
            columns in prop::collection::hash_set("[a-z]{1,6}", 1..6),
            rows in prop::collection::vec(prop::collection::vec("[a-zA-Z0-9.]{1,8}", 6), 0..20),
        ) {
            let header: Vec<String> = columns.into_iter().collect();
            let mut text = header.join("\t");
            text.push('\n');
            for row in &rows {
                text.push_str(&row[..header.len()].join("\t"));
                text.push('\n');
            }

            let dataset = convert(&text).unwrap();

            prop_assert_eq!(dataset.len(), rows.len());
            for record in dataset.iter() {
                prop_assert_eq!(record.keys().collect::<Vec<_>>(), header.iter().map(String::as_str).collect::<Vec<_>>());
            }
        }
    }
}
