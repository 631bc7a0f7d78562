//! Column statistics: maximum, minimum and median
//!
//! Values are parsed from text and sorted numerically in descending order.
//! A column must be fully populated with finite numbers; there is no
//! skipping and no default substitution.

use invflow_common::{fs, InventoryDataset, InvflowError, Result, StatisticsResult};
use std::path::Path;
use tracing::{debug, warn};

/// Compute statistics for `column` without touching the filesystem.
pub fn compute(dataset: &InventoryDataset, column: &str) -> Result<StatisticsResult> {
    if column.trim().is_empty() {
        return Err(InvflowError::invalid_argument("column name cannot be empty"));
    }

    if dataset.is_empty() {
        return Err(InvflowError::EmptyDataset);
    }

    let mut values = dataset
        .column_values(column)?
        .into_iter()
        .enumerate()
        .map(|(record, raw)| parse_value(column, record, raw))
        .collect::<Result<Vec<f64>>>()?;

    values.sort_by(|a, b| b.total_cmp(a));

    let (Some(&maximum), Some(&minimum)) = (values.first(), values.last()) else {
        return Err(InvflowError::EmptyDataset);
    };

    let stats = StatisticsResult {
        maximum,
        minimum,
        median: median_of_sorted(&values),
    };
    debug!(column, count = values.len(), ?stats, "Computed statistics");
    Ok(stats)
}

/// Compute statistics and write them to `output_path`.
///
/// The file is only written when computation succeeds. On failure any file
/// already at `output_path` is removed so it cannot pass for this run's result.
pub fn compute_and_write(
    dataset: &InventoryDataset,
    column: &str,
    output_path: impl AsRef<Path>,
) -> Result<StatisticsResult> {
    let output_path = output_path.as_ref();
    if output_path.as_os_str().is_empty() {
        return Err(InvflowError::invalid_argument("statistics path cannot be empty"));
    }

    match compute(dataset, column) {
        Ok(stats) => {
            fs::write_json_atomic(output_path, &stats, false)?;
            Ok(stats)
        },
        Err(e) => {
            if fs::remove_if_exists(output_path)? {
                warn!(path = %output_path.display(), "Removed stale statistics file");
            }
            Err(e)
        },
    }
}

fn parse_value(column: &str, record: usize, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| InvflowError::NotNumeric {
            column: column.to_string(),
            record,
            value: raw.to_string(),
        })
}

/// Median of a non-empty slice sorted in either direction.
fn median_of_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        let (a, b) = (sorted[mid - 1], sorted[mid]);
        let sum = a + b;
        if sum.is_finite() {
            sum / 2.0
        } else {
            // Sum overflowed, halve first
            a / 2.0 + b / 2.0
        }
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use invflow_common::Record;
    use tempfile::TempDir;

    const COLUMN: &str = "Volume 2015";

    fn dataset(values: &[&str]) -> InventoryDataset {
        values
            .iter()
            .map(|v| [("Item", "x"), (COLUMN, *v)].into_iter().collect::<Record>())
            .collect()
    }

    #[test]
    fn test_odd_count() {
        let stats = compute(&dataset(&["3.0", "1.0", "5.0", "2.5", "4.5"]), COLUMN).unwrap();
        assert_eq!(
            stats,
            StatisticsResult {
                maximum: 5.0,
                minimum: 1.0,
                median: 3.0
            }
        );
    }

    #[test]
    fn test_even_count_averages_middle_pair() {
        let stats =
            compute(&dataset(&["5.0", "4.5", "3.0", "2.5", "1.5", "1.0"]), COLUMN).unwrap();
        assert_eq!(stats.maximum, 5.0);
        assert_eq!(stats.minimum, 1.0);
        assert_eq!(stats.median, 2.75);
    }

    #[test]
    fn test_numeric_not_lexicographic_order() {
        let stats = compute(&dataset(&["9", "10", "100", "2"]), COLUMN).unwrap();
        assert_eq!(stats.maximum, 100.0);
        assert_eq!(stats.minimum, 2.0);
        assert_eq!(stats.median, 9.5);
    }

    #[test]
    fn test_single_value_and_negatives() {
        let stats = compute(&dataset(&["-4"]), COLUMN).unwrap();
        assert_eq!((stats.maximum, stats.minimum, stats.median), (-4.0, -4.0, -4.0));

        let stats = compute(&dataset(&["-1.5", " 2 ", "-10"]), COLUMN).unwrap();
        assert_eq!((stats.maximum, stats.minimum, stats.median), (2.0, -10.0, -1.5));
    }

    #[test]
    fn test_median_of_huge_values_is_finite() {
        let max = f64::MAX.to_string();
        let stats = compute(&dataset(&[max.as_str(), max.as_str()]), COLUMN).unwrap();
        assert_eq!(stats.median, f64::MAX);
    }

    #[test]
    fn test_median_of_subnormal_values_stays_in_range() {
        let stats = compute(&dataset(&["5e-324", "5e-324"]), COLUMN).unwrap();
        assert_eq!(stats.median, 5e-324);

        let stats = compute(&dataset(&["5e-324", "0", "-5e-324", "1e-323"]), COLUMN).unwrap();
        assert!(stats.median >= 0.0 && stats.median <= 5e-324);
    }

    #[test]
    fn test_median_of_opposite_extremes() {
        let (max, min) = (f64::MAX.to_string(), f64::MIN.to_string());
        let stats = compute(&dataset(&[max.as_str(), min.as_str()]), COLUMN).unwrap();
        assert_eq!(stats.median, 0.0);
    }

    #[test]
    fn test_not_numeric_names_record() {
        let err = compute(&dataset(&["1", "2", "lots"]), COLUMN).unwrap_err();
        match err {
            InvflowError::NotNumeric {
                column,
                record,
                value,
            } => {
                assert_eq!(column, COLUMN);
                assert_eq!(record, 2);
                assert_eq!(value, "lots");
            },
            other => panic!("expected NotNumeric, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_and_empty_values_rejected() {
        for bad in ["NaN", "inf", "-infinity", ""] {
            assert!(
                matches!(
                    compute(&dataset(&["1", bad]), COLUMN),
                    Err(InvflowError::NotNumeric { .. })
                ),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_empty_dataset_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("stats.json");

        let err = compute_and_write(&InventoryDataset::default(), COLUMN, &out).unwrap_err();

        assert!(matches!(err, InvflowError::EmptyDataset));
        assert!(!out.exists());
    }

    #[test]
    fn test_missing_column_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("stats.json");
        let mut records = dataset(&["1", "2"]).into_records();
        records.push([("Item", "y")].into_iter().collect());

        let err = compute_and_write(&InventoryDataset::new(records), COLUMN, &out).unwrap_err();

        assert!(matches!(err, InvflowError::MissingColumn { record: 2, .. }));
        assert!(!out.exists());
    }

    #[test]
    fn test_failure_removes_stale_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("stats.json");
        std::fs::write(&out, r#"{"Maximum":1.0,"Minimum":1.0,"Median":1.0}"#).unwrap();

        compute_and_write(&dataset(&["oops"]), COLUMN, &out).unwrap_err();

        assert!(!out.exists());
    }

    #[test]
    fn test_written_file_round_trips() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("stats.json");
        std::fs::write(&out, "previous run").unwrap();

        let stats = compute_and_write(&dataset(&["0.1", "0.2", "0.7"]), COLUMN, &out).unwrap();

        let raw = std::fs::read_to_string(&out).unwrap();
        let reloaded: StatisticsResult = serde_json::from_str(&raw).unwrap();
        assert_eq!(reloaded, stats);
        assert_eq!(reloaded.median, 0.2);

        let keys: Vec<String> = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&raw)
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys.len(), 3);
        assert!(raw.starts_with(r#"{"Maximum":0.7,"#));
    }
}
