//! Training metrics records
//!
//! `ClassificationReport` is what the training command writes to
//! `metrics.json`; `MetricsSnapshot` is the read-only subset the web UI
//! renders. Key names follow the classic classification-report layout
//! (`"macro avg"`, `"f1-score"`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{Error, Result};

/// Precision/recall/F1 for one class or one average
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: usize,
}

/// Full report written by the training command
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    /// Per-class scores keyed by species name
    #[serde(flatten)]
    pub per_class: BTreeMap<String, ClassScores>,
    pub accuracy: f64,
    #[serde(rename = "macro avg")]
    pub macro_avg: ClassScores,
    #[serde(rename = "weighted avg")]
    pub weighted_avg: ClassScores,
    pub cross_val_accuracy: f64,
}

/// Read-only metrics view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub accuracy: f64,
    #[serde(rename = "macro avg")]
    pub macro_avg: ClassScores,
    pub cross_val_accuracy: f64,
}

impl MetricsSnapshot {
    /// Read the snapshot from a metrics JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("No metrics found at {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(v: f64, support: usize) -> ClassScores {
        ClassScores {
            precision: v,
            recall: v,
            f1_score: v,
            support,
        }
    }

    #[test]
    fn test_report_round_trips_into_snapshot() {
        let mut per_class = BTreeMap::new();
        per_class.insert("Adelie".to_string(), scores(1.0, 30));
        let report = ClassificationReport {
            per_class,
            accuracy: 0.9855,
            macro_avg: scores(0.98, 69),
            weighted_avg: scores(0.985, 69),
            cross_val_accuracy: 0.9927,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["Adelie"]["f1-score"], 1.0);
        assert_eq!(json["macro avg"]["precision"], 0.98);

        let snapshot: MetricsSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(snapshot.accuracy, 0.9855);
        assert_eq!(snapshot.macro_avg.recall, 0.98);
        assert_eq!(snapshot.cross_val_accuracy, 0.9927);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = MetricsSnapshot::load(&dir.path().join("metrics.json")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
