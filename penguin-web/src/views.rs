//! View Composer
//!
//! Pure functions turning the history (and optionally the latest
//! prediction) into the two UI-facing representations: a scatter chart
//! specification and a display table.

use serde::Serialize;

use penguin_common::features::CSV_HEADER;
use penguin_common::{NumericFeature, Observation, Species};

pub const CHART_TITLE: &str = "Penguin Data Distribution";
pub const LEGEND_TITLE: &str = "Species";
pub const HIGHLIGHT_NAME: &str = "Latest Prediction";

/// Opacity of historical points
pub const HISTORY_OPACITY: f64 = 0.5;

/// Diameter in px of the largest sized marker
const MAX_MARKER_SIZE: f64 = 20.0;

/// Diameter in px when no size feature is plotted
const DEFAULT_MARKER_SIZE: f64 = 8.0;

const HIGHLIGHT_MARKER_SIZE: f64 = 15.0;

// ========================================
// Chart
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerSymbol {
    Circle,
    Star,
}

/// Fixed size for the whole trace, or one size per point
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MarkerSize {
    Fixed(f64),
    PerPoint(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerLine {
    pub width: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub color: String,
    pub opacity: f64,
    pub symbol: MarkerSymbol,
    pub size: MarkerSize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<MarkerLine>,
}

/// One named series of points
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub marker: Marker,
}

/// Renderer-agnostic scatter chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_axis: NumericFeature,
    pub y_axis: NumericFeature,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_axis: Option<NumericFeature>,
    pub legend_title: String,
    pub traces: Vec<Trace>,
}

impl ChartSpec {
    pub fn trace(&self, name: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.name == name)
    }
}

/// Scatter of the history colored by species, with an optional highlighted point
///
/// Species traces appear in fixed species order and only when non-empty.
/// Records without a species are not plotted. Marker area is proportional
/// to `size_feature` when one is given.
pub fn build_scatter(
    history: &[Observation],
    x_feature: NumericFeature,
    y_feature: NumericFeature,
    size_feature: Option<NumericFeature>,
    highlighted: Option<&Observation>,
) -> ChartSpec {
    let size_max = size_feature.map(|feature| {
        history
            .iter()
            .map(|o| o.numeric(feature))
            .fold(0.0_f64, f64::max)
    });

    let mut traces: Vec<Trace> = Species::ALL
        .iter()
        .filter_map(|species| {
            let points: Vec<&Observation> = history
                .iter()
                .filter(|o| o.species == Some(*species))
                .collect();
            if points.is_empty() {
                return None;
            }

            let size = match (size_feature, size_max) {
                (Some(feature), Some(max)) if max > 0.0 => MarkerSize::PerPoint(
                    points
                        .iter()
                        .map(|o| MAX_MARKER_SIZE * (o.numeric(feature).max(0.0) / max).sqrt())
                        .collect(),
                ),
                _ => MarkerSize::Fixed(DEFAULT_MARKER_SIZE),
            };

            Some(Trace {
                name: species.to_string(),
                x: points.iter().map(|o| o.numeric(x_feature)).collect(),
                y: points.iter().map(|o| o.numeric(y_feature)).collect(),
                marker: Marker {
                    color: species.color().to_string(),
                    opacity: HISTORY_OPACITY,
                    symbol: MarkerSymbol::Circle,
                    size,
                    line: None,
                },
            })
        })
        .collect();

    if let Some(latest) = highlighted {
        traces.push(Trace {
            name: HIGHLIGHT_NAME.to_string(),
            x: vec![latest.numeric(x_feature)],
            y: vec![latest.numeric(y_feature)],
            marker: Marker {
                color: "yellow".to_string(),
                opacity: 1.0,
                symbol: MarkerSymbol::Star,
                size: MarkerSize::Fixed(HIGHLIGHT_MARKER_SIZE),
                line: Some(MarkerLine {
                    width: 1.0,
                    color: "black".to_string(),
                }),
            },
        });
    }

    ChartSpec {
        title: CHART_TITLE.to_string(),
        x_axis: x_feature,
        y_axis: y_feature,
        size_axis: size_feature,
        legend_title: LEGEND_TITLE.to_string(),
        traces,
    }
}

// ========================================
// Table
// ========================================

/// History rendered as display strings in log column order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Number of records before any row limit
    pub total_rows: usize,
    pub truncated: bool,
}

/// Tabular view of the history, keeping at most `limit` rows from the top
pub fn build_table(history: &[Observation], limit: Option<usize>) -> TableView {
    let shown = limit.map_or(history.len(), |l| l.min(history.len()));

    TableView {
        columns: CSV_HEADER.iter().map(|c| c.to_string()).collect(),
        rows: history[..shown].iter().map(table_row).collect(),
        total_rows: history.len(),
        truncated: shown < history.len(),
    }
}

fn table_row(o: &Observation) -> Vec<String> {
    vec![
        o.species.map(|s| s.to_string()).unwrap_or_default(),
        o.island.to_string(),
        format!("{:?}", o.bill_length_mm),
        format!("{:?}", o.bill_depth_mm),
        format!("{:?}", o.flipper_length_mm),
        format!("{:?}", o.body_mass_g),
        o.sex.map(|s| s.to_string()).unwrap_or_default(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use penguin_common::{Island, Sex};

    fn obs(species: Species, bill_length_mm: f64, body_mass_g: f64) -> Observation {
        Observation {
            species: Some(species),
            island: Island::Biscoe,
            bill_length_mm,
            bill_depth_mm: 15.0,
            flipper_length_mm: 210.0,
            body_mass_g,
            sex: Some(Sex::Female),
        }
    }

    fn history() -> Vec<Observation> {
        vec![
            obs(Species::Gentoo, 47.0, 5000.0),
            obs(Species::Adelie, 38.0, 3600.0),
            obs(Species::Adelie, 39.0, 2500.0),
        ]
    }

    #[test]
    fn test_scatter_groups_by_species_in_fixed_order() {
        let chart = build_scatter(
            &history(),
            NumericFeature::FlipperLengthMm,
            NumericFeature::BillLengthMm,
            None,
            None,
        );

        let names: Vec<&str> = chart.traces.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Adelie", "Gentoo"]);

        let adelie = chart.trace("Adelie").unwrap();
        assert_eq!(adelie.y, vec![38.0, 39.0]);
        assert_eq!(adelie.x, vec![210.0, 210.0]);
        assert_eq!(adelie.marker.color, "#636EFA");
        assert_eq!(adelie.marker.opacity, HISTORY_OPACITY);
        assert_eq!(adelie.marker.size, MarkerSize::Fixed(DEFAULT_MARKER_SIZE));
        assert!(chart.trace(HIGHLIGHT_NAME).is_none());
    }

    #[test]
    fn test_scatter_highlight_is_single_opaque_star() {
        let latest = obs(Species::Chinstrap, 50.0, 3800.0);
        let chart = build_scatter(
            &history(),
            NumericFeature::BillLengthMm,
            NumericFeature::BodyMassG,
            Some(NumericFeature::BodyMassG),
            Some(&latest),
        );

        let highlight = chart.traces.last().unwrap();
        assert_eq!(highlight.name, HIGHLIGHT_NAME);
        assert_eq!(highlight.x, vec![50.0]);
        assert_eq!(highlight.y, vec![3800.0]);
        assert_eq!(highlight.marker.opacity, 1.0);
        assert_eq!(highlight.marker.symbol, MarkerSymbol::Star);
        // Highlight does not create a species trace of its own
        assert!(chart.trace("Chinstrap").is_none());
    }

    #[test]
    fn test_scatter_marker_area_tracks_size_feature() {
        let chart = build_scatter(
            &history(),
            NumericFeature::FlipperLengthMm,
            NumericFeature::BillLengthMm,
            Some(NumericFeature::BodyMassG),
            None,
        );

        let gentoo = chart.trace("Gentoo").unwrap();
        assert_eq!(gentoo.marker.size, MarkerSize::PerPoint(vec![MAX_MARKER_SIZE]));

        let adelie = chart.trace("Adelie").unwrap();
        match &adelie.marker.size {
            MarkerSize::PerPoint(sizes) => {
                assert_eq!(sizes.len(), 2);
                assert!(sizes[0] > sizes[1]);
                assert!(sizes.iter().all(|s| *s <= MAX_MARKER_SIZE));
            }
            other => panic!("Expected per-point sizes, got {:?}", other),
        }
    }

    #[test]
    fn test_scatter_of_empty_history_has_no_traces() {
        let chart = build_scatter(
            &[],
            NumericFeature::FlipperLengthMm,
            NumericFeature::BillLengthMm,
            Some(NumericFeature::BodyMassG),
            None,
        );
        assert!(chart.traces.is_empty());
        assert_eq!(chart.title, CHART_TITLE);
    }

    #[test]
    fn test_chart_serializes_axis_names() {
        let chart = build_scatter(
            &history(),
            NumericFeature::FlipperLengthMm,
            NumericFeature::BillLengthMm,
            None,
            None,
        );
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["x_axis"], "flipper_length_mm");
        assert_eq!(json["y_axis"], "bill_length_mm");
        assert!(json.get("size_axis").is_none());
        assert_eq!(json["traces"][0]["marker"]["symbol"], "circle");
    }

    #[test]
    fn test_table_rows_follow_history_order() {
        let table = build_table(&history(), None);

        assert_eq!(table.columns, CSV_HEADER.to_vec());
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.total_rows, 3);
        assert!(!table.truncated);
        assert_eq!(
            table.rows[0],
            vec!["Gentoo", "Biscoe", "47.0", "15.0", "210.0", "5000.0", "female"]
        );
    }

    #[test]
    fn test_table_row_limit() {
        let table = build_table(&history(), Some(2));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.total_rows, 3);
        assert!(table.truncated);

        let table = build_table(&history(), Some(10));
        assert_eq!(table.rows.len(), 3);
        assert!(!table.truncated);
    }
}
