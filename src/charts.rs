use crate::api::models::VisualizationSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// One point of a bar or line series, paired positionally from the wire
/// payload's `xvalues`/`yvalues` arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: String,
    pub y: f64,
}

/// Normalized bar/line chart data as stored on a tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesData {
    pub xlabel: String,
    pub ylabel: String,
    pub points: Vec<SeriesPoint>,
}

/// One pie slice. Produced by normalization at the response boundary so
/// nothing downstream has to inspect object keys at runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieEntry {
    pub label: String,
    pub value: f64,
}

/// Normalized pie chart data as stored on a tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieData {
    pub xlabel: String,
    pub entries: Vec<PieEntry>,
}

/// The per-tab chart state: at most one payload of each kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSet {
    pub bar: Option<SeriesData>,
    pub pie: Option<PieData>,
    pub line: Option<SeriesData>,
}

// Wire shapes as the visualization service sends them.

#[derive(Debug, Deserialize)]
struct SeriesPayload {
    xlabel: String,
    ylabel: String,
    #[serde(default)]
    xvalues: Vec<Value>,
    #[serde(default)]
    yvalues: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct PiePayload {
    xlabel: String,
    #[serde(default)]
    values: Vec<Value>,
}

impl ChartSet {
    /// Folds one visualization response into a fresh chart set. Kinds the
    /// response does not mention end up absent; duplicate kinds keep the
    /// last descriptor. Unknown kinds and unparsable payloads are dropped.
    pub fn from_specs(specs: &[VisualizationSpec]) -> ChartSet {
        let mut charts = ChartSet::default();
        for spec in specs {
            match spec.kind.as_str() {
                "bar" => charts.bar = SeriesData::from_value(&spec.data),
                "line" => charts.line = SeriesData::from_value(&spec.data),
                "pie" => charts.pie = PieData::from_value(&spec.data),
                other => warn!("Ignoring visualization of unknown kind: {}", other),
            }
        }
        charts
    }

    pub fn is_empty(&self) -> bool {
        self.bar.is_none() && self.pie.is_none() && self.line.is_none()
    }
}

impl SeriesData {
    fn from_value(data: &Value) -> Option<SeriesData> {
        let payload: SeriesPayload = match serde_json::from_value(data.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Discarding malformed series payload: {}", e);
                return None;
            }
        };

        // Positional pairing; a length mismatch pairs up to the shorter
        // side, and entries without a numeric y are dropped.
        let points = payload
            .xvalues
            .iter()
            .zip(payload.yvalues.iter())
            .filter_map(|(x, y)| {
                numeric(y).map(|y| SeriesPoint {
                    x: label_text(x),
                    y,
                })
            })
            .collect();

        Some(SeriesData {
            xlabel: payload.xlabel,
            ylabel: payload.ylabel,
            points,
        })
    }
}

impl PieData {
    fn from_value(data: &Value) -> Option<PieData> {
        let payload: PiePayload = match serde_json::from_value(data.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Discarding malformed pie payload: {}", e);
                return None;
            }
        };

        let entries = payload.values.iter().filter_map(pie_entry).collect();

        Some(PieData {
            xlabel: payload.xlabel,
            entries,
        })
    }
}

/// A pie value entry is either a labeled record (label under whichever
/// non-`"value"` key is present) or a bare number acting as its own label.
fn pie_entry(entry: &Value) -> Option<PieEntry> {
    match entry {
        Value::Number(n) => n.as_f64().map(|value| PieEntry {
            label: n.to_string(),
            value,
        }),
        Value::Object(map) => {
            let value = numeric(map.get("value")?)?;
            let label = map
                .iter()
                .find(|(key, _)| key.as_str() != "value")
                .map(|(_, label)| label_text(label))
                .unwrap_or_else(|| value.to_string());
            Some(PieEntry { label, value })
        }
        _ => None,
    }
}

fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
