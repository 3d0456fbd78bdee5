//! Vega-Lite chart rendering.
//!
//! Charts are written as self-contained HTML pages that load Vega, Vega-Lite
//! and Vega-Embed from jsDelivr and embed the chart spec inline.

use crate::error::{ChartQaError, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, instrument};

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

const HTML_TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <style>
    #vis.vega-embed {
      width: 100%;
      display: flex;
    }
  </style>
  <script type="text/javascript" src="https://cdn.jsdelivr.net/npm/vega@5"></script>
  <script type="text/javascript" src="https://cdn.jsdelivr.net/npm/vega-lite@5"></script>
  <script type="text/javascript" src="https://cdn.jsdelivr.net/npm/vega-embed@6"></script>
</head>
<body>
  <div id="vis"></div>
  <script>
const spec = __SPEC__;
    vegaEmbed("#vis", spec, {"mode": "vega-lite"}).catch(console.error);
  </script>
</body>
</html>
"##;

/// Chart mark type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
}

impl ChartKind {
    /// Vega-Lite mark name.
    pub fn mark(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar Chart",
            ChartKind::Line => "Line Chart",
        }
    }
}

impl std::str::FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bar" => Ok(ChartKind::Bar),
            "line" => Ok(ChartKind::Line),
            _ => Err(format!("Unknown chart kind: {}", s)),
        }
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mark())
    }
}

/// Ordered label → value table with unique labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartData {
    rows: Vec<(String, Number)>,
}

impl ChartData {
    /// Normalize chart data from JSON.
    ///
    /// Accepts an object (`{"Jan": 100}`) or an array of pairs
    /// (`[["Jan", 100]]`). Object order is preserved. A repeated label keeps
    /// its first position and takes the last value.
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut data = ChartData::default();

        match value {
            Value::Object(map) => {
                for (label, v) in map {
                    data.insert(label.clone(), to_number(v)?);
                }
            }
            Value::Array(items) => {
                for item in items {
                    match item.as_array().map(Vec::as_slice) {
                        Some([label, v]) => data.insert(to_label(label)?, to_number(v)?),
                        _ => {
                            return Err(ChartQaError::InvalidInput(format!(
                                "Data must be a dictionary or a list of [label, value] pairs, found element {}",
                                item
                            )))
                        }
                    }
                }
            }
            other => {
                return Err(ChartQaError::InvalidInput(format!(
                    "Data must be a dictionary or a list of [label, value] pairs, found {}",
                    json_type(other)
                )))
            }
        }

        Ok(data)
    }

    fn insert(&mut self, label: String, value: Number) {
        match self.rows.iter_mut().find(|(l, _)| *l == label) {
            Some(row) => row.1 = value,
            None => self.rows.push((label, value)),
        }
    }

    pub fn rows(&self) -> &[(String, Number)] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<L: Into<String>> FromIterator<(L, i64)> for ChartData {
    fn from_iter<T: IntoIterator<Item = (L, i64)>>(iter: T) -> Self {
        let mut data = ChartData::default();
        for (label, value) in iter {
            data.insert(label.into(), Number::from(value));
        }
        data
    }
}

fn to_label(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(ChartQaError::InvalidInput(format!(
            "Chart label must be a string or number, found {}",
            json_type(other)
        ))),
    }
}

fn to_number(value: &Value) -> Result<Number> {
    let invalid = || {
        ChartQaError::InvalidInput(format!("Chart value must be numeric, found {}", value))
    };

    match value {
        Value::Number(n) => Ok(n.clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Number::from(i));
            }
            s.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Everything needed to draw one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub data: ChartData,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub color: String,
}

impl ChartSpec {
    /// A chart with the default title, axis labels and color.
    pub fn new(kind: ChartKind, data: ChartData) -> Self {
        Self {
            kind,
            data,
            title: kind.default_title().to_string(),
            x_label: "X-axis".to_string(),
            y_label: "Y-axis".to_string(),
            color: "skyblue".to_string(),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_labels(mut self, x_label: &str, y_label: &str) -> Self {
        self.x_label = x_label.to_string();
        self.y_label = y_label.to_string();
        self
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = color.to_string();
        self
    }

    /// The Vega-Lite v5 spec. The x axis keeps data order (`sort: null`).
    pub fn to_vega_lite(&self) -> Value {
        let values: Vec<Value> = self
            .data
            .rows()
            .iter()
            .map(|(label, value)| {
                let mut row = serde_json::Map::new();
                row.insert(self.x_label.clone(), Value::String(label.clone()));
                row.insert(self.y_label.clone(), Value::Number(value.clone()));
                Value::Object(row)
            })
            .collect();

        json!({
            "$schema": VEGA_LITE_SCHEMA,
            "config": {"view": {"continuousWidth": 300, "continuousHeight": 300}},
            "title": self.title,
            "data": {"values": values},
            "mark": {"type": self.kind.mark(), "color": self.color},
            "encoding": {
                "x": {"field": escape_field(&self.x_label), "type": "nominal", "sort": null},
                "y": {"field": escape_field(&self.y_label), "type": "quantitative"}
            }
        })
    }

    /// Standalone HTML page embedding the chart.
    pub fn to_html(&self) -> Result<String> {
        // Both axes share one row object, keyed by label
        if self.x_label == self.y_label {
            return Err(ChartQaError::InvalidInput(format!(
                "x_label and y_label must differ, both are '{}'",
                self.x_label
            )));
        }
        // Keep the spec from closing the surrounding <script> element
        let spec = serde_json::to_string(&self.to_vega_lite())?.replace("</", "<\\/");
        Ok(HTML_TEMPLATE.replace("__SPEC__", &spec))
    }
}

/// Vega-Lite reads `.` and `[]` in field names as nested access.
fn escape_field(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '.' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `<title with underscores>_<YYYY-MM-DD_HH-MM-SS>.html`.
pub fn chart_file_name(title: &str, at: DateTime<Local>) -> String {
    let title: String = title
        .chars()
        .map(|c| if c == ' ' || c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}_{}.html", title, at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Writes charts into a fixed output directory.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    output_dir: PathBuf,
}

impl ChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Render a chart to `<output_dir>/<title>_<timestamp>.html`.
    ///
    /// Creates the output directory if needed and returns the written path.
    /// An existing chart with the same name is never overwritten.
    #[instrument(skip(self, spec), fields(kind = %spec.kind, title = %spec.title))]
    pub fn render(&self, spec: &ChartSpec) -> Result<PathBuf> {
        self.render_at(spec, Local::now())
    }

    fn render_at(&self, spec: &ChartSpec, at: DateTime<Local>) -> Result<PathBuf> {
        let html = spec.to_html()?;
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join(chart_file_name(&spec.title, at));
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    ChartQaError::Io(std::io::Error::new(
                        e.kind(),
                        format!(
                            "chart {} already exists; use a different title",
                            path.display()
                        ),
                    ))
                } else {
                    ChartQaError::Io(e)
                }
            })?;
        file.write_all(html.as_bytes())?;

        info!("Saved chart as {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
pub(crate) fn read_embedded_spec(path: &std::path::Path) -> Value {
    let html = std::fs::read_to_string(path).unwrap();
    let line = html
        .lines()
        .find_map(|l| l.strip_prefix("const spec = "))
        .unwrap();
    serde_json::from_str(line.trim_end_matches(';')).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn x_values(spec: &Value, field: &str) -> Vec<Value> {
        spec["data"]["values"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row[field].clone())
            .collect()
    }

    #[test]
    fn test_mapping_keeps_insertion_order() {
        let data = ChartData::from_value(&json!({"Mar": 3, "Jan": 1, "Feb": 2})).unwrap();
        let labels: Vec<_> = data.rows().iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["Mar", "Jan", "Feb"]);
    }

    #[test]
    fn test_pairs_normalize_like_mapping() {
        let from_map = ChartData::from_value(&json!({"Jan": 100, "Feb": 105.5})).unwrap();
        let from_pairs = ChartData::from_value(&json!([["Jan", 100], ["Feb", 105.5]])).unwrap();
        assert_eq!(from_map, from_pairs);

        let a = ChartSpec::new(ChartKind::Bar, from_map).to_vega_lite();
        let b = ChartSpec::new(ChartKind::Bar, from_pairs).to_vega_lite();
        assert_eq!(a, b);
    }

    #[test]
    fn test_duplicate_pair_labels_take_last_value() {
        let data = ChartData::from_value(&json!([["Jan", 1], ["Feb", 2], ["Jan", 3]])).unwrap();
        let rows: Vec<_> = data
            .rows()
            .iter()
            .map(|(l, v)| (l.as_str(), v.as_i64().unwrap()))
            .collect();
        assert_eq!(rows, vec![("Jan", 3), ("Feb", 2)]);
    }

    #[test]
    fn test_rejects_invalid_shapes() {
        for bad in [
            json!("Jan: 100"),
            json!(42),
            json!(null),
            json!([["Jan", 100], "Feb"]),
            json!([["Jan", 100, 7]]),
            json!([["Jan"]]),
            json!({"Jan": "lots"}),
            json!({"Jan": [1]}),
        ] {
            let err = ChartData::from_value(&bad).unwrap_err();
            assert!(matches!(err, ChartQaError::InvalidInput(_)), "{}", bad);
        }
    }

    #[test]
    fn test_numeric_labels_and_string_values() {
        let data = ChartData::from_value(&json!([[2023, "3.4"], [2024, "7"]])).unwrap();
        assert_eq!(data.rows()[0].0, "2023");
        assert_eq!(data.rows()[0].1.as_f64(), Some(3.4));
        assert_eq!(data.rows()[1].1.as_i64(), Some(7));
    }

    #[test]
    fn test_vega_lite_encoding() {
        let data: ChartData = [("Jan", 100), ("Feb", 105)].into_iter().collect();
        let spec = ChartSpec::new(ChartKind::Line, data)
            .with_title("Inflation")
            .with_labels("Month", "CPI")
            .with_color("red")
            .to_vega_lite();

        assert_eq!(spec["mark"], json!({"type": "line", "color": "red"}));
        assert_eq!(spec["title"], "Inflation");
        assert_eq!(spec["encoding"]["x"]["sort"], Value::Null);
        assert_eq!(spec["encoding"]["x"]["type"], "nominal");
        assert_eq!(spec["encoding"]["y"]["type"], "quantitative");
        assert_eq!(x_values(&spec, "Month"), vec![json!("Jan"), json!("Feb")]);
        assert_eq!(x_values(&spec, "CPI"), vec![json!(100), json!(105)]);
    }

    #[test]
    fn test_field_names_are_escaped() {
        let spec = ChartSpec::new(ChartKind::Bar, ChartData::default())
            .with_labels("U.S. region", "Rate [%]")
            .to_vega_lite();
        assert_eq!(spec["encoding"]["x"]["field"], "U\\.S\\. region");
        assert_eq!(spec["encoding"]["y"]["field"], "Rate \\[%\\]");
    }

    #[test]
    fn test_chart_file_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            chart_file_name("Monthly CPI Change", at),
            "Monthly_CPI_Change_2024-03-05_14-07-09.html"
        );
        assert_eq!(chart_file_name("a/b", at), "a_b_2024-03-05_14-07-09.html");
    }

    #[test]
    fn test_render_writes_one_file_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("temp_img");
        let renderer = ChartRenderer::new(&output_dir);

        let data = ChartData::from_value(&json!({"Q3": 3, "Q1": 1, "Q2": 2})).unwrap();
        let path = renderer
            .render(&ChartSpec::new(ChartKind::Bar, data))
            .unwrap();

        let entries: Vec<_> = std::fs::read_dir(&output_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(path.starts_with(&output_dir));

        let spec = read_embedded_spec(&path);
        assert_eq!(
            x_values(&spec, "X-axis"),
            vec![json!("Q3"), json!("Q1"), json!("Q2")]
        );
        assert_eq!(spec["title"], "Bar Chart");
        assert_eq!(spec["mark"]["color"], "skyblue");
    }

    #[test]
    fn test_inflation_line_chart_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ChartRenderer::new(dir.path().join("temp_img"));

        let data = ChartData::from_value(&json!({"Jan": 100, "Feb": 105})).unwrap();
        let path = renderer
            .render(&ChartSpec::new(ChartKind::Line, data).with_title("Inflation"))
            .unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("Inflation_"));
        assert!(name.ends_with(".html"));
        // Inflation_YYYY-MM-DD_HH-MM-SS.html
        assert_eq!(name.len(), "Inflation_".len() + 19 + ".html".len());

        let spec = read_embedded_spec(&path);
        assert_eq!(spec["mark"]["type"], "line");
        assert_eq!(x_values(&spec, "X-axis"), vec![json!("Jan"), json!("Feb")]);
        assert_eq!(x_values(&spec, "Y-axis"), vec![json!(100), json!(105)]);
    }

    #[test]
    fn test_html_escapes_script_close() {
        let spec = ChartSpec::new(ChartKind::Bar, ChartData::default()).with_title("</script>");
        let html = spec.to_html().unwrap();
        assert_eq!(html.matches("</script>").count(), 4);
    }

    #[test]
    fn test_same_name_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ChartRenderer::new(dir.path());
        let at = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let data: ChartData = [("Jan", 100)].into_iter().collect();

        let bar = ChartSpec::new(ChartKind::Bar, data.clone()).with_title("CPI");
        let line = ChartSpec::new(ChartKind::Line, data).with_title("CPI");
        let path = renderer.render_at(&bar, at).unwrap();

        let err = renderer.render_at(&line, at).unwrap_err();
        assert!(matches!(
            &err,
            ChartQaError::Io(e) if e.kind() == std::io::ErrorKind::AlreadyExists
        ));
        assert_eq!(read_embedded_spec(&path)["mark"]["type"], "bar");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_identical_axis_labels_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("temp_img");
        let data: ChartData = [("Jan", 100)].into_iter().collect();
        let spec = ChartSpec::new(ChartKind::Bar, data).with_labels("Month", "Month");

        let err = ChartRenderer::new(&output_dir).render(&spec).unwrap_err();
        assert!(matches!(err, ChartQaError::InvalidInput(_)));
        assert!(!output_dir.exists());
    }

    #[test]
    fn test_chart_kind_parse() {
        assert_eq!("BAR".parse::<ChartKind>().unwrap(), ChartKind::Bar);
        assert_eq!("line".parse::<ChartKind>().unwrap(), ChartKind::Line);
        assert!("pie".parse::<ChartKind>().is_err());
    }
}
