//! Bar and line chart tools.

use super::{Tool, ToolOutput};
use crate::chart::{ChartData, ChartKind, ChartRenderer, ChartSpec};
use crate::error::{ChartQaError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct ChartArgs {
    data: Value,
    title: Option<String>,
    x_label: Option<String>,
    y_label: Option<String>,
    color: Option<String>,
}

/// Renders one kind of chart from agent-supplied data.
pub struct ChartTool {
    kind: ChartKind,
    renderer: ChartRenderer,
}

impl ChartTool {
    pub fn new(kind: ChartKind, renderer: ChartRenderer) -> Self {
        Self { kind, renderer }
    }

    pub fn bar(renderer: ChartRenderer) -> Self {
        Self::new(ChartKind::Bar, renderer)
    }

    pub fn line(renderer: ChartRenderer) -> Self {
        Self::new(ChartKind::Line, renderer)
    }
}

#[async_trait]
impl Tool for ChartTool {
    fn name(&self) -> &str {
        match self.kind {
            ChartKind::Bar => "vega_bar_chart_creator",
            ChartKind::Line => "vega_line_chart_creator",
        }
    }

    fn description(&self) -> &str {
        match self.kind {
            ChartKind::Bar => {
                "Generates a dynamic Vega-Lite bar chart based on provided data and parameters."
            }
            ChartKind::Line => {
                "Generates a dynamic Vega-Lite line chart based on provided data and parameters."
            }
        }
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "data": {
                    "description": "Chart data: an object mapping each label to its numeric value, \
                        or a list of [label, value] pairs. Labels are plotted in the given order.",
                    "anyOf": [
                        {"type": "object", "additionalProperties": {"type": "number"}},
                        {
                            "type": "array",
                            "items": {"type": "array", "minItems": 2, "maxItems": 2}
                        }
                    ]
                },
                "title": {
                    "type": "string",
                    "description": format!("Chart title (default: {})", self.kind.default_title())
                },
                "x_label": {
                    "type": "string",
                    "description": "X axis label (default: X-axis)"
                },
                "y_label": {
                    "type": "string",
                    "description": "Y axis label (default: Y-axis)"
                },
                "color": {
                    "type": "string",
                    "description": "Mark color (default: skyblue)"
                }
            },
            "required": ["data"]
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput> {
        let args: ChartArgs = serde_json::from_value(args)
            .map_err(|e| ChartQaError::InvalidInput(format!("Invalid chart arguments: {}", e)))?;

        let data = ChartData::from_value(&args.data)?;
        let mut spec = ChartSpec::new(self.kind, data);
        if let Some(title) = args.title {
            spec = spec.with_title(&title);
        }
        if let Some(color) = args.color {
            spec = spec.with_color(&color);
        }
        let x_label = args.x_label.unwrap_or_else(|| spec.x_label.clone());
        let y_label = args.y_label.unwrap_or_else(|| spec.y_label.clone());
        spec = spec.with_labels(&x_label, &y_label);

        let path = self.renderer.render(&spec)?;
        Ok(ToolOutput::text(format!(
            "Saved {} chart '{}' with {} data point(s) to {}",
            self.kind,
            spec.title,
            spec.data.len(),
            path.display()
        ))
        .with_artifact(path))
    }
}
