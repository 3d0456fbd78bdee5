//! Chart command implementation.

use crate::chart::{ChartData, ChartKind, ChartRenderer, ChartSpec};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::{Context, Result};

/// Options for rendering a chart from the command line.
#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub color: Option<String>,
}

/// Run the chart command.
pub fn run_chart(
    kind: ChartKind,
    data: &str,
    options: ChartOptions,
    settings: &Settings,
) -> Result<()> {
    let value: serde_json::Value =
        serde_json::from_str(data).context("--data must be valid JSON")?;
    let data = ChartData::from_value(&value)?;

    let mut spec = ChartSpec::new(kind, data);
    if let Some(title) = &options.title {
        spec = spec.with_title(title);
    }
    if let Some(color) = &options.color {
        spec = spec.with_color(color);
    }
    let x_label = options.x_label.unwrap_or_else(|| spec.x_label.clone());
    let y_label = options.y_label.unwrap_or_else(|| spec.y_label.clone());
    spec = spec.with_labels(&x_label, &y_label);

    let path = ChartRenderer::new(settings.output_dir()).render(&spec)?;
    Output::success(&format!(
        "Saved {} chart with {} data point(s) to {}",
        kind,
        spec.data.len(),
        path.display()
    ));

    Ok(())
}
