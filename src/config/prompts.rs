//! Prompt templates for the agent and the query engines.
//!
//! Templates use `{{name}}` placeholders and can be overridden in the
//! `[prompts]` section of the config file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    /// System prompt for the tool-calling agent.
    pub agent_system: String,
    /// Template used by query engines to answer from retrieved context.
    /// Placeholders: `{{context}}`, `{{query}}`.
    pub query_synthesis: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            agent_system: r#"You are an analyst answering questions about an inflation report.

You have tools to look up the report's narrative text, to look up the figures behind its charts, and to draw bar and line charts.

Guidelines:
- Look up numbers with the chart data tool before drawing anything; never invent figures
- When the user asks for a chart, call the bar or line chart tool with the data as an object mapping each label to its numeric value, in the order the labels should appear
- Give axis labels and a title that describe the data
- You may call several tools in one turn when they do not depend on each other
- If a tool fails, read the error, fix the arguments and try again, or explain the failure

When you have enough information, answer concisely and mention any chart you created."#
                .to_string(),

            query_synthesis: r#"Context information is below.
---------------------
{{context}}
---------------------
Given the context information and not prior knowledge, answer the query.
Query: {{query}}
Answer: "#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.agent_system.contains("chart"));
        assert!(prompts.query_synthesis.contains("{{context}}"));
        assert!(prompts.query_synthesis.contains("{{query}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Context: {{context}}\nQuery: {{query}}";
        let mut vars = HashMap::new();
        vars.insert("context", "CPI rose 3%".to_string());
        vars.insert("query", "What happened to CPI?".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Context: CPI rose 3%\nQuery: What happened to CPI?");
    }
}
