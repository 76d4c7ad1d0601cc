use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

/// Name of the bundled calculation tool.
pub const SECRET_CALCULATION: &str = "performSecretCalculation";

/// A named tool the agent may call.
#[async_trait]
pub trait Tool: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema of the input object.
    fn input_schema(&self) -> Value;
    async fn execute(&self, input: Value) -> anyhow::Result<Value>;
}

/// Tools available to an agent, keyed by name.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Arc<HashMap<String, Arc<dyn Tool>>>,
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The default set: just [`SecretCalculation`].
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new().with_tool(Arc::new(SecretCalculation))
    }

    /// Add a tool, replacing any tool with the same name.
    #[must_use]
    pub fn with_tool(self, tool: Arc<dyn Tool>) -> Self {
        let mut tools = (*self.tools).clone();
        tools.insert(tool.name().to_string(), tool);
        Self {
            tools: Arc::new(tools),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Tool names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tool descriptions for the catalog endpoint.
    #[must_use]
    pub fn definitions(&self) -> Vec<Value> {
        self.names()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect()
    }
}

/// Adds two numbers and keeps the last digit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretCalculation;

#[derive(Deserialize)]
struct CalculationInput {
    a: f64,
    b: f64,
}

#[async_trait]
impl Tool for SecretCalculation {
    fn name(&self) -> &str {
        SECRET_CALCULATION
    }

    fn description(&self) -> &str {
        "Performs the secret calculation on two numbers."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": { "type": "number" },
                "b": { "type": "number" }
            },
            "required": ["a", "b"]
        })
    }

    async fn execute(&self, input: Value) -> anyhow::Result<Value> {
        let CalculationInput { a, b } =
            serde_json::from_value(input).context("invalid input for performSecretCalculation")?;
        tracing::info!(name: "tool.secret_calculation", a, b, "Performing secret calculation");

        // Truncating remainder, so negative sums stay negative.
        let result = (a + b) % 10.0;
        Ok(json!({ "result": number(result) }))
    }
}

/// Whole numbers are emitted as integers.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
pub(super) fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_secret_calculation() {
        let tool = SecretCalculation;
        let out = tool.execute(json!({ "a": 7, "b": 8 })).await.unwrap();
        assert_eq!(out, json!({ "result": 5 }));

        let out = tool.execute(json!({ "a": -3, "b": 0 })).await.unwrap();
        assert_eq!(out, json!({ "result": -3 }));

        let out = tool.execute(json!({ "a": 1.5, "b": 0 })).await.unwrap();
        assert_eq!(out, json!({ "result": 1.5 }));
    }

    #[tokio::test]
    async fn test_invalid_input_is_an_error() {
        let err = SecretCalculation
            .execute(json!({ "a": "seven" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid input"));
    }

    #[test]
    fn test_toolset_lookup() {
        let tools = ToolSet::with_defaults();
        assert_eq!(tools.names(), vec![SECRET_CALCULATION.to_string()]);
        assert!(tools.get(SECRET_CALCULATION).is_some());
        assert!(tools.get("nope").is_none());

        let defs = tools.definitions();
        assert_eq!(defs[0]["inputSchema"]["required"], json!(["a", "b"]));
    }
}
