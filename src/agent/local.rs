//! Offline agent.
//!
//! Produces a deterministic reply without calling any model: a short
//! reasoning preamble, a tool call when the prompt carries two numbers,
//! search citations when web search is on, and a text answer. Used for
//! development and tests.

use std::time::Duration;

use anyhow::anyhow;
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;

use super::tools::{SECRET_CALCULATION, ToolSet, number};
use super::{Agent, AgentEvent, AgentRequest, AgentStream};
use crate::conversation::Role;
use crate::error::ChatError;

const SEARCH_ENDPOINTS: [(&str, &str); 2] = [
    ("https://duckduckgo.com/", "q"),
    ("https://en.wikipedia.org/w/index.php", "search"),
];

/// Deterministic agent backed only by local tools.
#[derive(Debug, Clone, Default)]
pub struct LocalAgent {
    tools: ToolSet,
    delay: Duration,
}

impl LocalAgent {
    #[must_use]
    pub fn new(tools: ToolSet) -> Self {
        Self {
            tools,
            delay: Duration::ZERO,
        }
    }

    /// Pause between emitted chunks, to make streaming visible.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait::async_trait]
impl Agent for LocalAgent {
    async fn run(&self, request: AgentRequest) -> anyhow::Result<AgentStream> {
        let turn = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .ok_or_else(|| anyhow!("conversation has no user turn to answer"))?;

        let prompt = turn.text();
        let attachments = turn.files().count();
        let operands = operands(&prompt);
        let options = request.options;
        let tools = self.tools.clone();
        let delay = self.delay;

        let stream = async_stream::stream! {
            yield AgentEvent::Start { message_id: Uuid::new_v4().to_string() };

            let mut reasoning = format!("Answering with {}. ", options.model);
            match operands {
                Some((a, b)) => reasoning.push_str(&format!(
                    "The prompt mentions {a} and {b}, so the secret calculation applies."
                )),
                None => reasoning.push_str("No tool is needed for this prompt."),
            }
            for chunk in chunks(&reasoning) {
                pause(delay).await;
                yield AgentEvent::ReasoningDelta { text: chunk };
            }

            if options.web_search {
                for url in search_urls(&prompt) {
                    pause(delay).await;
                    yield AgentEvent::Source { url };
                }
            }

            let calculation = match (operands, tools.get(SECRET_CALCULATION)) {
                (Some((a, b)), Some(tool)) => {
                    let tool_call_id = format!("call_{}", Uuid::new_v4().simple());
                    let input = json!({ "a": number(a), "b": number(b) });
                    pause(delay).await;
                    yield AgentEvent::ToolInputAvailable {
                        tool_call_id: tool_call_id.clone(),
                        tool_name: tool.name().to_string(),
                        input: input.clone(),
                    };

                    match tool.execute(input).await {
                        Ok(output) => {
                            let result = output.get("result").cloned().unwrap_or(Value::Null);
                            yield AgentEvent::ToolOutput { tool_call_id, output };
                            Some(format!("The secret calculation of {a} and {b} is {result}."))
                        }
                        Err(e) => {
                            let error = ChatError::Tool { name: tool.name().to_string(), message: format!("{e:#}") };
                            tracing::warn!(name: "agent.tool.failed", error = %error, "Tool call failed");
                            yield AgentEvent::ToolError { tool_call_id, error_text: error.to_string() };
                            Some("The secret calculation failed.".to_string())
                        }
                    }
                }
                _ => None,
            };

            let mut reply = calculation.unwrap_or_else(|| format!("You said: {prompt}"));
            if attachments > 0 {
                let noun = if attachments == 1 { "attachment" } else { "attachments" };
                reply.push_str(&format!(" ({attachments} {noun} received.)"));
            }
            for chunk in chunks(&reply) {
                pause(delay).await;
                yield AgentEvent::TextDelta { text: chunk };
            }

            yield AgentEvent::Finish;
        };

        Ok(Box::pin(stream))
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Word-sized pieces that concatenate back to the input.
fn chunks(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

/// The first two numbers in the prompt.
fn operands(prompt: &str) -> Option<(f64, f64)> {
    let mut numbers = prompt
        .split(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .filter_map(|token| token.trim_end_matches('.').parse::<f64>().ok())
        .filter(|n| n.is_finite());
    Some((numbers.next()?, numbers.next()?))
}

fn search_urls(prompt: &str) -> Vec<String> {
    SEARCH_ENDPOINTS
        .iter()
        .filter_map(|(base, param)| Url::parse_with_params(base, &[(*param, prompt)]).ok())
        .map(String::from)
        .collect()
}
