use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::core::error::{TimeAgentError, TimeAgentResult};
use crate::core::provider::CityTimeProvider;

const MAX_AGENT_TURNS: usize = 10;
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

const SYSTEM_PROMPT: &str = "You are a time assistant. IMPORTANT: When the user asks about time \
     conversion between cities, you MUST also call get_current_time for EACH city mentioned \
     and include the current time in your final answer alongside the conversion result.";

/// A tool invocation recorded in the message trace
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub name: String,
    /// Named-argument mapping as issued by the model
    pub arguments: Value,
}

/// One entry in the conversation trace produced for a single query
#[derive(Debug, Clone)]
pub enum TraceMessage {
    User {
        content: String,
    },
    Assistant {
        content: String,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        content: String,
    },
}

/// Drives a model-directed tool loop for one query and returns the full
/// message trace once the loop settles
#[async_trait]
pub trait ToolCallingAgent: Send + Sync {
    async fn run(&self, query: &str) -> TimeAgentResult<Vec<TraceMessage>>;
}

/// Connection settings for the chat-completions endpoint behind the loop
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

/// Tool loop against an OpenAI-compatible chat completions API
pub struct ReactAgent {
    http: reqwest::Client,
    config: AgentConfig,
    provider: Arc<CityTimeProvider>,
}

impl ReactAgent {
    pub fn new(config: AgentConfig, provider: Arc<CityTimeProvider>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("default reqwest client");

        Self {
            http,
            config,
            provider,
        }
    }

    async fn chat_completion(&self, messages: &[Value]) -> TimeAgentResult<Value> {
        let body = json!({
            "model": self.config.model,
            "messages": messages,
            "tools": tool_definitions(),
            "tool_choice": "auto",
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TimeAgentError::AgentLoop {
                message: format!("model request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TimeAgentError::AgentLoop {
                message: format!("model returned HTTP {}: {detail}", status.as_u16()),
            });
        }

        let payload: Value = response.json().await.map_err(|e| TimeAgentError::AgentLoop {
            message: format!("malformed model response: {e}"),
        })?;

        let message = payload["choices"][0]["message"].clone();
        if message.is_null() {
            return Err(TimeAgentError::AgentLoop {
                message: "model response carried no choices".to_string(),
            });
        }
        Ok(message)
    }

    async fn dispatch(&self, call: &ToolCall) -> TimeAgentResult<String> {
        match call.name.as_str() {
            "get_current_time" => {
                let city = string_argument(&call.arguments, "city_name")?;
                self.provider.current_time(&city).await
            }
            "convert_time" => {
                let source = string_argument(&call.arguments, "source_city")?;
                let target = string_argument(&call.arguments, "target_city")?;
                let time = string_argument(&call.arguments, "time")?;
                self.provider.convert_time(&source, &target, &time).await
            }
            other => Err(TimeAgentError::AgentLoop {
                message: format!("model requested unknown tool: {other}"),
            }),
        }
    }
}

#[async_trait]
impl ToolCallingAgent for ReactAgent {
    async fn run(&self, query: &str) -> TimeAgentResult<Vec<TraceMessage>> {
        let mut conversation = vec![
            json!({"role": "system", "content": SYSTEM_PROMPT}),
            json!({"role": "user", "content": query}),
        ];
        let mut trace = vec![TraceMessage::User {
            content: query.to_string(),
        }];

        for _ in 0..MAX_AGENT_TURNS {
            let reply = self.chat_completion(&conversation).await?;
            let content = reply["content"].as_str().unwrap_or("").to_string();
            let raw_calls = reply["tool_calls"].as_array().cloned().unwrap_or_default();

            if raw_calls.is_empty() {
                trace.push(TraceMessage::Assistant {
                    content,
                    tool_calls: Vec::new(),
                });
                return Ok(trace);
            }

            conversation.push(json!({
                "role": "assistant",
                "content": reply["content"].clone(),
                "tool_calls": raw_calls.clone(),
            }));

            let mut calls = Vec::with_capacity(raw_calls.len());
            for raw in &raw_calls {
                calls.push(parse_tool_call(raw)?);
            }
            trace.push(TraceMessage::Assistant {
                content,
                tool_calls: calls.iter().map(|(_, call)| call.clone()).collect(),
            });

            for (id, call) in calls {
                // Tool failures are narrated back to the model, which decides
                // whether to retry with different arguments or give up
                let result = match self.dispatch(&call).await {
                    Ok(text) => text,
                    Err(e) => format!("Error: {e}"),
                };
                tracing::debug!(tool = %call.name, "tool call completed");

                conversation.push(json!({
                    "role": "tool",
                    "tool_call_id": id,
                    "content": result.clone(),
                }));
                trace.push(TraceMessage::Tool { content: result });
            }
        }

        Err(TimeAgentError::AgentLoop {
            message: format!("no final answer after {MAX_AGENT_TURNS} turns"),
        })
    }
}

/// Function schemas advertised to the model
fn tool_definitions() -> Value {
    json!([
        {
            "type": "function",
            "function": {
                "name": "get_current_time",
                "description": "Get the current time for a given city.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "city_name": {
                            "type": "string",
                            "description": "The name of the city (e.g., 'Warsaw', 'Tokyo', 'New York')."
                        }
                    },
                    "required": ["city_name"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "convert_time",
                "description": "Convert a time from one city's timezone to another city's timezone.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "source_city": {
                            "type": "string",
                            "description": "The city where the given time applies (e.g., 'Warsaw')."
                        },
                        "target_city": {
                            "type": "string",
                            "description": "The city to convert the time to (e.g., 'Tokyo')."
                        },
                        "time": {
                            "type": "string",
                            "description": "The time in HH:MM format (e.g., '15:00')."
                        }
                    },
                    "required": ["source_city", "target_city", "time"]
                }
            }
        }
    ])
}

fn parse_tool_call(raw: &Value) -> TimeAgentResult<(String, ToolCall)> {
    let id = raw["id"].as_str().unwrap_or_default().to_string();
    let name = raw["function"]["name"]
        .as_str()
        .ok_or_else(|| TimeAgentError::AgentLoop {
            message: "tool call missing function name".to_string(),
        })?
        .to_string();

    // OpenAI-style payloads carry arguments as a JSON-encoded string
    let arguments = match &raw["function"]["arguments"] {
        Value::String(encoded) => serde_json::from_str(encoded).unwrap_or_else(|_| json!({})),
        other => other.clone(),
    };

    Ok((id, ToolCall { name, arguments }))
}

fn string_argument(arguments: &Value, key: &str) -> TimeAgentResult<String> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TimeAgentError::AgentLoop {
            message: format!("tool call missing argument: {key}"),
        })
}
