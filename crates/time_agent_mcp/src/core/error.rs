use rmcp::ErrorData as McpError;
use rmcp::serde_json::json;

// Error codes
const ERROR_CITY_NOT_FOUND: &str = "city_not_found";
const ERROR_PROVIDER: &str = "provider_error";
const ERROR_INVALID_TIME_FORMAT: &str = "invalid_time_format";
const ERROR_AMBIGUOUS_TIME: &str = "ambiguous_time";
const ERROR_AGENT_LOOP: &str = "agent_loop_error";
const ERROR_RESOURCE_NOT_FOUND: &str = "resource_not_found";

/// Custom error types for better error handling
#[derive(Debug, thiserror::Error)]
pub enum TimeAgentError {
    #[error("City not found: {city}")]
    CityNotFound { city: String },
    #[error("Provider error: {message}")]
    Provider { message: String },
    #[error("Invalid time format: {time}. Expected HH:MM format")]
    InvalidTimeFormat { time: String },
    #[error("Ambiguous time during DST transition: {time}")]
    AmbiguousTime { time: String },
    #[error("Agent loop failure: {message}")]
    AgentLoop { message: String },
    #[error("Resource not found: {uri}")]
    ResourceNotFound { uri: String },
}

impl From<reqwest::Error> for TimeAgentError {
    fn from(err: reqwest::Error) -> Self {
        TimeAgentError::Provider {
            message: err.to_string(),
        }
    }
}

impl From<TimeAgentError> for McpError {
    fn from(err: TimeAgentError) -> Self {
        match err {
            TimeAgentError::CityNotFound { city } => {
                McpError::invalid_params(ERROR_CITY_NOT_FOUND, Some(json!({"city": city})))
            }
            TimeAgentError::Provider { message } => {
                McpError::internal_error(ERROR_PROVIDER, Some(json!({"message": message})))
            }
            TimeAgentError::InvalidTimeFormat { time } => {
                McpError::invalid_params(ERROR_INVALID_TIME_FORMAT, Some(json!({"time": time})))
            }
            TimeAgentError::AmbiguousTime { time } => {
                McpError::invalid_params(ERROR_AMBIGUOUS_TIME, Some(json!({"time": time})))
            }
            TimeAgentError::AgentLoop { message } => {
                McpError::internal_error(ERROR_AGENT_LOOP, Some(json!({"message": message})))
            }
            TimeAgentError::ResourceNotFound { uri } => McpError::resource_not_found(
                ERROR_RESOURCE_NOT_FOUND,
                Some(json!({
                    "uri": uri,
                    "available_resources": ["time-agent://status", "time-agent://help"]
                })),
            ),
        }
    }
}

pub type TimeAgentResult<T> = Result<T, TimeAgentError>;
pub type McpResult<T> = Result<T, McpError>;
