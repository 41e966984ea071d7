use std::sync::Arc;

use chrono::Utc;
use rmcp::{
    RoleServer, ServerHandler,
    handler::server::{
        router::{prompt::PromptRouter, tool::ToolRouter},
        wrapper::Parameters,
    },
    model::*,
    prompt, prompt_handler, prompt_router,
    service::RequestContext,
    tool, tool_handler, tool_router,
};

use crate::core::agent::{AgentConfig, ReactAgent, ToolCallingAgent};
use crate::core::assembler::ResponseAssembler;
use crate::core::geocode::{CityLocator, GeoClient};
use crate::core::provider::CityTimeProvider;
use crate::core::weather::WeatherClient;
use crate::core::{
    error::McpResult,
    models::{ConvertTimeRequest, GetCurrentTimeRequest, GetTodayWeatherRequest, TimeAgentRequest},
};

/// Time Agent MCP Server with city time, conversion, and weather operations
#[derive(Clone)]
pub struct TimeAgentService {
    provider: Arc<CityTimeProvider>,
    weather: WeatherClient,
    assembler: Arc<ResponseAssembler>,
    local_timezone_name: String, // Cache this
    tool_router: ToolRouter<TimeAgentService>,
    prompt_router: PromptRouter<TimeAgentService>,
}

impl TimeAgentService {
    pub fn new(agent_config: AgentConfig) -> Self {
        let locator: Arc<dyn CityLocator> = Arc::new(GeoClient::new());
        let provider = Arc::new(CityTimeProvider::new(locator.clone()));
        let weather = WeatherClient::new(locator.clone());

        let assembler = {
            let provider = provider.clone();
            ResponseAssembler::new(
                move || {
                    Arc::new(ReactAgent::new(agent_config.clone(), provider.clone()))
                        as Arc<dyn ToolCallingAgent>
                },
                locator,
            )
        };

        let local_timezone_name = provider.local_timezone.to_string();

        Self {
            provider,
            weather,
            assembler: Arc::new(assembler),
            local_timezone_name,
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    fn create_resource_text(&self, uri: &str, name: &str) -> Resource {
        RawResource::new(uri, name.to_string()).no_annotation()
    }

    pub(crate) fn get_local_timezone_name(&self) -> &str {
        &self.local_timezone_name
    }

    fn generate_status_content(&self) -> String {
        let now = Utc::now().with_timezone(&self.provider.local_timezone);

        format!(
            r#"Time Agent MCP Server Status

Server: Running
Local Timezone: {}
Current Local Time: {}
Tools Available: 4
Prompts Available: 1
Resources Available: 2

Capabilities:
- Current time queries for any city (geocoded to its IANA timezone)
- Time conversion between two cities with DST handling
- Today's weather per city (temperature extremes, condition code, wind)
- Natural-language time questions answered from live tool results"#,
            self.local_timezone_name,
            now.format("%Y-%m-%d %H:%M:%S %Z")
        )
    }

    fn generate_help_content(&self) -> String {
        format!(
            r#"Time Agent MCP Server Help

TOOLS:
- get_current_time: Get the current time in a city
  - city_name: City name (required)
  - Example: {{"city_name": "Warsaw"}}

- convert_time: Convert a time between two cities
  - source_city: City where the given time applies (required)
  - target_city: City to convert the time to (required)
  - time: Time in 24-hour format HH:MM (required)
  - Example: {{"source_city": "Warsaw", "target_city": "Tokyo", "time": "15:00"}}

- get_today_weather: Today's weather for a city
  - city_name: City name (required)
  - Example: {{"city_name": "Berlin"}}

- time_agent: Answer a natural-language time question
  - query: Free-text question (required)
  - Example: {{"query": "When it is 15:00 in Warsaw, what time is it in Tokyo?"}}

PROMPTS:
- city_time_guidance: Best practices for city time queries

RESOURCES:
- time-agent://status: Current server status and local time
- time-agent://help: This help documentation

LOCAL TIMEZONE: {}

CITY NAMES:
- Free text, resolved through geocoding: 'Warsaw', 'New York', 'Sao Paulo'
- The first geocoding match wins; unknown cities are rejected
- Time format for conversion: 24-hour HH:MM (e.g., '09:30', '15:00')"#,
            self.local_timezone_name
        )
    }
}

#[tool_router]
impl TimeAgentService {
    #[tool(description = "Get the current time for a given city")]
    pub(crate) async fn get_current_time(
        &self,
        Parameters(req): Parameters<GetCurrentTimeRequest>,
    ) -> McpResult<CallToolResult> {
        let result = self.provider.current_time(&req.city_name).await?;
        Ok(CallToolResult::success(vec![Content::text(result)]))
    }

    #[tool(description = "Convert a time from one city's timezone to another city's timezone")]
    pub(crate) async fn convert_time(
        &self,
        Parameters(req): Parameters<ConvertTimeRequest>,
    ) -> McpResult<CallToolResult> {
        let result = self
            .provider
            .convert_time(&req.source_city, &req.target_city, &req.time)
            .await?;
        Ok(CallToolResult::success(vec![Content::text(result)]))
    }

    #[tool(description = "Get information about weather for a specific city for today")]
    pub(crate) async fn get_today_weather(
        &self,
        Parameters(req): Parameters<GetTodayWeatherRequest>,
    ) -> McpResult<CallToolResult> {
        let record = self.weather.today_weather(&req.city_name).await?;
        Ok(CallToolResult::success(vec![Content::text(
            serde_json::to_string_pretty(&record).unwrap(),
        )]))
    }

    #[tool(
        description = "Answer a natural language question about city times. The answer is assembled from live tool results rather than model summarization."
    )]
    pub(crate) async fn time_agent(
        &self,
        Parameters(req): Parameters<TimeAgentRequest>,
    ) -> McpResult<CallToolResult> {
        let answer = self.assembler.answer(&req.query).await?;
        Ok(CallToolResult::success(vec![Content::text(answer)]))
    }
}

#[prompt_router]
impl TimeAgentService {
    /// Generate guidance for effective city time queries
    #[prompt(name = "city_time_guidance")]
    async fn city_time_guidance(
        &self,
        _ctx: RequestContext<rmcp::RoleServer>,
    ) -> McpResult<Vec<PromptMessage>> {
        let local_tz = self.get_local_timezone_name();
        let guidance = format!(
            r#"City Time Query Best Practices:

1. **City Names**
   - Use plain city names: 'Warsaw', 'Tokyo', 'New York'
   - Names are resolved through geocoding; the first match wins
   - Unknown or misspelled cities return a city_not_found error
   - The server's local timezone is detected as: {}

2. **Time Format**
   - Use 24-hour format (HH:MM) for time conversion
   - Examples: '09:30', '14:45', '23:15'
   - Leading zeros are required for single-digit hours

3. **Time Conversion**
   - Conversions are anchored to today's date in the source city
   - DST offsets on both sides are accounted for automatically
   - Converting between cities in the same timezone is a no-op

4. **Natural-Language Queries**
   - The time_agent tool accepts free-text questions
   - Its answer always includes the current time for every city
     mentioned, re-derived from live lookups

5. **Error Handling**
   - Unknown cities and malformed times are rejected
   - Provider outages fail the affected tool call only"#,
            local_tz
        );

        Ok(vec![PromptMessage {
            role: PromptMessageRole::Assistant,
            content: PromptMessageContent::text(guidance),
        }])
    }
}

#[tool_handler]
#[prompt_handler]
impl ServerHandler for TimeAgentService {
    fn get_info(&self) -> ServerInfo {
        let local_tz = self.get_local_timezone_name();
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_prompts()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(format!(
                "Time Agent MCP Server for city time and weather operations. Tools: get_current_time, convert_time, get_today_weather, time_agent. Local timezone: {}. City names are free text, resolved via geocoding.",
                local_tz
            )),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<rmcp::RoleServer>,
    ) -> McpResult<ListResourcesResult> {
        Ok(ListResourcesResult {
            resources: vec![
                self.create_resource_text("time-agent://status", "server-status"),
                self.create_resource_text("time-agent://help", "help-documentation"),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _: RequestContext<rmcp::RoleServer>,
    ) -> McpResult<ReadResourceResult> {
        match uri.as_str() {
            "time-agent://status" => {
                let status = self.generate_status_content();
                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(status, uri)],
                })
            }
            "time-agent://help" => {
                let help = self.generate_help_content();
                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(help, uri)],
                })
            }
            _ => Err(crate::core::error::TimeAgentError::ResourceNotFound {
                uri: uri.to_string(),
            }
            .into()),
        }
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<rmcp::RoleServer>,
    ) -> McpResult<ListResourceTemplatesResult> {
        Ok(ListResourceTemplatesResult {
            next_cursor: None,
            resource_templates: Vec::new(),
        })
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> McpResult<InitializeResult> {
        tracing::info!("Time Agent MCP Server initialized successfully");
        Ok(self.get_info())
    }
}

pub async fn run(agent_config: AgentConfig) -> Result<(), Box<dyn std::error::Error>> {
    use rmcp::{ServiceExt, transport::stdio};

    let service = TimeAgentService::new(agent_config)
        .serve(stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("serving error: {:?}", e);
        })?;

    service.waiting().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rmcp::model::ProtocolVersion;

    use crate::core::agent::AgentConfig;
    use crate::server::TimeAgentService;

    fn test_config() -> AgentConfig {
        AgentConfig {
            api_base: "http://localhost:4000/v1".to_string(),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
        }
    }

    fn service() -> TimeAgentService {
        TimeAgentService::new(test_config())
    }

    #[test]
    fn test_service_creation() {
        use rmcp::Service;

        let service = service();
        let info = service.get_info();

        assert_eq!(info.protocol_version, ProtocolVersion::V_2024_11_05);
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.prompts.is_some());
        assert!(info.capabilities.resources.is_some());
        assert!(info.instructions.is_some());
    }

    #[test]
    fn test_cached_timezone_name() {
        let service = service();
        let name1 = service.get_local_timezone_name();
        let name2 = service.get_local_timezone_name();

        // Should return the same reference (cached)
        assert_eq!(name1, name2);
        assert!(!name1.is_empty());
    }

    #[test]
    fn test_status_content_mentions_all_tools_count() {
        let service = service();
        let status = service.generate_status_content();

        assert!(status.contains("Server: Running"));
        assert!(status.contains("Tools Available: 4"));
        assert!(status.contains(service.get_local_timezone_name()));
    }

    #[test]
    fn test_help_content_documents_every_tool() {
        let service = service();
        let help = service.generate_help_content();

        for tool in [
            "get_current_time",
            "convert_time",
            "get_today_weather",
            "time_agent",
        ] {
            assert!(help.contains(tool), "help missing {tool}");
        }
    }

    #[tokio::test]
    async fn test_instructions_mention_local_timezone() {
        use rmcp::Service;

        let service = service();
        let info = service.get_info();
        let instructions = info.instructions.unwrap();

        assert!(instructions.contains(service.get_local_timezone_name()));
    }
}
