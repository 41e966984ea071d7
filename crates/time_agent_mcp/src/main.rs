use clap::Parser;
use tracing_subscriber::EnvFilter;

mod core;
mod server;

use crate::core::agent::AgentConfig;

#[derive(Parser, Debug)]
#[command(name = "time-agent-server")]
#[command(about = "MCP server for city time queries, time conversion, and daily weather")]
struct Args {
    /// Base URL of the OpenAI-compatible chat completions API
    #[arg(long, default_value = "https://api.openai.com/v1")]
    api_base: String,

    /// Model driving the tool-calling loop
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging only if LOG_LEVEL environment variable is set
    if let Ok(log_level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
            )
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .init();

        tracing::info!("Starting Time Agent MCP server with log level: {}", log_level);
    }

    let args = Args::parse();

    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY is not set; the time_agent tool cannot reach the model");
    }

    let config = AgentConfig {
        api_base: args.api_base,
        api_key,
        model: args.model,
    };

    if let Err(e) = server::run(config).await {
        // Only log error if logging is initialized
        if std::env::var("LOG_LEVEL").is_ok() {
            tracing::error!("Error running Time Agent MCP server: {}", e);
        }
        return Err(e);
    }

    Ok(())
}
