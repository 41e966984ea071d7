use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::core::agent::{ToolCall, ToolCallingAgent, TraceMessage};
use crate::core::error::TimeAgentResult;
use crate::core::geocode::CityLocator;
use crate::core::provider::{CLOCK_ZONE_FORMAT, parse_timezone};

pub const FRAGMENT_SEPARATOR: &str = ". ";

/// Tool-call argument keys that name a city
const CITY_ARGUMENT_KEYS: [&str; 3] = ["city_name", "source_city", "target_city"];

type AgentFactory = Box<dyn Fn() -> Arc<dyn ToolCallingAgent> + Send + Sync>;

/// Everything the trace walk extracts in one ordered pass
#[derive(Debug, Default)]
struct TraceDigest {
    tool_results: Vec<String>,
    cities: BTreeSet<String>,
}

/// Builds the final answer from the tool loop's message trace instead of
/// the model's own closing summary.
///
/// Tool outputs are taken as ground truth; a post-pass re-derives the
/// current time for every city the model touched, so the answer never
/// omits a city even when the model's summary would.
pub struct ResponseAssembler {
    agent: OnceCell<Arc<dyn ToolCallingAgent>>,
    make_agent: AgentFactory,
    locator: Arc<dyn CityLocator>,
}

impl ResponseAssembler {
    pub fn new(
        make_agent: impl Fn() -> Arc<dyn ToolCallingAgent> + Send + Sync + 'static,
        locator: Arc<dyn CityLocator>,
    ) -> Self {
        Self {
            agent: OnceCell::new(),
            make_agent: Box::new(make_agent),
            locator,
        }
    }

    /// The loop is constructed on first request, never at process startup,
    /// and reused for the process lifetime
    async fn agent(&self) -> &Arc<dyn ToolCallingAgent> {
        self.agent.get_or_init(|| async { (self.make_agent)() }).await
    }

    /// Answer one query. Only the loop invocation itself can fail the
    /// request; every per-city backstop lookup degrades instead.
    pub async fn answer(&self, query: &str) -> TimeAgentResult<String> {
        let trace = self.agent().await.run(query).await?;

        let digest = digest_trace(&trace);
        let mut fragments = if digest.tool_results.is_empty() {
            vec![last_message_text(&trace)]
        } else {
            digest.tool_results
        };

        for (city, looked_up) in self.city_time_checks(&digest.cities).await {
            match looked_up {
                Ok(fragment) => fragments.push(fragment),
                Err(e) => {
                    tracing::debug!(city = %city, error = %e, "skipping current-time backstop")
                }
            }
        }

        Ok(fragments.join(FRAGMENT_SEPARATOR))
    }

    /// One best-effort current-time lookup per discovered city, sequential,
    /// in sorted order
    async fn city_time_checks(
        &self,
        cities: &BTreeSet<String>,
    ) -> Vec<(String, TimeAgentResult<String>)> {
        let mut checks = Vec::with_capacity(cities.len());
        for city in cities {
            checks.push((city.clone(), self.current_time_fragment(city).await));
        }
        checks
    }

    async fn current_time_fragment(&self, city: &str) -> TimeAgentResult<String> {
        let location = self.locator.locate(city).await?;
        let tz = parse_timezone(&location.timezone)?;
        let now = Utc::now().with_timezone(&tz);

        Ok(format!(
            "Current time in {}: {}",
            city,
            now.format(CLOCK_ZONE_FORMAT)
        ))
    }
}

/// Walk the trace once, in order: tool outputs verbatim, city arguments
/// from every tool invocation
fn digest_trace(trace: &[TraceMessage]) -> TraceDigest {
    let mut digest = TraceDigest::default();

    for message in trace {
        match message {
            TraceMessage::User { .. } => {}
            TraceMessage::Assistant { tool_calls, .. } => {
                for call in tool_calls {
                    collect_cities(call, &mut digest.cities);
                }
            }
            TraceMessage::Tool { content } => digest.tool_results.push(content.clone()),
        }
    }

    digest
}

fn collect_cities(call: &ToolCall, cities: &mut BTreeSet<String>) {
    for key in CITY_ARGUMENT_KEYS {
        if let Some(city) = call.arguments.get(key).and_then(Value::as_str) {
            cities.insert(city.to_string());
        }
    }
}

fn last_message_text(trace: &[TraceMessage]) -> String {
    match trace.last() {
        Some(TraceMessage::User { content })
        | Some(TraceMessage::Assistant { content, .. })
        | Some(TraceMessage::Tool { content }) => content.clone(),
        None => String::new(),
    }
}
