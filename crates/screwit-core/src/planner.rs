//! Planner port and the simulated planner.
//!
//! The planner turns a user prompt plus the enabled capabilities into an
//! assistant reply. The chat controller bounds every call with
//! `ChatConfig::planner_timeout`.

use crate::Result;
use async_trait::async_trait;
use screwit_types::{AgentOption, MessageMetadata};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// Data sources reported by the simulated planner.
pub const SIMULATED_SOURCES: [&str; 3] = ["Amazon API", "Instacart API", "Restaurant Database"];

#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub session_id: Uuid,
    pub content: String,
    /// Options that were switched on for this turn.
    pub enabled_options: Vec<AgentOption>,
}

#[derive(Debug, Clone)]
pub struct PlanResponse {
    pub content: String,
    pub metadata: MessageMetadata,
}

#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, request: PlanRequest) -> Result<PlanResponse>;
}

/// Stand-in for the external planning service: waits, then answers with a
/// template.
#[derive(Debug, Clone)]
pub struct SimulatedPlanner {
    delay: Duration,
}

impl SimulatedPlanner {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedPlanner {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl Planner for SimulatedPlanner {
    async fn plan(&self, request: PlanRequest) -> Result<PlanResponse> {
        let started = Instant::now();
        tokio::time::sleep(self.delay).await;

        let capabilities = request
            .enabled_options
            .iter()
            .map(|o| o.title.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let content = format!(
            "I'll help you plan \"{}\". Let me analyze your requirements and gather information using the enabled capabilities: {}.",
            request.content, capabilities
        );

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(
            target: "screwit::planner",
            "Simulated reply for session {} after {:.0}ms",
            request.session_id, elapsed_ms
        );

        Ok(PlanResponse {
            content,
            metadata: MessageMetadata {
                agent_options: request.enabled_options,
                processing_time_ms: Some(elapsed_ms),
                sources: SIMULATED_SOURCES.iter().map(|s| s.to_string()).collect(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use screwit_types::Capability;

    #[tokio::test]
    async fn test_simulated_reply_lists_enabled_titles() {
        let planner = SimulatedPlanner::new(Duration::from_millis(10));
        let response = planner
            .plan(PlanRequest {
                session_id: Uuid::new_v4(),
                content: "Book a DJ".to_string(),
                enabled_options: vec![
                    AgentOption::from_capability(Capability::Amazon, true),
                    AgentOption::from_capability(Capability::Events, true),
                ],
            })
            .await
            .unwrap();

        assert_eq!(
            response.content,
            "I'll help you plan \"Book a DJ\". Let me analyze your requirements and gather information using the enabled capabilities: Amazon Product Search, Dartmouth Event Inspiration."
        );
        assert_eq!(
            response.metadata.sources,
            vec!["Amazon API", "Instacart API", "Restaurant Database"]
        );
        assert!(response.metadata.processing_time_ms.unwrap() >= 10.0);
        assert_eq!(response.metadata.agent_options.len(), 2);
    }
}
