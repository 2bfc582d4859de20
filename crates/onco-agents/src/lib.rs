//! Conversational agent team: web-search and cancer-knowledge members
//! coordinated by a team-runner model.

mod knowledge;
mod prompts;
mod search;
mod team;

use async_trait::async_trait;
use onco_core::CoreError;

pub use knowledge::KnowledgeAgent;
pub use search::SearchAgent;
pub use team::{AgentTeam, TeamDecision};

/// A consultable team member.
#[async_trait]
pub trait TeamMember: Send + Sync {
    fn name(&self) -> &'static str;

    /// Produces this member's note for the given query.
    async fn consult(&self, query: &str) -> Result<String, CoreError>;
}
