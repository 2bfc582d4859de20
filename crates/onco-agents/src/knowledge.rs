use async_trait::async_trait;
use onco_core::CoreError;
use onco_llm::{ChatClient, ChatOptions};
use tracing::info;

use crate::prompts::KNOWLEDGE_AGENT_PROMPT;
use crate::TeamMember;

/// Conversational cancer-education member.
pub struct KnowledgeAgent {
    client: ChatClient,
}

impl KnowledgeAgent {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TeamMember for KnowledgeAgent {
    fn name(&self) -> &'static str {
        "KnowledgeAgent"
    }

    async fn consult(&self, query: &str) -> Result<String, CoreError> {
        info!("KnowledgeAgent: consulting");
        self.client
            .chat(KNOWLEDGE_AGENT_PROMPT, query, ChatOptions::default())
            .await
    }
}
