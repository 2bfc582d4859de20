use async_trait::async_trait;
use onco_core::{ConversationalPath, CoreError};
use onco_llm::{ChatClient, ChatOptions};
use serde::Deserialize;
use tracing::{info, warn};

use crate::prompts::{COORDINATOR_PROMPT, TEAM_SYNTHESIS_PROMPT};
use crate::TeamMember;

/// Coordinator decision about which members to consult.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamDecision {
    pub use_search: bool,
    pub use_knowledge: bool,
    #[serde(default)]
    pub search_query: Option<String>,
}

/// The conversational agent team: a coordinator model decides which members
/// to consult, member notes are collected, and the team model synthesizes a
/// single plain-text answer.
///
/// Members are optional capabilities; a team with no members still answers
/// (the synthesis model asks clarifying questions when context is missing).
pub struct AgentTeam {
    coordinator: ChatClient,
    search: Option<Box<dyn TeamMember>>,
    knowledge: Box<dyn TeamMember>,
}

impl AgentTeam {
    pub fn new(
        coordinator: ChatClient,
        knowledge: Box<dyn TeamMember>,
        search: Option<Box<dyn TeamMember>>,
    ) -> Self {
        Self { coordinator, search, knowledge }
    }

    async fn decide(&self, query: &str) -> TeamDecision {
        match self
            .coordinator
            .structured::<TeamDecision>(COORDINATOR_PROMPT, query)
            .await
        {
            Ok(decision) => decision,
            Err(e) => {
                // Coordinator failures fall back to the knowledge member so a
                // malformed routing decision never loses the query.
                warn!("Team coordinator decision failed: {}", e);
                TeamDecision { use_search: false, use_knowledge: true, search_query: None }
            }
        }
    }

    async fn collect_notes(&self, query: &str, decision: &TeamDecision) -> Vec<(String, String)> {
        let mut notes = Vec::new();

        if decision.use_search {
            if let Some(search) = &self.search {
                let search_query = decision.search_query.as_deref().unwrap_or(query);
                match search.consult(search_query).await {
                    Ok(note) => notes.push((search.name().to_string(), note)),
                    Err(e) => warn!("{} failed: {}", search.name(), e),
                }
            }
        }

        if decision.use_knowledge {
            match self.knowledge.consult(query).await {
                Ok(note) => notes.push((self.knowledge.name().to_string(), note)),
                Err(e) => warn!("{} failed: {}", self.knowledge.name(), e),
            }
        }

        notes
    }

    fn synthesis_input(query: &str, notes: &[(String, String)]) -> String {
        if notes.is_empty() {
            return format!("User query: {query}\n\nNo member notes were gathered.");
        }

        let formatted = notes
            .iter()
            .map(|(name, note)| format!("[{name}]\n{note}"))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!("User query: {query}\n\nMember notes:\n{formatted}")
    }

    pub async fn run(&self, query: &str) -> Result<String, CoreError> {
        let decision = self.decide(query).await;
        info!(
            "Team: search={} knowledge={}",
            decision.use_search, decision.use_knowledge
        );

        let notes = self.collect_notes(query, &decision).await;
        let input = Self::synthesis_input(query, &notes);

        self.coordinator
            .chat(TEAM_SYNTHESIS_PROMPT, &input, ChatOptions::default())
            .await
    }
}

#[async_trait]
impl ConversationalPath for AgentTeam {
    async fn respond(&self, query: &str) -> Result<String, CoreError> {
        self.run(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_parses_with_and_without_search_query() {
        let d: TeamDecision = serde_json::from_str(
            r#"{"use_search": true, "use_knowledge": false, "search_query": "latest TMB thresholds"}"#,
        )
        .unwrap();
        assert!(d.use_search);
        assert_eq!(d.search_query.as_deref(), Some("latest TMB thresholds"));

        let d: TeamDecision =
            serde_json::from_str(r#"{"use_search": false, "use_knowledge": true}"#).unwrap();
        assert!(d.use_knowledge);
        assert!(d.search_query.is_none());
    }

    #[test]
    fn synthesis_input_includes_member_notes_in_order() {
        let notes = vec![
            ("SearchAgent".to_string(), "recent trial data".to_string()),
            ("KnowledgeAgent".to_string(), "background explanation".to_string()),
        ];
        let input = AgentTeam::synthesis_input("what is TMB?", &notes);
        let search_pos = input.find("[SearchAgent]").unwrap();
        let knowledge_pos = input.find("[KnowledgeAgent]").unwrap();
        assert!(search_pos < knowledge_pos);
        assert!(input.contains("what is TMB?"));
    }

    #[test]
    fn synthesis_input_notes_absence_of_members() {
        let input = AgentTeam::synthesis_input("hello", &[]);
        assert!(input.contains("No member notes"));
    }
}
