use async_trait::async_trait;
use onco_core::CoreError;
use onco_llm::{ChatClient, ChatOptions};
use serde::Deserialize;
use tracing::info;

use crate::prompts::SEARCH_AGENT_PROMPT;
use crate::TeamMember;

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    organic_results: Option<Vec<OrganicResult>>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

/// Web-search member: fetches organic results and asks the model to
/// synthesize them into a short plain-text answer.
pub struct SearchAgent {
    client: ChatClient,
    http: reqwest::Client,
    api_key: String,
    num_results: u8,
}

impl SearchAgent {
    pub fn new(client: ChatClient, http: reqwest::Client, api_key: String) -> Result<Self, CoreError> {
        if api_key.is_empty() {
            return Err(CoreError::ExternalApi("SERPAPI_KEY not configured".into()));
        }
        Ok(Self { client, http, api_key, num_results: 5 })
    }

    async fn search(&self, query: &str) -> Result<Vec<OrganicResult>, CoreError> {
        let url = format!(
            "https://serpapi.com/search.json?q={}&api_key={}&num={}",
            urlencoding::encode(query),
            self.api_key,
            self.num_results
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| CoreError::ExternalApi(e.to_string()))?;

        let data: SerpApiResponse = response
            .json()
            .await
            .map_err(|e| CoreError::ExternalApi(e.to_string()))?;

        Ok(data.organic_results.unwrap_or_default())
    }

    fn format_results(results: &[OrganicResult]) -> String {
        results
            .iter()
            .enumerate()
            .map(|(i, r)| {
                format!(
                    "{}. {}\n   {}\n   {}",
                    i + 1,
                    r.title.as_deref().unwrap_or(""),
                    r.link.as_deref().unwrap_or(""),
                    r.snippet.as_deref().unwrap_or("")
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
impl TeamMember for SearchAgent {
    fn name(&self) -> &'static str {
        "SearchAgent"
    }

    async fn consult(&self, query: &str) -> Result<String, CoreError> {
        info!("SearchAgent: searching");

        let results = self.search(query).await?;

        let context = format!(
            "Question: {query}\n\nSearch Results:\n{}\n\nSynthesize these results into a short plain-text answer.",
            Self::format_results(&results)
        );

        self.client
            .chat(SEARCH_AGENT_PROMPT, &context, ChatOptions::default())
            .await
    }
}
