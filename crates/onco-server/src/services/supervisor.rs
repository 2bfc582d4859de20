//! Query routing between the diagnostic RAG path and the agent team.

use onco_core::{ConversationalPath, CoreError, DiagnosticPath, IntentClassifier};
use tracing::info;

/// Boolean gate: diagnostic-style queries go to retrieval-augmented
/// analysis, everything else to the conversational team. First match wins;
/// there is no scoring or fallback ordering.
pub struct Supervisor {
    classifier: Box<dyn IntentClassifier>,
    diagnostic: Box<dyn DiagnosticPath>,
    conversational: Box<dyn ConversationalPath>,
}

impl Supervisor {
    pub fn new(
        classifier: Box<dyn IntentClassifier>,
        diagnostic: Box<dyn DiagnosticPath>,
        conversational: Box<dyn ConversationalPath>,
    ) -> Self {
        Self { classifier, diagnostic, conversational }
    }

    pub async fn run(&self, query: &str, vision_score: Option<f64>) -> Result<String, CoreError> {
        if self.classifier.is_diagnostic(query) {
            info!("Supervisor: diagnostic path");
            return self.diagnostic.analyze(query, vision_score).await;
        }

        info!("Supervisor: team path");
        self.conversational.respond(query).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use onco_rag::KeywordClassifier;

    use super::*;

    struct RecordingDiagnostic(Arc<AtomicBool>);

    #[async_trait]
    impl DiagnosticPath for RecordingDiagnostic {
        async fn analyze(&self, _query: &str, _vision_score: Option<f64>) -> Result<String, CoreError> {
            self.0.store(true, Ordering::SeqCst);
            Ok("diagnostic answer".into())
        }
    }

    struct RecordingTeam(Arc<AtomicBool>);

    #[async_trait]
    impl ConversationalPath for RecordingTeam {
        async fn respond(&self, _query: &str) -> Result<String, CoreError> {
            self.0.store(true, Ordering::SeqCst);
            Ok("team answer".into())
        }
    }

    fn supervisor_with_flags() -> (Supervisor, Arc<AtomicBool>, Arc<AtomicBool>) {
        let diagnostic_hit = Arc::new(AtomicBool::new(false));
        let team_hit = Arc::new(AtomicBool::new(false));
        let supervisor = Supervisor::new(
            Box::new(KeywordClassifier::new()),
            Box::new(RecordingDiagnostic(diagnostic_hit.clone())),
            Box::new(RecordingTeam(team_hit.clone())),
        );
        (supervisor, diagnostic_hit, team_hit)
    }

    #[tokio::test]
    async fn diagnostic_keywords_invoke_only_the_rag_path() {
        let (supervisor, diagnostic_hit, team_hit) = supervisor_with_flags();
        let answer = supervisor.run("explain my nodule report", Some(0.7)).await.unwrap();
        assert_eq!(answer, "diagnostic answer");
        assert!(diagnostic_hit.load(Ordering::SeqCst));
        assert!(!team_hit.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn non_matching_queries_invoke_only_the_team_path() {
        let (supervisor, diagnostic_hit, team_hit) = supervisor_with_flags();
        let answer = supervisor
            .run("What are early symptoms of blood cancer?", None)
            .await
            .unwrap();
        assert_eq!(answer, "team answer");
        assert!(!diagnostic_hit.load(Ordering::SeqCst));
        assert!(team_hit.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn path_errors_propagate_to_the_caller() {
        struct FailingTeam;

        #[async_trait]
        impl ConversationalPath for FailingTeam {
            async fn respond(&self, _query: &str) -> Result<String, CoreError> {
                Err(CoreError::Llm("model unreachable".into()))
            }
        }

        let supervisor = Supervisor::new(
            Box::new(KeywordClassifier::new()),
            Box::new(RecordingDiagnostic(Arc::new(AtomicBool::new(false)))),
            Box::new(FailingTeam),
        );
        let err = supervisor.run("hello there", None).await.unwrap_err();
        assert!(matches!(err, CoreError::Llm(_)));
    }
}
