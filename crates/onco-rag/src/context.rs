//! Context-block assembly from retrieved passages.

use std::collections::HashSet;

use onco_core::RetrievedPassage;

/// Builds the context block for the diagnostic prompt: exact-duplicate
/// passages are dropped (first occurrence wins), each survivor is tagged with
/// its source label, and retrieval rank order is preserved.
pub fn build_medical_context(passages: &[RetrievedPassage]) -> String {
    let mut seen = HashSet::new();
    let mut chunks = Vec::new();

    for passage in passages {
        let content = passage.content.trim();
        if content.is_empty() || !seen.insert(content.to_string()) {
            continue;
        }
        chunks.push(format!("Source [{}]: {}", passage.source, content));
    }

    chunks.join("\n\n")
}
