//! Vector-store retrieval with max-marginal-relevance selection.
//!
//! Qdrant returns pure nearest-neighbour candidates; MMR is computed client
//! side over a larger fetch pool so the final passages trade a little
//! relevance for diversity.

use std::sync::Arc;

use onco_core::{CoreError, RetrievedPassage, TextEmbedder};
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_output::VectorsOptions;
use qdrant_client::qdrant::{QueryPointsBuilder, ScoredPoint, Value};
use qdrant_client::Qdrant;
use tracing::info;

/// Source label used when a passage carries no metadata.
pub const DEFAULT_SOURCE: &str = "Medical Journal";

/// Relevance/diversity trade-off for MMR. 1.0 is pure relevance.
const MMR_LAMBDA: f32 = 0.5;

pub struct VectorStore {
    client: Qdrant,
    collection: String,
    embedder: Arc<dyn TextEmbedder>,
}

/// A retrieval candidate: passage plus the data MMR needs.
struct Candidate {
    passage: RetrievedPassage,
    vector: Vec<f32>,
    score: f32,
}

impl VectorStore {
    pub fn connect(
        url: &str,
        api_key: Option<&str>,
        collection: &str,
        embedder: Arc<dyn TextEmbedder>,
    ) -> Result<Self, CoreError> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder
            .build()
            .map_err(|e| CoreError::Retrieval(e.to_string()))?;

        info!("Qdrant client configured for collection '{}'", collection);

        Ok(Self {
            client,
            collection: collection.to_string(),
            embedder,
        })
    }

    /// Max-marginal-relevance search: fetch `fetch_k` nearest candidates,
    /// select `k` of them greedily by MMR, preserving selection order.
    pub async fn mmr_search(
        &self,
        query: &str,
        k: usize,
        fetch_k: usize,
    ) -> Result<Vec<RetrievedPassage>, CoreError> {
        let query_vector = self.embedder.embed(query)?;

        let response = self
            .client
            .query(
                QueryPointsBuilder::new(&self.collection)
                    .query(query_vector.clone())
                    .limit(fetch_k as u64)
                    .with_payload(true)
                    .with_vectors(true),
            )
            .await
            .map_err(|e| CoreError::Retrieval(e.to_string()))?;

        let candidates: Vec<Candidate> = response
            .result
            .into_iter()
            .filter_map(candidate_from_point)
            .collect();

        info!(
            "Retrieved {} candidates from '{}' (fetch_k={})",
            candidates.len(),
            self.collection,
            fetch_k
        );

        let selected = mmr_select(&query_vector, &candidates, k, MMR_LAMBDA);
        Ok(selected
            .into_iter()
            .map(|i| candidates[i].passage.clone())
            .collect())
    }
}

fn candidate_from_point(point: ScoredPoint) -> Option<Candidate> {
    let content = payload_str(point.payload.get("page_content"))?.to_string();

    let source = point
        .payload
        .get("metadata")
        .and_then(struct_field("source"))
        .unwrap_or(DEFAULT_SOURCE)
        .to_string();

    let vector = point.vectors.and_then(|v| match v.vectors_options? {
        VectorsOptions::Vector(vector) => Some(vector.data),
        VectorsOptions::Vectors(_) => None,
    })?;

    Some(Candidate {
        passage: RetrievedPassage { content, source },
        vector,
        score: point.score,
    })
}

fn payload_str(value: Option<&Value>) -> Option<&str> {
    match value?.kind.as_ref()? {
        Kind::StringValue(s) => Some(s),
        _ => None,
    }
}

fn struct_field(name: &'static str) -> impl Fn(&Value) -> Option<&str> {
    move |value| match value.kind.as_ref()? {
        Kind::StructValue(fields) => payload_str(fields.fields.get(name)),
        _ => None,
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Greedy MMR over the candidate pool. Returns indices into `candidates` in
/// selection order (first pick is the most relevant candidate).
fn mmr_select(query: &[f32], candidates: &[Candidate], k: usize, lambda: f32) -> Vec<usize> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }

    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| {
            if c.vector.len() == query.len() {
                cosine_similarity(query, &c.vector)
            } else {
                // Dimension mismatch: fall back to the store's own score.
                c.score
            }
        })
        .collect();

    let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();

    while selected.len() < k && !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_value = f32::NEG_INFINITY;

        for (pos, &idx) in remaining.iter().enumerate() {
            let max_sim_to_selected = selected
                .iter()
                .map(|&s| cosine_similarity(&candidates[idx].vector, &candidates[s].vector))
                .fold(f32::NEG_INFINITY, f32::max);

            let value = if selected.is_empty() {
                relevance[idx]
            } else {
                lambda * relevance[idx] - (1.0 - lambda) * max_sim_to_selected
            };

            if value > best_value {
                best_value = value;
                best_pos = pos;
            }
        }

        selected.push(remaining.swap_remove(best_pos));
    }

    selected
}
