//! Optional semantic ranking of aggregations against a free-text query.

use std::sync::Arc;

use canon_core::errors::ExtractionError;
use canon_core::traits::Embedder;
use serde::{Deserialize, Serialize};

use super::types::PatternAggregation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAggregation {
    pub aggregation: PatternAggregation,
    /// Cosine similarity between the query and the aggregation description.
    pub score: f64,
}

/// Ranks aggregations by embedding similarity of their descriptions.
pub struct SemanticRanker {
    embedder: Arc<dyn Embedder>,
}

impl SemanticRanker {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Order `aggregations` by similarity to `query`, most similar first.
    /// Ties keep their incoming order.
    pub fn rank(
        &self,
        query: &str,
        aggregations: Vec<PatternAggregation>,
    ) -> Result<Vec<RankedAggregation>, ExtractionError> {
        let query_vec = self.embed(query)?;
        let mut ranked = Vec::with_capacity(aggregations.len());
        for aggregation in aggregations {
            let text = format!("{} {}", aggregation.signature, aggregation.description);
            let vector = self.embed(&text)?;
            ranked.push(RankedAggregation {
                score: cosine_similarity(&query_vec, &vector),
                aggregation,
            });
        }
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ranked)
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ExtractionError> {
        let vector = self.embedder.embed(text)?;
        let expected = self.embedder.dimensions();
        if vector.len() != expected {
            return Err(ExtractionError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

/// Cosine similarity between two vectors.
/// Returns 0.0 for zero-length or zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut mag_a, mut mag_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Embeds text as counts of a few keywords.
    struct KeywordEmbedder;

    impl Embedder for KeywordEmbedder {
        fn dimensions(&self) -> usize {
            3
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, ExtractionError> {
            let count = |word: &str| text.matches(word).count() as f32;
            Ok(vec![count("naming"), count("quotes"), count("test")])
        }
    }

    struct BrokenEmbedder;

    impl Embedder for BrokenEmbedder {
        fn dimensions(&self) -> usize {
            4
        }

        fn embed(&self, _text: &str) -> Result<Vec<f32>, ExtractionError> {
            Ok(vec![1.0])
        }
    }

    fn aggregation(signature: &str) -> PatternAggregation {
        PatternAggregation {
            signature: signature.into(),
            category: "style".into(),
            description: String::new(),
            occurrences: Vec::new(),
            aggregated_confidence: 0.5,
            consensus_score: 1.0,
            project_count: 1,
            languages: Vec::new(),
            revision: 1,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn ranks_by_similarity() {
        let ranker = SemanticRanker::new(Arc::new(KeywordEmbedder));
        let ranked = ranker
            .rank(
                "quotes",
                vec![aggregation("naming:variable:camelCase"), aggregation("style:quotes:single")],
            )
            .unwrap();
        assert_eq!(ranked[0].aggregation.signature, "style:quotes:single");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let ranker = SemanticRanker::new(Arc::new(BrokenEmbedder));
        let err = ranker.rank("q", vec![aggregation("a")]).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::DimensionMismatch { expected: 4, actual: 1 }
        ));
    }
}
