use async_trait::async_trait;

use crate::error::Result;

/// Narrow contract the pipeline depends on for text embeddings.
///
/// Vectors returned for a single call must be of equal length, and the
/// dimension must be fixed for the lifetime of the service instance — the
/// core never renegotiates dimensionality mid-pipeline.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embeds each input text, preserving order: `result[i]` corresponds to
    /// `texts[i]`.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Fixed output dimension for this service instance.
    fn dimensions(&self) -> usize;
}

/// Cosine similarity over two equal-length vectors, assumed L2-normalized
/// per the distance metric fixed in the embedding service contract. Returns
/// 0.0 for mismatched or empty inputs rather than panicking.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_are_maximally_similar() {
        let v = vec![0.6, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_zero_similarity() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn mismatched_lengths_return_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
