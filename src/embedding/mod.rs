// embedding/mod.rs
//
// Voice embedding provider interface and vector math helpers.
//
// The embedding model itself (e.g. a WeSpeaker/pyannote ONNX model) lives
// behind the EmbeddingProvider trait; this crate only consumes vectors.

pub mod store;

use std::path::Path;

use anyhow::Result;
use log::warn;

pub use store::{JsonDirStore, MemoryStore, ReferenceEmbedding, ReferenceStore};

/// External voice-embedding service: audio span in, fixed-length vector out.
///
/// Providers are two-phase resources: construct the handle, then call
/// `ensure_ready` so model-loading failures surface before any words are
/// processed rather than mid-batch. The pipeline and enrollment entry
/// points call it; providers that need no initialization return `Ok(())`.
pub trait EmbeddingProvider {
    /// Load the underlying model if not already loaded. Idempotent.
    fn ensure_ready(&mut self) -> Result<()>;

    /// Extract an embedding for a time span of an audio file.
    fn embed_span(&self, audio: &Path, start_secs: f64, end_secs: f64) -> Result<Vec<f32>>;

    /// Extract an embedding for an entire clip (used for enrollment).
    fn embed_clip(&self, clip: &Path) -> Result<Vec<f32>>;
}

/// Calculate cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Element-wise mean of a set of embeddings. Returns None when the set is
/// empty. Vectors whose dimension disagrees with the first are skipped.
pub fn mean_embedding(embeddings: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = embeddings.first()?;
    let dim = first.len();

    let mut sum = vec![0.0f32; dim];
    let mut count = 0usize;

    for emb in embeddings {
        if emb.len() != dim {
            warn!(
                "Skipping embedding with mismatched dimension {} (expected {})",
                emb.len(),
                dim
            );
            continue;
        }
        for (acc, v) in sum.iter_mut().zip(emb.iter()) {
            *acc += v;
        }
        count += 1;
    }

    if count == 0 {
        return None;
    }

    let n = count as f32;
    for v in sum.iter_mut() {
        *v /= n;
    }
    Some(sum)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;

    /// Route log output through the test harness capture. Repeated calls
    /// are fine; only the first registration wins.
    pub fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Deterministic embedding provider for tests, keyed by time span or
    /// clip path. Unknown keys produce errors, which exercises the
    /// skip-and-continue paths.
    #[derive(Debug, Default)]
    pub struct StubProvider {
        spans: HashMap<String, Vec<f32>>,
        clips: HashMap<String, Vec<f32>>,
        init_error: Option<String>,
    }

    impl StubProvider {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make `ensure_ready` fail, simulating a missing or broken model.
        pub fn with_init_error(mut self, message: impl Into<String>) -> Self {
            self.init_error = Some(message.into());
            self
        }

        pub fn span_key(start: f64, end: f64) -> String {
            format!("{start:.3}-{end:.3}")
        }

        pub fn with_span(mut self, start: f64, end: f64, embedding: Vec<f32>) -> Self {
            self.spans.insert(Self::span_key(start, end), embedding);
            self
        }

        pub fn with_clip(mut self, path: impl AsRef<Path>, embedding: Vec<f32>) -> Self {
            self.clips
                .insert(path.as_ref().to_string_lossy().into_owned(), embedding);
            self
        }
    }

    impl EmbeddingProvider for StubProvider {
        fn ensure_ready(&mut self) -> Result<()> {
            match &self.init_error {
                Some(message) => Err(anyhow!("{message}")),
                None => Ok(()),
            }
        }

        fn embed_span(&self, _audio: &Path, start_secs: f64, end_secs: f64) -> Result<Vec<f32>> {
            self.spans
                .get(&Self::span_key(start_secs, end_secs))
                .cloned()
                .ok_or_else(|| anyhow!("no stub embedding for span {start_secs}-{end_secs}"))
        }

        fn embed_clip(&self, clip: &Path) -> Result<Vec<f32>> {
            self.clips
                .get(clip.to_string_lossy().as_ref())
                .cloned()
                .ok_or_else(|| anyhow!("no stub embedding for clip {:?}", clip))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        // Same vector should have similarity 1.0
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.001);

        // Orthogonal vectors should have similarity 0.0
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.001);

        // Opposite vectors should have similarity -1.0
        let c = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &c) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![1.0, 2.0, 3.0];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &zero), 0.0);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_mean_embedding() {
        let embs = vec![vec![1.0, 0.0], vec![3.0, 2.0]];
        assert_eq!(mean_embedding(&embs), Some(vec![2.0, 1.0]));
    }

    #[test]
    fn test_mean_embedding_empty() {
        assert_eq!(mean_embedding(&[]), None);
    }

    #[test]
    fn test_mean_embedding_skips_mismatched() {
        let embs = vec![vec![2.0, 4.0], vec![1.0, 2.0, 3.0], vec![4.0, 0.0]];
        assert_eq!(mean_embedding(&embs), Some(vec![3.0, 2.0]));
    }
}
