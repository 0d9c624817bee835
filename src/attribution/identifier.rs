// attribution/identifier.rs
//
// Resolves anonymous diarization cluster labels (SPEAKER_00, SPEAKER_01,
// ...) to enrolled speaker names by comparing cluster voice embeddings
// against reference embeddings with an exact one-to-one assignment.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::IdentifyConfig;
use crate::embedding::{cosine_similarity, mean_embedding, EmbeddingProvider, ReferenceStore};

use super::matching::max_similarity_assignment;
use super::types::SpeakerSegment;

/// Result of one identification call: cluster label -> resolved name, with
/// a parallel score map.
///
/// The map is total over every cluster label observed in the diarization
/// output. A score of 0.0 means "no embeddable evidence", not "confirmed
/// dissimilarity"; downstream consumers must not treat the two alike.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentificationResult {
    /// Cluster label -> resolved name (or "Unknown_N")
    pub names: HashMap<String, String>,
    /// Cluster label -> similarity score of the accepted (or forced) match
    pub scores: HashMap<String, f32>,
}

impl IdentificationResult {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// Identifies speakers by matching cluster voice embeddings against
/// enrolled references.
///
/// References are loaded from the store once and cached for the lifetime of
/// the identifier; share one warmed instance across calls rather than
/// re-creating it per file.
pub struct SpeakerIdentifier<P, S> {
    provider: P,
    store: S,
    config: IdentifyConfig,
    references: OnceCell<HashMap<String, Vec<f32>>>,
}

impl<P: EmbeddingProvider, S: ReferenceStore> SpeakerIdentifier<P, S> {
    pub fn new(provider: P, store: S) -> Self {
        Self::with_config(provider, store, IdentifyConfig::default())
    }

    pub fn with_config(provider: P, store: S, config: IdentifyConfig) -> Self {
        Self {
            provider,
            store,
            config,
            references: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &IdentifyConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Initialize the embedding provider and warm the reference cache.
    /// Called by the pipeline before any word is processed so model or
    /// store failures surface up front instead of mid-transcript.
    pub fn ensure_ready(&mut self) -> Result<()> {
        self.provider.ensure_ready()?;
        self.references()?;
        Ok(())
    }

    /// Reference embeddings, loaded from the store on first use and cached
    /// for the session.
    pub fn references(&self) -> Result<&HashMap<String, Vec<f32>>> {
        self.references.get_or_try_init(|| {
            let refs = self.store.load_all()?;
            info!("Loaded {} reference embeddings", refs.len());
            Ok(refs)
        })
    }

    /// Resolve cluster labels to enrolled names.
    ///
    /// Clusters are matched to candidate names by an exact one-to-one
    /// maximum-similarity assignment; a pair is accepted only when its
    /// similarity reaches the match threshold. Every observed cluster label
    /// gets an entry: clusters left over after matching fall back either to
    /// the best-scoring expected speaker (when `expected_speakers` is
    /// given, threshold ignored) or to sequential "Unknown_N" labels in
    /// first-appearance order.
    pub fn identify(
        &self,
        audio: &Path,
        speaker_segments: &[SpeakerSegment],
        expected_speakers: Option<&[String]>,
    ) -> Result<IdentificationResult> {
        // Distinct cluster labels in first-appearance order.
        let mut labels: Vec<String> = Vec::new();
        for seg in speaker_segments {
            if !labels.contains(&seg.speaker) {
                labels.push(seg.speaker.clone());
            }
        }
        if labels.is_empty() {
            return Ok(IdentificationResult::default());
        }

        let references = self.references()?;
        let expected = expected_speakers.filter(|e| !e.is_empty());

        // Candidate names in deterministic order: caller order when an
        // expected-speaker list is given, sorted names otherwise.
        let candidates: Vec<String> = match expected {
            Some(expected) => expected
                .iter()
                .filter(|name| references.contains_key(*name))
                .cloned()
                .collect(),
            None => {
                let mut names: Vec<String> = references.keys().cloned().collect();
                names.sort();
                names
            }
        };

        info!(
            "Identifying {} speaker clusters against {} candidate names",
            labels.len(),
            candidates.len()
        );

        // Transient per-cluster mean embeddings; clusters with no embeddable
        // segment are deferred to the fallback phase.
        let cluster_embeddings: Vec<Option<Vec<f32>>> = labels
            .iter()
            .map(|label| self.extract_cluster_embedding(audio, speaker_segments, label))
            .collect();

        let mut result = IdentificationResult::default();

        // Optimal matching over clusters that produced an embedding.
        if !candidates.is_empty() {
            let embeddable: Vec<(usize, &Vec<f32>)> = cluster_embeddings
                .iter()
                .enumerate()
                .filter_map(|(i, emb)| emb.as_ref().map(|e| (i, e)))
                .collect();

            if !embeddable.is_empty() {
                let similarities: Vec<Vec<f32>> = embeddable
                    .iter()
                    .map(|(_, emb)| {
                        candidates
                            .iter()
                            .map(|name| cosine_similarity(emb, &references[name]))
                            .collect()
                    })
                    .collect();

                let assignment = max_similarity_assignment(&similarities)?;
                for (row, assigned) in assignment.into_iter().enumerate() {
                    let Some(col) = assigned else { continue };
                    let score = similarities[row][col];
                    if score >= self.config.match_threshold {
                        let label = &labels[embeddable[row].0];
                        info!("  {} -> {} (score={:.3})", label, candidates[col], score);
                        result.names.insert(label.clone(), candidates[col].clone());
                        result.scores.insert(label.clone(), score);
                    }
                }
            }
        }

        // Fallback keeps the result total over every observed label.
        match expected {
            Some(expected) => {
                for (i, label) in labels.iter().enumerate() {
                    if result.names.contains_key(label) {
                        continue;
                    }
                    let (name, score) =
                        best_expected_fallback(cluster_embeddings[i].as_deref(), expected, references);
                    info!("  {} -> {} (forced, score={:.3})", label, name, score);
                    result.names.insert(label.clone(), name);
                    result.scores.insert(label.clone(), score);
                }
            }
            None => {
                let mut unknown_counter = 1;
                for label in &labels {
                    if result.names.contains_key(label) {
                        continue;
                    }
                    let name = format!("Unknown_{}", unknown_counter);
                    info!("  {} -> {}", label, name);
                    result.names.insert(label.clone(), name);
                    result.scores.insert(label.clone(), 0.0);
                    unknown_counter += 1;
                }
            }
        }

        Ok(result)
    }

    /// Mean embedding for one cluster, or None when the cluster has no
    /// embeddable segment.
    fn extract_cluster_embedding(
        &self,
        audio: &Path,
        segments: &[SpeakerSegment],
        label: &str,
    ) -> Option<Vec<f32>> {
        let mut embeddings = Vec::new();

        for seg in segments.iter().filter(|s| s.speaker == label) {
            let duration = seg.duration();

            // Not enough audio for a stable embedding.
            if duration < self.config.min_segment_secs {
                continue;
            }

            // Cap the embedded span to bound extraction cost on very long turns.
            let end = if duration > self.config.max_segment_secs {
                seg.start_time + self.config.max_segment_secs
            } else {
                seg.end_time
            };

            let start_secs = decimal_secs(seg.start_time);
            let end_secs = decimal_secs(end);
            match self.provider.embed_span(audio, start_secs, end_secs) {
                Ok(emb) => embeddings.push(emb),
                Err(e) => {
                    debug!(
                        "Failed to extract embedding for segment {start_secs:.3}-{end_secs:.3}: {e}"
                    );
                }
            }
        }

        let mean = mean_embedding(&embeddings);
        if mean.is_none() {
            warn!("Could not extract any embeddings for cluster {}", label);
        }
        mean
    }
}

fn decimal_secs(value: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or(0.0)
}

/// Best-scoring expected name for a forced fallback assignment. With no
/// embeddable evidence (or no scorable expected name) the first expected
/// name in caller order is used with score 0.0.
fn best_expected_fallback(
    cluster_embedding: Option<&[f32]>,
    expected: &[String],
    references: &HashMap<String, Vec<f32>>,
) -> (String, f32) {
    if let Some(emb) = cluster_embedding {
        let mut best: Option<(&String, f32)> = None;
        for name in expected {
            let Some(reference) = references.get(name) else { continue };
            let score = cosine_similarity(emb, reference);
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((name, score));
            }
        }
        if let Some((name, score)) = best {
            return (name.clone(), score);
        }
    }
    (expected[0].clone(), 0.0)
}

/// Apply a label -> name map (and optional score map) to diarization
/// segments. Labels absent from the map are left unchanged. Returns a new
/// vector; the input order is preserved.
pub fn relabel_segments(
    segments: Vec<SpeakerSegment>,
    names: &HashMap<String, String>,
    scores: Option<&HashMap<String, f32>>,
) -> Vec<SpeakerSegment> {
    segments
        .into_iter()
        .map(|mut seg| {
            if let Some(name) = names.get(&seg.speaker) {
                if let Some(score) = scores.and_then(|s| s.get(&seg.speaker)) {
                    seg.confidence = Some(*score);
                }
                seg.speaker = name.clone();
            }
            seg
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::StubProvider;
    use crate::embedding::MemoryStore;
    use rust_decimal_macros::dec;
    use std::path::PathBuf;

    fn seg(speaker: &str, start: Decimal, end: Decimal) -> SpeakerSegment {
        SpeakerSegment::new(speaker, start, end)
    }

    fn audio() -> PathBuf {
        PathBuf::from("episode.wav")
    }

    // Axis-aligned embeddings make similarities exact: matching axes score
    // 1.0, everything else 0.0.
    fn axis(dim: usize, index: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[index] = 1.0;
        v
    }

    #[test]
    fn test_identify_matches_clusters_to_names() {
        let segments = vec![
            seg("SPEAKER_00", dec!(0), dec!(10)),
            seg("SPEAKER_01", dec!(10), dec!(20)),
        ];
        let provider = StubProvider::new()
            .with_span(0.0, 10.0, axis(3, 0))
            .with_span(10.0, 20.0, axis(3, 1));
        let store = MemoryStore::new()
            .with_speaker("Matt", axis(3, 0))
            .with_speaker("Will", axis(3, 1));
        let identifier = SpeakerIdentifier::new(provider, store);

        let result = identifier.identify(&audio(), &segments, None).unwrap();
        assert_eq!(result.names["SPEAKER_00"], "Matt");
        assert_eq!(result.names["SPEAKER_01"], "Will");
        assert!(result.scores["SPEAKER_00"] > 0.99);
    }

    #[test]
    fn test_identify_is_total_over_clusters() {
        crate::embedding::testing::init_logs();

        let segments = vec![
            seg("SPEAKER_00", dec!(0), dec!(10)),
            seg("SPEAKER_01", dec!(10), dec!(20)),
            seg("SPEAKER_02", dec!(20), dec!(30)),
            seg("SPEAKER_00", dec!(30), dec!(40)),
        ];
        // Only SPEAKER_00 embeds successfully and matches.
        let provider = StubProvider::new()
            .with_span(0.0, 10.0, axis(3, 0))
            .with_span(30.0, 40.0, axis(3, 0));
        let store = MemoryStore::new().with_speaker("Matt", axis(3, 0));
        let identifier = SpeakerIdentifier::new(provider, store);

        let result = identifier.identify(&audio(), &segments, None).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result.names["SPEAKER_00"], "Matt");
        assert_eq!(result.names["SPEAKER_01"], "Unknown_1");
        assert_eq!(result.names["SPEAKER_02"], "Unknown_2");
    }

    #[test]
    fn test_empty_store_yields_sequential_unknowns() {
        let segments = vec![
            seg("c1", dec!(0), dec!(10)),
            seg("c2", dec!(10), dec!(20)),
            seg("c3", dec!(20), dec!(30)),
        ];
        let identifier = SpeakerIdentifier::new(StubProvider::new(), MemoryStore::new());

        let result = identifier.identify(&audio(), &segments, None).unwrap();
        assert_eq!(result.names["c1"], "Unknown_1");
        assert_eq!(result.names["c2"], "Unknown_2");
        assert_eq!(result.names["c3"], "Unknown_3");
    }

    #[test]
    fn test_no_clusters_empty_result() {
        let identifier = SpeakerIdentifier::new(StubProvider::new(), MemoryStore::new());
        let result = identifier.identify(&audio(), &[], None).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_no_duplicate_names_without_expected_list() {
        // Both clusters resemble Matt, but one-to-one assignment gives the
        // name to the better cluster only.
        let close_to_matt = vec![0.95, 0.31225, 0.0]; // cos with axis 0 = 0.95
        let segments = vec![
            seg("SPEAKER_00", dec!(0), dec!(10)),
            seg("SPEAKER_01", dec!(10), dec!(20)),
        ];
        let provider = StubProvider::new()
            .with_span(0.0, 10.0, axis(3, 0))
            .with_span(10.0, 20.0, close_to_matt);
        let store = MemoryStore::new().with_speaker("Matt", axis(3, 0));
        let identifier = SpeakerIdentifier::new(provider, store);

        let result = identifier.identify(&audio(), &segments, None).unwrap();
        assert_eq!(result.names["SPEAKER_00"], "Matt");
        assert_eq!(result.names["SPEAKER_01"], "Unknown_1");
    }

    #[test]
    fn test_below_threshold_falls_back_to_unknown() {
        let segments = vec![seg("SPEAKER_00", dec!(0), dec!(10))];
        // Orthogonal to the only reference: similarity 0.0 < 0.70.
        let provider = StubProvider::new().with_span(0.0, 10.0, axis(3, 1));
        let store = MemoryStore::new().with_speaker("Matt", axis(3, 0));
        let identifier = SpeakerIdentifier::new(provider, store);

        let result = identifier.identify(&audio(), &segments, None).unwrap();
        assert_eq!(result.names["SPEAKER_00"], "Unknown_1");
    }

    #[test]
    fn test_expected_speakers_restrict_candidates() {
        let segments = vec![seg("SPEAKER_00", dec!(0), dec!(10))];
        // The cluster is identical to Felix, but Felix is not expected.
        let provider = StubProvider::new().with_span(0.0, 10.0, axis(3, 2));
        let store = MemoryStore::new()
            .with_speaker("Matt", axis(3, 0))
            .with_speaker("Felix", axis(3, 2));
        let identifier = SpeakerIdentifier::new(provider, store);

        let expected = vec!["Matt".to_string()];
        let result = identifier
            .identify(&audio(), &segments, Some(&expected))
            .unwrap();
        // Forced to the best-scoring expected name despite the low score.
        assert_eq!(result.names["SPEAKER_00"], "Matt");
        assert!(result.scores["SPEAKER_00"] < 0.70);
    }

    #[test]
    fn test_expected_fallback_without_evidence_uses_first_expected() {
        // Segment too short to embed: no evidence at all.
        let segments = vec![seg("SPEAKER_00", dec!(0), dec!(0.3))];
        let store = MemoryStore::new().with_speaker("Will", axis(3, 1));
        let identifier = SpeakerIdentifier::new(StubProvider::new(), store);

        let expected = vec!["Will".to_string(), "Matt".to_string()];
        let result = identifier
            .identify(&audio(), &segments, Some(&expected))
            .unwrap();
        assert_eq!(result.names["SPEAKER_00"], "Will");
        assert_eq!(result.scores["SPEAKER_00"], 0.0);
    }

    #[test]
    fn test_short_segments_excluded_from_cluster_embedding() {
        // The only qualifying segment is the long one; the 0.4s segment has
        // a deliberately misleading stub embedding that must not be used.
        let segments = vec![
            seg("SPEAKER_00", dec!(0), dec!(0.4)),
            seg("SPEAKER_00", dec!(1), dec!(11)),
        ];
        let provider = StubProvider::new()
            .with_span(0.0, 0.4, axis(3, 1))
            .with_span(1.0, 11.0, axis(3, 0));
        let store = MemoryStore::new().with_speaker("Matt", axis(3, 0));
        let identifier = SpeakerIdentifier::new(provider, store);

        let result = identifier.identify(&audio(), &segments, None).unwrap();
        assert_eq!(result.names["SPEAKER_00"], "Matt");
    }

    #[test]
    fn test_long_segments_capped_at_max_span() {
        // A 60s segment must be embedded as [start, start + 30).
        let segments = vec![seg("SPEAKER_00", dec!(5), dec!(65))];
        let provider = StubProvider::new().with_span(5.0, 35.0, axis(3, 0));
        let store = MemoryStore::new().with_speaker("Matt", axis(3, 0));
        let identifier = SpeakerIdentifier::new(provider, store);

        let result = identifier.identify(&audio(), &segments, None).unwrap();
        assert_eq!(result.names["SPEAKER_00"], "Matt");
    }

    #[test]
    fn test_references_cached_across_calls() {
        let segments = vec![seg("SPEAKER_00", dec!(0), dec!(10))];
        let provider = StubProvider::new().with_span(0.0, 10.0, axis(3, 0));
        let store = MemoryStore::new().with_speaker("Matt", axis(3, 0));
        let identifier = SpeakerIdentifier::new(provider, store);

        identifier.references().unwrap();
        let result = identifier.identify(&audio(), &segments, None).unwrap();
        assert_eq!(result.names["SPEAKER_00"], "Matt");
    }

    #[test]
    fn test_ensure_ready_surfaces_provider_failure() {
        let provider = StubProvider::new().with_init_error("model file missing");
        let mut identifier = SpeakerIdentifier::new(provider, MemoryStore::new());

        let err = identifier.ensure_ready().unwrap_err();
        assert!(err.to_string().contains("model file missing"));
    }

    #[test]
    fn test_ensure_ready_warms_reference_cache() {
        let store = MemoryStore::new().with_speaker("Matt", axis(3, 0));
        let mut identifier = SpeakerIdentifier::new(StubProvider::new(), store);

        identifier.ensure_ready().unwrap();
        assert_eq!(identifier.references().unwrap().len(), 1);
    }

    #[test]
    fn test_relabel_segments_applies_map_and_scores() {
        let segments = vec![
            seg("SPEAKER_00", dec!(0), dec!(5)),
            seg("SPEAKER_01", dec!(5), dec!(10)),
            seg("SPEAKER_99", dec!(10), dec!(15)),
        ];
        let mut names = HashMap::new();
        names.insert("SPEAKER_00".to_string(), "Matt".to_string());
        names.insert("SPEAKER_01".to_string(), "Will".to_string());
        let mut scores = HashMap::new();
        scores.insert("SPEAKER_00".to_string(), 0.91f32);

        let out = relabel_segments(segments, &names, Some(&scores));
        assert_eq!(out[0].speaker, "Matt");
        assert_eq!(out[0].confidence, Some(0.91));
        assert_eq!(out[1].speaker, "Will");
        assert_eq!(out[1].confidence, None);
        // Labels absent from the map are left unchanged.
        assert_eq!(out[2].speaker, "SPEAKER_99");
    }
}
