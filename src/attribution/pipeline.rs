// attribution/pipeline.rs
//
// Composes the attribution stages for one audio file in explicit order:
// assign -> identify/relabel -> refine. Each stage consumes and returns
// collections; there is no hidden shared mutation between stages.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use log::warn;

use crate::config::{BoundaryConfig, OverlapConfig};
use crate::embedding::{EmbeddingProvider, ReferenceStore};

use super::assigner::assign_speakers_to_words;
use super::boundary::refine_speaker_boundaries;
use super::identifier::{relabel_segments, IdentificationResult, SpeakerIdentifier};
use super::types::{SpeakerSegment, WordSegment};

/// Per-call options for the attribution pipeline.
#[derive(Debug, Clone)]
pub struct AttributionOptions {
    /// Resolve cluster labels to enrolled names
    pub identify: bool,
    /// Re-examine words near speaker transitions with voice embeddings
    pub refine_boundaries: bool,
    /// Restrict identification candidates to these names
    pub expected_speakers: Option<Vec<String>>,
    pub overlap: OverlapConfig,
    pub boundary: BoundaryConfig,
}

impl Default for AttributionOptions {
    fn default() -> Self {
        Self {
            identify: true,
            refine_boundaries: true,
            expected_speakers: None,
            overlap: OverlapConfig::default(),
            boundary: BoundaryConfig::default(),
        }
    }
}

/// Output of one attribution pass over a file.
#[derive(Debug, Default)]
pub struct AttributionOutcome {
    /// Words with speaker/overlap fields populated
    pub words: Vec<WordSegment>,
    /// Diarization intervals, relabeled when identification ran
    pub speaker_segments: Vec<SpeakerSegment>,
    /// Cluster label -> name resolution (empty when identification was
    /// disabled or produced nothing)
    pub identification: IdentificationResult,
}

/// Run the full attribution pass for one file.
///
/// The embedding provider is initialized first; a model or store failure
/// errors out before any word is touched. Identification failures after
/// that point degrade gracefully: the words keep their anonymous cluster
/// labels and the pipeline carries on. Only the word and segment
/// speaker/overlap/confidence fields are modified; timings pass through
/// untouched.
pub fn attribute_transcript<P, S>(
    words: Vec<WordSegment>,
    speaker_segments: Vec<SpeakerSegment>,
    audio: &Path,
    identifier: &mut SpeakerIdentifier<P, S>,
    options: &AttributionOptions,
) -> Result<AttributionOutcome>
where
    P: EmbeddingProvider,
    S: ReferenceStore,
{
    identifier.ensure_ready()?;

    let mut words = assign_speakers_to_words(words, &speaker_segments, &options.overlap);
    let mut speaker_segments = speaker_segments;
    let mut identification = IdentificationResult::default();

    if options.identify {
        match identifier.identify(audio, &speaker_segments, options.expected_speakers.as_deref()) {
            Ok(result) if !result.is_empty() => {
                speaker_segments =
                    relabel_segments(speaker_segments, &result.names, Some(&result.scores));
                words = relabel_words(words, &result.names);
                identification = result;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Speaker identification failed, keeping cluster labels: {e}");
            }
        }
    }

    if options.refine_boundaries {
        match identifier.references() {
            Ok(references) => {
                words = refine_speaker_boundaries(
                    words,
                    audio,
                    identifier.provider(),
                    references,
                    &options.boundary,
                );
            }
            Err(e) => {
                warn!("Reference embeddings unavailable, skipping boundary refinement: {e}");
            }
        }
    }

    Ok(AttributionOutcome {
        words,
        speaker_segments,
        identification,
    })
}

/// Carry a label -> name map over to word-level speaker fields. Words with
/// labels absent from the map keep their current speaker.
fn relabel_words(words: Vec<WordSegment>, names: &HashMap<String, String>) -> Vec<WordSegment> {
    words
        .into_iter()
        .map(|mut word| {
            if let Some(name) = word.speaker.as_ref().and_then(|label| names.get(label)) {
                word.speaker = Some(name.clone());
            }
            word
        })
        .collect()
}
