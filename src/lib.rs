// Speaker Attribution - attributes word-level transcripts to identified speakers
//
// The core covered here:
// - Word-to-speaker assignment from diarization intervals (with gap fill)
// - Crosstalk (overlap) detection on individual words
// - Embedding-based refinement of words near speaker transitions
// - Cluster-to-name identification via optimal bipartite matching
// - Speaker enrollment (reference embedding construction)
//
// Transcription, the diarization clustering algorithm, the embedding model,
// and persistence are external collaborators behind traits.

// Tunable thresholds
pub mod config;

// Voice embeddings: provider interface, reference store, vector math
pub mod embedding;

// Core attribution stages
pub mod attribution;

// External collaborator contracts
pub mod diarizer;
pub mod sink;

// Re-export the primary API surface
pub use attribution::{
    assign_speakers_to_words, attribute_transcript, compute_speaker_embedding,
    enroll_all_speakers, enroll_speaker, find_boundary_words, refine_speaker_boundaries,
    relabel_segments, AttributionOptions, AttributionOutcome, EnrollmentReport,
    IdentificationResult, SpeakerIdentifier, SpeakerSegment, WordSegment,
};

pub use config::{BoundaryConfig, IdentifyConfig, OverlapConfig};

pub use embedding::{
    cosine_similarity, mean_embedding, EmbeddingProvider, JsonDirStore, MemoryStore,
    ReferenceEmbedding, ReferenceStore,
};

pub use diarizer::{DiarizationHints, Diarizer};
pub use sink::{MemorySink, TranscriptSink};
