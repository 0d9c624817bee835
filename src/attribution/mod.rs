// Speaker attribution module
// Maps diarization output onto word-level transcripts and resolves
// anonymous cluster labels to enrolled speaker names.
//
// Stages, in pipeline order:
// - assigner: largest-overlap word assignment + crosstalk flagging + gap fill
// - identifier: cluster-to-name resolution via optimal assignment
// - boundary: embedding-based refinement of words near speaker transitions
// - enroll: building reference embeddings for named speakers

pub mod assigner;
pub mod boundary;
pub mod enroll;
pub mod identifier;
pub mod matching;
pub mod pipeline;
pub mod types;

// Re-export the core types and operations
pub use types::{SpeakerSegment, WordSegment};

pub use assigner::assign_speakers_to_words;

pub use boundary::{find_boundary_words, refine_speaker_boundaries};

pub use identifier::{relabel_segments, IdentificationResult, SpeakerIdentifier};

pub use enroll::{compute_speaker_embedding, enroll_all_speakers, enroll_speaker, EnrollmentReport};

pub use pipeline::{attribute_transcript, AttributionOptions, AttributionOutcome};
