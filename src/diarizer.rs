// diarizer.rs
//
// Interface to the external diarization service. The clustering algorithm
// itself is out of scope: this crate only consumes its ordered
// (label, start, end) output.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::attribution::SpeakerSegment;

/// Hints passed through to the diarization backend. Both are optional and
/// purely advisory; backends may ignore them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiarizationHints {
    /// Expected number of speakers in the recording
    pub num_speakers: Option<usize>,
    /// Names expected to appear, forwarded to identification as the
    /// candidate restriction
    pub expected_speakers: Option<Vec<String>>,
}

/// External diarization service: audio file in, ordered speaker-labeled
/// intervals out.
pub trait Diarizer {
    fn diarize(&mut self, audio: &Path, hints: &DiarizationHints) -> Result<Vec<SpeakerSegment>>;
}
