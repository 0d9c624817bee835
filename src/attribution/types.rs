// attribution/types.rs
//
// Transcript and diarization data types shared by the attribution stages.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single transcribed word with timing and speaker attribution fields.
///
/// Words are produced upstream by the transcriber. The attribution stages
/// only ever touch `speaker`, `confidence`, and `is_overlap`; timings are
/// never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSegment {
    pub word: String,
    /// Start time in seconds from the beginning of the recording
    pub start_time: Decimal,
    /// End time in seconds from the beginning of the recording
    pub end_time: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Confidence of the speaker assignment (0.0 to 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Whether a second speaker had significant overlap with this word
    #[serde(default)]
    pub is_overlap: bool,
}

impl WordSegment {
    /// Create an unattributed word
    pub fn new(word: impl Into<String>, start_time: Decimal, end_time: Decimal) -> Self {
        Self {
            word: word.into(),
            start_time,
            end_time,
            speaker: None,
            confidence: None,
            is_overlap: false,
        }
    }

    /// Word duration in seconds (zero-duration words are tolerated)
    pub fn duration(&self) -> Decimal {
        self.end_time - self.start_time
    }

    /// Temporal midpoint of the word
    pub fn midpoint(&self) -> Decimal {
        (self.start_time + self.end_time) / Decimal::TWO
    }

    pub fn start_secs(&self) -> f64 {
        self.start_time.to_f64().unwrap_or(0.0)
    }

    pub fn end_secs(&self) -> f64 {
        self.end_time.to_f64().unwrap_or(0.0)
    }

    pub fn midpoint_secs(&self) -> f64 {
        self.midpoint().to_f64().unwrap_or(0.0)
    }
}

/// A diarization interval: one speaker cluster talking over a time span.
///
/// Produced by the external diarizer with anonymous cluster labels (e.g.
/// "SPEAKER_00"); after identification the label is replaced with a resolved
/// name. Intervals are ordered by start time but may overlap across speakers:
/// simultaneous speech is expected, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerSegment {
    /// Cluster label or resolved speaker name
    pub speaker: String,
    pub start_time: Decimal,
    pub end_time: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl SpeakerSegment {
    pub fn new(speaker: impl Into<String>, start_time: Decimal, end_time: Decimal) -> Self {
        Self {
            speaker: speaker.into(),
            start_time,
            end_time,
            confidence: None,
        }
    }

    pub fn duration(&self) -> Decimal {
        self.end_time - self.start_time
    }

    pub fn start_secs(&self) -> f64 {
        self.start_time.to_f64().unwrap_or(0.0)
    }

    pub fn end_secs(&self) -> f64 {
        self.end_time.to_f64().unwrap_or(0.0)
    }
}
