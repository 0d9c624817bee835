// sink.rs
//
// Write contract with the storage collaborator. Persistence schema is the
// collaborator's concern; this crate only hands over attributed batches.

use anyhow::Result;

use crate::attribution::{SpeakerSegment, WordSegment};

/// Storage collaborator accepting batches of attributed transcript data.
pub trait TranscriptSink {
    fn store_words(&mut self, words: &[WordSegment]) -> Result<()>;
    fn store_speaker_segments(&mut self, segments: &[SpeakerSegment]) -> Result<()>;
}

/// In-memory sink for tests and callers that batch writes themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub words: Vec<WordSegment>,
    pub speaker_segments: Vec<SpeakerSegment>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TranscriptSink for MemorySink {
    fn store_words(&mut self, words: &[WordSegment]) -> Result<()> {
        self.words.extend_from_slice(words);
        Ok(())
    }

    fn store_speaker_segments(&mut self, segments: &[SpeakerSegment]) -> Result<()> {
        self.speaker_segments.extend_from_slice(segments);
        Ok(())
    }
}
