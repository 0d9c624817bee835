// attribution/assigner.rs
//
// Maps diarization intervals onto word-level spans: largest-overlap
// assignment, crosstalk flagging, and bidirectional gap-filling for words
// no interval covers.

use log::debug;
use rust_decimal::Decimal;

use crate::config::OverlapConfig;

use super::types::{SpeakerSegment, WordSegment};

/// Assign speaker labels to word segments based on diarization output.
///
/// For each word the overlapping interval with the largest overlap wins
/// (ties go to the earlier interval). Words covered by no interval copy the
/// speaker of the nearest assigned word by midpoint distance, looking both
/// directions. Only `speaker`, `confidence`, and `is_overlap` are written;
/// timings are untouched.
pub fn assign_speakers_to_words(
    mut words: Vec<WordSegment>,
    speaker_segments: &[SpeakerSegment],
    config: &OverlapConfig,
) -> Vec<WordSegment> {
    if speaker_segments.is_empty() {
        return words;
    }

    // Sort by start time; the stable sort keeps first-seen order for equal
    // starts so overlap ties stay deterministic.
    let mut sorted: Vec<&SpeakerSegment> = speaker_segments.iter().collect();
    sorted.sort_by_key(|s| s.start_time);
    let start_times: Vec<Decimal> = sorted.iter().map(|s| s.start_time).collect();

    for word in words.iter_mut() {
        let word_start = word.start_time;
        let word_end = word.end_time;

        // Only intervals starting before the word's end can overlap it.
        let right_idx = start_times.partition_point(|t| *t < word_end);

        // Collect (overlap, segment) for every interval touching the word.
        let mut overlaps: Vec<(Decimal, &SpeakerSegment)> = Vec::new();
        for seg in &sorted[..right_idx] {
            if seg.end_time <= word_start {
                continue; // interval ends before the word starts
            }
            let overlap = word_end.min(seg.end_time) - word_start.max(seg.start_time);
            if overlap > Decimal::ZERO {
                overlaps.push((overlap, seg));
            }
        }

        let mut best: Option<(Decimal, &SpeakerSegment)> = None;
        for &(overlap, seg) in &overlaps {
            // Strict > keeps the first-seen interval on ties.
            if best.map_or(true, |(b, _)| overlap > b) {
                best = Some((overlap, seg));
            }
        }

        let Some((best_overlap, best_seg)) = best else {
            word.speaker = None;
            word.is_overlap = false;
            continue;
        };

        word.speaker = Some(best_seg.speaker.clone());
        word.confidence = best_seg.confidence;

        // Best competing overlap from a different speaker. A second interval
        // of the same speaker is continuation, not crosstalk.
        let second_overlap = overlaps
            .iter()
            .filter(|(_, seg)| seg.speaker != best_seg.speaker)
            .map(|(overlap, _)| *overlap)
            .max()
            .unwrap_or(Decimal::ZERO);

        let duration = word_end - word_start;
        word.is_overlap = duration > Decimal::ZERO
            && second_overlap >= duration * config.min_word_fraction
            && second_overlap >= best_overlap * config.min_best_fraction;
    }

    fill_gaps(&mut words);
    words
}

/// Info about an already-assigned word used for gap-filling.
#[derive(Clone)]
struct AssignedInfo {
    speaker: String,
    confidence: Option<f32>,
    midpoint: Decimal,
}

/// Bidirectional gap-filling: each unassigned word copies the speaker of
/// the temporally closer of its nearest assigned neighbors. Ties go to the
/// preceding neighbor.
fn fill_gaps(words: &mut [WordSegment]) {
    let n = words.len();

    // Forward pass: last assigned word at or before each position.
    let mut prev_info: Vec<Option<AssignedInfo>> = Vec::with_capacity(n);
    let mut last: Option<AssignedInfo> = None;
    for word in words.iter() {
        if let Some(speaker) = &word.speaker {
            last = Some(AssignedInfo {
                speaker: speaker.clone(),
                confidence: word.confidence,
                midpoint: word.midpoint(),
            });
        }
        prev_info.push(last.clone());
    }

    // Backward pass: next assigned word at or after each position.
    let mut next_info: Vec<Option<AssignedInfo>> = vec![None; n];
    let mut next: Option<AssignedInfo> = None;
    for (i, word) in words.iter().enumerate().rev() {
        if let Some(speaker) = &word.speaker {
            next = Some(AssignedInfo {
                speaker: speaker.clone(),
                confidence: word.confidence,
                midpoint: word.midpoint(),
            });
        }
        next_info[i] = next.clone();
    }

    let mut filled = 0usize;
    for (i, word) in words.iter_mut().enumerate() {
        if word.speaker.is_some() {
            continue;
        }

        let chosen = match (&prev_info[i], &next_info[i]) {
            (None, None) => continue, // nothing assigned anywhere
            (Some(prev), None) => prev,
            (None, Some(next)) => next,
            (Some(prev), Some(next)) => {
                let mid = word.midpoint();
                let prev_dist = (mid - prev.midpoint).abs();
                let next_dist = (next.midpoint - mid).abs();
                if prev_dist <= next_dist {
                    prev
                } else {
                    next
                }
            }
        };

        word.speaker = Some(chosen.speaker.clone());
        word.confidence = chosen.confidence;
        filled += 1;
    }

    if filled > 0 {
        debug!("Gap-filled speaker for {} uncovered words", filled);
    }
}
