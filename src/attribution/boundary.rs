// attribution/boundary.rs
//
// Word-level speaker boundary refinement using voice embeddings.
//
// Words near speaker transitions get assigned by maximum time overlap,
// which is close to a coin flip. Comparing the actual audio at each word
// against reference embeddings is more accurate. Refinement is strictly
// best-effort: any per-word failure leaves that word unmodified.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};

use crate::config::BoundaryConfig;
use crate::embedding::{cosine_similarity, EmbeddingProvider};

use super::types::WordSegment;

/// Find word indices within the boundary window of any speaker transition.
///
/// A transition exists wherever two temporally adjacent words differ in
/// speaker (unassigned counts as differing); its time is the midpoint of
/// the gap between the words. A word is a candidate when its own midpoint
/// lies within `window_secs` of any transition.
pub fn find_boundary_words(words: &[WordSegment], window_secs: f64) -> Vec<usize> {
    if words.is_empty() {
        return Vec::new();
    }

    let mut transition_times: Vec<f64> = Vec::new();
    for pair in words.windows(2) {
        if pair[0].speaker != pair[1].speaker {
            transition_times.push((pair[0].end_secs() + pair[1].start_secs()) / 2.0);
        }
    }

    if transition_times.is_empty() {
        return Vec::new();
    }

    let mut indices = Vec::new();
    for (idx, word) in words.iter().enumerate() {
        let midpoint = word.midpoint_secs();
        if transition_times
            .iter()
            .any(|t| (midpoint - t).abs() <= window_secs)
        {
            indices.push(idx);
        }
    }

    indices
}

/// Refine speaker assignments for boundary words using voice embeddings.
///
/// For each boundary candidate the word's embedding is compared against
/// the references of its current speaker and its immediate neighbors'
/// speakers. The word is reassigned only when a different one of those
/// speakers beats the current similarity by at least the configured margin.
/// A speaker that is neither current nor adjacent is never considered.
pub fn refine_speaker_boundaries<P: EmbeddingProvider + ?Sized>(
    mut words: Vec<WordSegment>,
    audio: &Path,
    provider: &P,
    references: &HashMap<String, Vec<f32>>,
    config: &BoundaryConfig,
) -> Vec<WordSegment> {
    if words.is_empty() {
        return words;
    }

    let boundary_indices = find_boundary_words(&words, config.window_secs);
    if boundary_indices.is_empty() {
        return words;
    }

    if references.is_empty() {
        debug!("No reference embeddings available, skipping boundary refinement");
        return words;
    }

    let n = words.len();
    let mut reassigned = 0usize;

    for idx in boundary_indices {
        let start = words[idx].start_secs();
        let end = words[idx].end_secs();
        let duration = end - start;

        // Too little audio to embed reliably.
        if duration < config.min_word_duration {
            debug!("Skipping short word at {start:.3}-{end:.3} ({duration:.3}s)");
            continue;
        }

        let current_speaker = words[idx].speaker.clone();

        // Candidate set: current speaker plus immediate neighbors, minus
        // unassigned, restricted to speakers with a reference embedding.
        // Current-first order keeps tie-breaking deterministic.
        let mut candidates: Vec<&str> = Vec::new();
        if let Some(speaker) = &current_speaker {
            candidates.push(speaker.as_str());
        }
        if idx > 0 {
            if let Some(speaker) = &words[idx - 1].speaker {
                if !candidates.contains(&speaker.as_str()) {
                    candidates.push(speaker.as_str());
                }
            }
        }
        if idx < n - 1 {
            if let Some(speaker) = &words[idx + 1].speaker {
                if !candidates.contains(&speaker.as_str()) {
                    candidates.push(speaker.as_str());
                }
            }
        }
        candidates.retain(|speaker| references.contains_key(*speaker));
        if candidates.is_empty() {
            debug!("No reference embeddings for candidates at word {idx}");
            continue;
        }

        let word_emb = match provider.embed_span(audio, start, end) {
            Ok(emb) => emb,
            Err(e) => {
                debug!("Failed to extract embedding for word {idx} ({start:.3}-{end:.3}): {e}");
                continue;
            }
        };

        let scores: Vec<(&str, f32)> = candidates
            .iter()
            .map(|speaker| (*speaker, cosine_similarity(&word_emb, &references[*speaker])))
            .collect();

        let current_score = current_speaker
            .as_deref()
            .and_then(|cur| scores.iter().find(|(speaker, _)| *speaker == cur))
            .map(|(_, score)| *score)
            .unwrap_or(-1.0);

        // Strict > keeps the first candidate (the current speaker when it
        // has a reference) on ties.
        let Some((best_speaker, best_score)) = scores
            .iter()
            .copied()
            .reduce(|best, entry| if entry.1 > best.1 { entry } else { best })
            .map(|(speaker, score)| (speaker.to_string(), score))
        else {
            continue;
        };

        if Some(best_speaker.as_str()) != current_speaker.as_deref()
            && best_score >= current_score + config.reassignment_margin
        {
            info!(
                "Reassigning word {idx} ({start:.3}-{end:.3}) from {current_speaker:?} to \
                 '{best_speaker}' (score {current_score:.3} -> {best_score:.3})"
            );
            words[idx].speaker = Some(best_speaker);
            reassigned += 1;
        }
    }

    if reassigned > 0 {
        info!("Boundary refinement reassigned {reassigned} words");
    }
    words
}
