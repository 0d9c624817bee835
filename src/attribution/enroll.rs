// attribution/enroll.rs
//
// Speaker enrollment: compute and store mean reference embeddings from
// sample audio clips.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use log::{info, warn};

use crate::embedding::{mean_embedding, EmbeddingProvider, ReferenceStore};

/// Outcome of a batch enrollment. One speaker's failure never aborts the
/// batch; the report says exactly which names went through.
#[derive(Debug, Default)]
pub struct EnrollmentReport {
    /// Speakers whose reference embedding was computed and saved
    pub enrolled: Vec<String>,
    /// Speakers that failed, with the failure reason
    pub failed: Vec<(String, String)>,
}

impl EnrollmentReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Compute a mean embedding from reference clips. The provider must
/// already be initialized; `enroll_speaker` handles that.
///
/// Missing files and extraction failures are logged and skipped. Zero
/// successful extractions is a hard error: an empty or garbage reference
/// embedding would silently corrupt every future identification.
pub fn compute_speaker_embedding<P: EmbeddingProvider + ?Sized>(
    provider: &P,
    clips: &[PathBuf],
) -> Result<(Vec<f32>, u32)> {
    let mut embeddings = Vec::new();

    for clip in clips {
        if !clip.exists() {
            warn!("Reference clip not found, skipping: {:?}", clip);
            continue;
        }
        match provider.embed_clip(clip) {
            Ok(emb) => {
                info!("  Extracted embedding from {:?}", clip.file_name().unwrap_or_default());
                embeddings.push(emb);
            }
            Err(e) => {
                warn!("  Failed to extract embedding from {:?}: {}", clip, e);
            }
        }
    }

    let clip_count = embeddings.len() as u32;
    let mean = mean_embedding(&embeddings).ok_or_else(|| {
        anyhow!(
            "Could not extract any embeddings from {} reference clips",
            clips.len()
        )
    })?;

    Ok((mean, clip_count))
}

/// Enroll a single speaker: compute the mean embedding from their clips
/// and save it through the reference store (overwriting any previous
/// enrollment for the same name).
pub fn enroll_speaker<P, S>(
    provider: &mut P,
    store: &mut S,
    name: &str,
    clips: &[PathBuf],
) -> Result<u32>
where
    P: EmbeddingProvider + ?Sized,
    S: ReferenceStore + ?Sized,
{
    provider.ensure_ready()?;
    info!("Enrolling speaker '{}' from {} clips...", name, clips.len());

    let (embedding, clip_count) = compute_speaker_embedding(provider, clips)?;
    store.save(name, &embedding, clip_count)?;

    info!("Enrolled '{}' ({} clips used)", name, clip_count);
    Ok(clip_count)
}

/// Enroll a batch of speakers independently. A provider initialization
/// failure fails every speaker up front; nothing is extracted or saved.
pub fn enroll_all_speakers<P, S>(
    provider: &mut P,
    store: &mut S,
    speakers: &[(String, Vec<PathBuf>)],
) -> EnrollmentReport
where
    P: EmbeddingProvider + ?Sized,
    S: ReferenceStore + ?Sized,
{
    let mut report = EnrollmentReport::default();

    if let Err(e) = provider.ensure_ready() {
        warn!("Embedding provider failed to initialize: {e}");
        for (name, _) in speakers {
            report.failed.push((name.clone(), e.to_string()));
        }
        return report;
    }

    for (name, clips) in speakers {
        match enroll_speaker(provider, store, name, clips) {
            Ok(_) => report.enrolled.push(name.clone()),
            Err(e) => {
                warn!("Failed to enroll '{}': {}", name, e);
                report.failed.push((name.clone(), e.to_string()));
            }
        }
    }

    info!(
        "Enrolled {}/{} speakers",
        report.enrolled.len(),
        speakers.len()
    );
    report
}
