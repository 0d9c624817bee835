// embedding/store.rs
//
// Reference embedding storage: a flat name -> vector namespace.
// Enrollment writes, identification reads. Re-enrollment overwrites: a
// speaker name maps to exactly one embedding.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// A stored reference embedding for an enrolled speaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceEmbedding {
    /// Display name
    pub name: String,
    /// Voice embedding vector
    pub embedding: Vec<f32>,
    /// When the speaker was enrolled
    pub created_at: DateTime<Utc>,
    /// Number of audio clips averaged into this embedding
    pub clip_count: u32,
}

/// Key-value namespace for enrolled speaker embeddings.
pub trait ReferenceStore {
    /// Load every enrolled speaker's embedding.
    fn load_all(&self) -> Result<HashMap<String, Vec<f32>>>;

    /// Save (or overwrite) the embedding for a speaker.
    fn save(&mut self, name: &str, embedding: &[f32], clip_count: u32) -> Result<()>;

    /// Remove an enrolled speaker.
    fn remove(&mut self, name: &str) -> Result<()>;
}

/// Directory-backed store with one JSON record per enrolled speaker.
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Open an existing embeddings directory. A missing directory is a
    /// configuration error and is reported before any processing starts.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(anyhow!("Embeddings directory not found: {:?}", dir));
        }
        Ok(Self { dir })
    }

    /// Open the embeddings directory, creating it if needed. Used by
    /// enrollment, which is allowed to start from an empty namespace.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| anyhow!("Failed to create embeddings directory {:?}: {}", dir, e))?;
        Ok(Self { dir })
    }

    /// Default embeddings directory under the platform data dir
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("speaker-attribution").join("embeddings"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }
}

impl ReferenceStore for JsonDirStore {
    fn load_all(&self) -> Result<HashMap<String, Vec<f32>>> {
        let mut references = HashMap::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let data = fs::read_to_string(&path)?;
            match serde_json::from_str::<ReferenceEmbedding>(&data) {
                Ok(record) => {
                    debug!("Loaded reference embedding for {}", record.name);
                    references.insert(record.name, record.embedding);
                }
                Err(e) => {
                    warn!("Skipping unreadable embedding file {:?}: {}", path, e);
                }
            }
        }

        info!("Loaded {} reference embeddings from {:?}", references.len(), self.dir);
        Ok(references)
    }

    fn save(&mut self, name: &str, embedding: &[f32], clip_count: u32) -> Result<()> {
        let record = ReferenceEmbedding {
            name: name.to_string(),
            embedding: embedding.to_vec(),
            created_at: Utc::now(),
            clip_count,
        };

        let path = self.record_path(name);
        let data = serde_json::to_string(&record)?;
        fs::write(&path, data)
            .map_err(|e| anyhow!("Failed to write embedding for '{}': {}", name, e))?;

        info!("Saved reference embedding for '{}' to {:?}", name, path);
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        let path = self.record_path(name);
        if !path.exists() {
            return Err(anyhow!("Speaker not enrolled: {}", name));
        }
        fs::remove_file(&path)?;
        info!("Removed reference embedding for '{}'", name);
        Ok(())
    }
}

/// In-memory store for tests and callers that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    speakers: HashMap<String, Vec<f32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_speaker(mut self, name: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.speakers.insert(name.into(), embedding);
        self
    }

    pub fn speaker_count(&self) -> usize {
        self.speakers.len()
    }
}

impl ReferenceStore for MemoryStore {
    fn load_all(&self) -> Result<HashMap<String, Vec<f32>>> {
        Ok(self.speakers.clone())
    }

    fn save(&mut self, name: &str, embedding: &[f32], _clip_count: u32) -> Result<()> {
        self.speakers.insert(name.to_string(), embedding.to_vec());
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        self.speakers
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| anyhow!("Speaker not enrolled: {}", name))
    }
}
