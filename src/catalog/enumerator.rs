use std::sync::Arc;

use super::{build_catalog, VoiceDescriptor};
use crate::config::ConfigStore;
use crate::EngineFacade;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("No voice at index {0}")]
    NotFound(usize),
    #[error("Batch size must be at least 1")]
    InvalidCount,
}

/// Result of [`VoiceEnumerator::next_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub voices: Vec<VoiceDescriptor>,
    /// Whether every requested voice was available.
    pub complete: bool,
}

/// Cursor over a catalog snapshot.
///
/// The snapshot is taken once, at construction; later settings changes are
/// not observed. Clones share the snapshot and carry an independent cursor.
#[derive(Debug, Clone)]
pub struct VoiceEnumerator {
    voices: Arc<[VoiceDescriptor]>,
    cursor: usize,
}

impl VoiceEnumerator {
    pub fn new(voices: Vec<VoiceDescriptor>) -> Self {
        Self {
            voices: voices.into(),
            cursor: 0,
        }
    }

    /// Load the settings, query the engine and build the catalog.
    ///
    /// Engine failures degrade to an empty engine voice list; the catalog
    /// still holds its fallback entry.
    pub fn from_services<E>(engine: &E, store: &ConfigStore) -> Self
    where
        E: EngineFacade + ?Sized,
    {
        if let Err(e) = store.load() {
            log::debug!("Enumerating with default settings: {e}");
        }
        let config = store.config();
        log::debug!(
            "Building catalog (default_only={}, enabled_voices={}, profiles={})",
            config.default_only,
            config.enabled_voices.len(),
            config.voice_profiles.len()
        );

        let engine_voices = match engine.initialize() {
            Ok(()) => engine.list_voices(),
            Err(e) => {
                log::warn!("Engine unavailable, exposing fallback voice only: {e}");
                Vec::new()
            }
        };

        let catalog = build_catalog(&engine_voices, &config);
        log::info!("Total voices available: {}", catalog.len());
        Self::new(catalog)
    }

    pub fn count(&self) -> usize {
        self.voices.len()
    }

    pub fn item(&self, index: usize) -> Result<&VoiceDescriptor, CatalogError> {
        self.voices.get(index).ok_or(CatalogError::NotFound(index))
    }

    /// Take up to `count` voices and advance the cursor past them.
    pub fn next_batch(&mut self, count: usize) -> Result<Batch, CatalogError> {
        if count == 0 {
            return Err(CatalogError::InvalidCount);
        }
        let end = self.cursor.saturating_add(count).min(self.voices.len());
        let voices = self.voices[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(Batch {
            complete: voices.len() == count,
            voices,
        })
    }

    /// Advance the cursor by `count`. Returns `false` when fewer remained.
    pub fn skip(&mut self, count: usize) -> bool {
        let remaining = self.voices.len() - self.cursor;
        let skipped = remaining.min(count);
        self.cursor += skipped;
        skipped == count
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Every voice in the snapshot, ignoring the cursor.
    pub fn iter(&self) -> std::slice::Iter<'_, VoiceDescriptor> {
        self.voices.iter()
    }
}
