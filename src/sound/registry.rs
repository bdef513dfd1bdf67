// SoundSourceRegistry - One sound source per track
// Mutated only by track add/remove; the scheduler just reads it.

use crate::project::{Track, TrackId};
use crate::sound::{SoundSource, SoundSourceFactory};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct SoundSourceRegistry {
    sources: HashMap<TrackId, Arc<dyn SoundSource>>,
}

impl SoundSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the track's source through `factory` unless one exists.
    /// Returns true if the track has a source afterwards.
    pub fn create_for(&mut self, track: &Track, factory: &dyn SoundSourceFactory) -> bool {
        if self.sources.contains_key(&track.id) {
            return true;
        }
        match factory.create(track) {
            Some(source) => {
                debug!("Created sound source for track {} ({})", track.id, track.name);
                self.sources.insert(track.id, source);
                true
            }
            None => {
                debug!("No sound source for track {} ({})", track.id, track.name);
                false
            }
        }
    }

    /// Bind a source directly, replacing (and disposing) any previous one
    pub fn register(&mut self, track_id: TrackId, source: Arc<dyn SoundSource>) {
        if let Some(old) = self.sources.insert(track_id, source) {
            old.dispose();
        }
    }

    /// Dispose and remove the track's source; false if it had none
    pub fn dispose(&mut self, track_id: TrackId) -> bool {
        match self.sources.remove(&track_id) {
            Some(source) => {
                source.dispose();
                debug!("Disposed sound source for track {}", track_id);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, track_id: TrackId) -> Option<Arc<dyn SoundSource>> {
        self.sources.get(&track_id).cloned()
    }

    pub fn contains(&self, track_id: TrackId) -> bool {
        self.sources.contains_key(&track_id)
    }

    pub fn track_ids(&self) -> Vec<TrackId> {
        let mut ids: Vec<TrackId> = self.sources.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for SoundSourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundSourceRegistry")
            .field("tracks", &self.track_ids())
            .finish()
    }
}
