/// Player state table
///
/// Owns one record per sound key. Records are inserted on create and removed
/// only once their player has been released.
use std::collections::HashMap;
use std::sync::Arc;

use super::player::SoundPlayer;

/// An active player and its lifecycle flags
pub struct PlayerRecord {
    pub sound_key: String,
    pub player: Arc<dyn SoundPlayer>,

    /// A stop is in flight; the record goes away when it completes
    pub stopping: bool,

    /// Bumped by every play and pause, only the latest start may report
    pub start_epoch: u64,
}

impl PlayerRecord {
    pub fn new(sound_key: &str, player: Arc<dyn SoundPlayer>) -> Self {
        Self {
            sound_key: sound_key.to_string(),
            player,
            stopping: false,
            start_epoch: 0,
        }
    }
}

#[derive(Default)]
pub struct PlayerTable {
    records: HashMap<String, PlayerRecord>,
}

impl PlayerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, sound_key: &str) -> bool {
        self.records.contains_key(sound_key)
    }

    pub fn get(&self, sound_key: &str) -> Option<&PlayerRecord> {
        self.records.get(sound_key)
    }

    pub fn get_mut(&mut self, sound_key: &str) -> Option<&mut PlayerRecord> {
        self.records.get_mut(sound_key)
    }

    /// Insert a record unless the key is taken, returns whether it was added
    pub fn insert(&mut self, record: PlayerRecord) -> bool {
        if self.records.contains_key(&record.sound_key) {
            return false;
        }
        self.records.insert(record.sound_key.clone(), record);
        true
    }

    /// Check that `player` is the one currently registered for `sound_key`
    pub fn holds(&self, sound_key: &str, player: &Arc<dyn SoundPlayer>) -> bool {
        self.records
            .get(sound_key)
            .map(|r| Arc::ptr_eq(&r.player, player))
            .unwrap_or(false)
    }

    /// Remove the record only if it still belongs to `player`
    pub fn remove_if_holds(
        &mut self,
        sound_key: &str,
        player: &Arc<dyn SoundPlayer>,
    ) -> Option<PlayerRecord> {
        if self.holds(sound_key, player) {
            self.records.remove(sound_key)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keys of every active record, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.keys().cloned().collect();
        keys.sort();
        keys
    }
}
