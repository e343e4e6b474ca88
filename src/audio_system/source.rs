/// Sound file lookup
///
/// Remote senders name sounds with free-form keys. The library maps each key
/// to an ASCII file stem and probes the configured extensions in order.
use std::path::PathBuf;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::PlayerError;

/// Convert a sound key to a file-system safe stem
///
/// - Strips diacritics via Unicode NFD decomposition
/// - Keeps ASCII letters, digits and `-`
/// - Replaces everything else with a single underscore
/// - Returns `None` when nothing usable is left
pub fn file_stem_for(sound_key: &str) -> Option<String> {
    let mut stem = String::with_capacity(sound_key.len());
    let mut last_was_underscore = false;

    for ch in sound_key.nfd() {
        if is_combining_mark(ch) || ch.is_control() {
            continue;
        }

        if ch.is_ascii_alphanumeric() || ch == '-' {
            stem.push(ch);
            last_was_underscore = false;
        } else if !last_was_underscore && !stem.is_empty() {
            stem.push('_');
            last_was_underscore = true;
        }
    }

    if stem.ends_with('_') {
        stem.pop();
    }

    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}

/// Directory of sound files
#[derive(Debug, Clone)]
pub struct SoundLibrary {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl SoundLibrary {
    pub fn new(dir: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            extensions,
        }
    }

    /// Find the file backing `sound_key`
    pub fn resolve(&self, sound_key: &str) -> Result<PathBuf, PlayerError> {
        let stem =
            file_stem_for(sound_key).ok_or_else(|| PlayerError::InvalidKey(sound_key.to_string()))?;

        self.extensions
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", stem, ext.trim_start_matches('.'))))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| PlayerError::NotFound {
                key: sound_key.to_string(),
            })
    }
}
