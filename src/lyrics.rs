use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum LyricsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Lyrics file name is not a numeric track id: {0}")]
    InvalidId(String),
    #[error("Duplicate lyrics for track {id}: {first} and {second}")]
    DuplicateId {
        id: i64,
        first: String,
        second: String,
    },
}

/// Lyrics keyed by integer track id, iterated in ascending id order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LyricsTable {
    rows: BTreeMap<i64, String>,
    sources: BTreeMap<i64, String>,
}

impl LyricsTable {
    pub fn get(&self, id: i64) -> Option<&str> {
        self.rows.get(&id).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.rows.iter().map(|(id, text)| (*id, text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn insert(&mut self, id: i64, file_name: String, text: String) -> Result<(), LyricsError> {
        if let Some(first) = self.sources.get(&id) {
            return Err(LyricsError::DuplicateId {
                id,
                first: first.clone(),
                second: file_name,
            });
        }
        self.sources.insert(id, file_name);
        self.rows.insert(id, text);
        Ok(())
    }
}

/// Parse a lyrics file name into its track id: `12.lrc` → 12.
/// A `.txt` suffix is stripped first, then `.lrc`.
pub fn track_id_from_file_name(name: &str) -> Result<i64, LyricsError> {
    let stem = name.strip_suffix(".txt").unwrap_or(name);
    let stem = stem.strip_suffix(".lrc").unwrap_or(stem);
    stem.parse::<i64>()
        .map_err(|_| LyricsError::InvalidId(name.to_string()))
}

/// Read every regular file directly inside `dir` into a lyrics table.
pub fn load_lyrics_from_dir(dir: &Path) -> Result<LyricsTable, LyricsError> {
    let mut table = LyricsTable::default();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        let id = track_id_from_file_name(&file_name)?;
        let text = std::fs::read_to_string(entry.path())?;
        table.insert(id, file_name, text)?;
    }

    log::info!("Loaded lyrics for {} tracks from {}", table.len(), dir.display());
    Ok(table)
}
