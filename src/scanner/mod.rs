use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::AUDIO_SUFFIX;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Collect the `.mp3` files directly inside `dir`, sorted lexicographically.
///
/// The listing is not recursive. Symlinks are followed and kept when they
/// point at a regular file. The suffix match is case-sensitive.
pub fn get_audio_paths(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut audio_files: Vec<PathBuf> = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_audio = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(AUDIO_SUFFIX));
        if is_audio {
            audio_files.push(entry.into_path());
        }
    }

    audio_files.sort();
    audio_files.dedup();

    log::info!("Found {} audio files in {}", audio_files.len(), dir.display());
    Ok(audio_files)
}

/// Join key for a track: the final path segment without its `.mp3` suffix.
pub fn track_key(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    match name.strip_suffix(AUDIO_SUFFIX) {
        Some(stem) => stem.to_string(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.mp3"), b"").unwrap();
        fs::write(dir.path().join("a.mp3"), b"").unwrap();
        fs::write(dir.path().join("c.wav"), b"").unwrap();

        let paths = get_audio_paths(dir.path()).unwrap();
        assert_eq!(
            paths,
            vec![dir.path().join("a.mp3"), dir.path().join("b.mp3")]
        );
    }

    #[test]
    fn test_suffix_is_case_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("1.MP3"), b"").unwrap();
        fs::write(dir.path().join("2.mp3"), b"").unwrap();

        let paths = get_audio_paths(dir.path()).unwrap();
        assert_eq!(paths, vec![dir.path().join("2.mp3")]);
    }

    #[test]
    fn test_not_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.mp3"), b"").unwrap();
        fs::create_dir(dir.path().join("folder.mp3")).unwrap();
        fs::write(dir.path().join("top.mp3"), b"").unwrap();

        let paths = get_audio_paths(dir.path()).unwrap();
        assert_eq!(paths, vec![dir.path().join("top.mp3")]);
    }

    #[test]
    fn test_lexicographic_not_numeric() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["10.mp3", "2.mp3", "1.mp3"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let keys: Vec<String> = get_audio_paths(dir.path())
            .unwrap()
            .iter()
            .map(|p| track_key(p))
            .collect();
        assert_eq!(keys, vec!["1", "10", "2"]);
    }

    #[test]
    fn test_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(get_audio_paths(&dir.path().join("absent")).is_err());
    }

    #[test]
    fn test_track_key() {
        assert_eq!(track_key(Path::new("data/audio/12.mp3")), "12");
        assert_eq!(track_key(Path::new("song.mp3")), "song");
        assert_eq!(track_key(Path::new("/tmp/clip.wav")), "clip.wav");
    }
}
