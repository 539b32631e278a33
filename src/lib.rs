pub mod analyzer;
pub mod annotations;
pub mod config;
pub mod dataset;
pub mod downloader;
pub mod emotion;
pub mod lyrics;
pub mod scanner;

/// File-name suffix of the audio files the collector picks up (case-sensitive).
pub const AUDIO_SUFFIX: &str = ".mp3";

/// Application name for XDG paths
pub const APP_NAME: &str = "moodset";
