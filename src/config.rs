use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

/// Application configuration loaded from TOML config file.
/// All fields have sensible defaults; the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Number of parallel feature-extraction workers. 0 = auto-detect (cores / 2, min 1).
    pub workers: usize,
    /// Annotation CSV used when `annotations` has no path argument.
    pub dataset: PathBuf,
    /// Feature extraction settings.
    pub features: FeatureConfig,
    /// Downloader settings.
    pub download: DownloadConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            dataset: PathBuf::from("data/dataset_500.csv"),
            features: FeatureConfig::default(),
            download: DownloadConfig::default(),
        }
    }
}

/// Analysis parameters for the feature extractor.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureConfig {
    /// Rate every file is resampled to before analysis.
    pub sample_rate: u32,
    /// STFT window length in samples.
    pub n_fft: usize,
    /// STFT hop in samples.
    pub hop_length: usize,
    /// Mel bands feeding the MFCC and onset computations.
    pub n_mels: usize,
    /// Number of MFCC columns emitted (`mfcc_0 ..`).
    pub n_mfcc: usize,
    /// Chroma bins. Chroma columns are currently not emitted.
    pub n_chroma: usize,
}

/// A feature setting the extractor cannot run with.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid feature config: {field} must be greater than zero")]
pub struct InvalidFeatureConfig {
    pub field: &'static str,
}

impl FeatureConfig {
    /// Reject zero sizes that would divide by zero or produce empty frames.
    pub fn validate(&self) -> Result<(), InvalidFeatureConfig> {
        let sizes = [
            ("sample_rate", self.sample_rate as usize),
            ("n_fft", self.n_fft),
            ("hop_length", self.hop_length),
            ("n_mels", self.n_mels),
        ];
        match sizes.into_iter().find(|&(_, value)| value == 0) {
            Some((field, _)) => Err(InvalidFeatureConfig { field }),
            None => Ok(()),
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            n_mfcc: 20,
            n_chroma: 12,
        }
    }
}

/// External download tool settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DownloadConfig {
    /// Downloads land in `<download_dir>/<index>.<ext>`.
    pub download_dir: PathBuf,
    /// Target audio bitrate in kbps.
    pub quality_kbps: u32,
    /// Executable used to search and fetch audio.
    pub tool: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("data/audio"),
            quality_kbps: 128,
            tool: "yt-dlp".to_string(),
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/moodset/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::from_toml(&contents) {
                    Ok(mut config) => {
                        log::info!("Loaded config from {}", path.display());
                        if let Err(e) = config.features.validate() {
                            log::warn!("{} in {}. Using default features.", e, path.display());
                            config.features = FeatureConfig::default();
                        }
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<AppConfig>(contents)
    }

    /// Resolve worker count: 0 → auto-detect (cores / 2, min 1).
    pub fn resolve_workers(&self) -> usize {
        resolve_workers(self.workers)
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

pub fn resolve_workers(workers: usize) -> usize {
    if workers > 0 {
        workers
    } else {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        (cores / 2).max(1)
    }
}
