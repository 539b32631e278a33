use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;

use crate::config::DownloadConfig;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

/// Output template handed to the download tool: `<dir>/<index>.%(ext)s`.
pub fn output_template(index: &str, config: &DownloadConfig) -> PathBuf {
    config.download_dir.join(format!("{index}.%(ext)s"))
}

/// Arguments for a top-hit search, audio-only mp3 transcode at the
/// configured bitrate. Single quotes are removed from the query.
pub fn yt_dlp_args(query: &str, index: &str, config: &DownloadConfig) -> Vec<String> {
    let query = query.replace('\'', "");
    vec![
        "-x".to_string(),
        "--audio-format".to_string(),
        "mp3".to_string(),
        format!("ytsearch1:{query}"),
        "--audio-quality".to_string(),
        format!("{}K", config.quality_kbps),
        "-o".to_string(),
        output_template(index, config).to_string_lossy().to_string(),
    ]
}

/// Search for `query` and fetch the top match to `<download_dir>/<index>.mp3`.
///
/// Only a failure to start the tool is reported. A failed search or fetch
/// shows up as a missing file, not as an error.
pub fn download_mp3(
    query: &str,
    index: &str,
    config: &DownloadConfig,
) -> Result<(), DownloadError> {
    std::fs::create_dir_all(&config.download_dir)?;

    let args = yt_dlp_args(query, index, config);
    log::info!("Downloading {:?} as track {}", query, index);
    log::debug!("{} {}", config.tool, args.join(" "));

    let status = Command::new(&config.tool)
        .args(&args)
        .status()
        .map_err(|source| DownloadError::Launch {
            tool: config.tool.clone(),
            source,
        })?;

    if !status.success() {
        log::warn!("{} exited with {} for {:?}", config.tool, status, query);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let config = DownloadConfig::default();
        let args = yt_dlp_args("Don't Stop Me Now", "17", &config);
        assert_eq!(
            args,
            vec![
                "-x",
                "--audio-format",
                "mp3",
                "ytsearch1:Dont Stop Me Now",
                "--audio-quality",
                "128K",
                "-o",
                "data/audio/17.%(ext)s",
            ]
        );
    }

    #[test]
    fn test_custom_bitrate_and_dir() {
        let config = DownloadConfig {
            download_dir: PathBuf::from("/tmp/songs"),
            quality_kbps: 320,
            tool: "yt-dlp".into(),
        };
        let args = yt_dlp_args("x", "3", &config);
        assert!(args.contains(&"320K".to_string()));
        assert_eq!(args.last().unwrap(), "/tmp/songs/3.%(ext)s");
    }

    #[test]
    fn test_missing_tool_is_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = DownloadConfig {
            download_dir: dir.path().join("audio"),
            quality_kbps: 128,
            tool: "moodset-no-such-downloader".into(),
        };
        let err = download_mp3("anything", "1", &config).unwrap_err();
        assert!(matches!(err, DownloadError::Launch { .. }));
        // The target directory is still prepared
        assert!(dir.path().join("audio").is_dir());
    }
}
