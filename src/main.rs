use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use moodset::analyzer::FeatureTable;
use moodset::emotion::{map_emotion, map_emotion_cal500};

#[derive(Parser)]
#[command(name = "moodset", version, about = "Music-emotion dataset preparation")]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a song and download the top match as <index>.mp3
    Download {
        /// Search query (song name, artist)
        query: String,

        /// Track index used as the output file name
        index: String,
    },

    /// List the .mp3 files of a directory in analysis order
    Paths {
        /// Audio directory
        dir: PathBuf,
    },

    /// Extract acoustic features for every .mp3 in a directory
    Features {
        /// Audio directory
        dir: PathBuf,

        /// Number of parallel workers (0 = config value)
        #[arg(short = 'j', long, default_value = "0")]
        jobs: usize,

        /// Write the feature table here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load valence/arousal annotations and label each track
    Annotations {
        /// Annotation CSV (defaults to config dataset)
        path: Option<PathBuf>,

        /// Write the labelled table here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load a directory of <id>.lrc lyric files
    Lyrics {
        /// Lyrics directory
        dir: PathBuf,
    },

    /// Map a tag or a valence/arousal point to an emotion
    Emotion {
        #[command(subcommand)]
        input: EmotionInput,
    },

    /// Join annotations, lyrics and (optionally) audio features by track id
    Dataset {
        /// Annotation CSV (defaults to config dataset)
        #[arg(long)]
        annotations: Option<PathBuf>,

        /// Lyrics directory
        #[arg(long)]
        lyrics: PathBuf,

        /// Audio directory to extract features from
        #[arg(long)]
        audio: Option<PathBuf>,

        /// Number of parallel workers (0 = config value)
        #[arg(short = 'j', long, default_value = "0")]
        jobs: usize,

        /// Write the joined table here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum EmotionInput {
    /// CAL500 emotion tag, e.g. Emotion-Laid-back_/_Mellow
    Tag { tag: String },

    /// Valence and arousal in [0, 1]
    Va {
        #[arg(allow_negative_numbers = true)]
        valence: f64,
        #[arg(allow_negative_numbers = true)]
        arousal: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = moodset::config::AppConfig::load();

    match cli.command {
        Commands::Download { query, index } => {
            moodset::downloader::download_mp3(&query, &index, &config.download)
                .context("Download failed")?;
            let expected = config.download.download_dir.join(format!("{index}.mp3"));
            if expected.exists() {
                println!("Downloaded {}", expected.display());
            } else {
                println!(
                    "No file at {}: the search or fetch failed",
                    expected.display()
                );
            }
        }

        Commands::Paths { dir } => {
            let paths = moodset::scanner::get_audio_paths(&dir)
                .with_context(|| format!("Failed to list {}", dir.display()))?;
            for path in &paths {
                println!("{}", path.display());
            }
        }

        Commands::Features { dir, jobs, output } => {
            let table = extract_dir(&dir, jobs, &config)?;
            table
                .write_csv(open_output(output.as_deref())?)
                .context("Failed to write feature table")?;
            eprintln!("Feature extraction complete: {} tracks", table.len());
        }

        Commands::Annotations { path, output } => {
            let path = path.unwrap_or_else(|| config.dataset.clone());
            let table = moodset::annotations::load_annotations_from_path(&path)
                .with_context(|| format!("Failed to load annotations from {}", path.display()))?;
            table
                .write_csv(open_output(output.as_deref())?)
                .context("Failed to write annotation table")?;
        }

        Commands::Lyrics { dir } => {
            let table = moodset::lyrics::load_lyrics_from_dir(&dir)
                .with_context(|| format!("Failed to load lyrics from {}", dir.display()))?;
            println!("{:>8}  {:>6}  {:>7}", "Id", "Lines", "Chars");
            println!("{}", "-".repeat(25));
            for (id, text) in table.iter() {
                println!(
                    "{:>8}  {:>6}  {:>7}",
                    id,
                    text.lines().count(),
                    text.chars().count()
                );
            }
            println!();
            println!("{} lyric files", table.len());
        }

        Commands::Emotion { input } => match input {
            EmotionInput::Tag { tag } => match map_emotion_cal500(&tag) {
                Some(emotion) => println!("{emotion}"),
                None => println!("(unmapped)"),
            },
            EmotionInput::Va { valence, arousal } => match map_emotion(valence, arousal) {
                Ok(emotion) => println!("{emotion}"),
                Err(e) => println!("{e}"),
            },
        },

        Commands::Dataset {
            annotations,
            lyrics,
            audio,
            jobs,
            output,
        } => {
            let annotations_path = annotations.unwrap_or_else(|| config.dataset.clone());
            let annotations = moodset::annotations::load_annotations_from_path(&annotations_path)
                .with_context(|| {
                    format!("Failed to load annotations from {}", annotations_path.display())
                })?;
            let lyrics = moodset::lyrics::load_lyrics_from_dir(&lyrics)
                .with_context(|| format!("Failed to load lyrics from {}", lyrics.display()))?;
            let features = match audio {
                Some(dir) => extract_dir(&dir, jobs, &config)?,
                None => FeatureTable::default(),
            };

            let rows = moodset::dataset::join(&annotations, &lyrics, &features);
            moodset::dataset::write_dataset_csv(
                &rows,
                config.features.n_mfcc,
                open_output(output.as_deref())?,
            )
            .context("Failed to write dataset")?;
            eprintln!("Dataset complete: {} rows", rows.len());
        }
    }

    Ok(())
}

/// Collect and analyze every .mp3 in `dir`.
fn extract_dir(
    dir: &Path,
    jobs: usize,
    config: &moodset::config::AppConfig,
) -> Result<FeatureTable> {
    let workers = if jobs > 0 { jobs } else { config.resolve_workers() };
    let paths = moodset::scanner::get_audio_paths(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?;
    moodset::analyzer::analyze_paths(&paths, workers, &config.features)
        .context("Feature extraction failed")
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file =
                File::create(p).with_context(|| format!("Failed to create {}", p.display()))?;
            Ok(Box::new(io::BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}
