pub mod decode;
pub mod features;
pub mod spectral;
pub mod tempo;

use std::io::Write;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use crate::config::{FeatureConfig, InvalidFeatureConfig};
use crate::scanner::track_key;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Decode error for {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: decode::DecodeError,
    },
    #[error(transparent)]
    Config(#[from] InvalidFeatureConfig),
    #[error("Thread pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("Two files share the track key {0:?}")]
    DuplicateKey(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Scalar summary features for one audio file, keyed by its file stem.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub key: String,
    pub rms: f64,
    pub spectral_centroid: f64,
    pub spectral_bandwidth: f64,
    pub rolloff: f64,
    pub zero_crossing_rate: f64,
    pub tempo: f64,
    pub tonnetz: f64,
    /// Time-averaged MFCCs, exported as `mfcc_0 ..`.
    pub mfcc: Vec<f64>,
}

impl FeatureRecord {
    /// Scalar columns in export order, MFCCs last.
    pub fn values(&self) -> Vec<f64> {
        let mut values = vec![
            self.rms,
            self.spectral_centroid,
            self.spectral_bandwidth,
            self.rolloff,
            self.zero_crossing_rate,
            self.tempo,
            self.tonnetz,
        ];
        values.extend_from_slice(&self.mfcc);
        values
    }
}

const SCALAR_COLUMNS: [&str; 7] = [
    "rms",
    "spectral_centroid",
    "spectral_bandwidth",
    "rolloff",
    "zero_crossing_rate",
    "tempo",
    "tonnetz",
];

/// Feature records sorted ascending by key, each key once.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FeatureTable {
    rows: Vec<FeatureRecord>,
}

impl FeatureTable {
    /// Sort records by key and reject duplicate keys.
    pub fn from_records(mut rows: Vec<FeatureRecord>) -> Result<Self, AnalyzeError> {
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        if let Some(pair) = rows.windows(2).find(|w| w[0].key == w[1].key) {
            return Err(AnalyzeError::DuplicateKey(pair[0].key.clone()));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[FeatureRecord] {
        &self.rows
    }

    pub fn keys(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.key.as_str()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&FeatureRecord> {
        self.rows
            .binary_search_by(|r| r.key.as_str().cmp(key))
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column header: `audio_path`, the scalar features, then `mfcc_0 ..`.
    pub fn column_names(n_mfcc: usize) -> Vec<String> {
        let mut names = vec!["audio_path".to_string()];
        names.extend(SCALAR_COLUMNS.iter().map(|c| c.to_string()));
        names.extend((0..n_mfcc).map(|i| format!("mfcc_{i}")));
        names
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), AnalyzeError> {
        let n_mfcc = self.rows.first().map(|r| r.mfcc.len()).unwrap_or(0);
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(Self::column_names(n_mfcc))?;
        for row in &self.rows {
            let mut record = vec![row.key.clone()];
            record.extend(row.values().iter().map(|v| v.to_string()));
            wtr.write_record(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Decode one audio file and compute its feature record.
/// Decode failures are returned to the caller untouched.
pub fn extract_features(
    path: &Path,
    config: &FeatureConfig,
) -> Result<FeatureRecord, AnalyzeError> {
    config.validate()?;
    log::debug!(
        "Analyzing: {}",
        path.file_name().and_then(|f| f.to_str()).unwrap_or("?")
    );

    let audio = decode::load_audio(path, config.sample_rate).map_err(|source| {
        AnalyzeError::Decode {
            path: path.display().to_string(),
            source,
        }
    })?;

    Ok(features::extract(track_key(path), &audio, config)?)
}

/// Extract features for every path on a pool of `jobs` threads, with a
/// progress bar. The first failure aborts the batch.
pub fn analyze_paths(
    paths: &[PathBuf],
    jobs: usize,
    config: &FeatureConfig,
) -> Result<FeatureTable, AnalyzeError> {
    config.validate()?;
    log::info!("Analyzing {} audio files with {} workers", paths.len(), jobs);

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message("Processing audio files");

    let result = run_batch(paths, jobs, &pb, |path| extract_features(path, config));

    match &result {
        Ok(table) => pb.finish_with_message(format!("Done: {} files", table.len())),
        Err(_) => pb.abandon_with_message("Aborted"),
    }
    result
}

/// Map `extract` over `paths` in parallel and assemble a key-sorted table.
///
/// `pb` advances once per completed item, in completion order. The output
/// order depends only on the keys, never on scheduling.
pub fn run_batch<F>(
    paths: &[PathBuf],
    jobs: usize,
    pb: &ProgressBar,
    extract: F,
) -> Result<FeatureTable, AnalyzeError>
where
    F: Fn(&Path) -> Result<FeatureRecord, AnalyzeError> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()?;

    let records: Vec<FeatureRecord> = pool.install(|| {
        use rayon::prelude::*;
        paths
            .par_iter()
            .map(|path| {
                let record = extract(path);
                pb.inc(1);
                record
            })
            .collect::<Result<Vec<_>, _>>()
    })?;

    FeatureTable::from_records(records)
}
