use super::FeatureRecord;
use super::decode::AudioData;
use super::spectral::{
    PadMode, Stft, apply_filterbank, dct_ortho, fft_frequencies, frame_count, mel_filterbank,
    pad_center, power_to_db,
};
use super::tempo;
use crate::config::{FeatureConfig, InvalidFeatureConfig};

/// Fraction of spectral energy below the roll-off frequency.
const ROLL_PERCENT: f32 = 0.85;

/// Dynamic range kept by the dB conversion.
const TOP_DB: f32 = 80.0;

/// Lowest frequency folded into chroma (C1).
const CHROMA_FMIN: f32 = 32.703;

/// Compute the full feature vector for one decoded track.
pub fn extract(
    key: String,
    audio: &AudioData,
    config: &FeatureConfig,
) -> Result<FeatureRecord, InvalidFeatureConfig> {
    config.validate()?;
    let y = &audio.samples;
    let sr = audio.sample_rate;

    let stft = Stft::compute(y, config.n_fft, config.hop_length);
    let freqs = fft_frequencies(sr, config.n_fft);

    let centroids = spectral_centroid(&stft, &freqs);
    let bandwidths = spectral_bandwidth(&stft, &freqs, &centroids);

    let power: Vec<Vec<f32>> = stft.power_frames().collect();

    let filters = mel_filterbank(sr, config.n_fft, config.n_mels);
    let mut mel_db: Vec<Vec<f32>> = power
        .iter()
        .map(|frame| apply_filterbank(&filters, frame))
        .collect();
    power_to_db(&mut mel_db, TOP_DB);

    let onset_env = tempo::onset_strength(&mel_db);
    let bpm = tempo::estimate_tempo(&onset_env, sr, config.hop_length);

    let pitch_classes = chroma(&power, &freqs);

    Ok(FeatureRecord {
        key,
        rms: mean(&rms(y, config.n_fft, config.hop_length)),
        spectral_centroid: mean(&centroids),
        spectral_bandwidth: mean(&bandwidths),
        rolloff: mean(&spectral_rolloff(&stft, &freqs, ROLL_PERCENT)),
        zero_crossing_rate: mean(&zero_crossing_rate(y, config.n_fft, config.hop_length)),
        tempo: bpm,
        tonnetz: tonnetz_mean(&pitch_classes),
        mfcc: mfcc_means(&mel_db, config.n_mfcc),
    })
}

/// Arithmetic mean in f64; empty input gives 0.
pub fn mean(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

/// Root-mean-square energy of each centered frame.
pub fn rms(y: &[f32], frame_length: usize, hop_length: usize) -> Vec<f32> {
    let padded = pad_center(y, frame_length, PadMode::Zero);
    let n_frames = frame_count(padded.len(), frame_length, hop_length);
    (0..n_frames)
        .map(|t| {
            let frame = &padded[t * hop_length..t * hop_length + frame_length];
            let energy: f32 = frame.iter().map(|s| s * s).sum();
            (energy / frame_length as f32).sqrt()
        })
        .collect()
}

/// Fraction of samples in each edge-padded frame where the sign flips.
pub fn zero_crossing_rate(y: &[f32], frame_length: usize, hop_length: usize) -> Vec<f32> {
    let padded = pad_center(y, frame_length, PadMode::Edge);
    let n_frames = frame_count(padded.len(), frame_length, hop_length);
    (0..n_frames)
        .map(|t| {
            let frame = &padded[t * hop_length..t * hop_length + frame_length];
            let crossings = frame
                .windows(2)
                .filter(|w| w[0].is_sign_negative() != w[1].is_sign_negative())
                .count();
            crossings as f32 / frame_length as f32
        })
        .collect()
}

pub fn spectral_centroid(stft: &Stft, freqs: &[f32]) -> Vec<f32> {
    stft.frames()
        .map(|frame| {
            let total: f32 = frame.iter().sum();
            if total <= f32::EPSILON {
                return 0.0;
            }
            frame.iter().zip(freqs).map(|(m, f)| m * f).sum::<f32>() / total
        })
        .collect()
}

/// Second-order spectral bandwidth around each frame's centroid.
pub fn spectral_bandwidth(stft: &Stft, freqs: &[f32], centroids: &[f32]) -> Vec<f32> {
    stft.frames()
        .zip(centroids)
        .map(|(frame, &centroid)| {
            let total: f32 = frame.iter().sum();
            if total <= f32::EPSILON {
                return 0.0;
            }
            let spread: f32 = frame
                .iter()
                .zip(freqs)
                .map(|(m, f)| (m / total) * (f - centroid).powi(2))
                .sum();
            spread.sqrt()
        })
        .collect()
}

pub fn spectral_rolloff(stft: &Stft, freqs: &[f32], roll_percent: f32) -> Vec<f32> {
    stft.frames()
        .map(|frame| {
            let total: f32 = frame.iter().sum();
            let threshold = roll_percent * total;
            let mut cumulative = 0.0;
            for (m, f) in frame.iter().zip(freqs) {
                cumulative += m;
                if cumulative >= threshold {
                    return *f;
                }
            }
            freqs.last().copied().unwrap_or(0.0)
        })
        .collect()
}

/// Time-averaged MFCCs from a mel dB spectrogram (frames × bands).
pub fn mfcc_means(mel_db: &[Vec<f32>], n_mfcc: usize) -> Vec<f64> {
    let mut sums = vec![0.0f64; n_mfcc];
    for frame in mel_db {
        for (sum, c) in sums.iter_mut().zip(dct_ortho(frame, n_mfcc)) {
            *sum += c as f64;
        }
    }
    let n = mel_db.len().max(1) as f64;
    sums.into_iter().map(|s| s / n).collect()
}

/// Fold power spectrum bins into 12 pitch classes (C = 0), max-normalized per frame.
pub fn chroma(power: &[Vec<f32>], freqs: &[f32]) -> Vec<[f32; 12]> {
    let pitch_class: Vec<Option<usize>> = freqs
        .iter()
        .map(|&hz| {
            if hz < CHROMA_FMIN {
                return None;
            }
            let midi = 69.0 + 12.0 * (hz / 440.0).log2();
            Some((midi.round() as i64).rem_euclid(12) as usize)
        })
        .collect();

    power
        .iter()
        .map(|frame| {
            let mut bins = [0.0f32; 12];
            for (p, pc) in frame.iter().zip(&pitch_class) {
                if let Some(pc) = pc {
                    bins[*pc] += p;
                }
            }
            let peak = bins.iter().copied().fold(0.0f32, f32::max);
            if peak > 0.0 {
                for b in bins.iter_mut() {
                    *b /= peak;
                }
            }
            bins
        })
        .collect()
}

/// Project chroma onto the 6-D tonal centroid space (fifths, minor thirds,
/// major thirds as sin/cos pairs).
pub fn tonnetz(chroma: &[[f32; 12]]) -> Vec<[f32; 6]> {
    let scale = [7.0 / 6.0, 7.0 / 6.0, 3.0 / 2.0, 3.0 / 2.0, 2.0 / 3.0, 2.0 / 3.0];
    let radius = [1.0, 1.0, 1.0, 1.0, 0.5, 0.5];

    let mut phi = [[0.0f32; 12]; 6];
    for (d, row) in phi.iter_mut().enumerate() {
        for (p, w) in row.iter_mut().enumerate() {
            let mut v = scale[d] * p as f32;
            if d % 2 == 0 {
                v -= 0.5;
            }
            *w = radius[d] * (std::f32::consts::PI * v).cos();
        }
    }

    chroma
        .iter()
        .map(|frame| {
            let l1: f32 = frame.iter().map(|c| c.abs()).sum();
            let mut out = [0.0f32; 6];
            if l1 <= f32::EPSILON {
                return out;
            }
            for (d, row) in phi.iter().enumerate() {
                out[d] = row.iter().zip(frame).map(|(w, c)| w * c / l1).sum();
            }
            out
        })
        .collect()
}

/// Tonnetz collapsed to a single number: the mean over all six dimensions
/// and all frames.
pub fn tonnetz_mean(chroma: &[[f32; 12]]) -> f64 {
    let flat: Vec<f32> = tonnetz(chroma).into_iter().flatten().collect();
    mean(&flat)
}
