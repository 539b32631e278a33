use std::f32::consts::PI;

use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

/// Magnitude spectrogram of a centered, Hann-windowed STFT.
///
/// The signal is zero-padded by `n_fft / 2` on both sides so frame `t`
/// is centered on sample `t * hop_length`.
pub struct Stft {
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_bins: usize,
    /// Frame-major magnitudes: `n_frames * n_bins`.
    magnitudes: Vec<f32>,
}

impl Stft {
    pub fn compute(signal: &[f32], n_fft: usize, hop_length: usize) -> Self {
        let n_bins = n_fft / 2 + 1;
        let padded = pad_center(signal, n_fft, PadMode::Zero);
        let n_frames = frame_count(padded.len(), n_fft, hop_length);
        let window = hann_window(n_fft);

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n_fft);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
        let mut magnitudes = Vec::with_capacity(n_frames * n_bins);

        for t in 0..n_frames {
            let start = t * hop_length;
            let frame = &padded[start..start + n_fft];
            for (i, (&s, &w)) in frame.iter().zip(&window).enumerate() {
                buffer[i] = Complex::new(s * w, 0.0);
            }
            fft.process(&mut buffer);
            magnitudes.extend(buffer[..n_bins].iter().map(|c| c.norm()));
        }

        Self {
            n_fft,
            hop_length,
            n_bins,
            magnitudes,
        }
    }

    pub fn n_frames(&self) -> usize {
        self.magnitudes.len() / self.n_bins
    }

    pub fn frames(&self) -> impl Iterator<Item = &[f32]> {
        self.magnitudes.chunks_exact(self.n_bins)
    }

    /// Power spectrogram frames (`|X|^2`).
    pub fn power_frames(&self) -> impl Iterator<Item = Vec<f32>> + '_ {
        self.frames()
            .map(|frame| frame.iter().map(|m| m * m).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadMode {
    Zero,
    /// Repeat the first/last sample.
    Edge,
}

/// Pad `n_fft / 2` samples on both sides of the signal.
pub fn pad_center(signal: &[f32], frame_length: usize, mode: PadMode) -> Vec<f32> {
    let pad = frame_length / 2;
    let (head, tail) = match mode {
        PadMode::Zero => (0.0, 0.0),
        PadMode::Edge => (
            signal.first().copied().unwrap_or(0.0),
            signal.last().copied().unwrap_or(0.0),
        ),
    };

    let mut padded = Vec::with_capacity(signal.len() + 2 * pad);
    padded.resize(pad, head);
    padded.extend_from_slice(signal);
    padded.resize(signal.len() + 2 * pad, tail);
    padded
}

/// Number of full frames of `frame_length` samples at `hop_length` spacing.
pub fn frame_count(len: usize, frame_length: usize, hop_length: usize) -> usize {
    if len < frame_length {
        0
    } else {
        1 + (len - frame_length) / hop_length
    }
}

/// Periodic Hann window.
pub fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos()))
        .collect()
}

/// Center frequency of each FFT bin in Hz.
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f32> {
    (0..=n_fft / 2)
        .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
        .collect()
}

/// Convert power to decibels (ref 1.0), flooring at `top_db` below the peak.
pub fn power_to_db(values: &mut [Vec<f32>], top_db: f32) {
    let mut peak = f32::NEG_INFINITY;
    for row in values.iter_mut() {
        for v in row.iter_mut() {
            *v = 10.0 * v.max(1e-10).log10();
            peak = peak.max(*v);
        }
    }
    let floor = peak - top_db;
    for row in values.iter_mut() {
        for v in row.iter_mut() {
            *v = v.max(floor);
        }
    }
}

fn hz_to_mel(hz: f32) -> f32 {
    // Slaney scale: linear below 1 kHz, logarithmic above
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = 6.4f32.ln() / 27.0;
    if hz >= min_log_hz {
        min_log_mel + (hz / min_log_hz).ln() / logstep
    } else {
        hz / f_sp
    }
}

fn mel_to_hz(mel: f32) -> f32 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = 6.4f32.ln() / 27.0;
    if mel >= min_log_mel {
        min_log_hz * (logstep * (mel - min_log_mel)).exp()
    } else {
        f_sp * mel
    }
}

/// Slaney-normalized triangular mel filterbank, `n_mels` rows of `n_fft / 2 + 1` weights.
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<Vec<f32>> {
    let fft_freqs = fft_frequencies(sample_rate, n_fft);
    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(sample_rate as f32 / 2.0);

    let mel_f: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (left, center, right) = (mel_f[m], mel_f[m + 1], mel_f[m + 2]);
            let enorm = 2.0 / (right - left);
            fft_freqs
                .iter()
                .map(|&f| {
                    let lower = (f - left) / (center - left);
                    let upper = (right - f) / (right - center);
                    lower.min(upper).max(0.0) * enorm
                })
                .collect()
        })
        .collect()
}

/// Apply a filterbank to one spectrum frame.
pub fn apply_filterbank(filters: &[Vec<f32>], spectrum: &[f32]) -> Vec<f32> {
    filters
        .iter()
        .map(|row| row.iter().zip(spectrum).map(|(w, s)| w * s).sum())
        .collect()
}

/// Orthonormal DCT-II, keeping the first `n_out` coefficients.
pub fn dct_ortho(input: &[f32], n_out: usize) -> Vec<f32> {
    let n = input.len();
    if n == 0 {
        return vec![0.0; n_out];
    }
    let scale0 = (1.0 / n as f32).sqrt();
    let scale = (2.0 / n as f32).sqrt();

    (0..n_out)
        .map(|k| {
            let sum: f32 = input
                .iter()
                .enumerate()
                .map(|(i, &x)| x * (PI * k as f32 * (2 * i + 1) as f32 / (2 * n) as f32).cos())
                .sum();
            if k == 0 { sum * scale0 } else { sum * scale }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sr: u32, secs: f32) -> Vec<f32> {
        let n = (sr as f32 * secs) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    #[test]
    fn test_frame_count_centered() {
        let signal = vec![0.0; 22050];
        let stft = Stft::compute(&signal, 2048, 512);
        // librosa-compatible: 1 + len / hop frames when centered
        assert_eq!(stft.n_frames(), 1 + 22050 / 512);
        assert_eq!(stft.n_bins, 1025);
    }

    #[test]
    fn test_peak_bin_matches_tone() {
        let sr = 22050;
        let signal = sine(1000.0, sr, 1.0);
        let stft = Stft::compute(&signal, 2048, 512);
        let freqs = fft_frequencies(sr, 2048);
        let mid = stft.frames().nth(stft.n_frames() / 2).unwrap();
        let (peak_bin, _) = mid
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, &m)| if m > best.1 { (i, m) } else { best });
        assert!((freqs[peak_bin] - 1000.0).abs() < 11.0);
    }

    #[test]
    fn test_pad_modes() {
        let s = [1.0, 2.0, 3.0];
        assert_eq!(pad_center(&s, 4, PadMode::Zero), vec![0.0, 0.0, 1.0, 2.0, 3.0, 0.0, 0.0]);
        assert_eq!(pad_center(&s, 4, PadMode::Edge), vec![1.0, 1.0, 1.0, 2.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_hann_window_is_periodic() {
        let w = hann_window(4);
        assert!(w[0].abs() < 1e-6);
        assert!((w[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mel_scale_inverse() {
        for hz in [0.0, 440.0, 999.0, 1000.0, 4000.0, 11025.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 0.05, "{hz}");
        }
    }

    #[test]
    fn test_mel_filterbank_shape() {
        let fb = mel_filterbank(22050, 2048, 128);
        assert_eq!(fb.len(), 128);
        assert!(fb.iter().all(|row| row.len() == 1025));
        assert!(fb.iter().all(|row| row.iter().all(|&w| w >= 0.0)));
        // Every band picks up some energy
        assert!(fb.iter().all(|row| row.iter().any(|&w| w > 0.0)));
    }

    #[test]
    fn test_dct_of_constant() {
        let c = dct_ortho(&[2.0; 8], 3);
        assert!((c[0] - 2.0 * 8f32.sqrt()).abs() < 1e-4);
        assert!(c[1].abs() < 1e-4);
        assert!(c[2].abs() < 1e-4);
    }

    #[test]
    fn test_power_to_db_floor() {
        let mut v = vec![vec![1.0, 1e-12], vec![100.0, 0.0]];
        power_to_db(&mut v, 80.0);
        assert!((v[0][0] - 0.0).abs() < 1e-5);
        assert!((v[1][0] - 20.0).abs() < 1e-5);
        assert!((v[0][1] - -60.0).abs() < 1e-5);
        assert!((v[1][1] - -60.0).abs() < 1e-5);
    }
}
