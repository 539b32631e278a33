//! Global tempo estimation from an onset-strength envelope.
//!
//! The envelope is the half-wave rectified first difference of the mel dB
//! spectrogram, averaged across bands. Its autocorrelation over up to
//! [`AC_SIZE_SECS`] of lag is weighted by a log-normal prior on tempo and
//! the best lag is converted to BPM.

/// Centre of the tempo prior.
pub const START_BPM: f64 = 120.0;

/// Width of the tempo prior in octaves.
const STD_BPM: f64 = 1.0;

/// Tempi above this are never reported.
const MAX_TEMPO: f64 = 320.0;

/// Longest lag considered, in seconds.
const AC_SIZE_SECS: f64 = 8.0;

/// Spectral flux onset envelope, one value per frame. Frame 0 is 0.
pub fn onset_strength(mel_db: &[Vec<f32>]) -> Vec<f32> {
    let mut env = Vec::with_capacity(mel_db.len());
    if mel_db.is_empty() {
        return env;
    }
    env.push(0.0);
    for pair in mel_db.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let bands = cur.len().max(1) as f32;
        let flux: f32 = cur
            .iter()
            .zip(prev)
            .map(|(c, p)| (c - p).max(0.0))
            .sum();
        env.push(flux / bands);
    }
    env
}

/// Estimate tempo in BPM from an onset envelope sampled every `hop_length`
/// samples. Envelopes too short to autocorrelate report [`START_BPM`].
pub fn estimate_tempo(onset_env: &[f32], sample_rate: u32, hop_length: usize) -> f64 {
    let frame_rate = sample_rate as f64 / hop_length as f64;
    let max_lag = ((AC_SIZE_SECS * frame_rate).round() as usize)
        .min(onset_env.len().saturating_sub(1));
    if max_lag < 1 {
        return START_BPM;
    }

    let ac = autocorrelate(onset_env, max_lag);
    let norm = if ac[0] > 0.0 { ac[0] } else { 1.0 };

    let mut best: Option<(f64, f64)> = None;
    for (lag, &value) in ac.iter().enumerate().skip(1) {
        let bpm = 60.0 * frame_rate / lag as f64;
        if bpm > MAX_TEMPO {
            continue;
        }
        let score = (1e6 * value / norm).ln_1p() + log_prior(bpm);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((bpm, score));
        }
    }

    best.map(|(bpm, _)| bpm).unwrap_or(START_BPM)
}

fn log_prior(bpm: f64) -> f64 {
    -0.5 * ((bpm.log2() - START_BPM.log2()) / STD_BPM).powi(2)
}

/// Raw autocorrelation for lags `0..=max_lag`.
fn autocorrelate(x: &[f32], max_lag: usize) -> Vec<f64> {
    (0..=max_lag)
        .map(|lag| {
            x.iter()
                .zip(&x[lag..])
                .map(|(a, b)| *a as f64 * *b as f64)
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 22050;
    const HOP: usize = 512;

    fn frame_rate() -> f64 {
        SR as f64 / HOP as f64
    }

    /// Unit impulses every `period` frames.
    fn click_envelope(period: usize, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| if i % period == 0 { 1.0 } else { 0.0 })
            .collect()
    }

    #[test]
    fn test_onset_strength_rectifies() {
        let mel = vec![vec![0.0, 0.0], vec![10.0, -10.0], vec![0.0, 0.0]];
        let env = onset_strength(&mel);
        assert_eq!(env, vec![0.0, 5.0, 5.0]);
    }

    #[test]
    fn test_click_track_tempo() {
        // 22 frames per beat at ~43 frames/s is ~117 BPM
        let env = click_envelope(22, 1300);
        let bpm = estimate_tempo(&env, SR, HOP);
        let expected = 60.0 * frame_rate() / 22.0;
        assert!((bpm - expected).abs() < 1e-9, "bpm = {bpm}");
    }

    #[test]
    fn test_slow_click_track_prefers_beat_over_half_tempo() {
        let env = click_envelope(29, 1300);
        let bpm = estimate_tempo(&env, SR, HOP);
        let expected = 60.0 * frame_rate() / 29.0;
        assert!((bpm - expected).abs() < 1e-9, "bpm = {bpm}");
    }

    #[test]
    fn test_flat_envelope_falls_back_to_prior() {
        let env = vec![0.0f32; 500];
        let bpm = estimate_tempo(&env, SR, HOP);
        assert!((bpm - START_BPM).abs() < 4.0, "bpm = {bpm}");
    }

    #[test]
    fn test_short_envelope() {
        assert_eq!(estimate_tempo(&[], SR, HOP), START_BPM);
        assert_eq!(estimate_tempo(&[1.0], SR, HOP), START_BPM);
    }
}
