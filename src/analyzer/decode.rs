use std::fs::File;
use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("symphonia decode error: {0}")]
    Symphonia(#[from] SymphoniaError),
    #[error("No decodable audio track")]
    NoTrack,
    #[error("Resample error: {0}")]
    Resample(String),
    #[error("File contains no audio samples")]
    Empty,
}

/// Mono waveform at a known sample rate.
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode a file to mono (channel average) and resample to `target_sr`.
pub fn load_audio(path: &Path, target_sr: u32) -> Result<AudioData, DecodeError> {
    let (samples, source_sr) = decode_mono(path)?;
    if samples.is_empty() || source_sr == 0 {
        return Err(DecodeError::Empty);
    }

    let samples = if source_sr != target_sr {
        log::debug!(
            "Resampling {} from {} Hz to {} Hz",
            path.display(),
            source_sr,
            target_sr
        );
        resample(samples, source_sr, target_sr)?
    } else {
        samples
    };

    Ok(AudioData {
        samples,
        sample_rate: target_sr,
    })
}

/// Decode every packet of the first audio track, averaging channels.
fn decode_mono(path: &Path) -> Result<(Vec<f32>, u32), DecodeError> {
    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;
    let track_id = track.id;
    let mut source_sr = track.codec_params.sample_rate.unwrap_or(0);

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            // Chained streams are not followed; keep what was decoded so far.
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                source_sr = spec.rate;
                let channels = spec.channels.count().max(1);

                let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                let buf = sample_buf.samples();

                if channels == 1 {
                    samples.extend_from_slice(buf);
                } else {
                    samples.extend(
                        buf.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                    );
                }
            }
            Err(SymphoniaError::DecodeError(e)) => {
                log::debug!("Skipping corrupt packet in {}: {}", path.display(), e);
            }
            Err(SymphoniaError::IoError(_)) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok((samples, source_sr))
}

/// Resample in one chunk, then flush the filter tail and drop its delay so
/// output sample `i` lines up with input time `i / target_sr`.
fn resample(samples: Vec<f32>, source_sr: u32, target_sr: u32) -> Result<Vec<f32>, DecodeError> {
    let ratio = target_sr as f64 / source_sr as f64;
    let expected_len = (samples.len() as f64 * ratio).ceil() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, samples.len(), 1)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;
    let delay = resampler.output_delay();

    let waves_in = vec![samples];
    let mut output = resampler
        .process(&waves_in, None)
        .map_err(|e| DecodeError::Resample(e.to_string()))?
        .pop()
        .unwrap_or_default();

    while output.len() < delay + expected_len {
        let tail = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?
            .pop()
            .unwrap_or_default();
        if tail.is_empty() {
            break;
        }
        output.extend(tail);
    }

    let mut aligned = output.split_off(delay.min(output.len()));
    aligned.truncate(expected_len);
    Ok(aligned)
}
