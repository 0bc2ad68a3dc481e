//! Audio decoding to mono PCM

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use truthlens_core::{Error, Result};

/// Decoded mono samples and their sample rate
#[derive(Debug, Clone)]
pub struct Pcm {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode the first audio track of a container into mono `f32` samples
///
/// `extension` is only a probing hint; the container is sniffed from its
/// contents.
pub fn decode(bytes: Vec<u8>, extension: Option<&str>) -> Result<Pcm> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::preprocess(format!("Unsupported audio format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::preprocess("No audio track found"))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::preprocess(format!("Unsupported audio codec: {}", e)))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(Error::preprocess(format!("Failed to read audio: {}", e)));
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!("Skipping undecodable audio packet: {}", e);
                continue;
            }
            Err(e) => {
                return Err(Error::preprocess(format!("Failed to decode audio: {}", e)));
            }
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        let channels = spec.channels.count().max(1);

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        samples.extend(downmix(buf.samples(), channels));
    }

    let sample_rate =
        sample_rate.ok_or_else(|| Error::preprocess("Audio stream has no sample rate"))?;

    Ok(Pcm {
        samples,
        sample_rate,
    })
}

/// Average interleaved channels into one
pub fn downmix(interleaved: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
}

/// Linear-interpolation resampling
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let out_len = ((samples.len() as f64) / ratio).round() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            samples[idx] + (samples[next] - samples[idx]) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::fixtures::wav_bytes;

    #[test]
    fn test_decode_stereo_wav_to_mono() {
        // Left at half scale, right silent
        let samples: Vec<i16> = (0..800).flat_map(|_| [16384i16, 0]).collect();
        let pcm = decode(wav_bytes(&samples, 2, 8000), Some("wav")).unwrap();

        assert_eq!(pcm.sample_rate, 8000);
        assert_eq!(pcm.samples.len(), 800);
        assert!(pcm.samples.iter().all(|s| (*s - 0.25).abs() < 1e-3));
    }

    #[test]
    fn test_decode_ignores_misleading_hint() {
        let pcm = decode(wav_bytes(&[0; 100], 1, 16000), Some("mp3")).unwrap();
        assert_eq!(pcm.samples.len(), 100);
    }

    #[test]
    fn test_garbage_is_preprocess_error() {
        let err = decode(b"definitely not audio".to_vec(), None).unwrap_err();
        assert_eq!(err.kind(), "preprocess");
    }

    #[test]
    fn test_resample_lengths() {
        let input = vec![0.5f32; 44_100];
        let out = resample(&input, 44_100, 16_000);
        assert_eq!(out.len(), 16_000);
        assert!(out.iter().all(|s| (*s - 0.5).abs() < 1e-6));

        assert_eq!(resample(&input[..10], 8_000, 16_000).len(), 20);
        assert!(resample(&[], 8_000, 16_000).is_empty());
    }

    #[test]
    fn test_resample_interpolates() {
        let out = resample(&[0.0, 1.0], 1, 2);
        assert_eq!(out, vec![0.0, 0.5, 1.0, 1.0]);
    }
}
