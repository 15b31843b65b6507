//! Energy check for recorded segments
//!
//! Telephony recorders happily deliver a WAV of line noise when the caller
//! says nothing. Such clips are rejected locally as `EmptyAudio`.

use std::io::Cursor;

use agrow_core::{AudioClip, AudioFormat};

use crate::PipelineError;

/// RMS level of a WAV clip on a 0.0..=1.0 scale.
///
/// Returns `None` when the bytes are not decodable PCM WAV.
pub fn rms_level(bytes: &[u8]) -> Option<f32> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
    let spec = reader.spec();

    let (sum, count) = match spec.sample_format {
        hound::SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f64;
            reader
                .into_samples::<i32>()
                .filter_map(Result::ok)
                .fold((0.0f64, 0usize), |(sum, n), s| {
                    let v = s as f64 / full_scale;
                    (sum + v * v, n + 1)
                })
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .filter_map(Result::ok)
            .fold((0.0f64, 0usize), |(sum, n), s| {
                let v = s as f64;
                (sum + v * v, n + 1)
            }),
    };

    if count == 0 {
        return Some(0.0);
    }
    Some((sum / count as f64).sqrt() as f32)
}

/// Fail with `EmptyAudio` if the clip cannot contain speech.
///
/// Zero-length clips and WAV clips below `floor` are empty. Formats that
/// cannot be decoded here are passed on for the recognizer to judge.
pub fn probe_speech(clip: &AudioClip, floor: f32) -> Result<(), PipelineError> {
    if clip.is_empty() {
        return Err(PipelineError::EmptyAudio);
    }

    if clip.format == AudioFormat::Wav {
        if let Some(level) = rms_level(&clip.bytes) {
            if level < floor {
                tracing::debug!(level, floor, "Recording below silence floor");
                return Err(PipelineError::EmptyAudio);
            }
        }
    }

    Ok(())
}
