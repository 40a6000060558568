//! WAV file loading into [`AudioBuffer`].
//!
//! Compressed formats are out of scope for the pipeline; the CLI accepts PCM
//! WAV in integer or float encodings and hands everything else back with an
//! input-format error.

use super::AudioBuffer;
use crate::{Result, error::HanToneError};
use hound::{SampleFormat, WavReader};
use log::debug;
use std::path::Path;

/// Load a WAV file as an [`AudioBuffer`], preserving channel layout and
/// sample rate. Integer PCM is scaled to `[-1, 1]`.
///
/// # Errors
///
/// Returns [`HanToneError::InputFormat`] when the file is not a readable
/// PCM WAV.
pub fn load_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path)
        .map_err(|e| HanToneError::input_format(format!("cannot open {}: {e}", path.display())))?;
    let spec = reader.spec();
    debug!(
        "Loading WAV {}: {} Hz, {} ch, {:?} {} bit",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.sample_format,
        spec.bits_per_sample
    );

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| HanToneError::input_format(format!("corrupt float samples: {e}")))?,
        (SampleFormat::Int, bits) if bits <= 32 => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| HanToneError::input_format(format!("corrupt integer samples: {e}")))?
        }
        (format, bits) => {
            return Err(HanToneError::input_format(format!(
                "unsupported WAV encoding: {format:?} {bits} bit"
            )));
        }
    };

    AudioBuffer::new(samples, spec.sample_rate, spec.channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use tempfile::tempdir;

    fn write_test_wav(path: &Path, spec: WavSpec, seconds: f32) {
        let mut writer = WavWriter::create(path, spec).unwrap();
        let frames = (spec.sample_rate as f32 * seconds) as usize;
        for i in 0..frames {
            let value = (2.0 * std::f32::consts::PI * 220.0 * i as f32
                / spec.sample_rate as f32)
                .sin()
                * 0.5;
            for _ in 0..spec.channels {
                match spec.sample_format {
                    SampleFormat::Float => writer.write_sample(value).unwrap(),
                    SampleFormat::Int => writer
                        .write_sample((value * i16::MAX as f32) as i16)
                        .unwrap(),
                }
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn loads_float_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        write_test_wav(&path, spec, 0.5);

        let buffer = load_wav(&path).unwrap();
        assert_eq!(buffer.sample_rate(), 16000);
        assert_eq!(buffer.channels(), 1);
        assert!((buffer.duration_seconds() - 0.5).abs() < 0.01);
    }

    #[test]
    fn loads_int16_stereo_wav_scaled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_test_wav(&path, spec, 0.2);

        let buffer = load_wav(&path).unwrap();
        assert_eq!(buffer.channels(), 2);
        let peak = buffer.samples().iter().fold(0f32, |m, &s| m.max(s.abs()));
        assert!(peak <= 1.0, "integer samples must be normalized, got {peak}");
        assert!(peak > 0.4);
    }

    #[test]
    fn missing_file_is_input_format_error() {
        let err = load_wav(Path::new("/nonexistent/audio.wav")).unwrap_err();
        assert!(matches!(err, HanToneError::InputFormat { .. }));
    }
}
