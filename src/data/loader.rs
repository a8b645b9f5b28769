// ============================================================
// Layer 4 - WAV Loader / Writer
// ============================================================
// Reads and writes waveforms using the hound crate.
//
// Two read paths:
//
//   read_mono_wav()   strict: the file MUST be single-channel.
//                     Used for dataset windows, where a stereo
//                     file means the dataset was built wrong.
//
//   load_for_inference()  lenient: multi-channel input is
//                     averaged down to mono and resampled to
//                     the model's rate (48 kHz by default),
//                     so any recording can be rendered.
//
// Integer PCM is normalised to [-1, 1] by dividing by
// 2^(bits-1); float PCM is taken as-is.
//
// Reference: hound crate documentation
//            Rust Book §9 (Error Handling)

use std::path::Path;

use crate::domain::error::{EngineError, EngineResult};

/// Sample rate every model is trained and rendered at
pub const MODEL_SAMPLE_RATE: u32 = 48_000;

/// Decoded audio with its original format details
#[derive(Debug, Clone)]
pub struct Waveform {
    /// Interleaved samples normalised to [-1, 1]
    pub samples:     Vec<f32>,
    pub channels:    u16,
    pub sample_rate: u32,
}

impl Waveform {
    /// Average all channels into one.
    pub fn into_mono(self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples;
        }
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

/// Decode any PCM WAV file.
pub fn read_wav(path: &Path) -> EngineResult<Waveform> {
    // A missing file is an I/O failure; a present-but-garbled one is an audio failure.
    if !path.is_file() {
        return Err(EngineError::io(path, "file not found"));
    }

    let reader = hound::WavReader::open(path).map_err(|e| match e {
        hound::Error::IoError(io) => EngineError::io(path, io),
        other                     => EngineError::audio(path, other),
    })?;

    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| EngineError::audio(path, e))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| EngineError::audio(path, e))?
        }
    };

    Ok(Waveform { samples, channels: spec.channels, sample_rate: spec.sample_rate })
}

/// Decode a WAV file that must already be mono.
pub fn read_mono_wav(path: &Path) -> EngineResult<Vec<f32>> {
    let wav = read_wav(path)?;
    if wav.channels != 1 {
        return Err(EngineError::Shape(format!(
            "'{}' has {} channels, dataset windows must be mono",
            path.display(),
            wav.channels
        )));
    }
    Ok(wav.samples)
}

/// Load any WAV file as mono audio at `target_rate`.
pub fn load_for_inference(path: &Path, target_rate: u32) -> EngineResult<Vec<f32>> {
    let wav = read_wav(path)?;
    let source_rate = wav.sample_rate;
    let mono = wav.into_mono();

    if source_rate != target_rate {
        tracing::info!(
            "Resampling '{}' from {} Hz to {} Hz",
            path.display(),
            source_rate,
            target_rate
        );
    }
    Ok(resample_linear(&mono, source_rate, target_rate))
}

/// Linear-interpolation resampler. Good enough to line a recording up
/// with the model's rate; not meant for mastering-grade conversion.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 {
        return samples.to_vec();
    }

    let ratio   = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round().max(1.0) as usize;
    let last    = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos  = i as f64 * ratio;
            let left = (pos.floor() as usize).min(last);
            let right = (left + 1).min(last);
            let frac = (pos - left as f64) as f32;
            samples[left] * (1.0 - frac) + samples[right] * frac
        })
        .collect()
}

/// Write mono 32-bit float PCM.
pub fn write_mono_wav(path: &Path, samples: &[f32], sample_rate: u32) -> EngineResult<()> {
    let spec = hound::WavSpec {
        channels:        1,
        sample_rate,
        bits_per_sample: 32,
        sample_format:   hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| EngineError::io(path, e))?;
    for &s in samples {
        writer.write_sample(s).map_err(|e| EngineError::io(path, e))?;
    }
    writer.finalize().map_err(|e| EngineError::io(path, e))?;

    tracing::debug!("Wrote {} samples to '{}'", samples.len(), path.display());
    Ok(())
}
