use rand::Rng;
use rayon::prelude::*;
use serde::Serialize;

/// Default number of bars in a waveform overview
pub const DEFAULT_ENVELOPE_LEN: usize = 200;

/// Placeholder magnitudes are drawn from `PLACEHOLDER_MIN..PLACEHOLDER_MAX`
pub const PLACEHOLDER_MIN: f32 = 0.3;
pub const PLACEHOLDER_MAX: f32 = 0.8;

/// Where an envelope's values came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// Reduced from decoded PCM
    Decoded,
    /// Decoded, but every block was zero
    Silent,
    /// Fabricated after a decode failure
    Placeholder,
}

/// Fixed-length normalized amplitude summary of one file
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AmplitudeEnvelope {
    kind: EnvelopeKind,
    values: Vec<f32>,
}

impl AmplitudeEnvelope {
    pub fn kind(&self) -> EnvelopeKind {
        self.kind
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == EnvelopeKind::Placeholder
    }
}

/// Reduce PCM to `len` block means of |sample|, normalized to the loudest block.
///
/// Blocks are `samples.len() / len` long; samples past the last full block are
/// ignored. When every block is zero (including inputs shorter than `len`)
/// the result is all zeros tagged [`EnvelopeKind::Silent`].
pub fn summarize(samples: &[f32], len: usize) -> AmplitudeEnvelope {
    let block_size = if len == 0 { 0 } else { samples.len() / len };

    let raw: Vec<f32> = if block_size == 0 {
        vec![0.0; len]
    } else {
        samples[..block_size * len]
            .par_chunks(block_size)
            .map(|block| {
                let sum: f64 = block.iter().map(|s| s.abs() as f64).sum();
                (sum / block_size as f64) as f32
            })
            .collect()
    };

    let max = raw
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0f32, f32::max);

    if max <= 0.0 {
        return AmplitudeEnvelope {
            kind: EnvelopeKind::Silent,
            values: vec![0.0; len],
        };
    }

    let values = raw
        .into_iter()
        .map(|v| if v.is_finite() { (v / max).min(1.0) } else { 0.0 })
        .collect();

    AmplitudeEnvelope {
        kind: EnvelopeKind::Decoded,
        values,
    }
}

/// Plausible-looking stand-in used when a file cannot be decoded
pub fn placeholder(len: usize) -> AmplitudeEnvelope {
    placeholder_with(&mut rand::rng(), len)
}

pub fn placeholder_with<R: Rng>(rng: &mut R, len: usize) -> AmplitudeEnvelope {
    let values = (0..len)
        .map(|_| rng.random_range(PLACEHOLDER_MIN..PLACEHOLDER_MAX))
        .collect();
    AmplitudeEnvelope {
        kind: EnvelopeKind::Placeholder,
        values,
    }
}
