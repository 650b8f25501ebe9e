//! Frequency-analysis tap
//!
//! Mirrors the browser analyser node: Blackman-windowed FFT over the most
//! recent `fft_size` samples, magnitudes scaled by `1 / fft_size`, temporally
//! smoothed, then mapped from decibels onto 0-255.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::Deserialize;

use super::playback::LiveSource;
use crate::error::{Result, ScopeError};

const BLACKMAN_ALPHA: f32 = 0.16;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct AnalyserSettings {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    /// Weight of the previous frame, 0.0-1.0
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,
}

impl Default for AnalyserSettings {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            smoothing: default_smoothing(),
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
        }
    }
}

fn default_fft_size() -> usize { 256 }
fn default_smoothing() -> f32 { 0.8 }
fn default_min_decibels() -> f32 { -100.0 }
fn default_max_decibels() -> f32 { -30.0 }

impl AnalyserSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(ScopeError::InvalidSettings(format!(
                "fft_size must be a power of two between 32 and 32768, got {}",
                self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(ScopeError::InvalidSettings(format!(
                "smoothing must be within 0.0-1.0, got {}",
                self.smoothing
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(ScopeError::InvalidSettings(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

/// Analysis tap attached to a playing source
pub struct AnalyserTap {
    settings: AnalyserSettings,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl AnalyserTap {
    /// Fails with [`ScopeError::ResourceUnavailable`] until the source has PCM.
    pub fn attach(source: &dyn LiveSource, settings: AnalyserSettings) -> Result<Self> {
        settings.validate()?;
        if !source.is_loaded() {
            return Err(ScopeError::ResourceUnavailable(
                "no audio loaded to analyse".into(),
            ));
        }

        let n = settings.fft_size;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);

        log::debug!(
            "Analyser attached: fft_size={}, {} bins @ {}Hz",
            n,
            settings.frequency_bin_count(),
            source.sample_rate()
        );

        Ok(Self {
            settings,
            fft,
            window: blackman_window(n),
            input: vec![0.0; n],
            buffer: vec![Complex::new(0.0, 0.0); n],
            smoothed: vec![0.0; n / 2],
        })
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.settings.frequency_bin_count()
    }

    pub fn settings(&self) -> &AnalyserSettings {
        &self.settings
    }

    /// Analyse the window ending at the source's playback position and write
    /// one byte per bin into `out` (extra entries are left untouched).
    pub fn byte_frequency_data(&mut self, source: &dyn LiveSource, out: &mut [u8]) {
        self.update(source);

        let min_db = self.settings.min_decibels;
        let scale = 255.0 / (self.settings.max_decibels - min_db);

        for (dst, &mag) in out.iter_mut().zip(&self.smoothed) {
            *dst = if mag > 0.0 {
                let db = 20.0 * mag.log10();
                (scale * (db - min_db)).floor().clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
    }

    /// Convenience wrapper returning a fresh frame
    pub fn frame(&mut self, source: &dyn LiveSource) -> Vec<u8> {
        let mut bins = vec![0u8; self.frequency_bin_count()];
        self.byte_frequency_data(source, &mut bins);
        bins
    }

    fn update(&mut self, source: &dyn LiveSource) {
        let n = self.settings.fft_size;
        source.recent_samples(&mut self.input);

        for ((slot, &s), &w) in self.buffer.iter_mut().zip(&self.input).zip(&self.window) {
            *slot = Complex::new(s * w, 0.0);
        }
        self.fft.process(&mut self.buffer);

        let tau = self.settings.smoothing;
        let norm = 1.0 / n as f32;
        for (prev, bin) in self.smoothed.iter_mut().zip(&self.buffer[..n / 2]) {
            let mag = bin.norm() * norm;
            let next = tau * *prev + (1.0 - tau) * mag;
            *prev = if next.is_finite() { next } else { 0.0 };
        }
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let a0 = (1.0 - BLACKMAN_ALPHA) / 2.0;
    let a1 = 0.5;
    let a2 = BLACKMAN_ALPHA / 2.0;
    let two_pi = 2.0 * std::f32::consts::PI;
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            a0 - a1 * (two_pi * x).cos() + a2 * (2.0 * two_pi * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::AudioData;
    use crate::audio::playback::PcmPlayer;

    fn playing(samples: Vec<f32>, sample_rate: u32, at: f64) -> PcmPlayer {
        let mut player = PcmPlayer::new();
        player.load(Arc::new(AudioData {
            samples,
            sample_rate,
            channels: 1,
        }));
        player.play();
        player.advance(at);
        player
    }

    #[test]
    fn default_window_gives_128_bins() {
        let settings = AnalyserSettings::default();
        assert_eq!(settings.fft_size, 256);
        assert_eq!(settings.frequency_bin_count(), 128);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_bad_settings() {
        let bad = [
            AnalyserSettings { fft_size: 300, ..Default::default() },
            AnalyserSettings { fft_size: 16, ..Default::default() },
            AnalyserSettings { smoothing: 1.5, ..Default::default() },
            AnalyserSettings { min_decibels: -20.0, ..Default::default() },
        ];
        for settings in bad {
            assert!(matches!(
                settings.validate(),
                Err(ScopeError::InvalidSettings(_))
            ));
        }
    }

    #[test]
    fn attach_requires_loaded_source() {
        let empty = PcmPlayer::new();
        let err = AnalyserTap::attach(&empty, AnalyserSettings::default()).err();
        assert!(matches!(err, Some(ScopeError::ResourceUnavailable(_))));
    }

    #[test]
    fn silence_reads_as_zero() {
        let player = playing(vec![0.0; 4096], 8000, 0.25);
        let mut tap = AnalyserTap::attach(&player, AnalyserSettings::default()).unwrap();
        let bins = tap.frame(&player);
        assert_eq!(bins.len(), 128);
        assert!(bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn tone_peaks_at_its_bin() {
        // 256-point window at 8 kHz: bin k sits at k * 31.25 Hz
        let sample_rate = 8000;
        let freq = 32.0 * 31.25;
        let samples: Vec<f32> = (0..8000)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.8)
            .collect();
        let player = playing(samples, sample_rate, 0.5);
        let settings = AnalyserSettings {
            smoothing: 0.0,
            ..Default::default()
        };
        let mut tap = AnalyserTap::attach(&player, settings).unwrap();
        let bins = tap.frame(&player);

        let peak = *bins.iter().max().unwrap();
        assert_eq!(bins[32], peak);
        assert!(bins[32] > 200);
        assert!(bins[5] < bins[32]);
        assert!(bins[100] < bins[32]);
    }

    #[test]
    fn smoothing_carries_previous_frames() {
        let sample_rate = 8000;
        let mut samples: Vec<f32> = (0..4000)
            .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sample_rate as f32).sin() * 0.1)
            .collect();
        samples.extend(std::iter::repeat(0.0).take(4000));

        let mut player = playing(samples, sample_rate, 0.25);
        let mut tap = AnalyserTap::attach(&player, AnalyserSettings::default()).unwrap();
        let loud = tap.frame(&player);

        // Fully inside the silent half, but smoothing keeps some energy
        player.advance(0.5);
        let decayed = tap.frame(&player);
        assert!(decayed[32] > 0);
        assert!(decayed[32] < loud[32]);
    }

    #[test]
    fn blackman_window_shape() {
        let w = blackman_window(256);
        assert!(w[0].abs() < 1e-6);
        assert!((w[128] - 1.0).abs() < 1e-5);
        assert!((w[64] - w[192]).abs() < 1e-5);
    }
}
