use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::envelope::DEFAULT_ENVELOPE_LEN;
use crate::audio::spectrum::AnalyserSettings;
use crate::render::spectrum::SpectrumStyle;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub envelope: EnvelopeConfig,
    #[serde(default)]
    pub spectrum: SpectrumConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct EnvelopeConfig {
    #[serde(default = "default_length")]
    pub length: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpectrumConfig {
    #[serde(flatten)]
    pub analyser: AnalyserSettings,
    #[serde(flatten)]
    pub style: SpectrumStyle,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            length: default_length(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
        }
    }
}

fn default_length() -> usize { DEFAULT_ENVELOPE_LEN }
fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 400 }
fn default_fps() -> u32 { 60 }

/// Explicit path first, then `./wavescope.toml`, then the per-user config dirs
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("wavescope.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("wavescope").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("wavescope").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Option<Config> {
    match toml::from_str(content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Ignoring malformed config: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.envelope.length, 200);
        assert_eq!(cfg.spectrum.analyser, AnalyserSettings::default());
        assert_eq!(cfg.spectrum.style, SpectrumStyle::default());
        assert_eq!((cfg.output.width, cfg.output.height, cfg.output.fps), (800, 400, 60));
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = parse_config(
            r#"
            [envelope]
            length = 64

            [spectrum]
            fft_size = 512
            smoothing = 0.5
            fade_alpha = 1.0
            bar_gap = 0.0

            [output]
            fps = 30
            "#,
        )
        .unwrap();
        assert_eq!(cfg.envelope.length, 64);
        assert_eq!(cfg.spectrum.analyser.fft_size, 512);
        assert_eq!(cfg.spectrum.analyser.smoothing, 0.5);
        assert_eq!(cfg.spectrum.analyser.min_decibels, -100.0);
        assert_eq!(cfg.spectrum.style.fade_alpha, 1.0);
        assert_eq!(cfg.spectrum.style.bar_gap, 0.0);
        assert_eq!(cfg.spectrum.style.height_ratio, 0.8);
        assert_eq!(cfg.output.fps, 30);
        assert_eq!(cfg.output.width, 800);
    }

    #[test]
    fn malformed_config_is_rejected() {
        assert!(parse_config("[envelope]\nlength = \"lots\"").is_none());
    }

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("/tmp/custom.toml");
        assert_eq!(find_config(Some(path)), Some(path.to_path_buf()));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wavescope.toml");
        std::fs::write(&path, "[output]\nwidth = 1024\n").unwrap();
        assert_eq!(load_config(&path).unwrap().output.width, 1024);
        assert!(load_config(&dir.path().join("missing.toml")).is_none());
    }
}
