use serde::Deserialize;

use super::canvas::{hsl, Canvas, Rgb};
use crate::audio::playback::LiveSource;
use crate::audio::spectrum::{AnalyserSettings, AnalyserTap};
use crate::error::Result;

/// Trail colour laid over the previous frame, rgba(10, 10, 15, fade_alpha)
pub const FADE_COLOR: Rgb = [10, 10, 15];

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct SpectrumStyle {
    /// Opacity of the trail fill; 1.0 clears every frame
    #[serde(default = "default_fade_alpha")]
    pub fade_alpha: f32,
    /// Fraction of the canvas height a full-scale bin reaches
    #[serde(default = "default_height_ratio")]
    pub height_ratio: f32,
    /// Bar width as a multiple of width / bin count
    #[serde(default = "default_bar_width_scale")]
    pub bar_width_scale: f32,
    #[serde(default = "default_bar_gap")]
    pub bar_gap: f32,
    #[serde(skip, default = "default_bottom_color")]
    pub bottom_color: Rgb,
    #[serde(skip, default = "default_top_color")]
    pub top_color: Rgb,
}

impl Default for SpectrumStyle {
    fn default() -> Self {
        Self {
            fade_alpha: default_fade_alpha(),
            height_ratio: default_height_ratio(),
            bar_width_scale: default_bar_width_scale(),
            bar_gap: default_bar_gap(),
            bottom_color: default_bottom_color(),
            top_color: default_top_color(),
        }
    }
}

fn default_fade_alpha() -> f32 { 0.2 }
fn default_height_ratio() -> f32 { 0.8 }
fn default_bar_width_scale() -> f32 { 2.5 }
fn default_bar_gap() -> f32 { 1.0 }
fn default_bottom_color() -> Rgb { hsl(280.0, 1.0, 0.7) }
fn default_top_color() -> Rgb { hsl(180.0, 1.0, 0.5) }

/// Draws one byte spectrum frame as gradient bars over a fading trail.
#[derive(Clone, Debug, Default)]
pub struct SpectrumVisualizer {
    style: SpectrumStyle,
}

impl SpectrumVisualizer {
    pub fn new(style: SpectrumStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &SpectrumStyle {
        &self.style
    }

    pub fn bar_width(&self, canvas_width: u32, bin_count: usize) -> f32 {
        if bin_count == 0 {
            return 0.0;
        }
        canvas_width as f32 / bin_count as f32 * self.style.bar_width_scale
    }

    pub fn bar_height(&self, canvas_height: u32, magnitude: u8) -> f32 {
        magnitude as f32 / 255.0 * canvas_height as f32 * self.style.height_ratio
    }

    pub fn draw_frame(&self, canvas: &mut Canvas, bins: &[u8]) {
        let width = canvas.width() as f32;
        let height = canvas.height() as f32;

        canvas.fill_rect(0.0, 0.0, width, height, FADE_COLOR, self.style.fade_alpha);

        let bar_width = self.bar_width(canvas.width(), bins.len());
        let mut x = 0.0f32;
        for &magnitude in bins {
            if x >= width {
                break;
            }
            let bar_height = self.bar_height(canvas.height(), magnitude);
            canvas.fill_rect_vertical_gradient(
                x,
                height - bar_height,
                bar_width,
                bar_height,
                self.style.bottom_color,
                self.style.top_color,
            );
            x += bar_width + self.style.bar_gap;
        }
    }
}

/// What a single display-refresh callback did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn,
    /// The source stopped; the loop is cancelled and nothing was drawn
    Halted,
    /// Not animating; nothing to do
    Idle,
}

/// Runs the per-frame redraw loop for a live source.
///
/// The host calls [`on_frame`](Self::on_frame) once per refresh. The loop only
/// runs while the source reports playing; once it stops, the analyser tap is
/// released and later callbacks are no-ops until [`start`](Self::start) is
/// called again.
pub struct SpectrumAnimation {
    visualizer: SpectrumVisualizer,
    settings: AnalyserSettings,
    tap: Option<AnalyserTap>,
    bins: Vec<u8>,
    frames_drawn: u64,
}

impl SpectrumAnimation {
    pub fn new(visualizer: SpectrumVisualizer, settings: AnalyserSettings) -> Self {
        Self {
            visualizer,
            settings,
            tap: None,
            bins: Vec::new(),
            frames_drawn: 0,
        }
    }

    /// Attach to `source` and begin animating if it is playing.
    ///
    /// Returns whether the loop is now running.
    pub fn start(&mut self, source: &dyn LiveSource) -> Result<bool> {
        if self.tap.is_some() {
            return Ok(true);
        }
        if !source.is_playing() {
            return Ok(false);
        }
        let tap = AnalyserTap::attach(source, self.settings)?;
        self.bins = vec![0; tap.frequency_bin_count()];
        self.tap = Some(tap);
        log::debug!("Spectrum animation started");
        Ok(true)
    }

    pub fn on_frame(&mut self, source: &dyn LiveSource, canvas: &mut Canvas) -> FrameOutcome {
        let Some(tap) = self.tap.as_mut() else {
            return FrameOutcome::Idle;
        };
        if !source.is_playing() {
            self.stop();
            return FrameOutcome::Halted;
        }
        tap.byte_frequency_data(source, &mut self.bins);
        self.visualizer.draw_frame(canvas, &self.bins);
        self.frames_drawn += 1;
        FrameOutcome::Drawn
    }

    pub fn stop(&mut self) {
        if self.tap.take().is_some() {
            log::debug!("Spectrum animation stopped after {} frames", self.frames_drawn);
        }
    }

    pub fn is_animating(&self) -> bool {
        self.tap.is_some()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Most recent spectrum frame
    pub fn bins(&self) -> &[u8] {
        &self.bins
    }
}

impl Drop for SpectrumAnimation {
    fn drop(&mut self) {
        self.stop();
    }
}
