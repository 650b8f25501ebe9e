use super::canvas::{Canvas, Rgb};
use crate::audio::envelope::AmplitudeEnvelope;
use crate::audio::playback::PlaybackPosition;

/// Reference strip height the bar sizes are expressed against
const REFERENCE_HEIGHT: f32 = 80.0;
/// Full-scale bar height within the reference strip
const MAX_BAR: f32 = 60.0;
/// Bars never shrink below this, so silence still reads as a line
const MIN_BAR: f32 = 4.0;
const BAR_GAP: f32 = 2.0;

pub const PLAYED_COLOR: Rgb = [168, 85, 247];
pub const UNPLAYED_COLOR: Rgb = [70, 70, 84];
pub const INDICATOR_COLOR: Rgb = [250, 250, 250];
pub const STRIP_BACKGROUND: Rgb = [24, 24, 32];

/// One bar in a laid-out waveform strip
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveformBar {
    pub x: f32,
    pub width: f32,
    pub height: f32,
    pub played: bool,
}

/// Lay the envelope out across `width` pixels of a `height`-pixel strip.
pub fn layout_bars(
    envelope: &AmplitudeEnvelope,
    position: &PlaybackPosition,
    width: u32,
    height: u32,
) -> Vec<WaveformBar> {
    let count = envelope.len();
    if count == 0 || width == 0 {
        return Vec::new();
    }

    let scale = height as f32 / REFERENCE_HEIGHT;
    let progress = position.progress();
    let slot = width as f32 / count as f32;
    let bar_width = (slot - BAR_GAP).max(1.0);

    envelope
        .values()
        .iter()
        .enumerate()
        .map(|(i, &value)| WaveformBar {
            x: i as f32 * slot,
            width: bar_width,
            height: (value * MAX_BAR).max(MIN_BAR) * scale,
            played: (i as f64 / count as f64) < progress,
        })
        .collect()
}

/// Seek target for a click at `x` on a strip `width` pixels wide.
///
/// `None` while the duration is unknown.
pub fn seek_time_for_click(x: f32, width: u32, position: &PlaybackPosition) -> Option<f64> {
    if position.duration <= 0.0 || width == 0 {
        return None;
    }
    Some(position.time_at(x as f64 / width as f64))
}

/// Render the strip: vertically centred bars plus a progress indicator line.
pub fn draw_waveform(canvas: &mut Canvas, envelope: &AmplitudeEnvelope, position: &PlaybackPosition) {
    canvas.clear(STRIP_BACKGROUND);

    let height = canvas.height() as f32;
    for bar in layout_bars(envelope, position, canvas.width(), canvas.height()) {
        let color = if bar.played { PLAYED_COLOR } else { UNPLAYED_COLOR };
        let top = (height - bar.height) / 2.0;
        canvas.fill_rect(bar.x, top, bar.width, bar.height, color, 1.0);
    }

    let x = position.progress() as f32 * canvas.width() as f32;
    canvas.fill_rect(x - 1.0, 0.0, 2.0, height, INDICATOR_COLOR, 1.0);
}
