use std::sync::Arc;

use serde::Serialize;

use super::decode::AudioData;

/// Current playback time and total duration, in seconds
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PlaybackPosition {
    pub current_time: f64,
    pub duration: f64,
}

impl PlaybackPosition {
    pub fn new(current_time: f64, duration: f64) -> Self {
        Self {
            current_time,
            duration,
        }
    }

    /// Played fraction in [0, 1]; zero while the duration is unknown
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Seek target for a fraction of the total length
    pub fn time_at(&self, fraction: f64) -> f64 {
        fraction.clamp(0.0, 1.0) * self.duration
    }
}

/// A source an analyser can tap while it plays.
pub trait LiveSource {
    fn is_playing(&self) -> bool;

    fn sample_rate(&self) -> u32;

    /// False until PCM is available to analyse
    fn is_loaded(&self) -> bool;

    /// Fill `out` with the samples that end at the playback position,
    /// zero-padding anything before the start of the stream.
    fn recent_samples(&self, out: &mut [f32]);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerStatus {
    Empty,
    Paused,
    Playing,
}

/// Plays decoded PCM against an externally advanced clock.
pub struct PcmPlayer {
    audio: Option<Arc<AudioData>>,
    cursor: usize,
    status: PlayerStatus,
    volume: f32,
}

impl Default for PcmPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PcmPlayer {
    pub fn new() -> Self {
        Self {
            audio: None,
            cursor: 0,
            status: PlayerStatus::Empty,
            volume: 1.0,
        }
    }

    /// Replace the loaded audio; playback restarts paused at zero.
    pub fn load(&mut self, audio: Arc<AudioData>) {
        self.audio = Some(audio);
        self.cursor = 0;
        self.status = PlayerStatus::Paused;
    }

    pub fn play(&mut self) {
        if self.audio.is_some() {
            self.status = PlayerStatus::Playing;
        }
    }

    pub fn pause(&mut self) {
        if self.status == PlayerStatus::Playing {
            self.status = PlayerStatus::Paused;
        }
    }

    pub fn toggle(&mut self) {
        match self.status {
            PlayerStatus::Playing => self.pause(),
            _ => self.play(),
        }
    }

    pub fn seek(&mut self, time: f64) {
        if let Some(audio) = &self.audio {
            let target = (time.max(0.0) * audio.sample_rate as f64) as usize;
            self.cursor = target.min(audio.samples.len());
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    /// Move the clock forward by `seconds` of playback. Reaching the end
    /// stops playback and rewinds to zero.
    pub fn advance(&mut self, seconds: f64) {
        if self.status != PlayerStatus::Playing {
            return;
        }
        let Some(audio) = &self.audio else {
            return;
        };
        let step = (seconds.max(0.0) * audio.sample_rate as f64).round() as usize;
        self.cursor = self.cursor.saturating_add(step);
        if self.cursor >= audio.samples.len() {
            log::debug!("Playback reached end of stream");
            self.cursor = 0;
            self.status = PlayerStatus::Paused;
        }
    }

    pub fn position(&self) -> PlaybackPosition {
        match &self.audio {
            Some(audio) if audio.sample_rate > 0 => PlaybackPosition {
                current_time: self.cursor as f64 / audio.sample_rate as f64,
                duration: audio.duration(),
            },
            _ => PlaybackPosition::default(),
        }
    }
}

impl LiveSource for PcmPlayer {
    fn is_playing(&self) -> bool {
        self.status == PlayerStatus::Playing
    }

    fn sample_rate(&self) -> u32 {
        self.audio.as_ref().map_or(0, |a| a.sample_rate)
    }

    fn is_loaded(&self) -> bool {
        self.audio
            .as_ref()
            .is_some_and(|a| a.sample_rate > 0 && !a.samples.is_empty())
    }

    fn recent_samples(&self, out: &mut [f32]) {
        out.fill(0.0);
        let Some(audio) = &self.audio else {
            return;
        };
        let end = self.cursor.min(audio.samples.len());
        let start = end.saturating_sub(out.len());
        let available = &audio.samples[start..end];
        let offset = out.len() - available.len();
        for (dst, src) in out[offset..].iter_mut().zip(available) {
            *dst = src * self.volume;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_with(samples: Vec<f32>, sample_rate: u32) -> PcmPlayer {
        let mut player = PcmPlayer::new();
        player.load(Arc::new(AudioData {
            samples,
            sample_rate,
            channels: 1,
        }));
        player
    }

    #[test]
    fn progress_handles_unknown_duration() {
        assert_eq!(PlaybackPosition::new(3.0, 0.0).progress(), 0.0);
        assert_eq!(PlaybackPosition::new(3.0, 12.0).progress(), 0.25);
        assert_eq!(PlaybackPosition::new(30.0, 12.0).progress(), 1.0);
    }

    #[test]
    fn time_at_maps_fraction_to_seconds() {
        let pos = PlaybackPosition::new(0.0, 80.0);
        assert_eq!(pos.time_at(0.5), 40.0);
        assert_eq!(pos.time_at(1.5), 80.0);
        assert_eq!(pos.time_at(-0.1), 0.0);
    }

    #[test]
    fn empty_player_is_not_loaded() {
        let mut player = PcmPlayer::new();
        player.play();
        assert!(!player.is_loaded());
        assert!(!player.is_playing());
        assert_eq!(player.position(), PlaybackPosition::default());
    }

    #[test]
    fn advance_moves_position_only_while_playing() {
        let mut player = player_with(vec![0.0; 1000], 100);
        player.advance(1.0);
        assert_eq!(player.position().current_time, 0.0);

        player.play();
        player.advance(2.5);
        assert_eq!(player.position().current_time, 2.5);
        assert_eq!(player.position().duration, 10.0);

        player.toggle();
        assert_eq!(player.status(), PlayerStatus::Paused);
    }

    #[test]
    fn reaching_the_end_stops_and_rewinds() {
        let mut player = player_with(vec![0.0; 100], 100);
        player.play();
        player.advance(0.6);
        player.advance(0.6);
        assert!(!player.is_playing());
        assert_eq!(player.position().current_time, 0.0);
    }

    #[test]
    fn seek_is_clamped() {
        let mut player = player_with(vec![0.0; 100], 10);
        player.seek(4.0);
        assert_eq!(player.position().current_time, 4.0);
        player.seek(99.0);
        assert_eq!(player.position().current_time, 10.0);
    }

    #[test]
    fn recent_samples_are_zero_padded() {
        let mut player = player_with((1..=10).map(|i| i as f32).collect(), 10);
        player.play();
        player.advance(0.3);

        let mut window = [9.0f32; 5];
        player.recent_samples(&mut window);
        assert_eq!(window, [0.0, 0.0, 1.0, 2.0, 3.0]);

        player.set_volume(0.5);
        player.advance(0.5);
        player.recent_samples(&mut window);
        assert_eq!(window, [2.0, 2.5, 3.0, 3.5, 4.0]);
    }
}
