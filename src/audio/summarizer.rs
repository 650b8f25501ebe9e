//! Asynchronous waveform summarization for one file slot
//!
//! Each [`WaveformSummarizer::load`] decodes on a worker thread and sends the
//! envelope back tagged with the load's generation. Only the result for the
//! most recent load is ever applied; anything older is dropped on arrival.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use super::decode::{AudioFile, PcmDecoder};
use super::envelope::{self, AmplitudeEnvelope, EnvelopeKind};

/// Decode and summarize on the calling thread. Never fails: a payload that
/// cannot be decoded yields a placeholder envelope.
pub fn analyze_file(decoder: &dyn PcmDecoder, file: &AudioFile, len: usize) -> Analysis {
    match decoder.decode(file) {
        Ok(audio) => {
            let envelope = envelope::summarize(&audio.samples, len);
            if envelope.kind() == EnvelopeKind::Silent {
                log::info!("{}: decoded silent audio, envelope is flat", file.name);
            } else {
                log::info!(
                    "{}: {} samples @ {}Hz summarized to {} bars",
                    file.name,
                    audio.samples.len(),
                    audio.sample_rate,
                    envelope.len()
                );
            }
            Analysis {
                file_name: file.name.clone(),
                sample_rate: audio.sample_rate,
                duration: audio.duration(),
                envelope,
            }
        }
        Err(err) => {
            log::warn!(
                "{}: decode failed ({}); substituting placeholder envelope",
                file.name,
                err
            );
            Analysis {
                file_name: file.name.clone(),
                sample_rate: 0,
                duration: 0.0,
                envelope: envelope::placeholder(len),
            }
        }
    }
}

/// Outcome of summarizing one file
#[derive(Clone, Debug)]
pub struct Analysis {
    pub file_name: String,
    /// Zero when the file could not be decoded
    pub sample_rate: u32,
    pub duration: f64,
    pub envelope: AmplitudeEnvelope,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummarizerState {
    Idle,
    Analyzing,
    Ready,
}

struct Completed {
    generation: u64,
    analysis: Analysis,
}

/// Owns the envelope for a single file slot.
pub struct WaveformSummarizer {
    decoder: Arc<dyn PcmDecoder>,
    len: usize,
    generation: u64,
    state: SummarizerState,
    current: Option<Analysis>,
    tx: Sender<Completed>,
    rx: Receiver<Completed>,
}

impl WaveformSummarizer {
    pub fn new(decoder: Arc<dyn PcmDecoder>, len: usize) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            decoder,
            len,
            generation: 0,
            state: SummarizerState::Idle,
            current: None,
            tx,
            rx,
        }
    }

    /// Start summarizing `file`, superseding any decode still in flight.
    ///
    /// The previous envelope stays visible until the new one is applied.
    pub fn load(&mut self, file: AudioFile) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        self.state = SummarizerState::Analyzing;

        let decoder = Arc::clone(&self.decoder);
        let tx = self.tx.clone();
        let len = self.len;

        log::debug!("{}: queued for analysis (generation {})", file.name, generation);

        let spawned = std::thread::Builder::new()
            .name("waveform-decode".into())
            .spawn(move || {
                let analysis = analyze_file(decoder.as_ref(), &file, len);
                // The summarizer may have been dropped meanwhile
                let _ = tx.send(Completed { generation, analysis });
            });

        if let Err(err) = spawned {
            log::error!("Failed to spawn decode thread: {}", err);
            self.current = Some(Analysis {
                file_name: String::new(),
                sample_rate: 0,
                duration: 0.0,
                envelope: envelope::placeholder(self.len),
            });
            self.state = SummarizerState::Ready;
        }

        generation
    }

    /// Apply any finished result without blocking. Returns true when the
    /// current generation's envelope was applied by this call.
    pub fn poll(&mut self) -> bool {
        let mut applied = false;
        loop {
            match self.rx.try_recv() {
                Ok(done) => applied |= self.apply(done),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    /// Block until the current generation resolves or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> Option<&Analysis> {
        let deadline = Instant::now() + timeout;
        while self.state == SummarizerState::Analyzing {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(done) => {
                    self.apply(done);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        if self.state == SummarizerState::Ready {
            self.current.as_ref()
        } else {
            None
        }
    }

    fn apply(&mut self, done: Completed) -> bool {
        if done.generation != self.generation {
            log::debug!(
                "{}: discarding stale result (generation {} < {})",
                done.analysis.file_name,
                done.generation,
                self.generation
            );
            return false;
        }
        self.current = Some(done.analysis);
        self.state = SummarizerState::Ready;
        true
    }

    pub fn state(&self) -> SummarizerState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.current.as_ref()
    }

    pub fn envelope(&self) -> Option<&AmplitudeEnvelope> {
        self.current.as_ref().map(|a| &a.envelope)
    }

    /// Forget the current envelope; in-flight results become stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.current = None;
        self.state = SummarizerState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::tests::wav_bytes;
    use crate::audio::decode::{AudioData, SymphoniaDecoder};
    use crate::error::{Result, ScopeError};

    /// Decodes names of the form "<delay_ms>-<level>", e.g. "150-0.5"
    struct ScriptedDecoder;

    impl PcmDecoder for ScriptedDecoder {
        fn decode(&self, file: &AudioFile) -> Result<AudioData> {
            let (delay, level) = file
                .name
                .split_once('-')
                .ok_or_else(|| ScopeError::InvalidSettings(file.name.clone()))?;
            let delay: u64 = delay.parse().unwrap();
            let level: f32 = level.parse().unwrap();
            std::thread::sleep(Duration::from_millis(delay));
            Ok(AudioData {
                samples: vec![level; 1000],
                sample_rate: 1000,
                channels: 1,
            })
        }
    }

    fn scripted(name: &str) -> AudioFile {
        AudioFile::new(name, Vec::<u8>::new())
    }

    #[test]
    fn starts_idle() {
        let s = WaveformSummarizer::new(Arc::new(ScriptedDecoder), 200);
        assert_eq!(s.state(), SummarizerState::Idle);
        assert!(s.envelope().is_none());
    }

    #[test]
    fn resolves_decoded_envelope() {
        let bytes = wav_bytes(8000, 1, 8000, |i, _| if i < 4000 { 0.2 } else { 0.8 });
        let mut s = WaveformSummarizer::new(Arc::new(SymphoniaDecoder), 100);
        s.load(AudioFile::new("steps.wav", bytes));
        assert_eq!(s.state(), SummarizerState::Analyzing);

        let analysis = s.wait(Duration::from_secs(10)).unwrap();
        assert_eq!(analysis.sample_rate, 8000);
        assert_eq!(analysis.envelope.kind(), EnvelopeKind::Decoded);
        assert_eq!(analysis.envelope.len(), 100);
        assert!((analysis.envelope.values()[99] - 1.0).abs() < 1e-6);
        assert!((analysis.envelope.values()[0] - 0.25).abs() < 1e-2);
        assert_eq!(s.state(), SummarizerState::Ready);
    }

    #[test]
    fn corrupt_payload_resolves_to_placeholder() {
        let mut s = WaveformSummarizer::new(Arc::new(SymphoniaDecoder), 200);
        s.load(AudioFile::new("corrupt.mp3", vec![0xffu8, 0x00, 0x42, 0x17]));
        let analysis = s.wait(Duration::from_secs(10)).unwrap();
        assert!(analysis.envelope.is_placeholder());
        assert_eq!(analysis.envelope.len(), 200);
        assert!(analysis
            .envelope
            .values()
            .iter()
            .all(|v| (envelope::PLACEHOLDER_MIN..envelope::PLACEHOLDER_MAX).contains(v)));
    }

    #[test]
    fn latest_load_wins() {
        let mut s = WaveformSummarizer::new(Arc::new(ScriptedDecoder), 10);
        // First file resolves well after the second one
        s.load(scripted("300-0.5"));
        let second = s.load(scripted("0-0.25"));
        assert_eq!(second, 2);

        let analysis = s.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(analysis.file_name, "0-0.25");

        // Let the stale decode land, then make sure it is ignored
        std::thread::sleep(Duration::from_millis(500));
        assert!(!s.poll());
        assert_eq!(s.analysis().unwrap().file_name, "0-0.25");
        assert_eq!(s.state(), SummarizerState::Ready);
    }

    #[test]
    fn earlier_result_arriving_first_is_not_applied() {
        let mut s = WaveformSummarizer::new(Arc::new(ScriptedDecoder), 10);
        s.load(scripted("0-0.5"));
        std::thread::sleep(Duration::from_millis(100));
        s.load(scripted("200-0.25"));

        // The first result is already queued but belongs to generation 1
        assert!(!s.poll());
        assert_eq!(s.state(), SummarizerState::Analyzing);
        assert!(s.envelope().is_none());

        let analysis = s.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(analysis.file_name, "200-0.25");
    }

    #[test]
    fn reset_discards_in_flight_work() {
        let mut s = WaveformSummarizer::new(Arc::new(ScriptedDecoder), 10);
        s.load(scripted("50-0.5"));
        s.reset();
        std::thread::sleep(Duration::from_millis(200));
        assert!(!s.poll());
        assert_eq!(s.state(), SummarizerState::Idle);
        assert!(s.wait(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn analyze_file_never_fails() {
        let analysis = analyze_file(&SymphoniaDecoder, &AudioFile::new("x.ogg", vec![1u8, 2, 3]), 32);
        assert!(analysis.envelope.is_placeholder());
        assert_eq!(analysis.envelope.len(), 32);
        assert_eq!(analysis.sample_rate, 0);
    }
}
