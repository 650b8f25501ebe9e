pub mod decode;
pub mod envelope;
pub mod playback;
pub mod spectrum;
pub mod summarizer;
