//! Waveform summarization and live spectrum visualization for audio files.

pub mod audio;
pub mod config;
pub mod error;
pub mod render;

pub use error::{Result, ScopeError};
