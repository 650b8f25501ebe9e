use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wavescope", about = "Waveform overviews and spectrum animations for audio files")]
pub struct Cli {
    /// Config file (defaults to ./wavescope.toml or the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarize files into fixed-length amplitude envelopes (JSON on stdout)
    Envelope(EnvelopeArgs),
    /// Play a file on an offline clock and render the spectrum animation
    Spectrum(SpectrumArgs),
}

#[derive(Args, Debug)]
pub struct EnvelopeArgs {
    /// Input audio files (WAV, MP3, FLAC, OGG, AAC), one slot each
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Number of bars per envelope
    #[arg(short, long, default_value_t = 200)]
    pub length: usize,

    /// Render the first envelope as a waveform strip PNG
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Playback position (seconds) for the strip's progress indicator
    #[arg(long, default_value_t = 0.0)]
    pub position: f64,

    /// Strip width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Strip height in pixels
    #[arg(long, default_value_t = 80)]
    pub height: u32,

    /// Seconds to wait for each decode before giving up
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,
}

#[derive(Args, Debug)]
pub struct SpectrumArgs {
    /// Input audio file
    pub input: PathBuf,

    /// Directory for rendered PNG frames
    #[arg(short, long, default_value = "frames")]
    pub output_dir: PathBuf,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Canvas height in pixels
    #[arg(long, default_value_t = 400)]
    pub height: u32,

    /// Display refresh rate driving the animation
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Write every Nth frame (0 writes only the last frame)
    #[arg(long, default_value_t = 0)]
    pub every: u64,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,
}
