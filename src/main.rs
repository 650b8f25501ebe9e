use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

mod cli;

use cli::{Cli, Command, EnvelopeArgs, SpectrumArgs};
use wavescope::audio::decode::{AudioFile, PcmDecoder, SymphoniaDecoder};
use wavescope::audio::envelope::AmplitudeEnvelope;
use wavescope::audio::playback::{LiveSource, PcmPlayer, PlaybackPosition};
use wavescope::audio::spectrum::AnalyserSettings;
use wavescope::audio::summarizer::WaveformSummarizer;
use wavescope::config::{self, Config};
use wavescope::render::canvas::Canvas;
use wavescope::render::spectrum::{FrameOutcome, SpectrumAnimation, SpectrumStyle, SpectrumVisualizer, FADE_COLOR};
use wavescope::render::waveform;

#[derive(Serialize)]
struct EnvelopeReport<'a> {
    file: &'a str,
    sample_rate: u32,
    duration: f64,
    #[serde(flatten)]
    envelope: &'a AmplitudeEnvelope,
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    // Config values apply only where the CLI is at its default
    let cfg = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    match &mut cli.command {
        Command::Envelope(args) => {
            if args.length == 200 { args.length = cfg.envelope.length; }
            run_envelope(args)
        }
        Command::Spectrum(args) => {
            if args.width == 800 { args.width = cfg.output.width; }
            if args.height == 400 { args.height = cfg.output.height; }
            if args.fps == 60 { args.fps = cfg.output.fps; }
            run_spectrum(args, cfg.spectrum.analyser, cfg.spectrum.style)
        }
    }
}

fn run_envelope(args: &EnvelopeArgs) -> Result<()> {
    let decoder: Arc<dyn PcmDecoder> = Arc::new(SymphoniaDecoder);

    // One slot per input, all decoding concurrently
    let mut slots = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        let file = AudioFile::read(input)
            .with_context(|| format!("Failed to read audio file: {}", input.display()))?;
        let mut slot = WaveformSummarizer::new(Arc::clone(&decoder), args.length);
        slot.load(file);
        slots.push(slot);
    }

    let timeout = Duration::from_secs(args.timeout);
    let mut analyses = Vec::with_capacity(slots.len());
    for (slot, input) in slots.iter_mut().zip(&args.inputs) {
        let analysis = slot
            .wait(timeout)
            .with_context(|| format!("Timed out analysing {}", input.display()))?;
        analyses.push(analysis.clone());
    }

    let reports: Vec<EnvelopeReport> = analyses
        .iter()
        .map(|a| EnvelopeReport {
            file: &a.file_name,
            sample_rate: a.sample_rate,
            duration: a.duration,
            envelope: &a.envelope,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&reports)?);

    if let (Some(path), Some(first)) = (&args.image, analyses.first()) {
        let position = PlaybackPosition::new(args.position, first.duration);
        let mut canvas = Canvas::new(args.width, args.height, waveform::STRIP_BACKGROUND);
        waveform::draw_waveform(&mut canvas, &first.envelope, &position);
        canvas
            .save_png(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Waveform strip written to {}", path.display());
    }

    Ok(())
}

fn run_spectrum(args: &SpectrumArgs, analyser: AnalyserSettings, style: SpectrumStyle) -> Result<()> {
    if args.fps == 0 {
        anyhow::bail!("--fps must be greater than zero");
    }
    analyser.validate().context("Invalid [spectrum] settings")?;

    let file = AudioFile::read(&args.input)
        .with_context(|| format!("Failed to read audio file: {}", args.input.display()))?;
    let audio = SymphoniaDecoder
        .decode(&file)
        .with_context(|| format!("Failed to decode {}", args.input.display()))?;

    log::info!("Input: {}", args.input.display());
    log::info!("Canvas: {}x{} @ {}fps", args.width, args.height, args.fps);

    let duration = audio.duration();
    let mut player = PcmPlayer::new();
    player.load(Arc::new(audio));

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    let mut canvas = Canvas::new(args.width, args.height, FADE_COLOR);
    let mut animation = SpectrumAnimation::new(SpectrumVisualizer::new(style), analyser);

    player.play();
    if !animation.start(&player)? {
        anyhow::bail!("Playback did not start for {}", args.input.display());
    }

    let expected = (duration * args.fps as f64).ceil() as u64;
    let total = args.max_frames.map_or(expected, |m| m.min(expected));
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    let frame_time = 1.0 / args.fps as f64;
    let mut frame_idx: u64 = 0;

    loop {
        if args.max_frames.is_some_and(|m| frame_idx >= m) {
            animation.stop();
            break;
        }
        match animation.on_frame(&player, &mut canvas) {
            FrameOutcome::Drawn => {}
            FrameOutcome::Halted | FrameOutcome::Idle => break,
        }

        if args.every > 0 && frame_idx % args.every == 0 {
            write_frame(&canvas, &args.output_dir, frame_idx)?;
        }

        frame_idx += 1;
        pb.set_position(frame_idx);
        player.advance(frame_time);
    }

    pb.finish_with_message("Rendering complete");

    let last = args.output_dir.join("last.png");
    canvas
        .save_png(&last)
        .with_context(|| format!("Failed to write {}", last.display()))?;

    log::info!(
        "Done! {} frames at {}Hz, final frame: {}",
        animation.frames_drawn(),
        player.sample_rate(),
        last.display()
    );
    Ok(())
}

fn write_frame(canvas: &Canvas, dir: &Path, frame_idx: u64) -> Result<()> {
    let path = dir.join(format!("frame_{:05}.png", frame_idx));
    canvas
        .save_png(&path)
        .with_context(|| format!("Failed to write {}", path.display()))
}
