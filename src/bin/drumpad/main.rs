//! drumpad - play a sound catalog from the keyboard
//!
//! Log output shares the terminal with the display, so only errors reach stderr by default.
//! `--log-file` moves the full log (filter `RUST_LOG`, default `info`) into a file.

use std::error::Error;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use drumpad::audio_engine::AudioEngine;
use drumpad::audio_engine::audio_stream::{CpalContextFactory, setup_logger, setup_logger_to};
use drumpad::catalog::SoundCatalog;
use drumpad::config::EngineConfig;
use drumpad::event_loop::EventLoop;
use drumpad::fetch::FsFetcher;
use env_logger::Target;

mod terminal;

#[derive(Parser)]
#[command(name = "drumpad")]
#[command(about = "Keyboard drum pad with a live spectrum display", long_about = None)]
struct Cli {
    /// Sound catalog (JSON with a `soundFiles` list); sound paths are relative to it
    #[arg(short, long, default_value = "sounds.json")]
    catalog: PathBuf,

    /// Maximum drawn frames per second
    #[arg(long, default_value = "120")]
    max_fps: f32,

    /// Per-frame retention of bar heights, 0.0-1.0
    #[arg(long, default_value = "0.9")]
    decay: f32,

    /// Canvas width in pixels
    #[arg(long, default_value = "1024")]
    width: usize,

    /// Canvas height in pixels
    #[arg(long, default_value = "256")]
    height: usize,

    /// Write the log here instead of stderr (level from RUST_LOG, default info)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            min_draw_interval: EngineConfig::draw_interval_for_rate(self.max_fps),
            decay_factor: self.decay.clamp(0.0, 1.0),
            canvas_width: self.width,
            canvas_height: self.height,
            ..EngineConfig::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&cli) {
        eprintln!("drumpad: cannot open log file: {err}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("drumpad: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Keeps stderr quiet while it shares the terminal with the display.
fn init_logging(cli: &Cli) -> io::Result<()> {
    match &cli.log_file {
        Some(path) => setup_logger_to(Target::Pipe(Box::new(File::create(path)?)), "info"),
        None if io::stderr().is_terminal() => setup_logger_to(Target::Stderr, "error"),
        None => setup_logger(),
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let catalog = SoundCatalog::load(&cli.catalog)?;

    let config = cli.engine_config();
    let key_repeat_window = config.key_repeat_window;
    let mut engine = AudioEngine::new(CpalContextFactory, config);
    engine.context()?;

    let report = engine.preload_all(&catalog, &FsFetcher::for_catalog(&cli.catalog))?;
    if !report.is_complete() {
        log::warn!(
            "{} of {} sounds failed to load",
            report.failed.len(),
            catalog.sound_files.len()
        );
    }

    let session = terminal::TerminalSession::enter()?;
    let presenter = terminal::TerminalPresenter::new(io::stdout());
    let mut event_loop = EventLoop::new(engine, &catalog, presenter);
    terminal::spawn_input_thread(
        event_loop.pad_input(),
        event_loop.sender(),
        terminal::KeyTranslator::new(session.reports_key_releases(), key_repeat_window),
    );

    event_loop.run();
    drop(session);
    Ok(())
}
