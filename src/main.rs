use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Result;
use clap::Parser;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};

use nemu::{
    emu::{default_image, emulator::Emulator, ram::Ram},
    sdb::{LineSource, Prompt, RunMode, Script, Session, SessionConfig},
};

/// The NEMU monitor.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run the guest to completion without the interactive monitor.
    #[arg(short, long)]
    batch: bool,
    /// Write log output to FILE instead of the terminal.
    #[arg(short, long, value_name = "FILE")]
    log: Option<PathBuf>,
    /// Read monitor commands from FILE instead of the terminal.
    #[arg(short, long, value_name = "FILE", conflicts_with = "batch")]
    script: Option<PathBuf>,
    /// Raw binary image to load at the reset vector.
    image: Option<PathBuf>,
}

fn init_logger(log_file: Option<&Path>) -> Result<()> {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    match log_file {
        Some(path) => WriteLogger::init(level, Config::default(), File::create(path)?)?,
        None => TermLogger::init(
            level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )?,
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logger(args.log.as_deref())?;

    let mut emu = Emulator::new(Ram::default());
    match &args.image {
        Some(path) => {
            let size = emu.load_image(&fs::read(path)?)?;
            log::info!("The image is {}, size = {}", path.display(), size);
        }
        None => {
            emu.load_image(&default_image())?;
            log::info!("No image is given. Use the default built-in image.");
        }
    }

    let mode = if args.batch {
        RunMode::Batch
    } else {
        RunMode::Interactive
    };
    let mut source: Box<dyn LineSource> = match (mode, &args.script) {
        (RunMode::Batch, _) => Box::new(Script::new(io::empty())),
        (RunMode::Interactive, Some(path)) => Box::new(Script::open(path)?),
        (RunMode::Interactive, None) => Box::new(Prompt::new("(nemu) ")?),
    };

    let mut session = Session::new(SessionConfig { mode }, emu, io::stdout());
    session.run(source.as_mut())?;

    if session.machine().is_exit_status_bad() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
