// Entry point for the Minesweeper TUI application
// Parses arguments, sets up logging, loads config and records, and launches the main UI

use clap::Parser;
use std::error::Error;
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;

// Module declarations
mod xtm_board;   // Cell grid, mine placement and reveal rules
mod xtm_config;  // Preferences and file locations
mod xtm_error;   // Error types
mod xtm_game;    // Difficulty presets, events and the game controller
mod xtm_hint;    // Single-use safe-cell hint
mod xtm_records; // Best times per difficulty
mod xtm_session; // One game: board, clock, hint
mod xtm_timer;   // Pausable game clock
mod xtm_ui;      // Terminal UI rendering and event handling

use xtm_config::{Overrides, Paths, load_or_create_config};
use xtm_game::{Difficulty, FirstClick, Game};
use xtm_records::BestTimes;
use xtm_ui::run as run_ui;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Start on this difficulty instead of the saved one
    #[arg(short, long, value_enum)]
    difficulty: Option<Difficulty>,

    /// How the first reveal is protected from mines
    #[arg(long, value_enum)]
    first_click: Option<FirstClick>,

    /// Force a seed instead of random
    #[arg(short, long)]
    seed: Option<u64>,

    /// Directory for the config, records and log files
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Write a log file (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// The terminal belongs to the UI, so logs go to a file and only on request
fn init_logging(paths: &Paths, verbose: u8) -> Result<(), Box<dyn Error>> {
    let level = match verbose {
        0 => return Ok(()),
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    fs::create_dir_all(paths.dir())?;
    let file = File::create(paths.log())?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let paths = match &args.config_dir {
        Some(dir) => Paths::new(dir.clone()),
        None => Paths::resolve()?,
    };
    init_logging(&paths, args.verbose)?;
    tracing::debug!("{:?}", args);

    // Load or create user configuration; command line overrides last for this run only
    let cfg = load_or_create_config(&paths.config());
    let overrides = Overrides {
        difficulty: args.difficulty,
        first_click: args.first_click,
    };

    let records = BestTimes::load(&paths.records());
    let mut game = Game::new(cfg, overrides, records, Some(paths), args.seed)?;

    // Launch the main UI loop
    run_ui(&mut game)
}
