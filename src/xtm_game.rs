// Game controller: difficulty presets, input events and the running session
// Replaces the session on difficulty change or restart and keeps best times up to date

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::xtm_board::{Board, BoardState, Mark, Pos, RevealResult};
use crate::xtm_config::{Config, Overrides, Paths, save_config};
use crate::xtm_error::{BoardError, Result};
use crate::xtm_records::BestTimes;
use crate::xtm_session::Session;
use crate::xtm_timer::TimerState;

/// Difficulty presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Difficulty {
    Easy,   // 9x9, 10 mines
    Normal, // 16x16, 40 mines
    Hard,   // 30x16, 99 mines
}

impl Serialize for Difficulty {
    /// Serialize difficulty as a human-readable string (not an index)
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    /// Deserialize difficulty from its name; also used for record table keys
    fn deserialize<D>(deserializer: D) -> std::result::Result<Difficulty, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Difficulty::ALL
            .into_iter()
            .find(|d| d.name() == s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown difficulty {s:?}")))
    }
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    /// Board dimensions (width, height, mine count)
    pub fn params(&self) -> (usize, usize, usize) {
        match self {
            Difficulty::Easy => (9, 9, 10),
            Difficulty::Normal => (16, 16, 40),
            Difficulty::Hard => (30, 16, 99),
        }
    }

    /// Stable identifier used in the config and records files
    pub fn name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }
}

/// How much of the board around the first reveal is kept free of mines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FirstClick {
    Random,   // Mines placed up front; the first click can lose
    SafeCell, // The clicked cell is never a mine
    #[default]
    SafeArea, // Neither the clicked cell nor its neighbours
}

impl FirstClick {
    /// Cells to keep mine-free when the first reveal lands on `pos`
    pub fn excluded(self, board: &Board, pos: Pos) -> Vec<Pos> {
        match self {
            FirstClick::Random => vec![],
            FirstClick::SafeCell => vec![pos],
            FirstClick::SafeArea => board.area(pos),
        }
    }
}

/// Discrete input forwarded by the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Reveal(Pos),
    CycleMark(Pos),
    Chord(Pos),
    SetDifficulty(Difficulty),
    RequestHint,
    TogglePause,
    Restart,
}

/// What an accepted event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Revealed(RevealResult),
    Marked(Mark),
    Hint(Pos),
    Clock(TimerState),
    NewGame(Difficulty),
}

pub struct Game {
    saved: Config,        // What goes back to disk
    cfg: Config,          // Saved settings plus this run's overrides
    records: BestTimes,
    paths: Option<Paths>, // None keeps everything in memory
    session: Session,
    rng: StdRng,          // Seeds each session's own generator
    new_record: bool,     // Last win beat the stored best
}

impl Game {
    pub fn new(
        saved: Config,
        overrides: Overrides,
        records: BestTimes,
        paths: Option<Paths>,
        seed: Option<u64>,
    ) -> std::result::Result<Game, BoardError> {
        let cfg = overrides.apply(&saved);
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let session = Session::new(cfg.difficulty, cfg.first_click, StdRng::seed_from_u64(rng.r#gen()))?;
        Ok(Game {
            saved,
            cfg,
            records,
            paths,
            session,
            rng,
            new_record: false,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Settings in effect for this run
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn difficulty(&self) -> Difficulty {
        self.session.difficulty()
    }

    /// Best time for the difficulty being played
    pub fn best_time(&self) -> Option<Duration> {
        self.records.best(self.difficulty())
    }

    pub fn new_record(&self) -> bool {
        self.new_record
    }

    /// Apply one input event; rejected events change nothing
    pub fn handle(&mut self, event: Event, now: Instant) -> Result<Reply> {
        match event {
            Event::Reveal(pos) => {
                let result = self.session.reveal(pos, now)?;
                self.after_reveal(&result, now);
                Ok(Reply::Revealed(result))
            }
            Event::Chord(pos) => {
                let result = self.session.chord(pos, now)?;
                self.after_reveal(&result, now);
                Ok(Reply::Revealed(result))
            }
            Event::CycleMark(pos) => Ok(Reply::Marked(self.session.cycle_mark(pos)?)),
            Event::RequestHint => Ok(Reply::Hint(self.session.request_hint()?)),
            Event::TogglePause => Ok(Reply::Clock(self.session.toggle_pause(now)?)),
            Event::SetDifficulty(d) => {
                self.select_difficulty(d)?;
                Ok(Reply::NewGame(d))
            }
            Event::Restart => {
                self.restart()?;
                Ok(Reply::NewGame(self.difficulty()))
            }
        }
    }

    /// Drop the current game and start a new one on another preset; allowed at any time
    /// A difficulty picked by the player is remembered for the next launch
    pub fn select_difficulty(&mut self, difficulty: Difficulty) -> std::result::Result<(), BoardError> {
        self.start(difficulty)?;
        self.cfg.difficulty = difficulty;
        if self.saved.difficulty != difficulty {
            self.saved.difficulty = difficulty;
            self.save();
        }
        Ok(())
    }

    /// New game on the current preset
    pub fn restart(&mut self) -> std::result::Result<(), BoardError> {
        self.start(self.difficulty())
    }

    /// Persist the saved preferences; command line overrides are left out
    pub fn save(&self) {
        if let Some(paths) = &self.paths {
            if let Err(e) = save_config(&self.saved, &paths.config()) {
                warn!("Could not save config: {}", e);
            }
        }
    }

    fn start(&mut self, difficulty: Difficulty) -> std::result::Result<(), BoardError> {
        let rng = StdRng::seed_from_u64(self.rng.r#gen());
        self.session = Session::new(difficulty, self.cfg.first_click, rng)?;
        self.new_record = false;
        info!("New {} game ({:?} first click)", difficulty.name(), self.cfg.first_click);
        Ok(())
    }

    fn after_reveal(&mut self, result: &RevealResult, now: Instant) {
        if result.outcome != BoardState::Won {
            return;
        }
        let difficulty = self.session.difficulty();
        let elapsed = self.session.elapsed(now);
        if self.records.record_if_best(difficulty, elapsed) {
            self.new_record = true;
            info!("New {} record: {:?}", difficulty.name(), elapsed);
            if let Some(paths) = &self.paths {
                if let Err(e) = self.records.save(&paths.records()) {
                    warn!("Could not save best times: {}", e);
                }
            }
        }
    }
}
