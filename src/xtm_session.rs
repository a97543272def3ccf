// One game from first click to win or loss
// Owns the board, clock, hint and random source; rejects moves while paused or finished

use rand::rngs::StdRng;
use std::time::{Duration, Instant};
use tracing::info;

use crate::xtm_board::{Board, BoardState, Mark, Pos, RevealResult};
use crate::xtm_error::{ActionError, BoardError, HintError, Result};
use crate::xtm_game::{Difficulty, FirstClick};
use crate::xtm_hint::HintSelector;
use crate::xtm_timer::{Timer, TimerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Playing,
    Won,
    Lost,
    Paused,
}

#[derive(Debug)]
pub struct Session {
    difficulty: Difficulty,
    first_click: FirstClick,
    board: Board,
    timer: Timer,
    hint: HintSelector,
    rng: StdRng,
}

impl Session {
    /// Start a fresh game. With a safe first click the mines wait for the first reveal
    pub fn new(difficulty: Difficulty, first_click: FirstClick, mut rng: StdRng) -> std::result::Result<Self, BoardError> {
        let (w, h, mines) = difficulty.params();
        let board = match first_click {
            FirstClick::Random => Board::generate(w, h, mines, &[], &mut rng)?,
            FirstClick::SafeCell | FirstClick::SafeArea => Board::blank(w, h, mines)?,
        };
        Ok(Session {
            difficulty,
            first_click,
            board,
            timer: Timer::default(),
            hint: HintSelector::default(),
            rng,
        })
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn hint_used(&self) -> bool {
        self.hint.is_used()
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.timer.elapsed(now)
    }

    pub fn mines_remaining(&self) -> isize {
        self.board.mines_remaining()
    }

    pub fn state(&self) -> GameState {
        match self.board.state() {
            BoardState::Won => GameState::Won,
            BoardState::Lost => GameState::Lost,
            BoardState::Playing if self.timer.state() == TimerState::Paused => GameState::Paused,
            BoardState::Playing => GameState::Playing,
        }
    }

    /// Open a cell; the first successful reveal places the mines (if deferred) and starts the clock
    pub fn reveal(&mut self, pos: Pos, now: Instant) -> Result<RevealResult> {
        self.check_active()?;
        if !self.board.is_armed() {
            match self.board.cell(pos) {
                None => return Err(ActionError::OutOfBounds),
                Some(c) if c.mark != Mark::None => return Err(ActionError::Marked),
                Some(_) => self.arm_around(pos),
            }
        }
        let result = self.board.reveal(pos)?;
        self.after_reveal(&result, now);
        Ok(result)
    }

    pub fn chord(&mut self, pos: Pos, now: Instant) -> Result<RevealResult> {
        self.check_active()?;
        let result = self.board.chord(pos)?;
        self.after_reveal(&result, now);
        Ok(result)
    }

    pub fn cycle_mark(&mut self, pos: Pos) -> Result<Mark> {
        self.check_active()?;
        self.board.cycle_mark(pos)
    }

    /// Ask for the single hint
    /// Refused until the mines are placed, so the first reveal keeps its protection
    pub fn request_hint(&mut self) -> Result<Pos> {
        self.check_active()?;
        if self.hint.is_used() {
            return Err(HintError::AlreadyUsed.into());
        }
        if !self.board.is_armed() {
            return Err(ActionError::NotStarted);
        }
        Ok(self.hint.request(&self.board, &mut self.rng)?)
    }

    /// Pause or resume; only possible while the clock runs
    pub fn toggle_pause(&mut self, now: Instant) -> Result<TimerState> {
        if self.board.state().is_finished() {
            return Err(ActionError::Finished);
        }
        match self.timer.toggle(now) {
            Some(state) => {
                info!("Clock {:?} at {:?}", state, self.timer.elapsed(now));
                Ok(state)
            }
            None => Err(ActionError::NotStarted),
        }
    }

    fn arm_around(&mut self, pos: Pos) {
        let excluded = self.first_click.excluded(&self.board, pos);
        self.board.arm(&excluded, &mut self.rng);
    }

    fn after_reveal(&mut self, result: &RevealResult, now: Instant) {
        self.timer.start(now);
        if result.outcome.is_finished() {
            self.timer.stop(now);
            info!(
                "{} game {:?} after {:?}",
                self.difficulty.name(),
                result.outcome,
                self.timer.elapsed(now)
            );
        }
    }

    fn check_active(&self) -> Result<()> {
        if self.board.state().is_finished() {
            Err(ActionError::Finished)
        } else if self.timer.state() == TimerState::Paused {
            Err(ActionError::Paused)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xtm_board::CellView;
    use rand::SeedableRng;

    fn session(first_click: FirstClick, seed: u64) -> Session {
        Session::new(Difficulty::Easy, first_click, StdRng::seed_from_u64(seed)).unwrap()
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    /// A session whose first reveal at the centre left the game open
    fn started_session(t0: Instant) -> Session {
        (0..)
            .map(|seed| {
                let mut s = session(FirstClick::SafeArea, seed);
                s.reveal((4, 4), t0).unwrap();
                s
            })
            .find(|s| s.state() == GameState::Playing)
            .unwrap()
    }

    #[test]
    fn random_policy_places_mines_up_front() {
        let s = session(FirstClick::Random, 1);

        assert!(s.board().is_armed());
        assert_eq!(s.state(), GameState::Playing);
        assert_eq!(s.timer_state(), TimerState::Idle);
    }

    #[test]
    fn safe_area_first_click_opens_a_region() {
        for seed in 0..20 {
            let t0 = Instant::now();
            let mut s = session(FirstClick::SafeArea, seed);
            assert!(!s.board().is_armed());

            let result = s.reveal((4, 4), t0).unwrap();

            assert_eq!(s.board().view((4, 4)), Some(CellView::Revealed(0)));
            assert!(result.exposed.len() >= 9);
            assert_ne!(s.timer_state(), TimerState::Idle);
        }
    }

    #[test]
    fn safe_cell_first_click_never_hits_a_mine() {
        for seed in 0..20 {
            let mut s = session(FirstClick::SafeCell, seed);

            let result = s.reveal((0, 0), Instant::now()).unwrap();

            assert_ne!(result.outcome, BoardState::Lost);
        }
    }

    #[test]
    fn marks_before_first_reveal_survive() {
        let mut s = session(FirstClick::SafeArea, 5);
        s.cycle_mark((8, 8)).unwrap();

        assert_eq!(s.reveal((8, 8), Instant::now()), Err(ActionError::Marked));
        assert!(!s.board().is_armed());
        s.reveal((0, 0), Instant::now()).unwrap();
        assert_eq!(s.board().view((8, 8)), Some(CellView::Hidden(Mark::Flag)));
    }

    #[test]
    fn pause_rejects_board_actions() {
        let t0 = Instant::now();
        let mut s = started_session(t0);
        let hidden = s.board().untouched().next().unwrap();

        assert_eq!(s.toggle_pause(t0 + secs(1)), Ok(TimerState::Paused));
        assert_eq!(s.state(), GameState::Paused);
        assert_eq!(s.reveal(hidden, t0 + secs(2)), Err(ActionError::Paused));
        assert_eq!(s.cycle_mark(hidden), Err(ActionError::Paused));
        assert_eq!(s.chord((4, 4), t0 + secs(2)), Err(ActionError::Paused));
        assert_eq!(s.request_hint(), Err(ActionError::Paused));
        assert!(!s.hint_used());

        assert_eq!(s.toggle_pause(t0 + secs(100)), Ok(TimerState::Running));
        assert_eq!(s.elapsed(t0 + secs(101)), secs(2));
        assert_eq!(s.cycle_mark(hidden), Ok(Mark::Flag));
    }

    #[test]
    fn pause_needs_a_running_clock() {
        let mut s = session(FirstClick::SafeArea, 2);

        assert_eq!(s.toggle_pause(Instant::now()), Err(ActionError::NotStarted));
    }

    #[test]
    fn hint_waits_for_the_first_reveal() {
        for seed in 0..50 {
            let mut s = session(FirstClick::SafeArea, seed);

            assert_eq!(s.request_hint(), Err(ActionError::NotStarted));
            assert!(!s.hint_used());
            assert!(!s.board().is_armed());

            let result = s.reveal((0, 0), Instant::now()).unwrap();
            assert_ne!(result.outcome, BoardState::Lost);
            if result.outcome == BoardState::Playing {
                let pos = s.request_hint().unwrap();
                assert!(!s.board().cell(pos).unwrap().mine);
                assert_eq!(s.request_hint(), Err(ActionError::Hint(HintError::AlreadyUsed)));
            }
        }
    }

    #[test]
    fn hint_with_random_placement_is_available_up_front() {
        let mut s = session(FirstClick::Random, 3);

        let pos = s.request_hint().unwrap();

        assert!(!s.board().cell(pos).unwrap().mine);
        assert_eq!(s.timer_state(), TimerState::Idle);
    }

    #[test]
    fn finished_game_stops_clock_and_rejects_moves() {
        let t0 = Instant::now();
        let mut s = session(FirstClick::Random, 4);
        let mine = (0..9)
            .flat_map(|r| (0..9).map(move |c| (r, c)))
            .find(|&p| s.board().cell(p).unwrap().mine)
            .unwrap();
        let safe = s
            .board()
            .safe_untouched()
            .find(|&p| s.board().cell(p).unwrap().adj > 0)
            .unwrap();
        s.reveal(safe, t0).unwrap();

        let result = s.reveal(mine, t0 + secs(7)).unwrap();

        assert_eq!(result.outcome, BoardState::Lost);
        assert_eq!(s.state(), GameState::Lost);
        assert_eq!(s.timer_state(), TimerState::Stopped);
        assert_eq!(s.elapsed(t0 + secs(60)), secs(7));
        assert_eq!(s.cycle_mark(safe), Err(ActionError::Finished));
        assert_eq!(s.toggle_pause(t0 + secs(60)), Err(ActionError::Finished));
    }
}
