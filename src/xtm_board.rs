// Minesweeper board model
// Owns the cell grid, mine placement, flood-fill reveal, chording and mark cycling

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::xtm_error::{ActionError, BoardError, Result};

/// Cell position as (row, col)
pub type Pos = (usize, usize);

/// Player annotation on an unrevealed cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mark {
    #[default]
    None,
    Flag,
    Question,
}

impl Mark {
    /// Next state in the None -> Flag -> Question -> None cycle
    pub fn next(self) -> Mark {
        match self {
            Mark::None => Mark::Flag,
            Mark::Flag => Mark::Question,
            Mark::Question => Mark::None,
        }
    }
}

/// A single cell on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    pub mine: bool,     // Contains a mine
    pub adj: u8,        // Adjacent mine count (0-8)
    pub revealed: bool, // Opened by the player or a cascade
    pub mark: Mark,     // Always Mark::None once revealed
}

/// What the renderer is allowed to know about a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellView {
    Hidden(Mark),
    Revealed(u8),
    Mine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardState {
    Playing,
    Won,
    Lost,
}

impl BoardState {
    pub fn is_finished(self) -> bool {
        matches!(self, BoardState::Won | BoardState::Lost)
    }
}

/// Cells exposed by one action and the board state afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealResult {
    pub exposed: Vec<Pos>,
    pub outcome: BoardState,
}

#[derive(Debug, Clone)]
pub struct Board {
    width: usize,
    height: usize,
    mine_count: usize,
    cells: Vec<Cell>, // Row-major
    armed: bool,      // Mines have been placed
    flags: usize,
    revealed: usize,
    state: BoardState,
    triggered: Option<Pos>,
}

impl Board {
    /// Create a board with no mines placed yet
    /// Marks can be placed on it; reveals wait until `arm` has run
    pub fn blank(width: usize, height: usize, mine_count: usize) -> std::result::Result<Self, BoardError> {
        if width == 0 || height == 0 {
            return Err(BoardError::EmptyBoard);
        }
        let cells = width * height;
        if mine_count >= cells {
            return Err(BoardError::TooManyMines { mines: mine_count, cells });
        }
        Ok(Board {
            width,
            height,
            mine_count,
            cells: vec![Cell::default(); cells],
            armed: false,
            flags: 0,
            revealed: 0,
            state: BoardState::Playing,
            triggered: None,
        })
    }

    /// Generate a board with mines placed uniformly at random outside `excluded`
    pub fn generate<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        mine_count: usize,
        excluded: &[Pos],
        rng: &mut R,
    ) -> std::result::Result<Self, BoardError> {
        let mut board = Board::blank(width, height, mine_count)?;
        board.arm(excluded, rng);
        Ok(board)
    }

    /// Place the mines and compute adjacency counts, keeping existing marks
    pub fn arm<R: Rng + ?Sized>(&mut self, excluded: &[Pos], rng: &mut R) {
        let n = self.cells.len();
        let excluded_idx: Vec<usize> = excluded
            .iter()
            .filter(|&&p| self.in_bounds(p))
            .map(|&p| self.index(p))
            .collect();
        let mut pool: Vec<usize> = (0..n).filter(|i| !excluded_idx.contains(i)).collect();
        if pool.len() < self.mine_count {
            warn!(
                "Cannot keep {} cells free of mines with {} mines on {} cells, keeping only the first one safe",
                excluded_idx.len(),
                self.mine_count,
                n
            );
            let first = excluded_idx.first().copied();
            pool = (0..n).filter(|&i| Some(i) != first).collect();
        }

        for cell in &mut self.cells {
            cell.mine = false;
            cell.adj = 0;
        }
        for &i in pool.choose_multiple(rng, self.mine_count) {
            self.cells[i].mine = true;
        }
        self.compute_adjacency();
        self.armed = true;
        debug!("Placed {} mines on a {}x{} board", self.mine_count, self.width, self.height);
    }

    fn compute_adjacency(&mut self) {
        for i in 0..self.cells.len() {
            let adj = self.neighbors(i).filter(|&n| self.cells[n].mine).count() as u8;
            self.cells[i].adj = adj;
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn mine_count(&self) -> usize {
        self.mine_count
    }

    pub fn flags(&self) -> usize {
        self.flags
    }

    /// Mine counter display value; negative when the player over-flags
    pub fn mines_remaining(&self) -> isize {
        self.mine_count as isize - self.flags as isize
    }

    pub fn state(&self) -> BoardState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// The mine that ended the game, if any
    pub fn triggered_mine(&self) -> Option<Pos> {
        self.triggered
    }

    pub fn in_bounds(&self, (row, col): Pos) -> bool {
        row < self.height && col < self.width
    }

    pub fn cell(&self, pos: Pos) -> Option<&Cell> {
        if self.in_bounds(pos) {
            Some(&self.cells[self.index(pos)])
        } else {
            None
        }
    }

    pub fn view(&self, pos: Pos) -> Option<CellView> {
        self.cell(pos).map(|c| match (c.revealed, c.mine) {
            (false, _) => CellView::Hidden(c.mark),
            (true, true) => CellView::Mine,
            (true, false) => CellView::Revealed(c.adj),
        })
    }

    /// Unrevealed, unmarked cells; mine or not
    pub fn untouched(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.cells.len())
            .filter(move |&i| !self.cells[i].revealed && self.cells[i].mark == Mark::None)
            .map(move |i| self.pos(i))
    }

    /// Unrevealed, unmarked cells without a mine
    pub fn safe_untouched(&self) -> impl Iterator<Item = Pos> + '_ {
        self.untouched().filter(move |&p| !self.cells[self.index(p)].mine)
    }

    /// In-bounds neighbours of a position, including itself
    pub fn area(&self, pos: Pos) -> Vec<Pos> {
        if !self.in_bounds(pos) {
            return vec![];
        }
        let idx = self.index(pos);
        let mut area: Vec<Pos> = self.neighbors(idx).map(|n| self.pos(n)).collect();
        area.insert(0, pos);
        area
    }

    /// Reveal a cell, cascading through zero cells
    /// - Mine: game lost, all mines exposed
    /// - Last safe cell: game won, all mines flagged
    pub fn reveal(&mut self, pos: Pos) -> Result<RevealResult> {
        let idx = self.checked_index(pos)?;
        self.check_playing()?;
        let cell = self.cells[idx];
        if cell.revealed {
            return Err(ActionError::AlreadyRevealed);
        }
        if cell.mark != Mark::None {
            return Err(ActionError::Marked);
        }
        let exposed = self.expose(idx);
        Ok(RevealResult {
            exposed,
            outcome: self.state,
        })
    }

    /// Reveal every unmarked neighbour of a numbered cell whose flags add up
    /// A misplaced flag means one of those neighbours is a mine
    pub fn chord(&mut self, pos: Pos) -> Result<RevealResult> {
        let idx = self.checked_index(pos)?;
        self.check_playing()?;
        let cell = self.cells[idx];
        if !cell.revealed || cell.adj == 0 {
            return Err(ActionError::ChordMismatch);
        }
        let flagged = self
            .neighbors(idx)
            .filter(|&n| self.cells[n].mark == Mark::Flag)
            .count();
        if flagged != cell.adj as usize {
            return Err(ActionError::ChordMismatch);
        }

        let targets: Vec<usize> = self
            .neighbors(idx)
            .filter(|&n| !self.cells[n].revealed && self.cells[n].mark == Mark::None)
            .collect();
        let mut exposed = Vec::new();
        for n in targets {
            if self.state.is_finished() {
                break;
            }
            // an earlier cascade in this chord may have opened it already
            if self.cells[n].revealed {
                continue;
            }
            exposed.extend(self.expose(n));
        }
        Ok(RevealResult {
            exposed,
            outcome: self.state,
        })
    }

    /// Advance the mark of an unrevealed cell
    pub fn cycle_mark(&mut self, pos: Pos) -> Result<Mark> {
        let idx = self.checked_index(pos)?;
        self.check_not_finished()?;
        if self.cells[idx].revealed {
            return Err(ActionError::AlreadyRevealed);
        }
        let prev = self.cells[idx].mark;
        let next = prev.next();
        self.cells[idx].mark = next;
        if next == Mark::Flag {
            self.flags += 1;
        } else if prev == Mark::Flag {
            self.flags -= 1;
        }
        Ok(next)
    }

    fn expose(&mut self, idx: usize) -> Vec<Pos> {
        if self.cells[idx].mine {
            let pos = self.pos(idx);
            self.triggered = Some(pos);
            self.state = BoardState::Lost;
            debug!("Mine hit at {:?}", pos);
            return self.expose_mines();
        }

        let mut exposed = vec![self.pos(idx)];
        self.cells[idx].revealed = true;
        self.revealed += 1;

        // explicit worklist instead of recursion; the result is the same
        // connected region whatever order cells are popped in
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            if self.cells[i].adj != 0 {
                continue;
            }
            let next: Vec<usize> = self.neighbors(i).collect();
            for n in next {
                let c = &mut self.cells[n];
                if c.revealed || c.mine || c.mark != Mark::None {
                    continue;
                }
                c.revealed = true;
                self.revealed += 1;
                exposed.push(self.pos(n));
                stack.push(n);
            }
        }

        if self.revealed == self.cells.len() - self.mine_count {
            self.flag_all_mines();
            self.state = BoardState::Won;
            debug!("Board cleared");
        }
        exposed
    }

    fn expose_mines(&mut self) -> Vec<Pos> {
        let mut exposed = Vec::new();
        for i in 0..self.cells.len() {
            let cell = &mut self.cells[i];
            if !cell.mine || cell.revealed {
                continue;
            }
            if cell.mark == Mark::Flag {
                self.flags -= 1;
            }
            cell.mark = Mark::None;
            cell.revealed = true;
            exposed.push(self.pos(i));
        }
        exposed
    }

    fn flag_all_mines(&mut self) {
        for cell in self.cells.iter_mut().filter(|c| c.mine) {
            if cell.mark != Mark::Flag {
                cell.mark = Mark::Flag;
                self.flags += 1;
            }
        }
    }

    fn check_not_finished(&self) -> Result<()> {
        if self.state.is_finished() {
            Err(ActionError::Finished)
        } else {
            Ok(())
        }
    }

    fn check_playing(&self) -> Result<()> {
        self.check_not_finished()?;
        if !self.armed {
            return Err(ActionError::NotStarted);
        }
        Ok(())
    }

    fn checked_index(&self, pos: Pos) -> Result<usize> {
        if self.in_bounds(pos) {
            Ok(self.index(pos))
        } else {
            Err(ActionError::OutOfBounds)
        }
    }

    fn index(&self, (row, col): Pos) -> usize {
        row * self.width + col
    }

    fn pos(&self, idx: usize) -> Pos {
        (idx / self.width, idx % self.width)
    }

    fn neighbors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let (row, col) = self.pos(idx);
        (row.saturating_sub(1)..=(row + 1).min(self.height - 1))
            .flat_map(move |r| {
                (col.saturating_sub(1)..=(col + 1).min(self.width - 1)).map(move |c| r * self.width + c)
            })
            .filter(move |&n| n != idx)
    }

    /// Board with a fixed mine layout
    #[cfg(test)]
    pub(crate) fn from_mines(width: usize, height: usize, mines: &[Pos]) -> Board {
        let mut board = Board::blank(width, height, mines.len()).unwrap();
        for &p in mines {
            let idx = board.index(p);
            board.cells[idx].mine = true;
        }
        board.compute_adjacency();
        board.armed = true;
        board
    }
}
