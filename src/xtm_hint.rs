// Single-use hint: points at one random cell that is safe to open

use rand::Rng;
use rand::seq::IteratorRandom;
use tracing::debug;

use crate::xtm_board::{Board, Pos};
use crate::xtm_error::HintError;

#[derive(Debug, Clone, Default)]
pub struct HintSelector {
    used: bool,
}

impl HintSelector {
    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Pick a non-mine, unrevealed, unmarked cell. The board is left untouched
    pub fn request<R: Rng + ?Sized>(&mut self, board: &Board, rng: &mut R) -> Result<Pos, HintError> {
        if self.used {
            return Err(HintError::AlreadyUsed);
        }
        let pos = board.safe_untouched().choose(rng).ok_or(HintError::NoSafeCell)?;
        self.used = true;
        debug!("Hint points at {:?}", pos);
        Ok(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xtm_board::{CellView, Mark};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn hint_points_at_safe_untouched_cell() {
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut board = Board::from_mines(3, 3, &[(0, 0), (2, 2)]);
            board.cycle_mark((0, 2)).unwrap();
            board.reveal((0, 1)).unwrap();
            let before: Vec<_> = board.area((1, 1)).into_iter().map(|p| board.view(p)).collect();
            let mut hint = HintSelector::default();

            let pos = hint.request(&board, &mut rng).unwrap();

            let cell = board.cell(pos).unwrap();
            assert!(!cell.mine && !cell.revealed);
            assert_eq!(cell.mark, Mark::None);
            let after: Vec<_> = board.area((1, 1)).into_iter().map(|p| board.view(p)).collect();
            assert_eq!(before, after);
        }
    }

    #[test]
    fn hint_is_single_use() {
        let mut rng = StdRng::seed_from_u64(9);
        let board = Board::from_mines(3, 3, &[(1, 1)]);
        let mut hint = HintSelector::default();

        assert!(hint.request(&board, &mut rng).is_ok());
        assert!(hint.is_used());
        assert_eq!(hint.request(&board, &mut rng), Err(HintError::AlreadyUsed));
    }

    #[test]
    fn no_safe_cell_leaves_hint_available() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut board = Board::from_mines(2, 1, &[(0, 0)]);
        board.cycle_mark((0, 1)).unwrap();
        let mut hint = HintSelector::default();

        assert_eq!(hint.request(&board, &mut rng), Err(HintError::NoSafeCell));
        assert!(!hint.is_used());
        assert_eq!(board.view((0, 1)), Some(CellView::Hidden(Mark::Flag)));
    }
}
