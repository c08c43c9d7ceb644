//! The twelve fixed bingo lines of a 5×5 grid.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::board::BingoCell;

pub const GRID_SIDE: usize = 5;
pub const CELL_COUNT: usize = GRID_SIDE * GRID_SIDE;

/// Rows 0-4, columns 5-9, main diagonal 10, anti-diagonal 11.
pub const LINES: [[usize; GRID_SIDE]; 12] = [
    [0, 1, 2, 3, 4],
    [5, 6, 7, 8, 9],
    [10, 11, 12, 13, 14],
    [15, 16, 17, 18, 19],
    [20, 21, 22, 23, 24],
    [0, 5, 10, 15, 20],
    [1, 6, 11, 16, 21],
    [2, 7, 12, 17, 22],
    [3, 8, 13, 18, 23],
    [4, 9, 14, 19, 24],
    [0, 6, 12, 18, 24],
    [4, 8, 12, 16, 20],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Row(usize),
    Column(usize),
    Diagonal,
    AntiDiagonal,
}

impl LineKind {
    pub fn of(line_index: usize) -> Option<Self> {
        match line_index {
            0..=4 => Some(LineKind::Row(line_index)),
            5..=9 => Some(LineKind::Column(line_index - 5)),
            10 => Some(LineKind::Diagonal),
            11 => Some(LineKind::AntiDiagonal),
            _ => None,
        }
    }
}

/// Indices of every line whose five cells are all avoided.
///
/// Anything other than a full 25-cell grid completes nothing.
pub fn evaluate_lines(cells: &[BingoCell]) -> BTreeSet<usize> {
    let marks: Vec<bool> = cells.iter().map(|c| c.avoided).collect();
    evaluate_marks(&marks)
}

/// Same as [`evaluate_lines`] over a bare mark array.
pub fn evaluate_marks(marks: &[bool]) -> BTreeSet<usize> {
    if marks.len() != CELL_COUNT {
        return BTreeSet::new();
    }
    LINES
        .iter()
        .enumerate()
        .filter(|(_, line)| line.iter().all(|&pos| marks[pos]))
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn all_marked_completes_every_line() {
        let lines = evaluate_marks(&[true; CELL_COUNT]);
        assert_eq!(lines, (0..12).collect());
    }

    #[test]
    fn nothing_marked_completes_nothing() {
        assert!(evaluate_marks(&[false; CELL_COUNT]).is_empty());
    }

    #[test]
    fn first_row_only() {
        let mut marks = [false; CELL_COUNT];
        marks[..5].iter_mut().for_each(|m| *m = true);
        assert_eq!(evaluate_marks(&marks), BTreeSet::from([0]));
    }

    #[test]
    fn both_diagonals() {
        let mut marks = [false; CELL_COUNT];
        for pos in LINES[10].iter().chain(LINES[11].iter()) {
            marks[*pos] = true;
        }
        assert_eq!(evaluate_marks(&marks), BTreeSet::from([10, 11]));
    }

    #[test]
    fn short_grid_completes_nothing() {
        assert!(evaluate_marks(&[true; 10]).is_empty());
    }

    #[test]
    fn line_kinds() {
        assert_eq!(LineKind::of(3), Some(LineKind::Row(3)));
        assert_eq!(LineKind::of(7), Some(LineKind::Column(2)));
        assert_eq!(LineKind::of(10), Some(LineKind::Diagonal));
        assert_eq!(LineKind::of(11), Some(LineKind::AntiDiagonal));
        assert_eq!(LineKind::of(12), None);
    }

    proptest! {
        #[test]
        fn reported_lines_are_exactly_the_full_ones(marks in proptest::collection::vec(any::<bool>(), CELL_COUNT)) {
            let lines = evaluate_marks(&marks);
            for (index, line) in LINES.iter().enumerate() {
                let full = line.iter().all(|&pos| marks[pos]);
                prop_assert_eq!(lines.contains(&index), full);
            }
        }
    }
}
