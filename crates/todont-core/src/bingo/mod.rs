mod board;
mod celebration;
mod generate;
mod lines;

pub use board::{BingoBoard, BingoCell, BoardOutcome, BoardSettings, WeekShift};
pub use celebration::{Celebration, CelebrationPhase};
pub use generate::{generate_cells, BoardStrategy, CellSource, SUGGESTIONS};
pub use lines::{evaluate_lines, evaluate_marks, LineKind, CELL_COUNT, GRID_SIDE, LINES};
