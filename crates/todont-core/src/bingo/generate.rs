//! Board generation.
//!
//! Two ways to fill the 25 cells: sample the active tasks uniformly, or cycle
//! through a fixed pool of generic suggestions. Randomness only comes from the
//! caller's RNG so a seeded generator reproduces the same board.

use chrono::{Days, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::board::BingoCell;
use super::lines::{CELL_COUNT, GRID_SIDE};
use crate::task::Task;

/// Generic challenges used when no task set is supplied.
pub const SUGGESTIONS: [&str; 12] = [
    "Do laundry",
    "Answer emails",
    "Go to the gym",
    "Call mom",
    "Clean kitchen",
    "Pay bills",
    "Meal prep",
    "Organize desk",
    "Water plants",
    "Read a chapter",
    "Take out trash",
    "Reply to texts",
];

/// Which source the board draws from on regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardStrategy {
    #[default]
    Tasks,
    Suggestions,
}

pub enum CellSource<'a> {
    /// Sample uniformly from these tasks; empty yields no board.
    Tasks(&'a [&'a Task]),
    /// Cycle through [`SUGGESTIONS`].
    Suggestions,
}

/// Build 25 cells, or none if the source is an empty task set.
///
/// Cells are dated on consecutive days from `start`. With a positive
/// `premark_probability` each cell independently starts avoided (demo boards).
pub fn generate_cells<R: Rng>(
    source: &CellSource<'_>,
    start: NaiveDate,
    premark_probability: f64,
    rng: &mut R,
) -> Vec<BingoCell> {
    if let CellSource::Tasks(tasks) = source {
        if tasks.is_empty() {
            return Vec::new();
        }
    }

    let premark = premark_probability.clamp(0.0, 1.0);
    (0..CELL_COUNT)
        .map(|i| {
            let (text, task_id) = match source {
                CellSource::Tasks(tasks) => {
                    let task = tasks[rng.gen_range(0..tasks.len())];
                    (task.text.clone(), Some(task.id.clone()))
                }
                CellSource::Suggestions => (SUGGESTIONS[i % SUGGESTIONS.len()].to_string(), None),
            };
            let avoided = premark > 0.0 && rng.gen_bool(premark);
            BingoCell {
                id: i,
                task: text,
                task_id,
                avoided,
                custom: false,
                estimated_duration: None,
                date: start.checked_add_days(Days::new(i as u64)).unwrap_or(start),
                row: i / GRID_SIDE,
                col: i % GRID_SIDE,
            }
        })
        .collect()
}
