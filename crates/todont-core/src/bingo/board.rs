//! Bingo board engine.
//!
//! Holds the 25 cells, the set of completed lines and the celebration flag.
//! The board never owns tasks: generated cells carry the task id as a
//! correlation key, customized cells fall back to text matching.
//!
//! Every mutation re-evaluates the lines. The celebration fires only when a
//! line completes that has not been counted since the last regeneration, so
//! unmarking and re-marking a cell of a counted line stays quiet.

use std::collections::BTreeSet;

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::celebration::Celebration;
use super::generate::{generate_cells, BoardStrategy, CellSource};
use super::lines::{evaluate_lines, CELL_COUNT};
use crate::error::ValidationError;
use crate::events::Event;
use crate::task::{validate_text, DurationRange, Task};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BingoCell {
    /// Position 0-24, row-major.
    pub id: usize,
    pub task: String,
    /// Ledger task this cell was generated from. Cleared on customization.
    #[serde(default)]
    pub task_id: Option<String>,
    pub avoided: bool,
    /// Text was set by the user rather than generated.
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub estimated_duration: Option<u32>,
    /// Calendar day this cell stands for.
    pub date: NaiveDate,
    pub row: usize,
    pub col: usize,
}

impl BingoCell {
    /// Short `month/day` label.
    pub fn date_label(&self) -> String {
        self.date.format("%-m/%-d").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekShift {
    Previous,
    Next,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardSettings {
    pub strategy: BoardStrategy,
    /// Demo only: chance that a freshly generated cell starts avoided.
    pub premark_probability: f64,
    pub celebration_duration: Duration,
    /// Fixed seed for reproducible boards; entropy otherwise.
    pub seed: Option<u64>,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            strategy: BoardStrategy::Tasks,
            premark_probability: 0.0,
            celebration_duration: Duration::seconds(3),
            seed: None,
        }
    }
}

/// Result of a board mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardOutcome {
    pub events: Vec<Event>,
    /// Celebration generation armed by this mutation, if any.
    pub armed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct BingoBoard {
    cells: Vec<BingoCell>,
    completed_lines: BTreeSet<usize>,
    /// Lines already celebrated since the last regeneration.
    counted_lines: BTreeSet<usize>,
    celebration: Celebration,
    start_date: NaiveDate,
    settings: BoardSettings,
    rng: Mcg128Xsl64,
}

impl BingoBoard {
    pub fn new(settings: BoardSettings, start_date: NaiveDate) -> Self {
        let rng = match settings.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self {
            cells: Vec::new(),
            completed_lines: BTreeSet::new(),
            counted_lines: BTreeSet::new(),
            celebration: Celebration::new(settings.celebration_duration),
            start_date,
            settings,
            rng,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn cells(&self) -> &[BingoCell] {
        &self.cells
    }

    pub fn cell(&self, id: usize) -> Option<&BingoCell> {
        self.cells.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn completed_lines(&self) -> &BTreeSet<usize> {
        &self.completed_lines
    }

    pub fn celebration(&self) -> &Celebration {
        &self.celebration
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn settings(&self) -> &BoardSettings {
        &self.settings
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Regenerate from the configured strategy.
    ///
    /// With the task strategy and no active tasks the board is left as is.
    pub fn regenerate(&mut self, active: &[&Task], now: DateTime<Utc>) -> Option<BoardOutcome> {
        match self.settings.strategy {
            BoardStrategy::Tasks => self.generate(&CellSource::Tasks(active), now),
            BoardStrategy::Suggestions => self.generate(&CellSource::Suggestions, now),
        }
    }

    /// Replace every cell from `source`, discarding marks and line state.
    pub fn generate(&mut self, source: &CellSource<'_>, now: DateTime<Utc>) -> Option<BoardOutcome> {
        let cells = generate_cells(
            source,
            self.start_date,
            self.settings.premark_probability,
            &mut self.rng,
        );
        if cells.is_empty() {
            debug!("no active tasks, board left unchanged");
            return None;
        }

        self.cells = cells;
        self.completed_lines.clear();
        self.counted_lines.clear();
        info!(start = %self.start_date, "bingo board regenerated");

        let mut outcome = BoardOutcome {
            events: vec![Event::BoardRegenerated {
                cells: self.cells.len(),
                at: now,
            }],
            armed: None,
        };
        // Demo pre-marks can already complete lines.
        self.evaluate(now, &mut outcome);
        Some(outcome)
    }

    /// Flip one cell's `avoided` mark.
    pub fn toggle_cell(&mut self, id: usize, now: DateTime<Utc>) -> Result<BoardOutcome, ValidationError> {
        let cell = self.cell_mut(id)?;
        cell.avoided = !cell.avoided;
        let avoided = cell.avoided;

        let mut outcome = BoardOutcome {
            events: vec![Event::CellToggled {
                cell_id: id,
                avoided,
                at: now,
            }],
            armed: None,
        };
        self.evaluate(now, &mut outcome);
        Ok(outcome)
    }

    /// Overwrite a cell's text and flag it as custom.
    pub fn set_cell_task(&mut self, id: usize, text: &str, now: DateTime<Utc>) -> Result<Event, ValidationError> {
        let text = validate_text("cell", text)?.to_string();
        let cell = self.cell_mut(id)?;
        cell.task = text.clone();
        cell.custom = true;
        cell.task_id = None;
        Ok(Event::CellCustomized {
            cell_id: id,
            text,
            at: now,
        })
    }

    /// `set_cell_task` plus a planning estimate. Both are validated before anything changes.
    pub fn customize_cell(
        &mut self,
        id: usize,
        text: &str,
        duration: u32,
        range: &DurationRange,
        now: DateTime<Utc>,
    ) -> Result<Event, ValidationError> {
        validate_text("cell", text)?;
        let duration = range.validate(duration)?;
        self.cell_mut(id)?;

        let event = self.set_cell_task(id, text, now)?;
        if let Some(cell) = self.cells.get_mut(id) {
            cell.estimated_duration = Some(duration);
        }
        Ok(event)
    }

    /// Carry one task's completion toggle across to the board.
    ///
    /// Only cells that correlate with `changed` are touched: completion marks
    /// them avoided, reactivation unmarks the custom ones. Marks the user set
    /// on other cells stay as they are, and cell text is never touched.
    pub fn sync_with_ledger(&mut self, changed: &Task, tasks: &[Task], now: DateTime<Utc>) -> BoardOutcome {
        let mut changed_any = false;
        for cell in self.cells.iter_mut() {
            let correlated = correlate(cell, tasks).is_some_and(|task| task.id == changed.id);
            if !correlated {
                continue;
            }
            if !changed.is_active && !cell.avoided {
                cell.avoided = true;
                changed_any = true;
            } else if changed.is_active && cell.custom && cell.avoided {
                cell.avoided = false;
                changed_any = true;
            }
        }

        let mut outcome = BoardOutcome::default();
        if changed_any {
            self.evaluate(now, &mut outcome);
        }
        outcome
    }

    /// Move the calendar a week and regenerate.
    pub fn shift_week(&mut self, shift: WeekShift, active: &[&Task], now: DateTime<Utc>) -> Option<BoardOutcome> {
        let week = Days::new(7);
        let moved = match shift {
            WeekShift::Previous => self.start_date.checked_sub_days(week),
            WeekShift::Next => self.start_date.checked_add_days(week),
        };
        if let Some(date) = moved {
            self.start_date = date;
        }
        self.regenerate(active, now)
    }

    /// Timer expiry for an armed celebration.
    pub fn expire_celebration(&mut self, generation: u64, now: DateTime<Utc>) -> Option<Event> {
        if self.celebration.expire(generation) {
            debug!(generation, "celebration cleared");
            Some(Event::CelebrationCleared { at: now })
        } else {
            None
        }
    }

    /// Clear a celebration whose deadline has passed without its timer firing.
    pub fn expire_due(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.celebration
            .expire_due(now)
            .then_some(Event::CelebrationCleared { at: now })
    }

    /// Teardown: no celebration survives the component.
    pub fn dispose(&mut self) {
        self.celebration.reset();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn cell_mut(&mut self, id: usize) -> Result<&mut BingoCell, ValidationError> {
        let len = self.cells.len();
        self.cells.get_mut(id).ok_or(ValidationError::OutOfBounds {
            collection: "bingo cells".to_string(),
            index: id,
            len,
        })
    }

    fn evaluate(&mut self, now: DateTime<Utc>, outcome: &mut BoardOutcome) {
        debug_assert!(self.cells.is_empty() || self.cells.len() == CELL_COUNT);
        let lines = evaluate_lines(&self.cells);
        if !lines.is_subset(&self.counted_lines) {
            self.counted_lines.extend(lines.iter().copied());
            let generation = self.celebration.trigger(now);
            info!(lines = lines.len(), "bingo");
            outcome.armed = Some(generation);
            outcome.events.push(Event::BingoCompleted {
                lines: lines.iter().copied().collect(),
                at: now,
            });
        }
        self.completed_lines = lines;
    }
}

/// Task a cell stands for: by id when it has one, otherwise the first
/// case-insensitive text match in ledger order.
fn correlate<'a>(cell: &BingoCell, tasks: &'a [Task]) -> Option<&'a Task> {
    match &cell.task_id {
        Some(id) => tasks.iter().find(|t| &t.id == id),
        None => {
            let wanted = cell.task.trim().to_lowercase();
            tasks.iter().find(|t| t.text.trim().to_lowercase() == wanted)
        }
    }
}
