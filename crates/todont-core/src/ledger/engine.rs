//! Task ledger and avoidance clock.
//!
//! The ledger owns every task and the running points balance. Like the rest
//! of the core it has no internal thread: the host calls `tick(now)` once per
//! second and applies commands in between.
//!
//! ## Task Transitions
//!
//! ```text
//! (add) -> Active --toggle--> Completed --toggle--> Active
//!            |                    |
//!            +------ delete ------+
//! ```

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::penalty::PenaltyPolicy;
use crate::error::ValidationError;
use crate::events::Event;
use crate::task::{validate_text, DurationRange, Task};

/// Tunables applied to every ledger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    pub penalty: PenaltyPolicy,
    /// Milestones fire at multiples of this many points.
    pub milestone_interval: u64,
    pub durations: DurationRange,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            penalty: PenaltyPolicy::default(),
            milestone_interval: 5,
            durations: DurationRange::default(),
        }
    }
}

/// What one clock tick produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Points accrued across all active tasks during this tick.
    pub delta: u64,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    tasks: Vec<Task>,
    balance: u64,
    settings: LedgerSettings,
}

impl Ledger {
    pub fn new(settings: LedgerSettings) -> Self {
        Self::from_parts(Vec::new(), 0, settings)
    }

    /// Rebuild from persisted state.
    pub fn from_parts(tasks: Vec<Task>, balance: u64, settings: LedgerSettings) -> Self {
        let milestone_interval = settings.milestone_interval.max(1);
        Self {
            tasks,
            balance,
            settings: LedgerSettings {
                milestone_interval,
                ..settings
            },
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn active_tasks(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.is_active).collect()
    }

    pub fn completed_tasks(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| !t.is_active).collect()
    }

    /// Sum of points over active tasks.
    pub fn total_active_points(&self) -> u64 {
        self.tasks
            .iter()
            .filter(|t| t.is_active)
            .map(|t| t.points)
            .sum()
    }

    /// Running total-points balance.
    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Add an active task. Rejects empty text and out-of-range estimates.
    pub fn add_task(
        &mut self,
        text: &str,
        estimated_duration: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<(Task, Event), ValidationError> {
        let text = validate_text("task", text)?;
        let estimated_duration = self.settings.durations.validate_optional(estimated_duration)?;

        let task = Task::new(text, estimated_duration, now);
        debug!(task_id = %task.id, "task added");
        let event = Event::TaskAdded {
            task_id: task.id.clone(),
            text: task.text.clone(),
            at: now,
        };
        self.tasks.push(task.clone());
        Ok((task, event))
    }

    /// Flip a task between active and completed.
    pub fn toggle_task(&mut self, id: &str, now: DateTime<Utc>) -> Result<Event, ValidationError> {
        let penalty = self.settings.penalty;
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ValidationError::not_found("task", id))?;

        if task.is_active {
            let points = task.points;
            let (forfeited, credited) = penalty.split(points);
            task.is_active = false;
            task.end_time = Some(now);
            self.balance = self.balance.saturating_sub(forfeited);
            debug!(task_id = %id, points, forfeited, "task completed");
            Ok(Event::TaskCompleted {
                task_id: task.id.clone(),
                text: task.text.clone(),
                points,
                forfeited,
                credited,
                at: now,
            })
        } else {
            task.is_active = true;
            task.points = 0;
            task.last_avoided_at = now;
            task.start_time = Some(now);
            task.end_time = task
                .estimated_duration
                .map(|min| now + Duration::minutes(i64::from(min)));
            debug!(task_id = %id, "task resumed");
            Ok(Event::TaskResumed {
                task_id: task.id.clone(),
                text: task.text.clone(),
                at: now,
            })
        }
    }

    /// Remove a task for good.
    pub fn delete_task(&mut self, id: &str, now: DateTime<Utc>) -> Result<Event, ValidationError> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| ValidationError::not_found("task", id))?;
        let task = self.tasks.remove(index);
        debug!(task_id = %id, "task deleted");
        Ok(Event::TaskDeleted {
            task_id: task.id,
            text: task.text,
            at: now,
        })
    }

    /// Call once per second. Recomputes points for every active task.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let interval = self.settings.milestone_interval;
        let mut report = TickReport::default();

        for task in self.tasks.iter_mut().filter(|t| t.is_active) {
            let old = task.points;
            // Never lower points when the device clock steps backwards.
            let new = task.elapsed_points(now).max(old);
            task.points = new;
            task.total_avoidance_time = task.total_avoidance_time.saturating_add(1);

            if new > old {
                let delta = new - old;
                report.delta += delta;
                if new % interval == 0 {
                    report.events.push(Event::Milestone {
                        task_id: task.id.clone(),
                        text: task.text.clone(),
                        minutes: new,
                        delta,
                        at: now,
                    });
                }
            }
        }

        self.balance = self.balance.saturating_add(report.delta);
        report
    }

    /// Take points out of the balance, never below zero.
    pub fn debit(&mut self, amount: u64) {
        self.balance = self.balance.saturating_sub(amount);
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerSettings::default())
    }
}
