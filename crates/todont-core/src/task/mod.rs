//! The unit of avoidance.
//!
//! A task is "active" while the user is successfully not doing it. Points are
//! whole minutes of the current avoidance interval; sub-minute progress stays
//! invisible until the next minute boundary.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Label shown in place of the running interval once a task is done.
pub const COMPLETED_LABEL: &str = "Completed 😱";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Start of the current avoidance interval.
    pub last_avoided_at: DateTime<Utc>,
    /// Seconds spent active, one per clock tick.
    #[serde(default)]
    pub total_avoidance_time: u64,
    pub is_active: bool,
    /// Whole minutes since `last_avoided_at`; a snapshot once inactive.
    #[serde(default)]
    pub points: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Planning estimate in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u32>,
}

impl Task {
    /// Create a fresh active task. Callers validate `text` first.
    pub fn new(text: &str, estimated_duration: Option<u32>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            created_at: now,
            last_avoided_at: now,
            total_avoidance_time: 0,
            is_active: true,
            points: 0,
            start_time: estimated_duration.map(|_| now),
            end_time: estimated_duration.map(|min| now + Duration::minutes(i64::from(min))),
            estimated_duration,
        }
    }

    /// Whole minutes elapsed since `last_avoided_at`, zero if the clock is behind it.
    pub fn elapsed_points(&self, now: DateTime<Utc>) -> u64 {
        let secs = (now - self.last_avoided_at).num_seconds().max(0) as u64;
        secs / 60
    }

    /// Running interval as `1h 2m 3s`, `2m 3s` or `3s`.
    pub fn avoidance_display(&self, now: DateTime<Utc>) -> String {
        if !self.is_active {
            return COMPLETED_LABEL.to_string();
        }
        let secs = (now - self.last_avoided_at).num_seconds().max(0) as u64;
        format_interval(secs)
    }
}

fn format_interval(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Trimmed, non-empty text or a rejection.
pub fn validate_text<'a>(field: &str, text: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty_text(field));
    }
    Ok(trimmed)
}

/// Accepted range for planning estimates, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    pub min: u32,
    pub max: u32,
}

impl Default for DurationRange {
    fn default() -> Self {
        Self { min: 5, max: 480 }
    }
}

impl DurationRange {
    pub fn validate(&self, minutes: u32) -> Result<u32, ValidationError> {
        if minutes < self.min || minutes > self.max {
            return Err(ValidationError::DurationOutOfRange {
                minutes,
                min: self.min,
                max: self.max,
            });
        }
        Ok(minutes)
    }

    /// `None` passes; `Some` must be in range.
    pub fn validate_optional(&self, minutes: Option<u32>) -> Result<Option<u32>, ValidationError> {
        minutes.map(|m| self.validate(m)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_starts_active_with_zero_points() {
        let now = Utc::now();
        let task = Task::new("Clean room", None, now);
        assert!(task.is_active);
        assert_eq!(task.points, 0);
        assert_eq!(task.created_at, now);
        assert_eq!(task.last_avoided_at, now);
        assert!(task.start_time.is_none());
        assert!(task.end_time.is_none());
    }

    #[test]
    fn estimate_sets_planning_window() {
        let now = Utc::now();
        let task = Task::new("Taxes", Some(30), now);
        assert_eq!(task.start_time, Some(now));
        assert_eq!(task.end_time, Some(now + Duration::minutes(30)));
    }

    #[test]
    fn elapsed_points_floors_to_whole_minutes() {
        let now = Utc::now();
        let mut task = Task::new("Dishes", None, now);
        task.last_avoided_at = now - Duration::seconds(119);
        assert_eq!(task.elapsed_points(now), 1);
        task.last_avoided_at = now - Duration::seconds(120);
        assert_eq!(task.elapsed_points(now), 2);
        task.last_avoided_at = now + Duration::seconds(30);
        assert_eq!(task.elapsed_points(now), 0);
    }

    #[test]
    fn display_formats_each_magnitude() {
        let now = Utc::now();
        let mut task = Task::new("Gym", None, now);
        task.last_avoided_at = now - Duration::seconds(7);
        assert_eq!(task.avoidance_display(now), "7s");
        task.last_avoided_at = now - Duration::seconds(125);
        assert_eq!(task.avoidance_display(now), "2m 5s");
        task.last_avoided_at = now - Duration::seconds(3723);
        assert_eq!(task.avoidance_display(now), "1h 2m 3s");
        task.is_active = false;
        assert_eq!(task.avoidance_display(now), COMPLETED_LABEL);
    }

    #[test]
    fn text_validation_trims() {
        assert_eq!(validate_text("task", "  call mom ").unwrap(), "call mom");
        assert!(validate_text("task", "   ").is_err());
    }

    #[test]
    fn duration_range_bounds_are_inclusive() {
        let range = DurationRange::default();
        assert!(range.validate(4).is_err());
        assert_eq!(range.validate(5).unwrap(), 5);
        assert_eq!(range.validate(480).unwrap(), 480);
        assert!(range.validate(481).is_err());
        assert_eq!(range.validate_optional(None).unwrap(), None);
    }

    #[test]
    fn legacy_record_without_accumulators_deserializes() {
        let json = r#"{
            "id": "1700000000000",
            "text": "Call the bank",
            "createdAt": "2024-01-01T10:00:00Z",
            "lastAvoidedAt": "2024-01-01T10:00:00Z",
            "isActive": true
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.total_avoidance_time, 0);
        assert_eq!(task.points, 0);
        assert!(task.estimated_duration.is_none());
    }
}
