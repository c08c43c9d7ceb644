//! Persisted task array and points balance.
//!
//! Loading never fails: missing keys give defaults, unreadable payloads are
//! logged and replaced. A task record is only dropped when it has no text;
//! any other missing or unreadable field takes its default, which also
//! covers records written by older builds.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use super::KeyValueStore;
use crate::error::{CoreError, Result};
use crate::task::Task;

pub const TASKS_KEY: &str = "todont-tasks";
pub const POINTS_KEY: &str = "todont-points";

/// Everything the ledger needs to resume.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub balance: u64,
}

type Record = serde_json::Map<String, serde_json::Value>;

/// One field of a stored record, or `None` if absent or unreadable.
fn field<T: DeserializeOwned>(record: &Record, key: &str) -> Option<T> {
    record.get(key).and_then(|value| T::deserialize(value).ok())
}

fn record_id(record: &Record) -> Option<String> {
    match record.get("id")? {
        serde_json::Value::String(id) if !id.is_empty() => Some(id.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Rebuild a task field by field. Only a missing or empty `text` loses the
/// record; every other unreadable field takes its default.
fn task_from_record(record: &serde_json::Value, now: DateTime<Utc>) -> Option<Task> {
    let record = record.as_object()?;
    let text = record.get("text")?.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    let created_at = field(record, "createdAt").unwrap_or(now);
    Some(Task {
        id: record_id(record).unwrap_or_else(|| Uuid::new_v4().to_string()),
        text: text.to_string(),
        created_at,
        last_avoided_at: field(record, "lastAvoidedAt").unwrap_or(created_at),
        total_avoidance_time: field(record, "totalAvoidanceTime").unwrap_or(0),
        is_active: field(record, "isActive").unwrap_or(true),
        points: field(record, "points").unwrap_or(0),
        start_time: field(record, "startTime"),
        end_time: field(record, "endTime"),
        estimated_duration: field(record, "estimatedDuration"),
    })
}

/// Read tasks and balance, substituting defaults for anything unreadable.
pub fn load_snapshot(store: &dyn KeyValueStore, now: DateTime<Utc>) -> Snapshot {
    Snapshot {
        tasks: load_tasks(store, now),
        balance: load_balance(store),
    }
}

fn load_tasks(store: &dyn KeyValueStore, now: DateTime<Utc>) -> Vec<Task> {
    let raw = match store.get(TASKS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("failed to read {TASKS_KEY}: {e}");
            return Vec::new();
        }
    };

    let records: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(e) => {
            warn!("discarding unreadable {TASKS_KEY}: {e}");
            return Vec::new();
        }
    };

    let total = records.len();
    let tasks: Vec<Task> = records
        .iter()
        .filter_map(|record| task_from_record(record, now))
        .collect();
    if tasks.len() < total {
        warn!(skipped = total - tasks.len(), "skipped malformed task records");
    }
    tasks
}

fn load_balance(store: &dyn KeyValueStore) -> u64 {
    match store.get(POINTS_KEY) {
        Ok(Some(raw)) => raw.trim().parse::<u64>().unwrap_or_else(|e| {
            warn!("discarding unreadable {POINTS_KEY} '{raw}': {e}");
            0
        }),
        Ok(None) => 0,
        Err(e) => {
            warn!("failed to read {POINTS_KEY}: {e}");
            0
        }
    }
}

/// Write the full task array.
///
/// # Errors
/// Returns an error if serialization or the store write fails.
pub fn save_tasks(store: &dyn KeyValueStore, tasks: &[Task]) -> Result<()> {
    let json = serde_json::to_string(tasks)?;
    store.set(TASKS_KEY, &json).map_err(CoreError::from)
}

/// Write the points balance.
///
/// # Errors
/// Returns an error if the store write fails.
pub fn save_balance(store: &dyn KeyValueStore, balance: u64) -> Result<()> {
    store
        .set(POINTS_KEY, &balance.to_string())
        .map_err(CoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Duration;

    #[test]
    fn empty_store_loads_defaults() {
        let store = MemoryStore::new();
        assert_eq!(load_snapshot(&store, Utc::now()), Snapshot::default());
    }

    #[test]
    fn save_then_load_preserves_fields() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut task = Task::new("Clean room", Some(45), now - Duration::hours(1));
        task.points = 12;
        task.total_avoidance_time = 733;
        task.is_active = false;

        save_tasks(&store, &[task.clone()]).unwrap();
        save_balance(&store, 99).unwrap();

        let snapshot = load_snapshot(&store, now);
        assert_eq!(snapshot.tasks, vec![task]);
        assert_eq!(snapshot.balance, 99);
    }

    #[test]
    fn legacy_and_broken_records_are_recovered() {
        let store = MemoryStore::new();
        store
            .set(
                TASKS_KEY,
                r#"[
                    {"id": "1", "text": "Old task", "createdAt": "2024-01-01T00:00:00Z",
                     "lastAvoidedAt": "2024-01-02T00:00:00Z", "isActive": false, "points": 7},
                    {"id": "2", "text": "   "},
                    {"id": "3", "createdAt": "not a date", "text": "Bad date"},
                    {"text": "Bare"},
                    42
                ]"#,
            )
            .unwrap();
        store.set(POINTS_KEY, "lots").unwrap();

        let now = Utc::now();
        let snapshot = load_snapshot(&store, now);
        assert_eq!(snapshot.balance, 0);
        assert_eq!(snapshot.tasks.len(), 3);

        let old = &snapshot.tasks[0];
        assert_eq!(old.total_avoidance_time, 0);
        assert_eq!(old.points, 7);
        assert!(!old.is_active);

        let bad_date = &snapshot.tasks[1];
        assert_eq!(bad_date.id, "3");
        assert_eq!(bad_date.text, "Bad date");
        assert_eq!(bad_date.created_at, now);

        let bare = &snapshot.tasks[2];
        assert!(bare.is_active);
        assert_eq!(bare.created_at, now);
        assert_eq!(bare.last_avoided_at, now);
        assert!(!bare.id.is_empty());
    }

    #[test]
    fn one_bad_field_keeps_the_rest_of_the_task() {
        let store = MemoryStore::new();
        store
            .set(
                TASKS_KEY,
                r#"[{"id": 1, "text": "Pay rent", "createdAt": "garbage",
                     "lastAvoidedAt": "2024-01-02T00:00:00Z", "isActive": "yes",
                     "points": -40, "totalAvoidanceTime": 90, "estimatedDuration": 30}]"#,
            )
            .unwrap();

        let now = Utc::now();
        let tasks = load_snapshot(&store, now).tasks;
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.id, "1");
        assert_eq!(task.text, "Pay rent");
        assert_eq!(task.created_at, now);
        assert_eq!(task.last_avoided_at.to_rfc3339(), "2024-01-02T00:00:00+00:00");
        assert!(task.is_active);
        assert_eq!(task.points, 0);
        assert_eq!(task.total_avoidance_time, 90);
        assert_eq!(task.estimated_duration, Some(30));
    }

    #[test]
    fn unreadable_payload_falls_back_to_empty() {
        let store = MemoryStore::new();
        store.set(TASKS_KEY, "{ nope").unwrap();
        assert!(load_snapshot(&store, Utc::now()).tasks.is_empty());
    }

    #[test]
    fn stored_json_uses_camel_case_keys() {
        let store = MemoryStore::new();
        save_tasks(&store, &[Task::new("Dishes", None, Utc::now())]).unwrap();
        let raw = store.get(TASKS_KEY).unwrap().unwrap();
        assert!(raw.contains("\"lastAvoidedAt\""));
        assert!(raw.contains("\"totalAvoidanceTime\""));
        assert!(raw.contains("\"isActive\""));
    }
}
