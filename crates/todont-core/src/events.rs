use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notify::{Notification, Severity};

/// Every state change in the system produces an Event.
/// The session turns the interesting ones into notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TaskAdded {
        task_id: String,
        text: String,
        at: DateTime<Utc>,
    },
    /// Active -> completed. `forfeited + credited == points`.
    TaskCompleted {
        task_id: String,
        text: String,
        points: u64,
        forfeited: u64,
        credited: u64,
        at: DateTime<Utc>,
    },
    TaskResumed {
        task_id: String,
        text: String,
        at: DateTime<Utc>,
    },
    TaskDeleted {
        task_id: String,
        text: String,
        at: DateTime<Utc>,
    },
    /// Points reached a multiple of the milestone interval.
    Milestone {
        task_id: String,
        text: String,
        minutes: u64,
        delta: u64,
        at: DateTime<Utc>,
    },
    BoardRegenerated {
        cells: usize,
        at: DateTime<Utc>,
    },
    CellToggled {
        cell_id: usize,
        avoided: bool,
        at: DateTime<Utc>,
    },
    CellCustomized {
        cell_id: usize,
        text: String,
        at: DateTime<Utc>,
    },
    /// The number of complete lines went up.
    BingoCompleted {
        lines: Vec<usize>,
        at: DateTime<Utc>,
    },
    CelebrationCleared {
        at: DateTime<Utc>,
    },
    PurchaseCompleted {
        item_id: String,
        name: String,
        cost: u64,
        at: DateTime<Utc>,
    },
    PurchaseDeclined {
        item_id: String,
        name: String,
        shortfall: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Display-ready record for the notification sink, if this event gets one.
    pub fn notification(&self) -> Option<Notification> {
        let n = match self {
            Event::TaskAdded { text, .. } => Notification::new(
                "🎯 New Avoidance Mission!",
                format!("Great! Now you can officially avoid: \"{text}\""),
                Severity::Info,
            )
            .with_duration_ms(2000),
            Event::TaskCompleted {
                text,
                forfeited,
                credited,
                ..
            } => Notification::new(
                "😱 Productivity Alert!",
                format!(
                    "Oh no! You actually did \"{text}\". Lost {forfeited} procrastination points, kept {credited}."
                ),
                Severity::Destructive,
            ),
            Event::TaskResumed { text, .. } => Notification::new(
                "🔄 Back to Avoiding!",
                format!("Welcome back to avoiding \"{text}\"!"),
                Severity::Info,
            ),
            Event::TaskDeleted { .. } => Notification::new(
                "🗑️ Mission Abandoned",
                "Task removed from your avoidance list!",
                Severity::Info,
            ),
            Event::Milestone { text, minutes, .. } => Notification::new(
                "🎉 Procrastination Master!",
                format!("You've avoided \"{text}\" for {minutes} minutes straight!"),
                Severity::Success,
            )
            .with_duration_ms(3000),
            Event::BingoCompleted { .. } => Notification::new(
                "🎉 B-I-N-G-O!",
                "You've completed a line of procrastination! Master level achieved!",
                Severity::Success,
            )
            .with_duration_ms(5000),
            Event::PurchaseCompleted { name, cost, .. } => Notification::new(
                "🛒 Purchase Successful!",
                format!("You bought \"{name}\" for {cost} points!"),
                Severity::Success,
            )
            .with_duration_ms(3000),
            Event::PurchaseDeclined { shortfall, .. } => Notification::new(
                "😅 Not Enough Points!",
                format!("You need {shortfall} more points to buy this item."),
                Severity::Destructive,
            ),
            Event::BoardRegenerated { .. }
            | Event::CellToggled { .. }
            | Event::CellCustomized { .. }
            | Event::CelebrationCleared { .. } => return None,
        };
        Some(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_notification_names_both_amounts() {
        let event = Event::TaskCompleted {
            task_id: "t".into(),
            text: "Laundry".into(),
            points: 10,
            forfeited: 5,
            credited: 5,
            at: Utc::now(),
        };
        let n = event.notification().unwrap();
        assert_eq!(n.severity, Severity::Destructive);
        assert!(n.description.contains("Laundry"));
        assert!(n.description.contains("Lost 5"));
        assert!(n.description.contains("kept 5"));
    }

    #[test]
    fn bookkeeping_events_stay_silent() {
        let at = Utc::now();
        assert!(Event::CellToggled { cell_id: 3, avoided: true, at }.notification().is_none());
        assert!(Event::CelebrationCleared { at }.notification().is_none());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::Milestone {
            task_id: "t".into(),
            text: "Clean room".into(),
            minutes: 5,
            delta: 5,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Milestone");
        assert_eq!(json["minutes"], 5);
    }
}
