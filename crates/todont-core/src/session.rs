//! Session facade.
//!
//! Applies inbound commands to the ledger, the board and the shop, persists
//! through a [`KeyValueStore`] and forwards events to a [`NotificationSink`].
//! Everything here is synchronous; scheduling lives in [`crate::runtime`].
//!
//! Rejected commands (empty text, unknown ids, out-of-range estimates) change
//! nothing and notify nobody. Persistence failures are logged and never abort
//! a command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bingo::{BingoBoard, BoardOutcome, CelebrationPhase, WeekShift};
use crate::error::{Result, ValidationError};
use crate::events::Event;
use crate::ledger::{Ledger, TickReport};
use crate::notify::{LogSink, NotificationSink};
use crate::shop::Shop;
use crate::storage::{load_snapshot, save_balance, save_tasks, Config, KeyValueStore, SqliteStore};

/// Inbound command from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    AddTask {
        text: String,
        #[serde(default)]
        duration: Option<u32>,
    },
    ToggleTask {
        id: String,
    },
    DeleteTask {
        id: String,
    },
    RegenerateBoard,
    ToggleCell {
        id: usize,
    },
    CustomizeCell {
        id: usize,
        text: String,
        duration: u32,
    },
    ShiftWeek {
        direction: WeekShift,
    },
    Purchase {
        item_id: String,
    },
}

/// What a command did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub events: Vec<Event>,
    /// Celebration generation the caller should arm a clear timer for.
    pub armed: Option<u64>,
}

impl ApplyReport {
    fn from_event(event: Event) -> Self {
        Self {
            events: vec![event],
            armed: None,
        }
    }

    fn from_outcome(outcome: BoardOutcome) -> Self {
        let mut report = Self::default();
        report.absorb(outcome);
        report
    }

    fn absorb(&mut self, outcome: BoardOutcome) {
        self.events.extend(outcome.events);
        if outcome.armed.is_some() {
            self.armed = outcome.armed;
        }
    }
}

pub struct Session {
    ledger: Ledger,
    board: BingoBoard,
    shop: Shop,
    config: Config,
    store: Box<dyn KeyValueStore>,
    sink: Box<dyn NotificationSink>,
}

impl Session {
    /// Restore the ledger from `store` and build the first board.
    pub fn new(
        config: Config,
        store: Box<dyn KeyValueStore>,
        sink: Box<dyn NotificationSink>,
        now: DateTime<Utc>,
    ) -> Self {
        let snapshot = load_snapshot(store.as_ref(), now);
        let ledger = Ledger::from_parts(snapshot.tasks, snapshot.balance, config.ledger_settings());
        let mut board = BingoBoard::new(config.board_settings(), now.date_naive());
        let startup = board.regenerate(&ledger.active_tasks(), now);
        info!(
            tasks = ledger.tasks().len(),
            balance = ledger.balance(),
            "session restored"
        );

        let session = Self {
            ledger,
            board,
            shop: Shop::new(),
            config,
            store,
            sink,
        };
        // Demo pre-marks can complete a line before any command arrives.
        if let Some(outcome) = startup {
            session.dispatch(&outcome.events);
        }
        session
    }

    /// Generation of the celebration currently showing, if any.
    pub fn pending_celebration(&self) -> Option<u64> {
        match self.board.celebration().phase() {
            CelebrationPhase::Triggered { generation, .. } => Some(generation),
            CelebrationPhase::Idle => None,
        }
    }

    /// Open with the on-disk config and database, logging notifications.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub fn open(now: DateTime<Utc>) -> Result<Self> {
        let config = Config::load_or_default();
        let store = SqliteStore::open()?;
        Ok(Self::new(config, Box::new(store), Box::new(LogSink), now))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn board(&self) -> &BingoBoard {
        &self.board
    }

    pub fn shop(&self) -> &Shop {
        &self.shop
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn balance(&self) -> u64 {
        self.ledger.balance()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Apply one command. Rejections return an empty report.
    pub fn apply(&mut self, command: Command, now: DateTime<Utc>) -> ApplyReport {
        let result = match command {
            Command::AddTask { text, duration } => self.add_task(&text, duration, now),
            Command::ToggleTask { id } => self.toggle_task(&id, now),
            Command::DeleteTask { id } => self.delete_task(&id, now),
            Command::RegenerateBoard => Ok(self.regenerate_board(now)),
            Command::ToggleCell { id } => self
                .board
                .toggle_cell(id, now)
                .map(ApplyReport::from_outcome),
            Command::CustomizeCell { id, text, duration } => {
                let range = self.config.duration_range();
                self.board
                    .customize_cell(id, &text, duration, &range, now)
                    .map(ApplyReport::from_event)
            }
            Command::ShiftWeek { direction } => {
                let outcome = self
                    .board
                    .shift_week(direction, &self.ledger.active_tasks(), now);
                Ok(outcome.map(ApplyReport::from_outcome).unwrap_or_default())
            }
            Command::Purchase { item_id } => Ok(self.purchase(&item_id, now)),
        };

        match result {
            Ok(report) => {
                self.dispatch(&report.events);
                report
            }
            Err(e) => {
                debug!("command rejected: {e}");
                ApplyReport::default()
            }
        }
    }

    /// One clock step: accrue points, persist, notify milestones.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = self.ledger.tick(now);
        if let Some(event) = self.board.expire_due(now) {
            report.events.push(event);
        }
        debug!(delta = report.delta, balance = self.ledger.balance(), "tick");
        self.persist();
        self.dispatch(&report.events);
        report
    }

    /// Timer expiry for an armed celebration.
    pub fn expire_celebration(&mut self, generation: u64, now: DateTime<Utc>) -> Option<Event> {
        self.board.expire_celebration(generation, now)
    }

    /// Teardown. Clears any active celebration.
    pub fn dispose(&mut self) {
        self.board.dispose();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn add_task(
        &mut self,
        text: &str,
        duration: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<ApplyReport, ValidationError> {
        let (_, event) = self.ledger.add_task(text, duration, now)?;
        let mut report = ApplyReport::from_event(event);
        self.refresh_board(now, &mut report);
        self.persist();
        Ok(report)
    }

    fn toggle_task(&mut self, id: &str, now: DateTime<Utc>) -> Result<ApplyReport, ValidationError> {
        let event = self.ledger.toggle_task(id, now)?;
        let mut report = ApplyReport::from_event(event);
        if self.board.is_empty() {
            self.refresh_board(now, &mut report);
        } else if let Some(changed) = self.ledger.get(id) {
            report.absorb(self.board.sync_with_ledger(changed, self.ledger.tasks(), now));
        }
        self.persist();
        Ok(report)
    }

    fn delete_task(&mut self, id: &str, now: DateTime<Utc>) -> Result<ApplyReport, ValidationError> {
        let event = self.ledger.delete_task(id, now)?;
        let mut report = ApplyReport::from_event(event);
        self.refresh_board(now, &mut report);
        self.persist();
        Ok(report)
    }

    fn regenerate_board(&mut self, now: DateTime<Utc>) -> ApplyReport {
        self.board
            .regenerate(&self.ledger.active_tasks(), now)
            .map(ApplyReport::from_outcome)
            .unwrap_or_default()
    }

    fn purchase(&mut self, item_id: &str, now: DateTime<Utc>) -> ApplyReport {
        let Some(event) = self.shop.purchase(item_id, self.ledger.balance(), now) else {
            debug!(item_id, "purchase ignored");
            return ApplyReport::default();
        };
        if let Event::PurchaseCompleted { cost, .. } = &event {
            self.ledger.debit(*cost);
            self.persist();
        }
        ApplyReport::from_event(event)
    }

    /// An empty board is built as soon as there is something to build it
    /// from. An existing one keeps its cells and marks.
    fn refresh_board(&mut self, now: DateTime<Utc>, report: &mut ApplyReport) {
        if self.board.is_empty() {
            if let Some(outcome) = self.board.regenerate(&self.ledger.active_tasks(), now) {
                report.absorb(outcome);
            }
        }
    }

    fn persist(&self) {
        if let Err(e) = save_tasks(self.store.as_ref(), self.ledger.tasks()) {
            warn!("failed to save tasks: {e}");
        }
        if let Err(e) = save_balance(self.store.as_ref(), self.ledger.balance()) {
            warn!("failed to save balance: {e}");
        }
    }

    fn dispatch(&self, events: &[Event]) {
        if !self.config.notifications.enabled {
            return;
        }
        for notification in events.iter().filter_map(Event::notification) {
            self.sink.notify(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bingo::BoardStrategy;
    use crate::error::StorageError;
    use crate::notify::{MemorySink, Severity};
    use crate::storage::{MemoryStore, POINTS_KEY, TASKS_KEY};
    use chrono::Duration;

    fn config() -> Config {
        let mut config = Config::default();
        config.bingo.seed = Some(7);
        config
    }

    fn session_with(config: Config) -> (Session, MemorySink) {
        let sink = MemorySink::new();
        let session = Session::new(
            config,
            Box::new(MemoryStore::new()),
            Box::new(sink.clone()),
            Utc::now(),
        );
        (session, sink)
    }

    fn add(session: &mut Session, text: &str, now: DateTime<Utc>) -> String {
        session.apply(
            Command::AddTask {
                text: text.to_string(),
                duration: None,
            },
            now,
        );
        session
            .ledger()
            .tasks()
            .last()
            .map(|t| t.id.clone())
            .unwrap()
    }

    #[test]
    fn add_task_notifies_persists_and_builds_board() {
        let (mut session, sink) = session_with(config());
        assert!(session.board().is_empty());

        add(&mut session, "Clean room", Utc::now());

        let notes = sink.drain();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].title.ends_with("New Avoidance Mission!"));
        assert_eq!(session.board().cells().len(), 25);

        let raw = session.store().get(TASKS_KEY).unwrap().unwrap();
        assert!(raw.contains("Clean room"));
    }

    #[test]
    fn rejected_commands_change_nothing() {
        let (mut session, sink) = session_with(config());
        let now = Utc::now();

        let report = session.apply(
            Command::AddTask {
                text: "   ".to_string(),
                duration: None,
            },
            now,
        );
        assert_eq!(report, ApplyReport::default());

        session.apply(
            Command::AddTask {
                text: "Taxes".to_string(),
                duration: Some(2),
            },
            now,
        );
        session.apply(Command::ToggleTask { id: "nope".into() }, now);
        session.apply(Command::ToggleCell { id: 40 }, now);

        assert!(session.ledger().tasks().is_empty());
        assert!(sink.is_empty());
        assert!(session.store().get(TASKS_KEY).unwrap().is_none());
    }

    #[test]
    fn completing_forfeits_half_and_marks_cells() {
        let (mut session, sink) = session_with(config());
        let start = Utc::now();
        let id = add(&mut session, "Clean room", start);

        session.tick(start + Duration::seconds(600));
        assert_eq!(session.balance(), 10);

        let report = session.apply(Command::ToggleTask { id: id.clone() }, start + Duration::seconds(601));
        assert!(matches!(
            report.events[0],
            Event::TaskCompleted {
                points: 10,
                forfeited: 5,
                credited: 5,
                ..
            }
        ));
        assert_eq!(session.balance(), 5);
        assert!(session.board().cells().iter().all(|c| c.avoided));
        assert_eq!(session.board().completed_lines().len(), 12);
        assert!(report.armed.is_some());

        let titles: Vec<String> = sink.drain().into_iter().map(|n| n.title).collect();
        assert!(titles.iter().any(|t| t.ends_with("Productivity Alert!")));
        assert!(titles.iter().any(|t| t.ends_with("B-I-N-G-O!")));
        assert_eq!(
            session.store().get(POINTS_KEY).unwrap().as_deref(),
            Some("5")
        );
    }

    #[test]
    fn tick_persists_and_notifies_milestones() {
        let (mut session, sink) = session_with(config());
        let start = Utc::now();
        add(&mut session, "Clean room", start);
        sink.drain();

        let report = session.tick(start + Duration::seconds(300));
        assert_eq!(report.delta, 5);
        let notes = sink.drain();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Success);
        assert_eq!(
            session.store().get(POINTS_KEY).unwrap().as_deref(),
            Some("5")
        );
    }

    #[test]
    fn disabled_notifications_still_change_state() {
        let mut config = config();
        config.notifications.enabled = false;
        let (mut session, sink) = session_with(config);

        add(&mut session, "Clean room", Utc::now());
        assert_eq!(session.ledger().tasks().len(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn purchase_debits_balance() {
        let store = MemoryStore::new();
        store.set(POINTS_KEY, "130").unwrap();
        let sink = MemorySink::new();
        let mut session = Session::new(config(), Box::new(store), Box::new(sink.clone()), Utc::now());

        let now = Utc::now();
        session.apply(Command::Purchase { item_id: "2".into() }, now);
        assert_eq!(session.balance(), 10);
        assert!(session.shop().owns("2"));

        let report = session.apply(Command::Purchase { item_id: "1".into() }, now);
        assert!(matches!(
            report.events[0],
            Event::PurchaseDeclined { shortfall: 40, .. }
        ));
        assert_eq!(session.balance(), 10);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn session_restores_from_store() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let task = crate::task::Task::new("Dishes", None, now);
        save_tasks(&store, &[task]).unwrap();
        save_balance(&store, 42).unwrap();

        let session = Session::new(config(), Box::new(store), Box::new(MemorySink::new()), now);
        assert_eq!(session.balance(), 42);
        assert_eq!(session.ledger().tasks()[0].text, "Dishes");
        assert_eq!(session.board().cells().len(), 25);
    }

    #[test]
    fn customize_and_shift_week() {
        let mut config = config();
        config.bingo.strategy = BoardStrategy::Suggestions;
        let (mut session, _sink) = session_with(config);
        let now = Utc::now();
        let start = session.board().start_date();

        let report = session.apply(
            Command::CustomizeCell {
                id: 3,
                text: "Fix bike".into(),
                duration: 30,
            },
            now,
        );
        assert_eq!(report.events.len(), 1);
        assert_eq!(session.board().cells()[3].estimated_duration, Some(30));

        let rejected = session.apply(
            Command::CustomizeCell {
                id: 3,
                text: "Fix car".into(),
                duration: 1,
            },
            now,
        );
        assert!(rejected.events.is_empty());
        assert_eq!(session.board().cells()[3].task, "Fix bike");

        session.apply(
            Command::ShiftWeek {
                direction: WeekShift::Next,
            },
            now,
        );
        assert_eq!(session.board().start_date(), start + chrono::Days::new(7));
        assert!(!session.board().cells()[3].custom);
    }

    #[test]
    fn expired_celebration_clears_on_tick() {
        let (mut session, _sink) = session_with(config());
        let start = Utc::now();
        let id = add(&mut session, "Clean room", start);
        let report = session.apply(Command::ToggleTask { id }, start);
        assert!(report.armed.is_some());
        assert!(session.board().celebration().is_triggered());

        let tick = session.tick(start + Duration::seconds(4));
        assert!(tick
            .events
            .iter()
            .any(|e| matches!(e, Event::CelebrationCleared { .. })));
        assert!(!session.board().celebration().is_triggered());
    }

    #[test]
    fn premarked_startup_board_notifies_bingo() {
        let mut config = config();
        config.bingo.strategy = BoardStrategy::Suggestions;
        config.bingo.demo_premark_probability = 1.0;
        let (session, sink) = session_with(config);

        assert_eq!(session.board().completed_lines().len(), 12);
        assert!(session.pending_celebration().is_some());
        let notes = sink.drain();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].title.ends_with("B-I-N-G-O!"));
    }

    #[test]
    fn unrelated_task_commands_keep_user_marks() {
        let (mut session, _sink) = session_with(config());
        let now = Utc::now();
        let laundry = add(&mut session, "Laundry", now);
        session.apply(
            Command::CustomizeCell {
                id: 0,
                text: "laundry".into(),
                duration: 30,
            },
            now,
        );
        session.apply(Command::ToggleCell { id: 0 }, now);
        assert!(session.board().cells()[0].avoided);

        let taxes = add(&mut session, "Taxes", now);
        assert!(session.board().cells()[0].avoided);

        session.apply(Command::ToggleTask { id: taxes.clone() }, now);
        session.apply(Command::DeleteTask { id: taxes }, now);
        assert!(session.board().cells()[0].avoided);

        // Completing then resuming Laundry is what clears the custom mark.
        session.apply(Command::ToggleTask { id: laundry.clone() }, now);
        session.apply(Command::ToggleTask { id: laundry }, now);
        assert!(!session.board().cells()[0].avoided);
        assert!(session.board().cells()[1].avoided);
    }

    #[test]
    fn unvalidated_celebration_length_cannot_crash_startup() {
        let mut config = config();
        config.bingo.strategy = BoardStrategy::Suggestions;
        config.bingo.demo_premark_probability = 1.0;
        config.bingo.celebration_secs = 10_000_000_000_000_000;
        let (session, _sink) = session_with(config);
        assert!(session.board().celebration().is_triggered());
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> std::result::Result<Option<String>, StorageError> {
            Err(StorageError::Locked)
        }

        fn set(&self, _key: &str, _value: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::Locked)
        }
    }

    #[test]
    fn storage_failures_never_abort_commands() {
        let sink = MemorySink::new();
        let mut session = Session::new(config(), Box::new(FailingStore), Box::new(sink.clone()), Utc::now());
        add(&mut session, "Clean room", Utc::now());
        assert_eq!(session.ledger().tasks().len(), 1);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn commands_deserialize_from_tagged_json() {
        let cmd: Command = serde_json::from_str(r#"{"type":"addTask","text":"Gym"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::AddTask {
                text: "Gym".into(),
                duration: None
            }
        );
        let cmd: Command =
            serde_json::from_str(r#"{"type":"shiftWeek","direction":"previous"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::ShiftWeek {
                direction: WeekShift::Previous
            }
        );
    }
}
