//! # To-Don't Core Library
//!
//! Core logic for To-Don't, a task tracker that rewards *not* doing things.
//! Points accrue while a task is avoided and are partly forfeited when it is
//! finally done. Presentation lives elsewhere; this crate emits
//! display-ready notifications and persists through a key-value store.
//!
//! ## Architecture
//!
//! - **Ledger**: the task list and avoidance clock. A wall-clock-based state
//!   machine; the caller invokes `tick()` once per second.
//! - **Bingo**: a 5×5 board bound to the active tasks, with line detection and
//!   a celebration flag that clears itself after a few seconds.
//! - **Shop**: a fixed catalog of rewards bought with the points balance.
//! - **Session / Runtime**: the command facade and the tokio tasks that drive
//!   it.
//! - **Storage**: SQLite key-value persistence and TOML configuration.
//!
//! ## Key Components
//!
//! - [`Ledger`]: task bookkeeping and scoring
//! - [`BingoBoard`]: board generation, marks and line evaluation
//! - [`Session`]: applies [`Command`]s and forwards [`Event`]s
//! - [`SessionHandle`]: owns the clock and celebration timers
//! - [`Config`]: application configuration management

pub mod bingo;
pub mod error;
pub mod events;
pub mod ledger;
pub mod notify;
pub mod runtime;
pub mod session;
pub mod shop;
pub mod storage;
pub mod task;

pub use bingo::{BingoBoard, BingoCell, BoardStrategy, WeekShift};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use ledger::{Ledger, PenaltyPolicy};
pub use notify::{Notification, NotificationSink, Severity};
pub use runtime::SessionHandle;
pub use session::{ApplyReport, Command, Session};
pub use shop::{Shop, ShopItem};
pub use storage::{Config, KeyValueStore, MemoryStore, SqliteStore};
pub use task::Task;
