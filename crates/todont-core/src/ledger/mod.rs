mod engine;
mod penalty;

pub use engine::{Ledger, LedgerSettings, TickReport};
pub use penalty::PenaltyPolicy;
