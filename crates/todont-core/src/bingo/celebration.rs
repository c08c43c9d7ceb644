//! Bingo celebration flag.
//!
//! `Idle -> Triggered -> Idle`. A trigger arms a one-shot expiry; triggering
//! again while already triggered bumps the generation, and an expiry only
//! clears the generation it was armed for.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum CelebrationPhase {
    Idle,
    Triggered {
        generation: u64,
        expires_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
pub struct Celebration {
    phase: CelebrationPhase,
    generation: u64,
    duration: Duration,
}

impl Celebration {
    pub fn new(duration: Duration) -> Self {
        Self {
            phase: CelebrationPhase::Idle,
            generation: 0,
            duration,
        }
    }

    pub fn phase(&self) -> CelebrationPhase {
        self.phase
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self.phase, CelebrationPhase::Triggered { .. })
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Enter (or restart) `Triggered`. Returns the armed generation.
    pub fn trigger(&mut self, now: DateTime<Utc>) -> u64 {
        self.generation += 1;
        self.phase = CelebrationPhase::Triggered {
            generation: self.generation,
            expires_at: now
                .checked_add_signed(self.duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.generation
    }

    /// Timer expiry for `generation`. Stale generations are ignored.
    pub fn expire(&mut self, generation: u64) -> bool {
        match self.phase {
            CelebrationPhase::Triggered { generation: armed, .. } if armed == generation => {
                self.phase = CelebrationPhase::Idle;
                true
            }
            _ => false,
        }
    }

    /// Clear if the deadline has passed. For hosts that poll instead of arming timers.
    pub fn expire_due(&mut self, now: DateTime<Utc>) -> bool {
        match self.phase {
            CelebrationPhase::Triggered { expires_at, .. } if now >= expires_at => {
                self.phase = CelebrationPhase::Idle;
                true
            }
            _ => false,
        }
    }

    /// Drop back to idle unconditionally. Used on teardown.
    pub fn reset(&mut self) {
        self.phase = CelebrationPhase::Idle;
    }
}

impl Default for Celebration {
    fn default() -> Self {
        Self::new(Duration::seconds(3))
    }
}
