//! Points shop.
//!
//! A fixed catalog of rewards paid for with the avoidance balance. Ownership
//! is per session and is not persisted.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShopCategory {
    Rewards,
    Excuses,
    Boosts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShopItem {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub cost: u64,
    pub category: ShopCategory,
}

pub const CATALOG: [ShopItem; 5] = [
    ShopItem {
        id: "1",
        name: "Coffee Break Excuse",
        description: "Perfect excuse for a 30-minute coffee break",
        cost: 50,
        category: ShopCategory::Excuses,
    },
    ShopItem {
        id: "2",
        name: "Gaming Session Pass",
        description: "2-hour guilt-free gaming session",
        cost: 120,
        category: ShopCategory::Rewards,
    },
    ShopItem {
        id: "3",
        name: "Productivity Immunity",
        description: "Immune to guilt for 1 day",
        cost: 200,
        category: ShopCategory::Boosts,
    },
    ShopItem {
        id: "4",
        name: "Music Listening Marathon",
        description: "Justify 3 hours of just listening to music",
        cost: 80,
        category: ShopCategory::Rewards,
    },
    ShopItem {
        id: "5",
        name: "Ultimate Procrastinator Badge",
        description: "Show off your avoidance mastery",
        cost: 500,
        category: ShopCategory::Rewards,
    },
];

#[derive(Debug, Clone, Default)]
pub struct Shop {
    owned: BTreeSet<&'static str>,
}

impl Shop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(&self) -> &'static [ShopItem] {
        &CATALOG
    }

    pub fn item(id: &str) -> Option<&'static ShopItem> {
        CATALOG.iter().find(|item| item.id == id)
    }

    pub fn owns(&self, id: &str) -> bool {
        self.owned.contains(id)
    }

    /// Attempt a purchase against `balance`.
    ///
    /// Unknown or already owned items yield `None`. Otherwise the event says
    /// whether it went through; on `PurchaseCompleted` the caller debits `cost`.
    pub fn purchase(&mut self, id: &str, balance: u64, now: DateTime<Utc>) -> Option<Event> {
        let item = Self::item(id)?;
        if self.owns(item.id) {
            return None;
        }
        if balance < item.cost {
            return Some(Event::PurchaseDeclined {
                item_id: item.id.to_string(),
                name: item.name.to_string(),
                shortfall: item.cost - balance,
                at: now,
            });
        }
        self.owned.insert(item.id);
        Some(Event::PurchaseCompleted {
            item_id: item.id.to_string(),
            name: item.name.to_string(),
            cost: item.cost,
            at: now,
        })
    }
}
