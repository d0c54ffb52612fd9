use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

/// Catalog entry as seen by the recommender.
///
/// `replenishment_cycle_days` is the expected number of days a household
/// takes to use the item up. Missing, zero or negative cycles mark the item
/// as never eligible for a replenishment nudge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub replenishment_cycle_days: Option<i64>,
}

impl CatalogItem {
    pub fn new(id: ItemId, replenishment_cycle_days: Option<i64>) -> Self {
        Self { id, replenishment_cycle_days }
    }

    /// Cycle length in days when the item can be replenished at all.
    pub fn replenishment_cycle(&self) -> Option<u32> {
        self.replenishment_cycle_days
            .filter(|days| *days > 0)
            .and_then(|days| u32::try_from(days).ok())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub category_id: CategoryId,
    pub name: String,
    pub replenishment_cycle_days: Option<i64>,
}

impl Item {
    pub fn catalog_entry(&self) -> CatalogItem {
        CatalogItem::new(self.id, self.replenishment_cycle_days)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
