//! Flags household purchases that are close to being used up.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::domain::item::{CatalogItem, ItemId};
use crate::domain::order::AcquisitionRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplenishmentAdvisor {
    threshold: f64,
}

impl Default for ReplenishmentAdvisor {
    fn default() -> Self {
        Self { threshold: super::REPLENISHMENT_THRESHOLD }
    }
}

impl ReplenishmentAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `threshold` is the share of the usage cycle that must have elapsed.
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Share of the item's usage cycle consumed at `as_of`, in whole days.
    ///
    /// `None` for items with no positive cycle.
    pub fn consumed_share(
        &self,
        item: &CatalogItem,
        acquired_at: DateTime<Utc>,
        as_of: DateTime<Utc>,
    ) -> Option<f64> {
        let cycle = item.replenishment_cycle()?;
        let elapsed_days = (as_of - acquired_at).num_days();
        Some(elapsed_days as f64 / f64::from(cycle))
    }

    /// Items from `acquisitions` whose consumed share reached the threshold.
    pub fn due_items(
        &self,
        catalog: &[CatalogItem],
        acquisitions: &[AcquisitionRecord],
        as_of: DateTime<Utc>,
    ) -> BTreeSet<ItemId> {
        let by_id: HashMap<ItemId, &CatalogItem> =
            catalog.iter().map(|item| (item.id, item)).collect();

        acquisitions
            .iter()
            .filter(|record| {
                by_id
                    .get(&record.item_id)
                    .and_then(|item| self.consumed_share(item, record.acquired_at, as_of))
                    .is_some_and(|share| share >= self.threshold)
            })
            .map(|record| record.item_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::ReplenishmentAdvisor;
    use crate::domain::item::{CatalogItem, ItemId};
    use crate::domain::order::AcquisitionRecord;
    use crate::domain::requester::HouseholdId;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).single().expect("valid timestamp")
    }

    fn bought(item: i64, days_ago: i64) -> AcquisitionRecord {
        AcquisitionRecord {
            household_id: HouseholdId(1),
            item_id: ItemId(item),
            acquired_at: now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn flags_item_past_seventy_percent_of_cycle() {
        let catalog = [CatalogItem::new(ItemId(1), Some(10))];
        let due = ReplenishmentAdvisor::new().due_items(&catalog, &[bought(1, 8)], now());
        assert!(due.contains(&ItemId(1)));
    }

    #[test]
    fn exact_threshold_counts_as_due() {
        let catalog = [CatalogItem::new(ItemId(1), Some(10))];
        let advisor = ReplenishmentAdvisor::new();
        assert!(advisor.due_items(&catalog, &[bought(1, 7)], now()).contains(&ItemId(1)));
        assert!(advisor.due_items(&catalog, &[bought(1, 6)], now()).is_empty());
    }

    #[test]
    fn partial_days_are_not_counted() {
        let catalog = [CatalogItem::new(ItemId(1), Some(10))];
        let record = AcquisitionRecord {
            household_id: HouseholdId(1),
            item_id: ItemId(1),
            acquired_at: now() - Duration::days(6) - Duration::hours(23),
        };
        assert!(ReplenishmentAdvisor::new().due_items(&catalog, &[record], now()).is_empty());
    }

    #[test]
    fn items_without_a_positive_cycle_are_never_due() {
        let catalog = [
            CatalogItem::new(ItemId(1), None),
            CatalogItem::new(ItemId(2), Some(0)),
            CatalogItem::new(ItemId(3), Some(-5)),
        ];
        let records = [bought(1, 400), bought(2, 400), bought(3, 400)];
        assert!(ReplenishmentAdvisor::new().due_items(&catalog, &records, now()).is_empty());
    }

    #[test]
    fn future_acquisitions_are_never_due() {
        let catalog = [CatalogItem::new(ItemId(1), Some(10))];
        assert!(ReplenishmentAdvisor::new().due_items(&catalog, &[bought(1, -30)], now()).is_empty());
    }

    #[test]
    fn repeated_purchases_collapse_to_one_entry() {
        let catalog = [CatalogItem::new(ItemId(1), Some(10)), CatalogItem::new(ItemId(2), Some(30))];
        let records = [bought(1, 9), bought(1, 20), bought(2, 1)];
        let due = ReplenishmentAdvisor::new().due_items(&catalog, &records, now());
        assert_eq!(due.into_iter().collect::<Vec<_>>(), vec![ItemId(1)]);
    }

    #[test]
    fn custom_threshold_is_respected() {
        let catalog = [CatalogItem::new(ItemId(1), Some(10))];
        let advisor = ReplenishmentAdvisor::with_threshold(0.9);
        assert!(advisor.due_items(&catalog, &[bought(1, 8)], now()).is_empty());
        assert!(advisor.due_items(&catalog, &[bought(1, 9)], now()).contains(&ItemId(1)));
    }
}
