use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use restock_core::domain::interaction::InteractionEvent;
use restock_core::domain::item::{CatalogItem, Item, ItemId};
use restock_core::domain::order::{AcquisitionRecord, OrderId, PurchaseOrder};
use restock_core::domain::requester::{HouseholdId, Requester, RequesterId};
use restock_core::errors::SourceError;
use restock_core::recommend::{InteractionSource, Snapshot};

#[derive(Default)]
struct MemoryState {
    requesters: BTreeMap<RequesterId, Requester>,
    items: BTreeMap<ItemId, Item>,
    events: Vec<InteractionEvent>,
    orders: BTreeMap<OrderId, PurchaseOrder>,
}

impl MemoryState {
    fn eligible_requesters(&self) -> Vec<RequesterId> {
        self.requesters
            .values()
            .filter(|requester| requester.is_eligible())
            .map(|requester| requester.id)
            .collect()
    }

    fn catalog(&self) -> Vec<CatalogItem> {
        self.items.values().map(Item::catalog_entry).collect()
    }

    fn settled_acquisitions(&self, household: HouseholdId) -> Vec<AcquisitionRecord> {
        let mut acquisitions: Vec<AcquisitionRecord> = self
            .orders
            .values()
            .filter(|order| order.household_id == household)
            .flat_map(PurchaseOrder::acquisitions)
            .collect();
        acquisitions.sort_by_key(|record| record.acquired_at);
        acquisitions
    }

    fn interaction_counts(&self) -> HashMap<ItemId, u64> {
        let mut counts = HashMap::new();
        for event in &self.events {
            *counts.entry(event.item_id).or_insert(0) += 1;
        }
        counts
    }

    fn household_of(&self, requester: RequesterId) -> Option<HouseholdId> {
        self.requesters.get(&requester).and_then(|requester| requester.household_id)
    }
}

/// Interaction store held entirely in memory. Ordering matches the SQL
/// store: requesters and items by id, events by insertion.
#[derive(Default)]
pub struct InMemoryInteractionStore {
    state: RwLock<MemoryState>,
}

impl InMemoryInteractionStore {
    pub async fn save_requester(&self, requester: Requester) {
        let mut state = self.state.write().await;
        state.requesters.insert(requester.id, requester);
    }

    pub async fn save_item(&self, item: Item) {
        let mut state = self.state.write().await;
        state.items.insert(item.id, item);
    }

    pub async fn record_event(&self, event: InteractionEvent) {
        let mut state = self.state.write().await;
        state.events.push(event);
    }

    pub async fn save_order(&self, order: PurchaseOrder) {
        let mut state = self.state.write().await;
        state.orders.insert(order.id, order);
    }
}

#[async_trait]
impl InteractionSource for InMemoryInteractionStore {
    async fn list_eligible_requesters(&self) -> Result<Vec<RequesterId>, SourceError> {
        Ok(self.state.read().await.eligible_requesters())
    }

    async fn list_items(&self) -> Result<Vec<CatalogItem>, SourceError> {
        Ok(self.state.read().await.catalog())
    }

    async fn list_interaction_events(&self) -> Result<Vec<InteractionEvent>, SourceError> {
        Ok(self.state.read().await.events.clone())
    }

    async fn list_settled_acquisitions(
        &self,
        household: HouseholdId,
    ) -> Result<Vec<AcquisitionRecord>, SourceError> {
        Ok(self.state.read().await.settled_acquisitions(household))
    }

    async fn count_total_interactions_per_item(
        &self,
    ) -> Result<HashMap<ItemId, u64>, SourceError> {
        Ok(self.state.read().await.interaction_counts())
    }

    async fn household_of(
        &self,
        requester: RequesterId,
    ) -> Result<Option<HouseholdId>, SourceError> {
        Ok(self.state.read().await.household_of(requester))
    }

    /// Builds the whole snapshot under a single read guard.
    async fn read_snapshot(
        &self,
        requester: Option<RequesterId>,
    ) -> Result<Snapshot, SourceError> {
        let state = self.state.read().await;
        let acquisitions = requester
            .and_then(|requester| state.household_of(requester))
            .map(|household| state.settled_acquisitions(household))
            .unwrap_or_default();

        Ok(Snapshot {
            requesters: state.eligible_requesters(),
            items: state.catalog(),
            events: state.events.clone(),
            acquisitions,
            interaction_counts: state.interaction_counts(),
        })
    }
}
