use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::interaction::InteractionEvent;
use crate::domain::item::{CatalogItem, ItemId};
use crate::domain::order::AcquisitionRecord;
use crate::domain::requester::{HouseholdId, RequesterId};
use crate::errors::SourceError;

/// Read interface the recommender needs from the store that owns the data.
///
/// Implementations must return requesters and items in a stable order; that
/// order becomes the tie-break order of the ranking.
#[async_trait]
pub trait InteractionSource: Send + Sync {
    /// Non-privileged requesters, in stable order.
    async fn list_eligible_requesters(&self) -> Result<Vec<RequesterId>, SourceError>;

    async fn list_items(&self) -> Result<Vec<CatalogItem>, SourceError>;

    async fn list_interaction_events(&self) -> Result<Vec<InteractionEvent>, SourceError>;

    /// Acquisitions from paid, shipped or completed orders of the household.
    async fn list_settled_acquisitions(
        &self,
        household: HouseholdId,
    ) -> Result<Vec<AcquisitionRecord>, SourceError>;

    async fn count_total_interactions_per_item(&self)
        -> Result<HashMap<ItemId, u64>, SourceError>;

    async fn household_of(&self, requester: RequesterId)
        -> Result<Option<HouseholdId>, SourceError>;

    /// Everything one call scores against, read as a single consistent view.
    ///
    /// Acquisitions are included only when `requester` belongs to a household.
    /// The default issues the reads above one after another; stores that can
    /// read under one transaction override it.
    async fn read_snapshot(
        &self,
        requester: Option<RequesterId>,
    ) -> Result<Snapshot, SourceError> {
        let mut snapshot = Snapshot {
            requesters: self.list_eligible_requesters().await?,
            items: self.list_items().await?,
            events: self.list_interaction_events().await?,
            acquisitions: Vec::new(),
            interaction_counts: self.count_total_interactions_per_item().await?,
        };
        if let Some(requester) = requester {
            if let Some(household) = self.household_of(requester).await? {
                snapshot.acquisitions = self.list_settled_acquisitions(household).await?;
            }
        }
        Ok(snapshot)
    }
}

/// Everything one recommendation call reads, fetched before any scoring.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub requesters: Vec<RequesterId>,
    pub items: Vec<CatalogItem>,
    pub events: Vec<InteractionEvent>,
    pub acquisitions: Vec<AcquisitionRecord>,
    pub interaction_counts: HashMap<ItemId, u64>,
}

impl Snapshot {
    /// Reads the population plus the settled acquisitions of the requester's
    /// household, if it has one.
    pub async fn read(
        source: &dyn InteractionSource,
        requester: RequesterId,
    ) -> Result<Self, SourceError> {
        source.read_snapshot(Some(requester)).await
    }

    /// Reads requesters, items, events and counts without any purchase history.
    pub async fn read_population(source: &dyn InteractionSource) -> Result<Self, SourceError> {
        source.read_snapshot(None).await
    }

    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }
}
