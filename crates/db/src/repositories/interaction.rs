use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Row, SqliteConnection};

use restock_core::domain::interaction::{InteractionEvent, InteractionKind};
use restock_core::domain::item::{CatalogItem, CategoryId, Item, ItemId};
use restock_core::domain::order::{AcquisitionRecord, PurchaseOrder};
use restock_core::domain::requester::{HouseholdId, Requester, RequesterId};
use restock_core::errors::SourceError;
use restock_core::recommend::{InteractionSource, Snapshot};

use super::{parse_timestamp, RepositoryError};
use crate::DbPool;

/// SQLite-backed interaction store.
pub struct SqlInteractionStore {
    pool: DbPool,
}

impl SqlInteractionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn insert_household(&self, id: HouseholdId, name: &str) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_household(&mut conn, id, name).await
    }

    pub async fn insert_requester(&self, requester: &Requester) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_requester(&mut conn, requester).await
    }

    pub async fn insert_category(&self, id: CategoryId, name: &str) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_category(&mut conn, id, name).await
    }

    pub async fn insert_item(&self, item: &Item) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_item(&mut conn, item).await
    }

    pub async fn record_event(&self, event: &InteractionEvent) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        record_event(&mut conn, event).await
    }

    /// Writes the order and its lines atomically.
    pub async fn insert_order(&self, order: &PurchaseOrder) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        insert_order(&mut tx, order).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn find_requester(
        &self,
        id: RequesterId,
    ) -> Result<Option<Requester>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, household_id, is_privileged FROM requester WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_requester(r)?)),
            None => Ok(None),
        }
    }

    /// Full catalog rows, ordered by id.
    pub async fn list_catalog(&self) -> Result<Vec<Item>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, category_id, name, replenishment_cycle_days FROM item ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect()
    }
}

#[async_trait]
impl InteractionSource for SqlInteractionStore {
    async fn list_eligible_requesters(&self) -> Result<Vec<RequesterId>, SourceError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        Ok(fetch_eligible_requesters(&mut conn).await?)
    }

    async fn list_items(&self) -> Result<Vec<CatalogItem>, SourceError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        Ok(fetch_items(&mut conn).await?)
    }

    async fn list_interaction_events(&self) -> Result<Vec<InteractionEvent>, SourceError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        Ok(fetch_events(&mut conn).await?)
    }

    async fn list_settled_acquisitions(
        &self,
        household: HouseholdId,
    ) -> Result<Vec<AcquisitionRecord>, SourceError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        Ok(fetch_settled_acquisitions(&mut conn, household).await?)
    }

    async fn count_total_interactions_per_item(
        &self,
    ) -> Result<HashMap<ItemId, u64>, SourceError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        Ok(fetch_interaction_counts(&mut conn).await?)
    }

    async fn household_of(
        &self,
        requester: RequesterId,
    ) -> Result<Option<HouseholdId>, SourceError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        Ok(fetch_household_of(&mut conn, requester).await?)
    }

    /// Runs every read inside one transaction so a concurrent reseed is
    /// either fully visible or not at all.
    async fn read_snapshot(
        &self,
        requester: Option<RequesterId>,
    ) -> Result<Snapshot, SourceError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let snapshot = read_snapshot_in(&mut tx, requester).await?;
        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(snapshot)
    }
}

async fn read_snapshot_in(
    conn: &mut SqliteConnection,
    requester: Option<RequesterId>,
) -> Result<Snapshot, RepositoryError> {
    let mut snapshot = Snapshot {
        requesters: fetch_eligible_requesters(conn).await?,
        items: fetch_items(conn).await?,
        events: fetch_events(conn).await?,
        acquisitions: Vec::new(),
        interaction_counts: fetch_interaction_counts(conn).await?,
    };
    if let Some(requester) = requester {
        if let Some(household) = fetch_household_of(conn, requester).await? {
            snapshot.acquisitions = fetch_settled_acquisitions(conn, household).await?;
        }
    }
    Ok(snapshot)
}

async fn fetch_eligible_requesters(
    conn: &mut SqliteConnection,
) -> Result<Vec<RequesterId>, RepositoryError> {
    let ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM requester WHERE is_privileged = 0 ORDER BY id")
            .fetch_all(&mut *conn)
            .await?;
    Ok(ids.into_iter().map(RequesterId).collect())
}

async fn fetch_items(conn: &mut SqliteConnection) -> Result<Vec<CatalogItem>, RepositoryError> {
    let rows = sqlx::query("SELECT id, replenishment_cycle_days FROM item ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| -> Result<CatalogItem, RepositoryError> {
            let id: i64 = row.try_get("id")?;
            let cycle: Option<i64> = row.try_get("replenishment_cycle_days")?;
            Ok(CatalogItem::new(ItemId(id), cycle))
        })
        .collect()
}

async fn fetch_events(
    conn: &mut SqliteConnection,
) -> Result<Vec<InteractionEvent>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT requester_id, item_id, kind, occurred_at FROM interaction_event ORDER BY id",
    )
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(row_to_event).collect()
}

async fn fetch_settled_acquisitions(
    conn: &mut SqliteConnection,
    household: HouseholdId,
) -> Result<Vec<AcquisitionRecord>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT o.household_id, l.item_id, l.acquired_at
         FROM order_line l
         JOIN purchase_order o ON o.id = l.order_id
         WHERE o.household_id = ? AND o.status IN ('paid', 'shipped', 'completed')
         ORDER BY l.acquired_at, l.id",
    )
    .bind(household.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| -> Result<AcquisitionRecord, RepositoryError> {
            let household_id: i64 = row.try_get("household_id")?;
            let item_id: i64 = row.try_get("item_id")?;
            let acquired_at: String = row.try_get("acquired_at")?;
            Ok(AcquisitionRecord {
                household_id: HouseholdId(household_id),
                item_id: ItemId(item_id),
                acquired_at: parse_timestamp("acquired_at", &acquired_at)?,
            })
        })
        .collect()
}

async fn fetch_interaction_counts(
    conn: &mut SqliteConnection,
) -> Result<HashMap<ItemId, u64>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT item_id, COUNT(*) AS interactions FROM interaction_event GROUP BY item_id",
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut counts = HashMap::with_capacity(rows.len());
    for row in &rows {
        let item_id: i64 = row.try_get("item_id")?;
        let interactions: i64 = row.try_get("interactions")?;
        let interactions = u64::try_from(interactions).map_err(|_| {
            RepositoryError::Decode(format!("negative interaction count for item {item_id}"))
        })?;
        counts.insert(ItemId(item_id), interactions);
    }
    Ok(counts)
}

async fn fetch_household_of(
    conn: &mut SqliteConnection,
    requester: RequesterId,
) -> Result<Option<HouseholdId>, RepositoryError> {
    let household: Option<Option<i64>> =
        sqlx::query_scalar("SELECT household_id FROM requester WHERE id = ?")
            .bind(requester.0)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(household.flatten().map(HouseholdId))
}

pub(crate) async fn insert_household(
    conn: &mut SqliteConnection,
    id: HouseholdId,
    name: &str,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO household (id, name) VALUES (?, ?)")
        .bind(id.0)
        .bind(name)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn insert_requester(
    conn: &mut SqliteConnection,
    requester: &Requester,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO requester (id, name, household_id, is_privileged) VALUES (?, ?, ?, ?)")
        .bind(requester.id.0)
        .bind(&requester.name)
        .bind(requester.household_id.map(|household| household.0))
        .bind(requester.is_privileged)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn insert_category(
    conn: &mut SqliteConnection,
    id: CategoryId,
    name: &str,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO category (id, name) VALUES (?, ?)")
        .bind(id.0)
        .bind(name)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn insert_item(
    conn: &mut SqliteConnection,
    item: &Item,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO item (id, category_id, name, replenishment_cycle_days) VALUES (?, ?, ?, ?)",
    )
    .bind(item.id.0)
    .bind(item.category_id.0)
    .bind(&item.name)
    .bind(item.replenishment_cycle_days)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn record_event(
    conn: &mut SqliteConnection,
    event: &InteractionEvent,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO interaction_event (requester_id, item_id, kind, occurred_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(event.requester_id.0)
    .bind(event.item_id.0)
    .bind(event.kind.as_str())
    .bind(event.occurred_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_order(
    conn: &mut SqliteConnection,
    order: &PurchaseOrder,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO purchase_order (id, household_id, requester_id, status, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(order.id.0)
    .bind(order.household_id.0)
    .bind(order.placed_by.map(|requester| requester.0))
    .bind(order.status.as_str())
    .bind(order.created_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    for line in &order.lines {
        sqlx::query(
            "INSERT INTO order_line (order_id, item_id, quantity, acquired_at) VALUES (?, ?, ?, ?)",
        )
        .bind(order.id.0)
        .bind(line.item_id.0)
        .bind(i64::from(line.quantity))
        .bind(line.acquired_at.to_rfc3339())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

fn row_to_requester(row: &sqlx::sqlite::SqliteRow) -> Result<Requester, RepositoryError> {
    let id: i64 = row.try_get("id")?;
    let name: String = row.try_get("name")?;
    let household_id: Option<i64> = row.try_get("household_id")?;
    let is_privileged: bool = row.try_get("is_privileged")?;

    Ok(Requester {
        id: RequesterId(id),
        name,
        household_id: household_id.map(HouseholdId),
        is_privileged,
    })
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<Item, RepositoryError> {
    let id: i64 = row.try_get("id")?;
    let category_id: i64 = row.try_get("category_id")?;
    let name: String = row.try_get("name")?;
    let replenishment_cycle_days: Option<i64> = row.try_get("replenishment_cycle_days")?;

    Ok(Item { id: ItemId(id), category_id: CategoryId(category_id), name, replenishment_cycle_days })
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<InteractionEvent, RepositoryError> {
    let requester_id: i64 = row.try_get("requester_id")?;
    let item_id: i64 = row.try_get("item_id")?;
    let kind: String = row.try_get("kind")?;
    let occurred_at: String = row.try_get("occurred_at")?;

    let kind = kind
        .parse::<InteractionKind>()
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    Ok(InteractionEvent {
        requester_id: RequesterId(requester_id),
        item_id: ItemId(item_id),
        kind,
        occurred_at: parse_timestamp("occurred_at", &occurred_at)?,
    })
}
