//! Deterministic synthetic dataset for demos and local evaluation.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use restock_core::domain::interaction::{InteractionEvent, InteractionKind};
use restock_core::domain::item::{CategoryId, Item, ItemId};
use restock_core::domain::order::{OrderId, OrderLine, OrderStatus, PurchaseOrder};
use restock_core::domain::requester::{HouseholdId, Requester, RequesterId};

use crate::connection::DbPool;
use crate::repositories::interaction::{
    insert_category, insert_household, insert_item, insert_order, insert_requester, record_event,
};
use crate::repositories::RepositoryError;

pub const DEFAULT_SEED: u64 = 20_240_601;

const HOUSEHOLDS: i64 = 20;
const REQUESTERS_PER_HOUSEHOLD: i64 = 2;
const ITEM_COUNT: i64 = 120;
const HISTORY_DAYS: i64 = 120;
const MAX_LINES_PER_ORDER: usize = 3;

const CYCLE_DAYS: &[i64] = &[7, 15, 30, 60, 90, 180];

const CATEGORIES: &[&str] = &[
    "Dairy",
    "Bakery",
    "Produce",
    "Pantry",
    "Beverages",
    "Frozen",
    "Snacks",
    "Cleaning",
    "Laundry",
    "Paper Goods",
    "Personal Care",
    "Baby",
    "Pet Supplies",
    "Health",
    "Household Tools",
];

/// Tables cleared before every load, children first.
const MANAGED_TABLES: &[&str] = &[
    "order_line",
    "purchase_order",
    "interaction_event",
    "item",
    "category",
    "requester",
    "household",
];

#[derive(Clone, Debug, PartialEq)]
pub struct SeedDataset {
    pub households: Vec<(HouseholdId, String)>,
    pub categories: Vec<(CategoryId, String)>,
    pub requesters: Vec<Requester>,
    pub items: Vec<Item>,
    pub events: Vec<InteractionEvent>,
    pub orders: Vec<PurchaseOrder>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub seed: u64,
    pub households: usize,
    pub requesters: usize,
    pub items: usize,
    pub events: usize,
    pub orders: usize,
}

/// Instant the generated history is laid out against.
pub fn seed_anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).single().unwrap_or_default()
}

impl SeedDataset {
    pub fn generate(seed: u64) -> Self {
        let anchor = seed_anchor();
        let mut rng = StdRng::seed_from_u64(seed);

        let households: Vec<(HouseholdId, String)> =
            (1..=HOUSEHOLDS).map(|id| (HouseholdId(id), format!("Household {id:02}"))).collect();

        let mut requesters = Vec::new();
        for (household_id, _) in &households {
            for member in 0..REQUESTERS_PER_HOUSEHOLD {
                let id = (household_id.0 - 1) * REQUESTERS_PER_HOUSEHOLD + member + 1;
                requesters.push(Requester {
                    id: RequesterId(id),
                    name: format!("Shopper {id:02}"),
                    household_id: Some(*household_id),
                    is_privileged: false,
                });
            }
        }
        let admin_id = HOUSEHOLDS * REQUESTERS_PER_HOUSEHOLD + 1;
        requesters.push(Requester {
            id: RequesterId(admin_id),
            name: "Store Admin".to_string(),
            household_id: None,
            is_privileged: true,
        });

        let categories: Vec<(CategoryId, String)> = CATEGORIES
            .iter()
            .zip(1..)
            .map(|(name, id)| (CategoryId(id), (*name).to_string()))
            .collect();

        let items: Vec<Item> = (1..=ITEM_COUNT)
            .map(|id| {
                let (category_id, category_name) = &categories[(id as usize - 1) % categories.len()];
                Item {
                    id: ItemId(id),
                    category_id: *category_id,
                    name: format!("{category_name} #{id}"),
                    replenishment_cycle_days: Some(
                        CYCLE_DAYS[rng.gen_range(0..CYCLE_DAYS.len())],
                    ),
                }
            })
            .collect();
        let item_ids: Vec<ItemId> = items.iter().map(|item| item.id).collect();

        let mut events = Vec::new();
        let mut orders = Vec::new();
        let mut next_order_id = 1;
        for requester in requesters.iter().filter(|requester| requester.is_eligible()) {
            let Some(household_id) = requester.household_id else {
                continue;
            };

            let touched = rng.gen_range(5..=15);
            let mut acquired = Vec::new();
            for (position, item_id) in item_ids.choose_multiple(&mut rng, touched).enumerate() {
                let seen_at = anchor
                    - Duration::days(rng.gen_range(1..=HISTORY_DAYS))
                    - Duration::hours(rng.gen_range(0..24));
                events.push(InteractionEvent::new(
                    requester.id,
                    *item_id,
                    InteractionKind::Observe,
                    seen_at,
                ));
                if rng.gen_bool(0.5) {
                    events.push(InteractionEvent::new(
                        requester.id,
                        *item_id,
                        InteractionKind::Stage,
                        seen_at + Duration::minutes(10),
                    ));
                }
                // every shopper ends up with at least two acquisitions
                if rng.gen_bool(0.3) || position < 2 {
                    let acquired_at = seen_at + Duration::minutes(30);
                    events.push(InteractionEvent::new(
                        requester.id,
                        *item_id,
                        InteractionKind::Acquire,
                        acquired_at,
                    ));
                    acquired.push(OrderLine { item_id: *item_id, quantity: 1, acquired_at });
                }
            }

            acquired.sort_by_key(|line| line.acquired_at);
            for lines in acquired.chunks(MAX_LINES_PER_ORDER) {
                let created_at = lines[0].acquired_at;
                orders.push(PurchaseOrder {
                    id: OrderId(next_order_id),
                    household_id,
                    placed_by: Some(requester.id),
                    status: pick_status(&mut rng),
                    created_at,
                    lines: lines.to_vec(),
                });
                next_order_id += 1;
            }
        }

        Self { households, categories, requesters, items, events, orders }
    }

    pub fn summary(&self, seed: u64) -> SeedSummary {
        SeedSummary {
            seed,
            households: self.households.len(),
            requesters: self.requesters.len(),
            items: self.items.len(),
            events: self.events.len(),
            orders: self.orders.len(),
        }
    }

    /// Replaces the contents of every modeled table with this dataset.
    pub async fn load(&self, pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        clear_tables(&mut tx).await?;

        for (id, name) in &self.households {
            insert_household(&mut tx, *id, name).await?;
        }
        for requester in &self.requesters {
            insert_requester(&mut tx, requester).await?;
        }
        for (id, name) in &self.categories {
            insert_category(&mut tx, *id, name).await?;
        }
        for item in &self.items {
            insert_item(&mut tx, item).await?;
        }
        for event in &self.events {
            record_event(&mut tx, event).await?;
        }
        for order in &self.orders {
            insert_order(&mut tx, order).await?;
        }

        tx.commit().await?;
        info!(
            event_name = "fixtures.seed.loaded",
            requesters = self.requesters.len(),
            items = self.items.len(),
            events = self.events.len(),
            orders = self.orders.len(),
            "seed dataset loaded"
        );
        Ok(())
    }

    pub async fn clear(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        clear_tables(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn clear_tables(conn: &mut sqlx::SqliteConnection) -> Result<(), RepositoryError> {
    for table in MANAGED_TABLES {
        sqlx::query(&format!("DELETE FROM {table}")).execute(&mut *conn).await?;
    }
    Ok(())
}

fn pick_status(rng: &mut StdRng) -> OrderStatus {
    match rng.gen_range(0..10) {
        0 => OrderStatus::Pending,
        1 => OrderStatus::Cancelled,
        2..=4 => OrderStatus::Paid,
        5..=6 => OrderStatus::Shipped,
        _ => OrderStatus::Completed,
    }
}
