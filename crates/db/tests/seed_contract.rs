use std::sync::Arc;

use restock_core::domain::requester::{HouseholdId, RequesterId};
use restock_core::recommend::{InteractionSource, RecommendRequest, Recommender};
use restock_db::fixtures::seed_anchor;
use restock_db::{
    connect_with_settings, migrations, InMemoryInteractionStore, SeedDataset, SqlInteractionStore,
    DEFAULT_SEED,
};

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

async fn seeded_sql_store(dataset: &SeedDataset) -> SeedContractTestResult<SqlInteractionStore> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate: {error}"))?;
    dataset.load(&pool).await.map_err(|error| format!("load: {error}"))?;
    Ok(SqlInteractionStore::new(pool))
}

async fn seeded_memory_store(dataset: &SeedDataset) -> InMemoryInteractionStore {
    let store = InMemoryInteractionStore::default();
    for requester in &dataset.requesters {
        store.save_requester(requester.clone()).await;
    }
    for item in &dataset.items {
        store.save_item(item.clone()).await;
    }
    for event in &dataset.events {
        store.record_event(event.clone()).await;
    }
    for order in &dataset.orders {
        store.save_order(order.clone()).await;
    }
    store
}

#[tokio::test]
async fn sql_and_memory_stores_serve_the_same_population() -> SeedContractTestResult {
    let dataset = SeedDataset::generate(DEFAULT_SEED);
    let sql = seeded_sql_store(&dataset).await?;
    let memory = seeded_memory_store(&dataset).await;

    let sql_requesters =
        sql.list_eligible_requesters().await.map_err(|error| error.to_string())?;
    let memory_requesters =
        memory.list_eligible_requesters().await.map_err(|error| error.to_string())?;
    require_eq!(sql_requesters, memory_requesters);
    require!(
        !sql_requesters.iter().any(|id| *id == RequesterId(41)),
        "privileged requester should not be eligible"
    );

    let sql_counts =
        sql.count_total_interactions_per_item().await.map_err(|error| error.to_string())?;
    let memory_counts =
        memory.count_total_interactions_per_item().await.map_err(|error| error.to_string())?;
    require_eq!(sql_counts, memory_counts);

    let sql_acquisitions = sql
        .list_settled_acquisitions(HouseholdId(1))
        .await
        .map_err(|error| error.to_string())?;
    let memory_acquisitions = memory
        .list_settled_acquisitions(HouseholdId(1))
        .await
        .map_err(|error| error.to_string())?;
    require_eq!(sql_acquisitions.len(), memory_acquisitions.len());

    Ok(())
}

#[tokio::test]
async fn sql_and_memory_stores_produce_identical_rankings() -> SeedContractTestResult {
    let dataset = SeedDataset::generate(DEFAULT_SEED);
    let sql = Recommender::new(Arc::new(seeded_sql_store(&dataset).await?));
    let memory = Recommender::new(Arc::new(seeded_memory_store(&dataset).await));

    for requester in [1, 2, 17, 40] {
        let request = RecommendRequest::new(RequesterId(requester), 10, 0.5).at(seed_anchor());
        let from_sql =
            sql.recommend_at(request).await.map_err(|error| error.to_string())?;
        let from_memory = memory.recommend_at(request).await.map_err(|error| error.to_string())?;

        require_eq!(from_sql.strategy, from_memory.strategy);
        require_eq!(from_sql.replenishment_due, from_memory.replenishment_due);
        require_eq!(from_sql.items.len(), from_memory.items.len());
        for (left, right) in from_sql.items.iter().zip(&from_memory.items) {
            require_eq!(left.item_id, right.item_id);
            require!(
                (left.score - right.score).abs() < 1e-9,
                "score mismatch for requester {requester} item {}: {} vs {}",
                left.item_id,
                left.score,
                right.score
            );
        }
    }

    Ok(())
}
