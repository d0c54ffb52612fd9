use crate::commands::{build_runtime, load_config, open_store, CommandResult, Failure};
use restock_db::SeedDataset;

pub fn run(seed: u64) -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let store = open_store(&config).await?;
        let dataset = SeedDataset::generate(seed);
        dataset
            .load(store.pool())
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        store.pool().close().await;
        Ok::<_, Failure>(dataset.summary(seed))
    });

    match result {
        Ok(summary) => {
            let message = format!(
                "seeded {} households, {} requesters, {} items, {} events and {} orders",
                summary.households, summary.requesters, summary.items, summary.events, summary.orders
            );
            CommandResult::success_with_data("seed", message, summary)
        }
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}
