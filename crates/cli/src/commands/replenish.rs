use std::sync::Arc;

use restock_core::domain::item::ItemId;
use restock_core::domain::requester::RequesterId;
use restock_core::recommend::Recommender;
use serde::Serialize;

use crate::commands::{
    application_failure, build_runtime, load_config, open_store, parse_as_of, CommandResult,
    Failure,
};

#[derive(Debug, Serialize)]
struct DueItem {
    item_id: ItemId,
    name: Option<String>,
    replenishment_cycle_days: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ReplenishmentView {
    requester_id: RequesterId,
    as_of: String,
    threshold: f64,
    items: Vec<DueItem>,
}

pub fn run(requester: i64, as_of: Option<String>, json: bool) -> CommandResult {
    let config = match load_config("replenish") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("replenish") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };
    let settings = config.recommender.settings();

    let result = runtime.block_on(async {
        let as_of = parse_as_of(as_of.as_deref())?;
        let store = Arc::new(open_store(&config).await?);
        let recommender = Recommender::with_settings(store.clone(), settings);
        let due = recommender
            .replenishment_due(RequesterId(requester), as_of)
            .await
            .map_err(application_failure)?;
        let catalog = store
            .list_catalog()
            .await
            .map_err(|error| ("data_unavailable", error.to_string(), 7u8))?;
        store.pool().close().await;

        let items = due
            .iter()
            .map(|item_id| {
                let entry = catalog.iter().find(|item| item.id == *item_id);
                DueItem {
                    item_id: *item_id,
                    name: entry.map(|item| item.name.clone()),
                    replenishment_cycle_days: entry.and_then(|item| item.replenishment_cycle_days),
                }
            })
            .collect();

        Ok::<_, Failure>(ReplenishmentView {
            requester_id: RequesterId(requester),
            as_of: as_of.to_rfc3339(),
            threshold: settings.replenishment_threshold,
            items,
        })
    });

    match result {
        Ok(view) if json => {
            let message =
                format!("{} item(s) due for requester {}", view.items.len(), view.requester_id);
            CommandResult::success_with_data("replenish", message, view)
        }
        Ok(view) => CommandResult::text(render_human(&view)),
        Err(failure) => CommandResult::from_failure("replenish", failure),
    }
}

fn render_human(view: &ReplenishmentView) -> String {
    let mut lines = vec![format!(
        "items due for repurchase by requester {} as of {}:",
        view.requester_id, view.as_of
    )];
    if view.items.is_empty() {
        lines.push("  (nothing is running low)".to_string());
    }
    for item in &view.items {
        let cycle = item
            .replenishment_cycle_days
            .map(|days| format!("every {days} days"))
            .unwrap_or_else(|| "no cycle".to_string());
        lines.push(format!(
            "  - item {} {} ({cycle})",
            item.item_id,
            item.name.as_deref().unwrap_or("<unknown>")
        ));
    }
    lines.join("\n")
}
