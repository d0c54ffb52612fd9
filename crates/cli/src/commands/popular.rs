use std::sync::Arc;

use restock_core::recommend::{Recommender, ScoredItem};

use crate::commands::{
    application_failure, build_runtime, load_config, open_store, CommandResult, Failure,
};

pub fn run(top_n: Option<usize>, json: bool) -> CommandResult {
    let config = match load_config("popular") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("popular") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };
    let settings = config.recommender.settings();
    let top_n = top_n.unwrap_or(settings.top_n);

    let result = runtime.block_on(async {
        let store = Arc::new(open_store(&config).await?);
        let recommender = Recommender::with_settings(store.clone(), settings);
        let items = recommender.popular(top_n).await.map_err(application_failure)?;
        store.pool().close().await;
        Ok::<Vec<ScoredItem>, Failure>(items)
    });

    match result {
        Ok(items) if json => {
            let message = format!("{} most popular item(s)", items.len());
            CommandResult::success_with_data("popular", message, items)
        }
        Ok(items) => {
            let mut lines = vec![format!("top {top_n} items by total interactions:")];
            for (position, item) in items.iter().enumerate() {
                lines.push(format!(
                    "  {:>2}. item {} ({} interactions)",
                    position + 1,
                    item.item_id,
                    item.score
                ));
            }
            CommandResult::text(lines.join("\n"))
        }
        Err(failure) => CommandResult::from_failure("popular", failure),
    }
}
