use std::collections::HashMap;
use std::sync::Arc;

use restock_core::domain::item::ItemId;
use restock_core::domain::requester::RequesterId;
use restock_core::recommend::{
    FallbackReason, RecommendRequest, Recommendation, RecommendationStrategy, Recommender,
};
use serde::Serialize;

use crate::commands::{
    application_failure, build_runtime, load_config, open_store, parse_as_of, CommandResult,
    Failure,
};

#[derive(Debug, Clone, Default)]
pub struct RecommendOptions {
    pub requester: i64,
    pub top_n: Option<usize>,
    pub alpha: Option<f64>,
    pub as_of: Option<String>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct RankedItem {
    rank: usize,
    item_id: ItemId,
    name: Option<String>,
    score: f64,
    replenishment_due: bool,
}

#[derive(Debug, Serialize)]
struct RecommendationView {
    requester_id: RequesterId,
    strategy: RecommendationStrategy,
    fallback_reason: Option<FallbackReason>,
    items: Vec<RankedItem>,
}

pub fn run(options: RecommendOptions) -> CommandResult {
    let config = match load_config("recommend") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("recommend") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let settings = config.recommender.settings();
    let request_top_n = options.top_n.unwrap_or(settings.top_n);
    let request_alpha = options.alpha.unwrap_or(settings.alpha);

    let result = runtime.block_on(async {
        let as_of = parse_as_of(options.as_of.as_deref())?;
        let store = Arc::new(open_store(&config).await?);
        let catalog = store
            .list_catalog()
            .await
            .map_err(|error| ("data_unavailable", error.to_string(), 7u8))?;
        let names: HashMap<ItemId, String> =
            catalog.into_iter().map(|item| (item.id, item.name)).collect();

        let recommender = Recommender::with_settings(store.clone(), settings);
        let request =
            RecommendRequest::new(RequesterId(options.requester), request_top_n, request_alpha)
                .at(as_of);
        let recommendation = recommender.recommend_at(request).await.map_err(application_failure)?;
        store.pool().close().await;
        Ok::<_, Failure>(view(recommendation, &names))
    });

    match result {
        Ok(view) if options.json => {
            let message = format!(
                "{} recommendation(s) for requester {}",
                view.items.len(),
                view.requester_id
            );
            CommandResult::success_with_data("recommend", message, view)
        }
        Ok(view) => CommandResult::text(render_human(&view)),
        Err(failure) => CommandResult::from_failure("recommend", failure),
    }
}

fn view(recommendation: Recommendation, names: &HashMap<ItemId, String>) -> RecommendationView {
    let items = recommendation
        .items
        .iter()
        .enumerate()
        .map(|(position, scored)| RankedItem {
            rank: position + 1,
            item_id: scored.item_id,
            name: names.get(&scored.item_id).cloned(),
            score: scored.score,
            replenishment_due: recommendation.replenishment_due.contains(&scored.item_id),
        })
        .collect();

    RecommendationView {
        requester_id: recommendation.requester_id,
        strategy: recommendation.strategy,
        fallback_reason: recommendation.fallback_reason,
        items,
    }
}

fn render_human(view: &RecommendationView) -> String {
    let mut lines = vec![match view.fallback_reason {
        Some(reason) => format!(
            "recommendations for requester {} (popularity fallback: {})",
            view.requester_id,
            reason.as_str()
        ),
        None => format!(
            "recommendations for requester {} ({})",
            view.requester_id,
            view.strategy.as_str()
        ),
    }];

    if view.items.is_empty() {
        lines.push("  (no items to recommend)".to_string());
    }
    for item in &view.items {
        let marker = if item.replenishment_due { " [restock]" } else { "" };
        lines.push(format!(
            "  {:>2}. item {} {} score={:.4}{marker}",
            item.rank,
            item.item_id,
            item.name.as_deref().unwrap_or("<unknown>"),
            item.score
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use restock_core::domain::item::ItemId;
    use restock_core::domain::requester::RequesterId;
    use restock_core::recommend::{
        FallbackReason, Recommendation, RecommendationStrategy, ScoredItem,
    };

    use super::{render_human, view};

    #[test]
    fn json_view_uses_snake_case_enum_names() {
        let recommendation = Recommendation {
            requester_id: RequesterId(8),
            strategy: RecommendationStrategy::Popularity,
            fallback_reason: Some(FallbackReason::NoInteractions),
            items: Vec::new(),
            replenishment_due: Vec::new(),
        };

        let payload = serde_json::to_value(view(recommendation, &HashMap::new())).expect("json");
        assert_eq!(payload["strategy"], "popularity");
        assert_eq!(payload["fallback_reason"], "no_interactions");
    }

    #[test]
    fn human_output_marks_items_due_for_restock() {
        let recommendation = Recommendation {
            requester_id: RequesterId(4),
            strategy: RecommendationStrategy::Collaborative,
            fallback_reason: None,
            items: vec![
                ScoredItem { item_id: ItemId(9), score: 2.5 },
                ScoredItem { item_id: ItemId(3), score: 0.75 },
            ],
            replenishment_due: vec![ItemId(9)],
        };
        let names = HashMap::from([(ItemId(9), "Laundry #9".to_string())]);

        let rendered = render_human(&view(recommendation, &names));

        assert!(rendered.starts_with("recommendations for requester 4 (collaborative)"));
        assert!(rendered.contains("1. item 9 Laundry #9 score=2.5000 [restock]"));
        assert!(rendered.contains("2. item 3 <unknown> score=0.7500"));
    }

    #[test]
    fn fallback_reason_is_reported() {
        let recommendation = Recommendation {
            requester_id: RequesterId(8),
            strategy: RecommendationStrategy::Popularity,
            fallback_reason: Some(FallbackReason::UnknownRequester),
            items: Vec::new(),
            replenishment_due: Vec::new(),
        };

        let rendered = render_human(&view(recommendation, &HashMap::new()));

        assert!(rendered.contains("popularity fallback: unknown_requester"));
        assert!(rendered.contains("(no items to recommend)"));
    }
}
