//! Recommendation pipeline: snapshot → matrix → similarity → fusion → ranking.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::fusion::{apply_boost, fuse, rank};
use super::matrix::{EventWeights, MatrixBuilder};
use super::popularity::most_popular;
use super::predictor::predict;
use super::replenishment::ReplenishmentAdvisor;
use super::source::{InteractionSource, Snapshot};
use super::{DEFAULT_ALPHA, DEFAULT_TOP_N, REPLENISHMENT_BOOST, REPLENISHMENT_THRESHOLD};
use crate::domain::item::ItemId;
use crate::domain::requester::RequesterId;
use crate::errors::{ApplicationError, DomainError};

/// Tunables shared by every call made through one [`Recommender`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommenderSettings {
    pub alpha: f64,
    pub top_n: usize,
    pub replenishment_threshold: f64,
    pub replenishment_boost: f64,
    pub weights: EventWeights,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            top_n: DEFAULT_TOP_N,
            replenishment_threshold: REPLENISHMENT_THRESHOLD,
            replenishment_boost: REPLENISHMENT_BOOST,
            weights: EventWeights::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStrategy {
    Collaborative,
    Popularity,
}

impl RecommendationStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Collaborative => "collaborative",
            Self::Popularity => "popularity",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    EmptyPopulation,
    UnknownRequester,
    NoInteractions,
}

impl FallbackReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyPopulation => "empty_population",
            Self::UnknownRequester => "unknown_requester",
            Self::NoInteractions => "no_interactions",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item_id: ItemId,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub requester_id: RequesterId,
    pub strategy: RecommendationStrategy,
    pub fallback_reason: Option<FallbackReason>,
    pub items: Vec<ScoredItem>,
    /// Items the household is due to repurchase, boosted or not.
    pub replenishment_due: Vec<ItemId>,
}

impl Recommendation {
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.item_id).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecommendRequest {
    pub requester_id: RequesterId,
    pub top_n: usize,
    pub alpha: f64,
    pub as_of: DateTime<Utc>,
}

impl RecommendRequest {
    pub fn new(requester_id: RequesterId, top_n: usize, alpha: f64) -> Self {
        Self { requester_id, top_n, alpha, as_of: Utc::now() }
    }

    pub fn at(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = as_of;
        self
    }
}

pub fn validate_alpha(alpha: f64) -> Result<(), DomainError> {
    if alpha.is_finite() && (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(DomainError::InvalidParameter {
            name: "alpha",
            reason: format!("fusion weight must be within 0..=1, got {alpha}"),
        })
    }
}

/// Stateless recommender; every call rebuilds its model from a fresh read.
#[derive(Clone)]
pub struct Recommender {
    source: Arc<dyn InteractionSource>,
    settings: RecommenderSettings,
}

impl Recommender {
    pub fn new(source: Arc<dyn InteractionSource>) -> Self {
        Self::with_settings(source, RecommenderSettings::default())
    }

    pub fn with_settings(source: Arc<dyn InteractionSource>, settings: RecommenderSettings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &RecommenderSettings {
        &self.settings
    }

    /// Ordered item ids for `requester`, best first, at most `top_n`.
    pub async fn recommend(
        &self,
        requester: RequesterId,
        top_n: usize,
        alpha: f64,
    ) -> Result<Vec<ItemId>, ApplicationError> {
        let recommendation =
            self.recommend_at(RecommendRequest::new(requester, top_n, alpha)).await?;
        Ok(recommendation.item_ids())
    }

    pub async fn recommend_at(
        &self,
        request: RecommendRequest,
    ) -> Result<Recommendation, ApplicationError> {
        validate_alpha(request.alpha)?;
        let snapshot = Snapshot::read(self.source.as_ref(), request.requester_id).await?;
        debug!(
            event_name = "recommend.snapshot.loaded",
            requester_id = %request.requester_id,
            requesters = snapshot.requesters.len(),
            items = snapshot.items.len(),
            events = snapshot.events.len(),
            acquisitions = snapshot.acquisitions.len(),
            "interaction snapshot loaded"
        );

        let recommendation = score_snapshot(&snapshot, &request, &self.settings);
        info!(
            event_name = "recommend.completed",
            requester_id = %request.requester_id,
            strategy = ?recommendation.strategy,
            fallback_reason = ?recommendation.fallback_reason,
            returned = recommendation.items.len(),
            top_n = request.top_n,
            "recommendation computed"
        );
        Ok(recommendation)
    }

    /// Household items due for repurchase at `as_of`.
    pub async fn replenishment_due(
        &self,
        requester: RequesterId,
        as_of: DateTime<Utc>,
    ) -> Result<BTreeSet<ItemId>, ApplicationError> {
        let snapshot = Snapshot::read(self.source.as_ref(), requester).await?;
        let advisor = ReplenishmentAdvisor::with_threshold(self.settings.replenishment_threshold);
        Ok(advisor.due_items(&snapshot.items, &snapshot.acquisitions, as_of))
    }

    pub async fn popular(&self, top_n: usize) -> Result<Vec<ScoredItem>, ApplicationError> {
        let snapshot = Snapshot::read_population(self.source.as_ref()).await?;
        Ok(most_popular(&snapshot.item_ids(), &snapshot.interaction_counts, top_n)
            .into_iter()
            .map(|(item_id, count)| ScoredItem { item_id, score: count as f64 })
            .collect())
    }
}

/// Scores one request against an already-read snapshot. Pure computation.
pub fn score_snapshot(
    snapshot: &Snapshot,
    request: &RecommendRequest,
    settings: &RecommenderSettings,
) -> Recommendation {
    let catalog = snapshot.item_ids();
    let builder = MatrixBuilder::with_weights(settings.weights);
    let Some(model) = builder.build(&snapshot.requesters, &catalog, &snapshot.events) else {
        return popularity_fallback(snapshot, request, FallbackReason::EmptyPopulation);
    };
    if model.dropped_events > 0 {
        debug!(
            event_name = "recommend.matrix.dropped_events",
            dropped = model.dropped_events,
            "ignored events outside the current population"
        );
    }

    if model.is_cold(request.requester_id) {
        return popularity_fallback(snapshot, request, FallbackReason::NoInteractions);
    }
    let Some(predictions) = predict(&model, request.requester_id) else {
        return popularity_fallback(snapshot, request, FallbackReason::UnknownRequester);
    };

    let advisor = ReplenishmentAdvisor::with_threshold(settings.replenishment_threshold);
    let due = advisor.due_items(&snapshot.items, &snapshot.acquisitions, request.as_of);

    let mut scores = fuse(&predictions.requester_based, &predictions.item_based, request.alpha);
    let boosted = apply_boost(&mut scores, &model.items, &due, settings.replenishment_boost);
    debug!(
        event_name = "recommend.fusion.boosted",
        requester_id = %request.requester_id,
        due = due.len(),
        boosted,
        "replenishment boost applied"
    );

    // engaged items stay masked unless the household is due to rebuy them
    let excluded: Vec<bool> = predictions
        .interacted
        .iter()
        .enumerate()
        .map(|(col, interacted)| {
            *interacted && !model.items.id_at(col).is_some_and(|item_id| due.contains(&item_id))
        })
        .collect();

    let items = rank(&scores, &excluded, request.top_n)
        .into_iter()
        .filter_map(|(col, score)| model.items.id_at(col).map(|item_id| ScoredItem { item_id, score }))
        .collect();

    Recommendation {
        requester_id: request.requester_id,
        strategy: RecommendationStrategy::Collaborative,
        fallback_reason: None,
        items,
        replenishment_due: due.into_iter().collect(),
    }
}

fn popularity_fallback(
    snapshot: &Snapshot,
    request: &RecommendRequest,
    reason: FallbackReason,
) -> Recommendation {
    warn!(
        event_name = "recommend.fallback.popularity",
        requester_id = %request.requester_id,
        reason = ?reason,
        "falling back to popularity ranking"
    );
    let items = most_popular(&snapshot.item_ids(), &snapshot.interaction_counts, request.top_n)
        .into_iter()
        .map(|(item_id, count)| ScoredItem { item_id, score: count as f64 })
        .collect();

    Recommendation {
        requester_id: request.requester_id,
        strategy: RecommendationStrategy::Popularity,
        fallback_reason: Some(reason),
        items,
        replenishment_due: Vec::new(),
    }
}
