//! Offline precision / recall evaluation of the recommender.
//!
//! Each requester with at least one acquisition is scored on a copy of the
//! snapshot with every interaction they had with their acquired items held
//! out; the recommendations are then compared against those acquisitions.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::interaction::InteractionKind;
use crate::domain::item::ItemId;
use crate::domain::requester::RequesterId;
use crate::errors::ApplicationError;
use crate::recommend::{
    score_snapshot, validate_alpha, InteractionSource, RecommendRequest, RecommenderSettings,
    Snapshot,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl Grade {
    pub fn from_f1(f1: f64) -> Self {
        if f1 >= 0.7 {
            Self::Excellent
        } else if f1 >= 0.5 {
            Self::Good
        } else if f1 >= 0.3 {
            Self::Fair
        } else {
            Self::NeedsImprovement
        }
    }
}

/// Which way the recommender leans between precision and recall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Conservative,
    Aggressive,
    Balanced,
}

impl Bias {
    pub fn from_means(precision: f64, recall: f64) -> Self {
        if precision > recall {
            Self::Conservative
        } else if recall > precision {
            Self::Aggressive
        } else {
            Self::Balanced
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl MetricSummary {
    /// Upper median for even-sized samples. `None` for an empty sample.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|left, right| left.total_cmp(right));
        Some(Self {
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            median: sorted[sorted.len() / 2],
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequesterScore {
    pub requester_id: RequesterId,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl RequesterScore {
    pub fn compute(
        requester_id: RequesterId,
        recommended: &HashSet<ItemId>,
        acquired: &HashSet<ItemId>,
    ) -> Self {
        let hits = recommended.intersection(acquired).count() as f64;
        let precision =
            if recommended.is_empty() { 0.0 } else { hits / recommended.len() as f64 };
        let recall = if acquired.is_empty() { 0.0 } else { hits / acquired.len() as f64 };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self { requester_id, precision, recall, f1 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub top_n: usize,
    pub alpha: f64,
    pub evaluated_requesters: usize,
    pub precision: MetricSummary,
    pub recall: MetricSummary,
    pub f1: MetricSummary,
    pub grade: Grade,
    pub bias: Bias,
    pub per_requester: Vec<RequesterScore>,
}

pub async fn evaluate(
    source: &dyn InteractionSource,
    settings: &RecommenderSettings,
    top_n: usize,
    alpha: f64,
    as_of: DateTime<Utc>,
) -> Result<Option<EvaluationReport>, ApplicationError> {
    validate_alpha(alpha)?;
    let snapshot = Snapshot::read_population(source).await?;
    let report = evaluate_snapshot(&snapshot, settings, top_n, alpha, as_of);
    match &report {
        Some(report) => info!(
            event_name = "evaluation.completed",
            evaluated = report.evaluated_requesters,
            precision = report.precision.mean,
            recall = report.recall.mean,
            f1 = report.f1.mean,
            grade = ?report.grade,
            "recommender evaluation completed"
        ),
        None => info!(
            event_name = "evaluation.insufficient_data",
            "no requester had both acquisitions and recommendations"
        ),
    }
    Ok(report)
}

/// Runs the hold-out evaluation over an in-memory snapshot.
///
/// Returns `None` when no requester could be evaluated.
pub fn evaluate_snapshot(
    snapshot: &Snapshot,
    settings: &RecommenderSettings,
    top_n: usize,
    alpha: f64,
    as_of: DateTime<Utc>,
) -> Option<EvaluationReport> {
    let mut acquired_by: HashMap<RequesterId, HashSet<ItemId>> = HashMap::new();
    for event in &snapshot.events {
        if event.kind == InteractionKind::Acquire {
            acquired_by.entry(event.requester_id).or_default().insert(event.item_id);
        }
    }

    let mut per_requester = Vec::new();
    for requester in &snapshot.requesters {
        let Some(acquired) = acquired_by.get(requester) else {
            continue;
        };

        let held_out = hold_out(snapshot, *requester, acquired);
        let request = RecommendRequest::new(*requester, top_n, alpha).at(as_of);
        let recommendation = score_snapshot(&held_out, &request, settings);
        let recommended: HashSet<ItemId> = recommendation.item_ids().into_iter().collect();
        if recommended.is_empty() {
            debug!(
                event_name = "evaluation.requester.skipped",
                requester_id = %requester,
                "no recommendations produced"
            );
            continue;
        }

        per_requester.push(RequesterScore::compute(*requester, &recommended, acquired));
    }

    let precision: Vec<f64> = per_requester.iter().map(|score| score.precision).collect();
    let recall: Vec<f64> = per_requester.iter().map(|score| score.recall).collect();
    let f1: Vec<f64> = per_requester.iter().map(|score| score.f1).collect();

    let precision = MetricSummary::from_samples(&precision)?;
    let recall = MetricSummary::from_samples(&recall)?;
    let f1 = MetricSummary::from_samples(&f1)?;

    Some(EvaluationReport {
        top_n,
        alpha,
        evaluated_requesters: per_requester.len(),
        grade: Grade::from_f1(f1.mean),
        bias: Bias::from_means(precision.mean, recall.mean),
        precision,
        recall,
        f1,
        per_requester,
    })
}

fn hold_out(snapshot: &Snapshot, requester: RequesterId, acquired: &HashSet<ItemId>) -> Snapshot {
    let events: Vec<_> = snapshot
        .events
        .iter()
        .filter(|event| event.requester_id != requester || !acquired.contains(&event.item_id))
        .cloned()
        .collect();

    let mut interaction_counts: HashMap<ItemId, u64> = HashMap::new();
    for event in &events {
        *interaction_counts.entry(event.item_id).or_insert(0) += 1;
    }

    Snapshot {
        requesters: snapshot.requesters.clone(),
        items: snapshot.items.clone(),
        events,
        acquisitions: Vec::new(),
        interaction_counts,
    }
}
