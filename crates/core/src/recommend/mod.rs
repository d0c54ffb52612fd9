//! Collaborative-filtering recommender with a replenishment boost.
//!
//! Every call reads a fresh [`Snapshot`] from an [`InteractionSource`], builds
//! a dense requester × item affinity matrix, scores items through
//! requester-based and item-based cosine similarity, blends the two rankings
//! and lifts items the household is about to run out of. Requesters the
//! model cannot place fall back to a plain popularity ranking.

pub mod engine;
pub mod fusion;
pub mod matrix;
pub mod popularity;
pub mod predictor;
pub mod replenishment;
pub mod similarity;
pub mod source;

pub use engine::{
    score_snapshot, validate_alpha, FallbackReason, RecommendRequest, Recommendation,
    RecommendationStrategy, Recommender, RecommenderSettings, ScoredItem,
};
pub use matrix::{AffinityModel, DenseIndex, EventWeights, Matrix, MatrixBuilder};
pub use replenishment::ReplenishmentAdvisor;
pub use source::{InteractionSource, Snapshot};

/// Weight of each interaction kind: observe 1, stage 3, acquire 5.
pub const DEFAULT_EVENT_WEIGHTS: EventWeights =
    EventWeights { observe: 1.0, stage: 3.0, acquire: 5.0 };

/// Share of the requester-based side in the blend.
pub const DEFAULT_ALPHA: f64 = 0.5;

pub const DEFAULT_TOP_N: usize = 10;

/// Share of an item's usage cycle after which it is due for repurchase.
pub const REPLENISHMENT_THRESHOLD: f64 = 0.7;

/// Added to the fused score of due items. Fused scores live in `[0, 1]`, so
/// this outranks every non-boosted item.
pub const REPLENISHMENT_BOOST: f64 = 2.0;
