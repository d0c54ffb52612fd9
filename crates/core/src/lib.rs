pub mod config;
pub mod domain;
pub mod errors;
pub mod evaluation;
pub mod recommend;

pub use domain::interaction::{InteractionEvent, InteractionKind};
pub use domain::item::{CatalogItem, CategoryId, Item, ItemId};
pub use domain::order::{AcquisitionRecord, OrderId, OrderLine, OrderStatus, PurchaseOrder};
pub use domain::requester::{HouseholdId, Requester, RequesterId};
pub use errors::{ApplicationError, DomainError, InterfaceError, SourceError};
pub use evaluation::{evaluate, EvaluationReport};
pub use recommend::{
    FallbackReason, InteractionSource, RecommendRequest, Recommendation, RecommendationStrategy,
    Recommender, RecommenderSettings, ScoredItem,
};
