use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::item::ItemId;
use crate::domain::requester::RequesterId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Observe,
    Stage,
    Acquire,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 3] = [Self::Observe, Self::Stage, Self::Acquire];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Observe => "observe",
            Self::Stage => "stage",
            Self::Acquire => "acquire",
        }
    }
}

impl FromStr for InteractionKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "observe" | "view" => Ok(Self::Observe),
            "stage" | "add_to_cart" => Ok(Self::Stage),
            "acquire" | "purchase" => Ok(Self::Acquire),
            other => Err(DomainError::InvalidParameter {
                name: "interaction_kind",
                reason: format!("unknown interaction kind `{other}`"),
            }),
        }
    }
}

/// Immutable record of one requester touching one item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub requester_id: RequesterId,
    pub item_id: ItemId,
    pub kind: InteractionKind,
    pub occurred_at: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn new(
        requester_id: RequesterId,
        item_id: ItemId,
        kind: InteractionKind,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self { requester_id, item_id, kind, occurred_at }
    }
}

#[cfg(test)]
mod tests {
    use super::InteractionKind;

    #[test]
    fn parses_canonical_and_storefront_names() {
        assert_eq!("observe".parse::<InteractionKind>(), Ok(InteractionKind::Observe));
        assert_eq!("add_to_cart".parse::<InteractionKind>(), Ok(InteractionKind::Stage));
        assert_eq!(" Purchase ".parse::<InteractionKind>(), Ok(InteractionKind::Acquire));
        assert!("wishlist".parse::<InteractionKind>().is_err());
    }

    #[test]
    fn as_str_round_trips_through_from_str() {
        for kind in InteractionKind::ALL {
            assert_eq!(kind.as_str().parse::<InteractionKind>(), Ok(kind));
        }
    }
}
