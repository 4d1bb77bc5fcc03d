use crate::ids::CardId;

/// Hover-preview lifecycle of a single content card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum HoverPhase {
    #[default]
    Idle,
    PendingActivation,
    Active,
}

/// Layer visibility the card view should render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CardView {
    pub card_id: CardId,
    pub phase: HoverPhase,
    pub poster_visible: bool,
    pub preview_visible: bool,
}

impl CardView {
    pub fn idle(card_id: CardId) -> Self {
        Self {
            card_id,
            phase: HoverPhase::Idle,
            poster_visible: true,
            preview_visible: false,
        }
    }
}
