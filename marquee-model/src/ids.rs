use uuid::Uuid;

/// Strongly typed ID for content items supplied by the catalog
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentId(pub Uuid);

impl Default for ContentId {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentId {
    pub fn new() -> Self {
        ContentId(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl AsRef<Uuid> for ContentId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly typed ID for a rendered content card (hover-preview target)
///
/// A card is a view of a content item; the same item may be rendered by
/// several cards at once, each with its own hover state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CardId(pub Uuid);

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl CardId {
    pub fn new() -> Self {
        CardId(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<ContentId> for CardId {
    fn from(value: ContentId) -> Self {
        CardId(value.0)
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "card:{}", self.0)
    }
}
