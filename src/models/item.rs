//! Represents a catalogue entry and the ordered collection of entries.

use serde::{Deserialize, Serialize};

/// A single catalogue entry.
///
/// Items are immutable once stored and carry no surrogate key: an item is
/// identified by its position in the repository's insertion order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(try_from = "StoredItem")]
pub struct Item {
    /// Display name, never empty.
    pub name: String,

    /// Free-form category label, never empty.
    pub category: String,

    /// Reference key of the stored image (`<sha256>.jpg`), empty when the
    /// item was created without one.
    #[serde(rename = "image_name")]
    pub image_ref: String,
}

impl Item {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        image_ref: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            image_ref: image_ref.into(),
        }
    }

    /// Check the fields every item must carry: a non-blank name and category.
    pub fn check_fields(name: &str, category: &str) -> Result<(), String> {
        for (field, value) in [("name", name), ("category", category)] {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
        }
        Ok(())
    }
}

/// Record shape as read from disk, checked before it becomes an `Item`.
#[derive(Deserialize)]
struct StoredItem {
    name: String,
    category: String,
    #[serde(rename = "image_name", default)]
    image_ref: String,
}

impl TryFrom<StoredItem> for Item {
    type Error = String;

    fn try_from(stored: StoredItem) -> Result<Self, Self::Error> {
        Item::check_fields(&stored.name, &stored.category)?;
        Ok(Item::new(stored.name, stored.category, stored.image_ref))
    }
}

/// All items in insertion order. Position is the lookup key.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemCollection {
    pub items: Vec<Item>,
}

impl ItemCollection {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ordinal lookup. Negative or out-of-range positions yield `None`.
    pub fn get(&self, position: i64) -> Option<&Item> {
        usize::try_from(position)
            .ok()
            .and_then(|idx| self.items.get(idx))
    }
}

impl From<Vec<Item>> for ItemCollection {
    fn from(items: Vec<Item>) -> Self {
        Self { items }
    }
}
