use crate::domain::{
    identity::{IdGenerator, Identity},
    sequence,
};
use serde::{Deserialize, Serialize};

/// A card on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Identity,
    pub title: String,
    /// Back-reference to the owning column; the column's sequence is authoritative
    pub column_id: Identity,
}

impl Card {
    pub fn new(id: Identity, title: String, column_id: Identity) -> Self {
        Self {
            id,
            title,
            column_id,
        }
    }
}

/// A board column holding an ordered sequence of cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: Identity,
    pub title: String,
    pub cards: Vec<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Column {
    pub fn new(id: Identity, title: String) -> Self {
        Self {
            id,
            title,
            cards: Vec::new(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_cards(mut self, cards: Vec<Card>) -> Self {
        self.cards = cards;
        self
    }

    pub fn position_of(&self, card_id: &str) -> Option<usize> {
        self.cards.iter().position(|card| card.id == card_id)
    }
}

/// Kanban board snapshot: an ordered sequence of columns.
///
/// Every operation leaves `self` untouched and returns the next snapshot.
/// Unknown ids make an operation a no-op; callers compare snapshots (or check
/// existence beforehand) to learn whether an intent took effect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    columns: Vec<Column>,
}

impl Board {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.id == column_id)
    }

    fn column_mut(&mut self, column_id: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|col| col.id == column_id)
    }

    /// Locates a card, returning its column and index within that column
    pub fn find_card(&self, card_id: &str) -> Option<(&Column, usize)> {
        self.columns
            .iter()
            .find_map(|col| col.position_of(card_id).map(|index| (col, index)))
    }

    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.find_card(card_id)
            .map(|(column, index)| &column.cards[index])
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Total number of cards across all columns
    pub fn total_cards(&self) -> usize {
        self.columns.iter().map(|col| col.cards.len()).sum()
    }

    /// Moves the card at `source_index` of one column to `dest_index` of another
    /// (or the same) column.
    ///
    /// Unknown columns or an out-of-range source index leave the board unchanged.
    /// A destination index past the end appends.
    #[must_use]
    pub fn move_card(
        &self,
        source_column_id: &str,
        dest_column_id: &str,
        source_index: usize,
        dest_index: usize,
    ) -> Board {
        if self.column(source_column_id).is_none() || self.column(dest_column_id).is_none() {
            return self.clone();
        }

        let mut next = self.clone();
        let Some(mut card) = next
            .column_mut(source_column_id)
            .and_then(|col| sequence::remove_at(&mut col.cards, source_index))
        else {
            return self.clone();
        };

        if let Some(dest) = next.column_mut(dest_column_id) {
            card.column_id = dest.id.clone();
            sequence::insert_clamped(&mut dest.cards, dest_index, card);
        }
        next
    }

    /// Appends a new card with a fresh identity to the named column.
    ///
    /// Blank titles and unknown columns leave the board unchanged.
    #[must_use]
    pub fn add_card(&self, column_id: &str, title: &str) -> Board {
        if title.trim().is_empty() {
            return self.clone();
        }

        let mut next = self.clone();
        if let Some(col) = next.column_mut(column_id) {
            let card = Card::new(IdGenerator::new().card_id(), title.to_string(), col.id.clone());
            col.cards.push(card);
        }
        next
    }

    #[must_use]
    pub fn delete_card(&self, card_id: &str) -> Board {
        let mut next = self.clone();
        for col in &mut next.columns {
            if sequence::remove_where(&mut col.cards, |card| card.id == card_id).is_some() {
                break;
            }
        }
        next
    }

    /// Replaces a card's title; unchanged titles and unknown cards are no-ops
    #[must_use]
    pub fn rename_card(&self, card_id: &str, new_title: &str) -> Board {
        let mut next = self.clone();
        if let Some(card) = next
            .columns
            .iter_mut()
            .flat_map(|col| col.cards.iter_mut())
            .find(|card| card.id == card_id)
        {
            if card.title != new_title {
                card.title = new_title.to_string();
            }
        }
        next
    }

    /// Appends a new empty column with a fresh identity
    #[must_use]
    pub fn add_column(&self, title: &str, color: Option<&str>) -> Board {
        let mut column = Column::new(IdGenerator::new().column_id(), title.to_string());
        column.color = color.map(str::to_string);

        let mut next = self.clone();
        next.columns.push(column);
        next
    }

    /// Removes a column and every card in it.
    ///
    /// Protection of reserved columns is enforced by the editor, not here.
    #[must_use]
    pub fn delete_column(&self, column_id: &str) -> Board {
        let mut next = self.clone();
        next.columns.retain(|col| col.id != column_id);
        next
    }
}
