//! The storage shelf: a small holding area for cards taken off the grid.

use thiserror::Error;

use crate::constants::SHELF_CAPACITY;
use crate::types::Card;

/// Why a card could not be shelved.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShelfError {
    /// The shelf already holds its maximum number of cards.
    #[error("storage shelf is full ({capacity} cards)")]
    Full {
        /// The shelf's fixed capacity.
        capacity: usize,
    },
}

/// A card parked on the shelf, with the time it was stored.
#[derive(Debug, Clone)]
pub struct StoredCard {
    /// The shelved card, off the grid until restored.
    pub card: Card,
    /// When the card was stored, in milliseconds.
    pub stored_at: f64,
}

/// Bounded holding area for cards removed from the grid. Pure container;
/// putting a restored card back on the grid is the caller's job.
#[derive(Debug, Default)]
pub struct StorageShelf {
    cards: Vec<StoredCard>,
}

impl StorageShelf {
    /// An empty shelf.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shelved cards, oldest first.
    pub fn cards(&self) -> &[StoredCard] {
        &self.cards
    }

    /// Number of shelved cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the shelf is empty.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Whether the shelf is at capacity.
    pub fn is_full(&self) -> bool {
        self.cards.len() >= SHELF_CAPACITY
    }

    /// Shelves a card, stamping the storage time.
    pub fn store(&mut self, card: Card, now_ms: f64) -> Result<(), ShelfError> {
        if self.is_full() {
            return Err(ShelfError::Full {
                capacity: SHELF_CAPACITY,
            });
        }
        self.cards.push(StoredCard {
            card,
            stored_at: now_ms,
        });
        Ok(())
    }

    /// Takes a card off the shelf by id.
    pub fn take(&mut self, id: &str) -> Option<Card> {
        let idx = self.cards.iter().position(|s| s.card.id == id)?;
        Some(self.cards.remove(idx).card)
    }

    /// Empties the shelf, returning everything that was on it.
    pub fn clear(&mut self) -> Vec<Card> {
        self.cards.drain(..).map(|s| s.card).collect()
    }
}
