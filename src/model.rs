//! The committed grid model.
//!
//! [`BentoGrid`] owns the authoritative card list. Everything the avoidance
//! engine computes is a suggestion until it lands here via [`apply_moves`],
//! and every insertion path goes through a placement check so cards at rest
//! never overlap.
//!
//! [`apply_moves`]: BentoGrid::apply_moves

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_COLUMNS, DEFAULT_GAP, DEFAULT_UNIT};
use crate::types::{Card, CardId, CardSize, GridPos, GridRect, Move, Units};

/// Upper bound on the row-major probe in [`BentoGrid::find_valid_position`].
const PLACEMENT_SCAN_LIMIT: i32 = 100;

/// The committed card layout plus its geometry parameters.
#[derive(Debug, Clone)]
pub struct BentoGrid {
    cards: Vec<Card>,
    staged: Vec<(Card, GridPos)>,
    /// Number of columns.
    pub columns: i32,
    /// Gap between cells, in pixels.
    pub gap: f32,
    /// Cell edge length, in pixels.
    pub unit: f32,
}

impl Default for BentoGrid {
    fn default() -> Self {
        Self {
            cards: Vec::new(),
            staged: Vec::new(),
            columns: DEFAULT_COLUMNS,
            gap: DEFAULT_GAP,
            unit: DEFAULT_UNIT,
        }
    }
}

impl BentoGrid {
    /// An empty grid with the default geometry.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty grid with explicit geometry.
    pub fn with_geometry(columns: i32, unit: f32, gap: f32) -> Self {
        Self {
            columns: columns.max(1),
            unit,
            gap,
            ..Self::default()
        }
    }

    /// The committed cards.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Looks up a committed card by id.
    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Mutable lookup by id.
    pub fn card_mut(&mut self, id: &str) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == id)
    }

    /// Creates a card of the given size, places it at the nearest valid
    /// position to `want`, and returns its id.
    pub fn add_card(&mut self, title: impl Into<String>, size: CardSize, want: GridPos) -> CardId {
        let card = Card::new(title, size, want);
        let id = card.id.clone();
        self.place_card(card, want);
        id
    }

    /// Removes a card, returning it if it was committed.
    pub fn remove_card(&mut self, id: &str) -> Option<Card> {
        let idx = self.cards.iter().position(|c| c.id == id)?;
        Some(self.cards.remove(idx))
    }

    /// Moves a card to `to` if the cell is in bounds and collision free.
    /// Returns whether the move was applied.
    pub fn move_card(&mut self, id: &str, to: GridPos) -> bool {
        let Some(card) = self.card(id) else {
            return false;
        };
        let rect = GridRect::at(to, card.footprint());
        if !self.rect_in_bounds(rect) || self.collides_at(id, rect) {
            return false;
        }
        if let Some(card) = self.card_mut(id) {
            card.position = to;
        }
        true
    }

    /// Changes a card's size preset if the new footprint still fits at its
    /// position. Explicit units are cleared so the preset takes effect.
    pub fn resize_card(&mut self, id: &str, size: CardSize) -> bool {
        let Some(card) = self.card(id) else {
            return false;
        };
        let rect = GridRect::at(card.position, size.units());
        if !self.rect_in_bounds(rect) || self.collides_at(id, rect) {
            return false;
        }
        if let Some(card) = self.card_mut(id) {
            card.size = Some(size);
            card.units = None;
        }
        true
    }

    /// Applies planner moves directly. A move naming an unknown id is skipped
    /// so a plan computed against a stale card list cannot poison the model;
    /// duplicate ids resolve last-writer-wins.
    pub fn apply_moves(&mut self, moves: &[Move]) {
        for m in moves {
            match self.card_mut(&m.card_id) {
                Some(card) => card.position = m.to,
                None => warn!("dropping move for unknown card {}", m.card_id),
            }
        }
    }

    /// Whether `rect` overlaps any committed card other than `card_id`.
    pub fn collides_at(&self, card_id: &str, rect: GridRect) -> bool {
        self.cards
            .iter()
            .any(|c| c.id != card_id && rect.overlaps(&c.rect()))
    }

    fn rect_in_bounds(&self, rect: GridRect) -> bool {
        rect.x >= 0 && rect.y >= 0 && rect.right() <= self.columns
    }

    /// Picks a position for `card`: `want` if it is valid, otherwise the
    /// first free cell in row-major scan order, otherwise the origin.
    pub fn find_valid_position(&self, card: &Card, want: GridPos) -> GridPos {
        let units = card.footprint();
        let want_rect = GridRect::at(want, units);
        if self.rect_in_bounds(want_rect) && !self.collides_at(&card.id, want_rect) {
            return want;
        }
        for attempt in 0..PLACEMENT_SCAN_LIMIT {
            let pos = GridPos::new(attempt % self.columns, attempt / self.columns);
            let rect = GridRect::at(pos, units);
            if self.rect_in_bounds(rect) && !self.collides_at(&card.id, rect) {
                return pos;
            }
        }
        GridPos::new(0, 0)
    }

    /// Inserts `card` at the nearest valid position to `want`. When even the
    /// scan fallback collides, the probe continues past the scan limit; the
    /// grid is unbounded downward so a free row always exists.
    pub fn place_card(&mut self, mut card: Card, want: GridPos) -> GridPos {
        let mut pos = self.find_valid_position(&card, want);
        let units = card.footprint();
        if self.collides_at(&card.id, GridRect::at(pos, units)) {
            let mut y = PLACEMENT_SCAN_LIMIT / self.columns;
            loop {
                let probe = GridPos::new(0, y);
                if !self.collides_at(&card.id, GridRect::at(probe, units)) {
                    pos = probe;
                    break;
                }
                y += 1;
            }
        }
        debug!("placing {} at ({}, {})", card.id, pos.x, pos.y);
        card.position = pos;
        self.cards.push(card);
        pos
    }

    /// Parks a card for deferred insertion, committed later by
    /// [`commit_staged`](Self::commit_staged). The card is not visible on the
    /// grid while staged.
    pub fn stage_card(&mut self, card: Card, want: GridPos) {
        self.staged.push((card, want));
    }

    /// Inserts a previously staged card through [`place_card`]. Returns the
    /// committed position, or `None` if the id was never staged.
    ///
    /// [`place_card`]: Self::place_card
    pub fn commit_staged(&mut self, id: &str) -> Option<GridPos> {
        let idx = self.staged.iter().position(|(c, _)| c.id == id)?;
        let (card, want) = self.staged.remove(idx);
        Some(self.place_card(card, want))
    }

    /// Discards a staged card without inserting it.
    pub fn cancel_staged(&mut self, id: &str) -> Option<Card> {
        let idx = self.staged.iter().position(|(c, _)| c.id == id)?;
        Some(self.staged.remove(idx).0)
    }

    /// Captures the current layout as a flat id-to-metadata map.
    pub fn snapshot(&self) -> LayoutSnapshot {
        self.cards
            .iter()
            .map(|c| {
                (
                    c.id.clone(),
                    CardSnapshot {
                        size: c.size,
                        units: c.units,
                        position: c.position,
                    },
                )
            })
            .collect()
    }

    /// Applies a snapshot to the cards still present. Ids in the snapshot
    /// with no committed counterpart are ignored.
    pub fn restore(&mut self, snapshot: &LayoutSnapshot) {
        for card in &mut self.cards {
            if let Some(snap) = snapshot.get(&card.id) {
                card.size = snap.size;
                card.units = snap.units;
                card.position = snap.position;
            }
        }
    }
}

/// Per-card layout metadata captured by [`BentoGrid::snapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSnapshot {
    /// Size preset at capture time.
    pub size: Option<CardSize>,
    /// Explicit footprint at capture time.
    pub units: Option<Units>,
    /// Committed position at capture time.
    pub position: GridPos,
}

/// A saved layout: card id to metadata, serialized as flat JSON.
pub type LayoutSnapshot = HashMap<CardId, CardSnapshot>;
