//! Gesture-scoped bookkeeping for the avoidance engine.
//!
//! One instance lives inside the avoidance plugin and is cleared at both ends
//! of every drag gesture. Only the avoidance hooks mutate it.

use std::collections::HashMap;

use crate::types::{CardId, GridPos, GridRect};

/// A displacement currently in effect for one card.
#[derive(Debug, Clone)]
pub struct ActiveAvoid {
    /// Where the card sat before any avoidance moved it.
    pub orig: GridPos,
    /// Where the card has been nudged to.
    pub moved: GridPos,
    /// The drop-target area key this displacement belongs to.
    pub area_key: String,
}

/// The last move emitted for a card, used to de-duplicate redundant moves.
#[derive(Debug, Clone, Copy)]
pub struct LastMove {
    /// Target cell of the last emitted move.
    pub to: GridPos,
    /// When it was emitted, in milliseconds.
    pub ts: f64,
}

/// Mutable state tracking displacements, reservations, and overlap timing
/// for a single drag gesture.
#[derive(Debug, Default)]
pub struct AvoidanceState {
    /// Tentative, uncommitted rectangles held by displaced cards.
    pub reservations: HashMap<CardId, GridRect>,
    /// Pre-avoidance position of every displaced card, for rollback.
    pub originals: HashMap<CardId, GridPos>,
    /// The currently active displacement set.
    pub active_avoid: HashMap<CardId, ActiveAvoid>,
    /// Area key of the drop target the displacements were computed for.
    pub active_area_key: String,
    /// Last emitted target per card.
    pub last_moves: HashMap<CardId, LastMove>,
    /// When each card first began overlapping the drop target.
    pub overlap_start_ts: HashMap<CardId, f64>,
    /// The dragged card's position when the gesture began.
    pub drag_origin: Option<GridPos>,
}

impl AvoidanceState {
    /// Clears all bookkeeping. Called on both drag start and drag end so no
    /// state can leak between gestures.
    pub fn reset(&mut self) {
        self.reservations.clear();
        self.originals.clear();
        self.active_avoid.clear();
        self.active_area_key.clear();
        self.last_moves.clear();
        self.overlap_start_ts.clear();
        self.drag_origin = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_everything() {
        let mut state = AvoidanceState::default();
        state
            .reservations
            .insert("a".into(), GridRect { x: 0, y: 0, w: 1, h: 1 });
        state.originals.insert("a".into(), GridPos::new(0, 0));
        state.active_avoid.insert(
            "a".into(),
            ActiveAvoid {
                orig: GridPos::new(0, 0),
                moved: GridPos::new(1, 0),
                area_key: "0,0,2,2".into(),
            },
        );
        state.active_area_key = "0,0,2,2".into();
        state.last_moves.insert(
            "a".into(),
            LastMove {
                to: GridPos::new(1, 0),
                ts: 12.0,
            },
        );
        state.overlap_start_ts.insert("a".into(), 5.0);
        state.drag_origin = Some(GridPos::new(3, 3));

        state.reset();

        assert!(state.reservations.is_empty());
        assert!(state.originals.is_empty());
        assert!(state.active_avoid.is_empty());
        assert!(state.active_area_key.is_empty());
        assert!(state.last_moves.is_empty());
        assert!(state.overlap_start_ts.is_empty());
        assert!(state.drag_origin.is_none());
    }
}
