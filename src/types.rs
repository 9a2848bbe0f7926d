//! Core data types and structures for the bento board.
//!
//! This module defines the fundamental data structures used throughout the
//! application: cards, grid geometry, rearrangement plans, and the context
//! handed to avoidance plugins on every drag tick.

use serde::{Deserialize, Serialize};

/// Unique identifier for a card. Generated cards use a UUID v4 string.
pub type CardId = String;

/// Preset footprint sizes for cards, in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSize {
    /// 1x1 cell
    Small,
    /// 2 wide, 1 tall
    Medium,
    /// 1 wide, 2 tall
    Large,
    /// 2x2 cells
    Wide,
}

impl CardSize {
    /// Returns the footprint for this size preset.
    pub fn units(self) -> Units {
        match self {
            CardSize::Small => Units { w: 1, h: 1 },
            CardSize::Medium => Units { w: 2, h: 1 },
            CardSize::Large => Units { w: 1, h: 2 },
            CardSize::Wide => Units { w: 2, h: 2 },
        }
    }
}

/// A card footprint expressed in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Units {
    /// Width in grid cells.
    pub w: i32,
    /// Height in grid cells.
    pub h: i32,
}

/// A cell position on the grid, top-left anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    /// Column index.
    pub x: i32,
    /// Row index.
    pub y: i32,
}

impl GridPos {
    /// Creates a position from column/row indices.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in grid-cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRect {
    /// Left column.
    pub x: i32,
    /// Top row.
    pub y: i32,
    /// Width in cells.
    pub w: i32,
    /// Height in cells.
    pub h: i32,
}

impl GridRect {
    /// Creates a rectangle anchored at `pos` with footprint `units`.
    pub fn at(pos: GridPos, units: Units) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            w: units.w,
            h: units.h,
        }
    }

    /// Top-left corner.
    pub fn pos(&self) -> GridPos {
        GridPos::new(self.x, self.y)
    }

    /// One past the rightmost column.
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    /// One past the bottom row.
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// Axis-aligned overlap test. Rectangles that merely touch do not overlap.
    pub fn overlaps(&self, other: &GridRect) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }

    /// Area of the intersection with `other`, in cells. Zero when disjoint.
    pub fn intersection_area(&self, other: &GridRect) -> i32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            return 0;
        }
        (x2 - x1) * (y2 - y1)
    }

    /// Encodes the rectangle as an area key, e.g. `"3,1,2,2"`. Used to detect
    /// when the drop target has moved to a materially different cell.
    pub fn area_key(&self) -> String {
        format!("{},{},{},{}", self.x, self.y, self.w, self.h)
    }
}

/// A rectangle in pixel coordinates, relative to the grid origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PxRect {
    /// Left edge in pixels.
    pub left: f32,
    /// Top edge in pixels.
    pub top: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

/// A single tile on the bento grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    /// Unique identifier for this card.
    pub id: CardId,
    /// User-displayable title.
    pub title: String,
    /// Preset footprint size; ignored when `units` is set.
    pub size: Option<CardSize>,
    /// Explicit footprint in grid units, overriding `size`.
    pub units: Option<Units>,
    /// Committed grid position, top-left anchored.
    pub position: GridPos,
    /// Fill color as RGB, a rendering hint only.
    pub color: [u8; 3],
}

impl Card {
    /// Creates a new card with a generated id at the given position.
    pub fn new(title: impl Into<String>, size: CardSize, position: GridPos) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            size: Some(size),
            units: None,
            position,
            color: [255, 255, 255],
        }
    }

    /// Resolves this card's footprint: explicit units if present, else the
    /// size preset, defaulting to `Wide` (2x2).
    pub fn footprint(&self) -> Units {
        if let Some(units) = self.units {
            return units;
        }
        self.size.unwrap_or(CardSize::Wide).units()
    }

    /// The card's footprint rectangle at its committed position.
    pub fn rect(&self) -> GridRect {
        GridRect::at(self.position, self.footprint())
    }
}

/// An instruction to relocate a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    /// The card to relocate.
    pub card_id: CardId,
    /// Its new grid position.
    pub to: GridPos,
}

/// What kind of motion an animation descriptor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationKind {
    /// Straight-line translation between two grid cells.
    Translate,
}

/// Easing curves for animation descriptors. Closed-form approximations, not
/// Bezier solvers; the presentation layer may substitute its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    /// Fast start, decelerating finish.
    Decelerate,
    /// Overshoots the target slightly before settling.
    Overshoot,
}

impl Easing {
    /// Evaluates the curve at `t` in `[0, 1]`.
    pub fn value(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Decelerate => 1.0 - (1.0 - t).powi(3),
            Easing::Overshoot => {
                let c1 = 1.70158;
                let c3 = c1 + 1.0;
                1.0 + c3 * (t - 1.0).powi(3) + c1 * (t - 1.0).powi(2)
            }
        }
    }
}

/// A hint for the presentation layer describing how a relocation should look.
/// Carries no authority over final positions.
#[derive(Debug, Clone)]
pub struct Animation {
    /// The card being animated.
    pub card_id: CardId,
    /// Motion type.
    pub kind: AnimationKind,
    /// Starting grid cell.
    pub from: GridPos,
    /// Ending grid cell.
    pub to: GridPos,
    /// Duration in milliseconds.
    pub duration_ms: f64,
    /// Easing curve to apply.
    pub easing: Easing,
}

/// The output of one plugin evaluation: moves to commit plus optional
/// animation hints, and an optional override for where the dragged card
/// itself should land (set by the rollback path).
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Relocations to apply to the grid model.
    pub moves: Vec<Move>,
    /// Rendering hints accompanying the moves.
    pub animations: Vec<Animation>,
    /// Where the dragged card should be committed instead of its drop target.
    pub drop_position: Option<GridPos>,
}

impl Plan {
    /// True when the plan carries nothing at all.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.animations.is_empty() && self.drop_position.is_none()
    }
}

/// The context supplied by the drag controller to every plugin hook.
///
/// `drop_rect` must be present for any avoidance computation to run; hooks
/// return `None` without it. `now_ms` is injected by the controller so hook
/// logic never reads a clock directly.
#[derive(Debug, Clone, Copy)]
pub struct AvoidanceContext<'a> {
    /// Number of grid columns.
    pub columns: i32,
    /// Gap between cells in pixels.
    pub gap: f32,
    /// Cell edge length in pixels.
    pub unit: f32,
    /// The card being dragged.
    pub dragged: &'a Card,
    /// Pixel rectangle where the dragged card would land, if known.
    pub drop_rect: Option<PxRect>,
    /// Drop target cell, if the controller has resolved one.
    pub drop_target: Option<GridPos>,
    /// The full committed card list, including the dragged card.
    pub cards: &'a [Card],
    /// Current timestamp in milliseconds.
    pub now_ms: f64,
    /// How long a card must overlap the target before being displaced.
    pub avoidance_delay_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: i32, y: i32, w: i32, h: i32) -> GridRect {
        GridRect { x, y, w, h }
    }

    #[test]
    fn test_size_presets() {
        assert_eq!(CardSize::Small.units(), Units { w: 1, h: 1 });
        assert_eq!(CardSize::Medium.units(), Units { w: 2, h: 1 });
        assert_eq!(CardSize::Large.units(), Units { w: 1, h: 2 });
        assert_eq!(CardSize::Wide.units(), Units { w: 2, h: 2 });
    }

    #[test]
    fn test_footprint_resolution() {
        let mut card = Card::new("a", CardSize::Small, GridPos::new(0, 0));
        assert_eq!(card.footprint(), Units { w: 1, h: 1 });

        // Explicit units win over the size preset.
        card.units = Some(Units { w: 3, h: 1 });
        assert_eq!(card.footprint(), Units { w: 3, h: 1 });

        // No size at all falls back to wide.
        card.units = None;
        card.size = None;
        assert_eq!(card.footprint(), Units { w: 2, h: 2 });
    }

    #[test]
    fn test_overlap_detection() {
        let a = rect(0, 0, 2, 2);
        assert!(a.overlaps(&rect(1, 1, 2, 2)));
        assert!(a.overlaps(&rect(0, 0, 1, 1)));
        // Edge-adjacent rectangles do not overlap.
        assert!(!a.overlaps(&rect(2, 0, 2, 2)));
        assert!(!a.overlaps(&rect(0, 2, 2, 2)));
        assert!(!a.overlaps(&rect(5, 5, 1, 1)));
    }

    #[test]
    fn test_intersection_area() {
        let a = rect(0, 0, 2, 2);
        assert_eq!(a.intersection_area(&rect(1, 1, 2, 2)), 1);
        assert_eq!(a.intersection_area(&rect(0, 0, 2, 2)), 4);
        assert_eq!(a.intersection_area(&rect(2, 0, 2, 2)), 0);
        assert_eq!(a.intersection_area(&rect(1, 0, 2, 1)), 1);
    }

    #[test]
    fn test_area_key() {
        assert_eq!(rect(3, 1, 2, 2).area_key(), "3,1,2,2");
        assert_eq!(rect(0, 0, 1, 1).area_key(), "0,0,1,1");
    }

    #[test]
    fn test_easing_endpoints() {
        for easing in [Easing::Decelerate, Easing::Overshoot] {
            assert!((easing.value(0.0) - 0.0).abs() < 1e-4);
            assert!((easing.value(1.0) - 1.0).abs() < 1e-4);
        }
        // The overshoot curve exceeds 1.0 partway through.
        assert!(Easing::Overshoot.value(0.8) > 1.0);
    }

    #[test]
    fn test_card_serialization_roundtrip() {
        let card = Card::new("Weather", CardSize::Medium, GridPos::new(4, 2));
        let json = serde_json::to_string(&card).unwrap();
        assert!(json.contains("\"medium\""));
        let back: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, card.id);
        assert_eq!(back.position, card.position);
        assert_eq!(back.footprint(), card.footprint());
    }

    #[test]
    fn test_plan_is_empty() {
        assert!(Plan::default().is_empty());
        let plan = Plan {
            moves: vec![Move {
                card_id: "a".into(),
                to: GridPos::new(1, 0),
            }],
            ..Default::default()
        };
        assert!(!plan.is_empty());
    }
}
