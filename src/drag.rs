//! The drag gesture controller.
//!
//! Owns the plugin manager and the single live gesture. The UI feeds it raw
//! pointer samples; the controller coalesces them to one evaluation per frame,
//! builds the hook context, applies whatever plan the plugins return, and
//! commits or restores the dragged card when the gesture ends.

use log::debug;
use thiserror::Error;

use crate::avoidance::AvoidancePlugin;
use crate::constants::AVOIDANCE_DELAY_MS;
use crate::grid::to_grid_xy;
use crate::model::{BentoGrid, LayoutSnapshot};
use crate::plugins::{Hook, PlacementPlugin, PluginManager};
use crate::types::{Animation, AvoidanceContext, CardId, GridPos, GridRect, PxRect};

/// Why a gesture could not start.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DragError {
    /// A gesture is already live; gestures are strictly serialized.
    #[error("a drag gesture is already in progress")]
    GestureActive,
    /// The card id is not committed to the grid.
    #[error("no committed card with id {id}")]
    UnknownCard {
        /// The id that failed to resolve.
        id: CardId,
    },
}

/// State of the one live gesture.
#[derive(Debug)]
struct Gesture {
    card_id: CardId,
    /// Pointer offset from the card's top-left corner at grab time, px.
    grab_offset: (f32, f32),
    /// Latest computed drop rectangle, if the pointer has moved.
    drop_rect: Option<PxRect>,
    /// Clamped grid cell under the drop rectangle.
    drop_target: Option<GridPos>,
    /// Full layout at gesture start, for cancellation.
    snapshot: LayoutSnapshot,
}

/// Coordinates drag gestures between the UI, the plugins, and the model.
pub struct DragController {
    manager: PluginManager,
    gesture: Option<Gesture>,
    pending_pointer: Option<(f32, f32)>,
    /// How long an overlap must persist before avoidance reacts, ms.
    pub avoidance_delay_ms: f64,
}

impl Default for DragController {
    fn default() -> Self {
        let mut manager = PluginManager::new();
        manager.register(Box::new(AvoidancePlugin::new()));
        manager.register(Box::new(PlacementPlugin::new()));
        Self {
            manager,
            gesture: None,
            pending_pointer: None,
            avoidance_delay_ms: AVOIDANCE_DELAY_MS,
        }
    }
}

impl DragController {
    /// A controller with the stock plugins registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// The plugin manager, for registering extra plugins.
    pub fn plugins_mut(&mut self) -> &mut PluginManager {
        &mut self.manager
    }

    /// Id of the card being dragged, if a gesture is live.
    pub fn dragging(&self) -> Option<&str> {
        self.gesture.as_ref().map(|g| g.card_id.as_str())
    }

    /// The current drop target cell, if the pointer has produced one.
    pub fn drop_target(&self) -> Option<GridPos> {
        self.gesture.as_ref().and_then(|g| g.drop_target)
    }

    /// The current drop rectangle in pixels, for shadow rendering.
    pub fn drop_rect(&self) -> Option<PxRect> {
        self.gesture.as_ref().and_then(|g| g.drop_rect)
    }

    /// Pixel offset from the dragged card's corner to the grab point, so the
    /// card can be drawn under the pointer.
    pub fn grab_offset(&self) -> Option<(f32, f32)> {
        self.gesture.as_ref().map(|g| g.grab_offset)
    }

    /// Begins a gesture on `card_id` with the pointer at `pointer` px.
    /// Gestures are serialized: starting while one is live is an error.
    pub fn start_drag(
        &mut self,
        model: &BentoGrid,
        card_id: &str,
        pointer: (f32, f32),
    ) -> Result<(), DragError> {
        if self.gesture.is_some() {
            return Err(DragError::GestureActive);
        }
        let card = model.card(card_id).ok_or_else(|| DragError::UnknownCard {
            id: card_id.to_string(),
        })?;

        let cell = model.unit + model.gap;
        let grab_offset = (
            pointer.0 - card.position.x as f32 * cell,
            pointer.1 - card.position.y as f32 * cell,
        );
        self.gesture = Some(Gesture {
            card_id: card_id.to_string(),
            grab_offset,
            drop_rect: None,
            drop_target: None,
            snapshot: model.snapshot(),
        });
        self.pending_pointer = None;
        debug!("drag start on {card_id}");

        let ctx = make_ctx(model, card, None, None, 0.0, self.avoidance_delay_ms);
        self.manager.dispatch(Hook::DragStart, &ctx);
        Ok(())
    }

    /// Records a pointer sample. Only the latest sample per frame survives;
    /// evaluation happens in [`tick`](Self::tick).
    pub fn pointer_moved(&mut self, pointer: (f32, f32)) {
        if self.gesture.is_some() {
            self.pending_pointer = Some(pointer);
        }
    }

    /// Runs one evaluation against the latest pointer sample, applies any
    /// resulting moves, and returns the animations for the presentation
    /// layer. Call once per frame.
    pub fn tick(&mut self, model: &mut BentoGrid, now_ms: f64) -> Vec<Animation> {
        let Some(pointer) = self.pending_pointer else {
            return Vec::new();
        };
        let Some(gesture) = &mut self.gesture else {
            return Vec::new();
        };

        let Some(card) = model.card(&gesture.card_id) else {
            return Vec::new();
        };
        let (rect, target) = clamped_drop(model, pointer, gesture.grab_offset, card.footprint());
        gesture.drop_rect = Some(rect);
        gesture.drop_target = Some(target);

        let plan = {
            let ctx = make_ctx(
                model,
                card,
                Some(rect),
                Some(target),
                now_ms,
                self.avoidance_delay_ms,
            );
            self.manager.dispatch(Hook::DragUpdate, &ctx)
        };
        let Some(plan) = plan else {
            return Vec::new();
        };
        model.apply_moves(&plan.moves);
        plan.animations
    }

    /// Ends the gesture and commits the drop. Plan moves apply first, then
    /// the dragged card lands on the plan's drop position (the rollback path)
    /// or the pointer's clamped target, corrected to a collision-free cell.
    pub fn finish_drag(&mut self, model: &mut BentoGrid, now_ms: f64) -> Vec<Animation> {
        let Some(mut gesture) = self.gesture.take() else {
            return Vec::new();
        };

        let Some(card) = model.card(&gesture.card_id) else {
            self.pending_pointer = None;
            return Vec::new();
        };
        // A sample that arrived after the last tick still decides the drop.
        if let Some(pointer) = self.pending_pointer.take() {
            let (rect, target) = clamped_drop(model, pointer, gesture.grab_offset, card.footprint());
            gesture.drop_rect = Some(rect);
            gesture.drop_target = Some(target);
        }
        let origin = card.position;
        let plan = {
            let ctx = make_ctx(
                model,
                card,
                gesture.drop_rect,
                gesture.drop_target,
                now_ms,
                self.avoidance_delay_ms,
            );
            self.manager.dispatch(Hook::BeforeDrop, &ctx)
        };

        let mut animations = Vec::new();
        let mut target = gesture.drop_target.unwrap_or(origin);
        if let Some(plan) = plan {
            model.apply_moves(&plan.moves);
            if let Some(back_to) = plan.drop_position {
                target = back_to;
            }
            animations = plan.animations;
        }

        if let Some(card) = model.card(&gesture.card_id) {
            let landed = model.find_valid_position(card, target);
            let rect = GridRect::at(landed, card.footprint());
            let safe = !model.collides_at(&gesture.card_id, rect);
            if let Some(card) = model.card_mut(&gesture.card_id) {
                // The scan fallback can still collide on a packed grid; the
                // origin cell is known good from gesture start.
                card.position = if safe { landed } else { origin };
            }
        }

        self.dispatch_drag_end(model, &gesture.card_id, now_ms);
        debug!("drag finished for {}", gesture.card_id);
        animations
    }

    /// Aborts the gesture and puts every card back where it was when the
    /// gesture began.
    pub fn cancel_drag(&mut self, model: &mut BentoGrid) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        self.pending_pointer = None;
        model.restore(&gesture.snapshot);
        self.dispatch_drag_end(model, &gesture.card_id, 0.0);
        debug!("drag cancelled for {}", gesture.card_id);
    }

    fn dispatch_drag_end(&mut self, model: &BentoGrid, card_id: &str, now_ms: f64) {
        // The dragged card can have been removed mid-gesture; fall back to
        // any card just to carry the context through.
        let card = model.card(card_id).or_else(|| model.cards().first());
        if let Some(card) = card {
            let ctx = make_ctx(model, card, None, None, now_ms, self.avoidance_delay_ms);
            self.manager.dispatch(Hook::DragEnd, &ctx);
        }
    }
}

/// Computes the pixel drop rectangle and its clamped grid cell. The x cell is
/// clamped so the footprint stays inside the columns.
fn clamped_drop(
    model: &BentoGrid,
    pointer: (f32, f32),
    grab_offset: (f32, f32),
    units: crate::types::Units,
) -> (PxRect, GridPos) {
    let cell = model.unit + model.gap;
    let raw = to_grid_xy(
        pointer.0 - grab_offset.0,
        pointer.1 - grab_offset.1,
        model.unit,
        model.gap,
    );
    let target = GridPos::new(raw.x.min(model.columns - units.w).max(0), raw.y);
    let rect = PxRect {
        left: target.x as f32 * cell,
        top: target.y as f32 * cell,
        width: units.w as f32 * model.unit + (units.w - 1) as f32 * model.gap,
        height: units.h as f32 * model.unit + (units.h - 1) as f32 * model.gap,
    };
    (rect, target)
}

fn make_ctx<'a>(
    model: &'a BentoGrid,
    dragged: &'a crate::types::Card,
    drop_rect: Option<PxRect>,
    drop_target: Option<GridPos>,
    now_ms: f64,
    avoidance_delay_ms: f64,
) -> AvoidanceContext<'a> {
    AvoidanceContext {
        columns: model.columns,
        gap: model.gap,
        unit: model.unit,
        dragged,
        drop_rect,
        drop_target,
        cards: model.cards(),
        now_ms,
        avoidance_delay_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CardSize, Units};

    const CELL: f32 = 56.0; // unit 36 + gap 20

    fn px(x: i32, y: i32) -> (f32, f32) {
        (x as f32 * CELL, y as f32 * CELL)
    }

    fn controller() -> DragController {
        let mut c = DragController::new();
        c.avoidance_delay_ms = 0.0;
        c
    }

    fn assert_no_overlaps(model: &BentoGrid) {
        let cards = model.cards();
        for (i, a) in cards.iter().enumerate() {
            for b in &cards[i + 1..] {
                assert!(!a.rect().overlaps(&b.rect()), "{} vs {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn test_gestures_are_serialized() {
        let mut model = BentoGrid::new();
        let a = model.add_card("a", CardSize::Small, GridPos::new(0, 0));
        let b = model.add_card("b", CardSize::Small, GridPos::new(3, 0));

        let mut ctl = controller();
        ctl.start_drag(&model, &a, px(0, 0)).unwrap();
        assert_eq!(
            ctl.start_drag(&model, &b, px(3, 0)),
            Err(DragError::GestureActive)
        );
        assert_eq!(ctl.dragging(), Some(a.as_str()));
    }

    #[test]
    fn test_unknown_card_is_rejected() {
        let model = BentoGrid::new();
        let mut ctl = controller();
        assert_eq!(
            ctl.start_drag(&model, "ghost", px(0, 0)),
            Err(DragError::UnknownCard {
                id: "ghost".into()
            })
        );
        assert!(ctl.dragging().is_none());
    }

    #[test]
    fn test_tick_displaces_resident_card() {
        let mut model = BentoGrid::new();
        let resident = model.add_card("resident", CardSize::Small, GridPos::new(1, 0));
        let dragged = model.add_card("dragged", CardSize::Wide, GridPos::new(6, 6));

        let mut ctl = controller();
        ctl.start_drag(&model, &dragged, px(6, 6)).unwrap();
        ctl.pointer_moved(px(0, 0));
        ctl.tick(&mut model, 1000.0);

        let moved = model.card(&resident).unwrap().position;
        assert_ne!(moved, GridPos::new(1, 0));
        let shadow = GridRect {
            x: 0,
            y: 0,
            w: 2,
            h: 2,
        };
        assert!(!GridRect::at(moved, Units { w: 1, h: 1 }).overlaps(&shadow));
    }

    #[test]
    fn test_tick_without_sample_is_a_no_op() {
        let mut model = BentoGrid::new();
        let a = model.add_card("a", CardSize::Small, GridPos::new(0, 0));
        let mut ctl = controller();
        ctl.start_drag(&model, &a, px(0, 0)).unwrap();
        assert!(ctl.tick(&mut model, 0.0).is_empty());
    }

    #[test]
    fn test_finish_commits_at_clamped_target() {
        let mut model = BentoGrid::new();
        let dragged = model.add_card("dragged", CardSize::Wide, GridPos::new(0, 0));

        let mut ctl = controller();
        ctl.start_drag(&model, &dragged, px(0, 0)).unwrap();
        // Far past the right edge: the 2-wide footprint clamps to column 10.
        ctl.pointer_moved(px(20, 3));
        ctl.tick(&mut model, 1000.0);
        ctl.finish_drag(&mut model, 1001.0);

        assert_eq!(model.card(&dragged).unwrap().position, GridPos::new(10, 3));
        assert!(ctl.dragging().is_none());
        assert_no_overlaps(&model);
    }

    #[test]
    fn test_finish_with_displacement_leaves_no_overlap() {
        let mut model = BentoGrid::new();
        model.add_card("resident", CardSize::Small, GridPos::new(1, 0));
        let dragged = model.add_card("dragged", CardSize::Wide, GridPos::new(6, 6));

        let mut ctl = controller();
        ctl.start_drag(&model, &dragged, px(6, 6)).unwrap();
        ctl.pointer_moved(px(0, 0));
        ctl.tick(&mut model, 1000.0);
        ctl.finish_drag(&mut model, 1016.0);

        assert_eq!(model.card(&dragged).unwrap().position, GridPos::new(0, 0));
        assert_no_overlaps(&model);
    }

    #[test]
    fn test_boxed_in_drop_rolls_back_to_origin() {
        let mut model = BentoGrid::with_geometry(1, 36.0, 20.0);
        let mut blocked = crate::types::Card::new("blocked", CardSize::Small, GridPos::new(0, 0));
        blocked.units = Some(Units { w: 1, h: 2 });
        let blocked_id = blocked.id.clone();
        model.place_card(blocked, GridPos::new(0, 0));
        let mut dragged = crate::types::Card::new("dragged", CardSize::Small, GridPos::new(0, 5));
        dragged.units = Some(Units { w: 1, h: 2 });
        let dragged_id = dragged.id.clone();
        model.place_card(dragged, GridPos::new(0, 5));

        let mut ctl = controller();
        ctl.start_drag(&model, &dragged_id, px(0, 5)).unwrap();
        ctl.pointer_moved(px(0, 0));
        ctl.finish_drag(&mut model, 1000.0);

        // Nothing could make room, so both cards sit where they started.
        assert_eq!(model.card(&blocked_id).unwrap().position, GridPos::new(0, 0));
        assert_eq!(model.card(&dragged_id).unwrap().position, GridPos::new(0, 5));
        assert_no_overlaps(&model);
    }

    #[test]
    fn test_cancel_restores_snapshot() {
        let mut model = BentoGrid::new();
        let resident = model.add_card("resident", CardSize::Small, GridPos::new(1, 0));
        let dragged = model.add_card("dragged", CardSize::Wide, GridPos::new(6, 6));

        let mut ctl = controller();
        ctl.start_drag(&model, &dragged, px(6, 6)).unwrap();
        ctl.pointer_moved(px(0, 0));
        ctl.tick(&mut model, 1000.0);
        assert_ne!(model.card(&resident).unwrap().position, GridPos::new(1, 0));

        ctl.cancel_drag(&mut model);
        assert_eq!(model.card(&resident).unwrap().position, GridPos::new(1, 0));
        assert_eq!(model.card(&dragged).unwrap().position, GridPos::new(6, 6));
        assert!(ctl.dragging().is_none());
    }
}
