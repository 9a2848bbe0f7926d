//! The collision-avoidance engine.
//!
//! While a card is dragged over the grid, this plugin detects which resident
//! cards the drop target would overlap and computes a low-churn rearrangement
//! that nudges them out of the way, committing or rolling the displacements
//! back when the gesture ends.
//!
//! # Module Organization
//!
//! - `state` - gesture-scoped displacement bookkeeping
//! - `drag_update` - live resolution while the pointer moves (neighbors, then BFS)
//! - `before_drop` - final low-latency resolution at drop time, with rollback

mod before_drop;
mod drag_update;
mod state;

pub use state::{ActiveAvoid, AvoidanceState, LastMove};

use crate::grid::to_grid_xy;
use crate::plugins::GridPlugin;
use crate::types::{AvoidanceContext, GridPos, GridRect, Plan};

/// Name under which the avoidance plugin registers itself.
pub const AVOIDANCE_PLUGIN_NAME: &str = "position-avoidance";

/// The avoidance plugin. Owns its gesture state; nothing outside this module
/// touches it.
#[derive(Debug, Default)]
pub struct AvoidancePlugin {
    state: AvoidanceState,
}

impl AvoidancePlugin {
    /// Creates a plugin with empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the gesture state, for tests and diagnostics.
    pub fn state(&self) -> &AvoidanceState {
        &self.state
    }
}

impl GridPlugin for AvoidancePlugin {
    fn name(&self) -> &str {
        AVOIDANCE_PLUGIN_NAME
    }

    fn on_drag_start(&mut self, ctx: &AvoidanceContext<'_>) {
        self.state.reset();
        self.state.drag_origin = Some(ctx.dragged.position);
    }

    fn on_drag_update(&mut self, ctx: &AvoidanceContext<'_>) -> Option<Plan> {
        drag_update::on_drag_update(&mut self.state, ctx)
    }

    fn on_before_drop(&mut self, ctx: &AvoidanceContext<'_>) -> Option<Plan> {
        before_drop::on_before_drop(&mut self.state, ctx)
    }

    fn on_drag_end(&mut self) {
        // Unconditional: the controller has already committed or discarded
        // moves by the time this runs.
        self.state.reset();
    }
}

/// Resolves the dragged card's candidate rectangle from the drop rectangle.
/// Returns `None` when no drop rectangle is available.
fn dragged_rect(ctx: &AvoidanceContext<'_>) -> Option<GridRect> {
    let drop_rect = ctx.drop_rect?;
    let target = to_grid_xy(drop_rect.left, drop_rect.top, ctx.unit, ctx.gap);
    Some(GridRect::at(target, ctx.dragged.footprint()))
}

/// The four axis-aligned neighbor cells of a card's current position, in the
/// tie-break order up, down, left, right. Up and left are clamped at zero.
fn neighbor_candidates(pos: GridPos) -> [GridPos; 4] {
    [
        GridPos::new(pos.x, (pos.y - 1).max(0)),
        GridPos::new(pos.x, pos.y + 1),
        GridPos::new((pos.x - 1).max(0), pos.y),
        GridPos::new(pos.x + 1, pos.y),
    ]
}
