//! Shared application-wide constants.
//! Centralizes tweakable values used across the avoidance engine and the UI.

// Grid geometry
/// Default number of grid columns.
pub const DEFAULT_COLUMNS: i32 = 12;
/// Default edge length of one grid cell in pixels.
pub const DEFAULT_UNIT: f32 = 36.0;
/// Default gap between grid cells in pixels.
pub const DEFAULT_GAP: f32 = 20.0;

// Occupancy / search
/// Rows of headroom added below the tallest occupied row when building the occupancy grid.
pub const OCCUPANCY_HEADROOM_ROWS: i32 = 4;
/// How far past the occupancy matrix the nearest-free-cell search may probe downward.
pub const BFS_ROW_OVERSCAN: i32 = 8;
/// Hard cap on dequeues in the nearest-free-cell search. A placement that
/// needs more expansions than this is treated as not found.
pub const BFS_STEP_LIMIT: usize = 800;

// Avoidance timing
/// How long a card must overlap the drop target before it is displaced.
/// Filters out micro-overlaps from jittery pointer movement.
pub const AVOIDANCE_DELAY_MS: f64 = 100.0;
/// Duration of displacement animations emitted during live dragging.
pub const AVOID_ANIM_MS: f64 = 260.0;
/// Duration of displacement animations emitted at drop time.
pub const DROP_ANIM_MS: f64 = 240.0;
/// Duration of the dragged card's settle animation after a drop.
pub const PLACEMENT_ANIM_MS: f64 = 300.0;

// Storage shelf
/// Maximum number of cards the floating storage shelf will hold.
pub const SHELF_CAPACITY: usize = 10;
