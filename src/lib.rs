//! # Bento Board
//!
//! An interactive bento-grid card layout with live collision avoidance.
//! Cards occupy whole grid cells; while one is dragged, resident cards are
//! nudged out of the drop target's way (nearest neighbor first, then a
//! bounded breadth-first search) and either commit to their new cells or
//! roll back when the gesture ends.
//!
//! ## Features
//! - Drag and drop with a snapping drop shadow
//! - Collision avoidance with debounced, low-churn displacement
//! - Whole-batch rollback when a drop cannot be resolved
//! - A bounded storage shelf for parking cards off the grid
//! - Layout save/load as flat JSON

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod avoidance;
pub mod constants;
pub mod drag;
pub mod grid;
pub mod model;
pub mod plugins;
pub mod storage;
pub mod types;
mod ui;

pub use avoidance::{AvoidancePlugin, AVOIDANCE_PLUGIN_NAME};
pub use drag::{DragController, DragError};
pub use grid::OccupancyGrid;
pub use model::{BentoGrid, LayoutSnapshot};
pub use plugins::{GridPlugin, Hook, PluginManager};
pub use storage::{ShelfError, StorageShelf};
pub use types::{Card, CardSize, GridPos, Move, Plan, Units};
use ui::BentoApp;

/// Runs the bento board application with default settings.
///
/// # Returns
///
/// Returns `Ok(())` if the application runs successfully, or an
/// `eframe::Error` if initialization fails.
pub fn run_app() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Bento Board",
        options,
        Box::new(|cc| Ok(Box::new(BentoApp::new(cc)))),
    )
}
