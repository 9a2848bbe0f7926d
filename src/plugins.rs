//! Plugin seam for the drag lifecycle.
//!
//! Plugins observe the four gesture hooks and may contribute a [`Plan`] of
//! moves and animations. The manager dispatches hooks in registration order
//! and merges whatever the plugins return into one plan for the controller.

use log::debug;

use crate::constants::PLACEMENT_ANIM_MS;
use crate::types::{Animation, AnimationKind, AvoidanceContext, Easing, Plan};

/// The lifecycle points a plugin can hook into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// The pointer grabbed a card.
    DragStart,
    /// The pointer moved while holding a card.
    DragUpdate,
    /// The gesture is about to commit its drop.
    BeforeDrop,
    /// The gesture is over, committed or not.
    DragEnd,
}

/// A participant in the drag lifecycle.
///
/// All hooks default to no-ops so plugins implement only the ones they care
/// about. Hooks that can contribute moves return an optional [`Plan`].
pub trait GridPlugin {
    /// Stable name used for registration and replacement.
    fn name(&self) -> &str;

    /// Called when a gesture begins.
    fn on_drag_start(&mut self, _ctx: &AvoidanceContext<'_>) {}

    /// Called for each coalesced pointer sample during a gesture.
    fn on_drag_update(&mut self, _ctx: &AvoidanceContext<'_>) -> Option<Plan> {
        None
    }

    /// Called once before the drop commits.
    fn on_before_drop(&mut self, _ctx: &AvoidanceContext<'_>) -> Option<Plan> {
        None
    }

    /// Called when the gesture ends, whether it committed or was cancelled.
    fn on_drag_end(&mut self) {}
}

/// Holds registered plugins and fans hooks out to them.
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Box<dyn GridPlugin>>,
}

impl PluginManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin. A plugin with the same name is replaced in place
    /// so dispatch order is stable across re-registration.
    pub fn register(&mut self, plugin: Box<dyn GridPlugin>) {
        if let Some(slot) = self
            .plugins
            .iter_mut()
            .find(|p| p.name() == plugin.name())
        {
            debug!("replacing plugin {}", plugin.name());
            *slot = plugin;
        } else {
            self.plugins.push(plugin);
        }
    }

    /// Removes the plugin with the given name, if registered.
    pub fn unregister(&mut self, name: &str) {
        self.plugins.retain(|p| p.name() != name);
    }

    /// Whether a plugin with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    /// Borrows a registered plugin by name.
    pub fn get(&self, name: &str) -> Option<&dyn GridPlugin> {
        self.plugins
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// Dispatches a hook to every plugin in registration order and merges
    /// their plans. Moves and animations concatenate; the first plugin to
    /// claim a drop position wins. Returns `None` when no plugin contributed
    /// anything.
    pub fn dispatch(&mut self, hook: Hook, ctx: &AvoidanceContext<'_>) -> Option<Plan> {
        let mut merged = Plan::default();
        for plugin in &mut self.plugins {
            let plan = match hook {
                Hook::DragStart => {
                    plugin.on_drag_start(ctx);
                    None
                }
                Hook::DragUpdate => plugin.on_drag_update(ctx),
                Hook::BeforeDrop => plugin.on_before_drop(ctx),
                Hook::DragEnd => {
                    plugin.on_drag_end();
                    None
                }
            };
            if let Some(plan) = plan {
                merged.moves.extend(plan.moves);
                merged.animations.extend(plan.animations);
                if merged.drop_position.is_none() {
                    merged.drop_position = plan.drop_position;
                }
            }
        }
        if merged.is_empty() {
            None
        } else {
            Some(merged)
        }
    }
}

/// Name under which the placement animation plugin registers itself.
pub const PLACEMENT_PLUGIN_NAME: &str = "placement-animate";

/// Emits a settle animation for the dragged card when it lands somewhere
/// other than where the gesture started. Contributes no moves.
#[derive(Debug, Default)]
pub struct PlacementPlugin {
    origin: Option<crate::types::GridPos>,
}

impl PlacementPlugin {
    /// Creates the plugin.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GridPlugin for PlacementPlugin {
    fn name(&self) -> &str {
        PLACEMENT_PLUGIN_NAME
    }

    fn on_drag_start(&mut self, ctx: &AvoidanceContext<'_>) {
        self.origin = Some(ctx.dragged.position);
    }

    fn on_before_drop(&mut self, ctx: &AvoidanceContext<'_>) -> Option<Plan> {
        let target = ctx.drop_target?;
        let origin = self.origin?;
        if target == origin {
            return None;
        }
        Some(Plan {
            animations: vec![Animation {
                card_id: ctx.dragged.id.clone(),
                kind: AnimationKind::Translate,
                from: origin,
                to: target,
                duration_ms: PLACEMENT_ANIM_MS,
                easing: Easing::Overshoot,
            }],
            ..Default::default()
        })
    }

    fn on_drag_end(&mut self) {
        self.origin = None;
    }
}
