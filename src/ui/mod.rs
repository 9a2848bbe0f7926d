//! User interface shell for the bento board.
//!
//! # Module Organization
//!
//! - `rendering` - drawing the grid, cards, drop shadow, and animations
//! - `file_ops` - layout save/load for native and WASM

mod file_ops;
mod rendering;

use eframe::egui;
use log::{info, warn};

use crate::constants::PLACEMENT_ANIM_MS;
use crate::drag::DragController;
use crate::model::BentoGrid;
use crate::storage::StorageShelf;
use crate::types::{CardId, CardSize, GridPos};

use self::file_ops::FileState;
use self::rendering::ActiveAnimation;

/// A shelved card waiting for its restore animation to finish before it is
/// committed back onto the grid.
struct PendingRestore {
    card_id: CardId,
    commit_at_ms: f64,
}

/// The main application: grid model, storage shelf, drag controller, and the
/// presentation state around them.
pub struct BentoApp {
    model: BentoGrid,
    shelf: StorageShelf,
    controller: DragController,
    animations: Vec<ActiveAnimation>,
    pending_restores: Vec<PendingRestore>,
    file: FileState,
    show_shelf: bool,
    dark_mode: bool,
}

/// Fill color used for new cards of each size.
fn color_for(size: CardSize) -> [u8; 3] {
    match size {
        CardSize::Small => [96, 125, 139],
        CardSize::Medium => [67, 133, 190],
        CardSize::Large => [121, 85, 160],
        CardSize::Wide => [56, 142, 116],
    }
}

impl Default for BentoApp {
    fn default() -> Self {
        let mut model = BentoGrid::new();
        for (title, size, pos) in [
            ("Welcome", CardSize::Wide, GridPos::new(0, 0)),
            ("Notes", CardSize::Medium, GridPos::new(3, 0)),
            ("Clock", CardSize::Small, GridPos::new(3, 1)),
        ] {
            let id = model.add_card(title, size, pos);
            if let Some(card) = model.card_mut(&id) {
                card.color = color_for(size);
            }
        }
        Self {
            model,
            shelf: StorageShelf::new(),
            controller: DragController::new(),
            animations: Vec::new(),
            pending_restores: Vec::new(),
            file: FileState::new(),
            show_shelf: true,
            dark_mode: true,
        }
    }
}

impl eframe::App for BentoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let visuals = if self.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        ctx.set_visuals(visuals);

        let now_ms = ctx.input(|i| i.time) * 1000.0;

        self.handle_pending_file_operations(ctx);
        self.commit_matured_restores(now_ms);

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.controller.cancel_drag(&mut self.model);
            self.animations.clear();
        }

        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        if self.show_shelf {
            egui::SidePanel::right("shelf_panel")
                .resizable(true)
                .default_width(220.0)
                .show(ctx, |ui| {
                    self.draw_shelf_panel(ui, now_ms);
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_board(ui, now_ms);
        });

        // Keep repainting while anything is in motion.
        if self.controller.dragging().is_some()
            || !self.animations.is_empty()
            || !self.pending_restores.is_empty()
        {
            ctx.request_repaint();
        }
    }
}

impl BentoApp {
    /// Creates the app, restoring nothing; layouts load explicitly through
    /// the toolbar.
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self::default()
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Add:");
            for (label, size) in [
                ("Small", CardSize::Small),
                ("Medium", CardSize::Medium),
                ("Large", CardSize::Large),
                ("Wide", CardSize::Wide),
            ] {
                if ui.button(label).clicked() {
                    let n = self.model.cards().len() + 1;
                    let id = self
                        .model
                        .add_card(format!("Card {n}"), size, GridPos::new(0, 0));
                    if let Some(card) = self.model.card_mut(&id) {
                        card.color = color_for(size);
                    }
                }
            }

            ui.separator();

            if ui.button("Save Layout").clicked() {
                self.request_save();
            }
            if ui.button("Load Layout").clicked() {
                self.request_load();
            }

            ui.separator();

            ui.checkbox(&mut self.show_shelf, "Shelf");
            ui.checkbox(&mut self.dark_mode, "Dark Mode");

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("Cards: {}", self.model.cards().len()));
                if let Some(path) = &self.file.current_path {
                    ui.label(path.as_str());
                }
            });
        });
    }

    fn draw_shelf_panel(&mut self, ui: &mut egui::Ui, now_ms: f64) {
        ui.heading("Storage Shelf");
        ui.label(format!(
            "{} / {}",
            self.shelf.len(),
            crate::constants::SHELF_CAPACITY
        ));
        ui.separator();

        let mut restore_id: Option<CardId> = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for stored in self.shelf.cards() {
                ui.horizontal(|ui| {
                    ui.label(&stored.card.title);
                    if ui.button("Restore").clicked() {
                        restore_id = Some(stored.card.id.clone());
                    }
                });
            }
            if self.shelf.is_empty() {
                ui.colored_label(egui::Color32::GRAY, "Right-click a card to shelve it");
            }
        });

        if let Some(id) = restore_id {
            self.restore_from_shelf(&id, now_ms);
        }
    }

    /// Takes a card off the shelf, stages it, and schedules its commit for
    /// when the settle animation would finish.
    fn restore_from_shelf(&mut self, id: &str, now_ms: f64) {
        let Some(card) = self.shelf.take(id) else {
            return;
        };
        info!("restoring {} from shelf", card.title);
        let want = card.position;
        let card_id = card.id.clone();
        self.model.stage_card(card, want);
        self.pending_restores.push(PendingRestore {
            card_id,
            commit_at_ms: now_ms + PLACEMENT_ANIM_MS,
        });
    }

    fn commit_matured_restores(&mut self, now_ms: f64) {
        let mut i = 0;
        while i < self.pending_restores.len() {
            if now_ms >= self.pending_restores[i].commit_at_ms {
                let pending = self.pending_restores.remove(i);
                if self.model.commit_staged(&pending.card_id).is_none() {
                    warn!("staged card {} vanished before commit", pending.card_id);
                }
            } else {
                i += 1;
            }
        }
    }

    /// Moves a committed card onto the shelf, unless the shelf is full or the
    /// card is mid-drag.
    fn shelve_card(&mut self, id: &str, now_ms: f64) {
        if self.controller.dragging() == Some(id) {
            return;
        }
        if self.shelf.is_full() {
            warn!("shelf is full");
            return;
        }
        if let Some(card) = self.model.remove_card(id) {
            // Capacity was checked above; a full shelf here means a race we
            // resolve by putting the card back.
            if let Err(err) = self.shelf.store(card.clone(), now_ms) {
                warn!("{err}");
                self.model.place_card(card, GridPos::new(0, 0));
            }
        }
    }
}
