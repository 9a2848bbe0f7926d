//! Drawing the board: grid lines, cards, the drop shadow, and animations.
//!
//! Animations here are presentation hints only. Card positions always come
//! from the model; an [`ActiveAnimation`] just interpolates where a card is
//! drawn on its way to the cell the model already assigned it.

use eframe::egui;
use eframe::epaint::StrokeKind;
use log::debug;

use crate::types::{Animation, Card};

use super::BentoApp;

/// An animation in flight, tracked from the frame its plan arrived.
pub(super) struct ActiveAnimation {
    pub anim: Animation,
    pub started_ms: f64,
}

impl ActiveAnimation {
    fn progress(&self, now_ms: f64) -> f32 {
        if self.anim.duration_ms <= 0.0 {
            return 1.0;
        }
        (((now_ms - self.started_ms) / self.anim.duration_ms) as f32).clamp(0.0, 1.0)
    }

    pub(super) fn finished(&self, now_ms: f64) -> bool {
        now_ms - self.started_ms >= self.anim.duration_ms
    }

    /// Interpolated top-left corner in grid-local pixels.
    fn pos_px(&self, now_ms: f64, cell: f32) -> egui::Vec2 {
        let t = self.anim.easing.value(self.progress(now_ms));
        let from = egui::vec2(
            self.anim.from.x as f32 * cell,
            self.anim.from.y as f32 * cell,
        );
        let to = egui::vec2(self.anim.to.x as f32 * cell, self.anim.to.y as f32 * cell);
        from + (to - from) * t
    }
}

impl BentoApp {
    /// Draws the board and handles pointer interaction for one frame.
    pub(super) fn draw_board(&mut self, ui: &mut egui::Ui, now_ms: f64) {
        let size = ui.available_size();
        let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
        let origin = response.rect.min + egui::vec2(12.0, 12.0);
        let cell = self.model.unit + self.model.gap;

        self.handle_pointer(&response, origin, now_ms);

        self.draw_grid_lines(&painter, response.rect, origin, cell);
        self.draw_drop_shadow(&painter, origin);
        self.draw_cards(&painter, origin, cell, now_ms);
        self.draw_dragged_card(&painter, &response);

        self.animations.retain(|a| !a.finished(now_ms));
    }

    fn handle_pointer(&mut self, response: &egui::Response, origin: egui::Pos2, now_ms: f64) {
        let rel = |pos: egui::Pos2| (pos.x - origin.x, pos.y - origin.y);

        if response.secondary_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                if let Some(id) = self.card_at(rel(pos)) {
                    self.shelve_card(&id, now_ms);
                }
            }
        }

        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                let p = rel(pos);
                if let Some(id) = self.card_at(p) {
                    if let Err(err) = self.controller.start_drag(&self.model, &id, p) {
                        debug!("drag not started: {err}");
                    }
                }
            }
        }

        if let Some(pos) = response.interact_pointer_pos() {
            if self.controller.dragging().is_some() {
                self.controller.pointer_moved(rel(pos));
            }
        }

        let mut plans = self.controller.tick(&mut self.model, now_ms);
        if response.drag_stopped() {
            plans.extend(self.controller.finish_drag(&mut self.model, now_ms));
        }
        for anim in plans {
            // A newer animation for the same card supersedes the old one.
            self.animations.retain(|a| a.anim.card_id != anim.card_id);
            self.animations.push(ActiveAnimation {
                anim,
                started_ms: now_ms,
            });
        }
    }

    /// Topmost committed card whose pixel footprint contains the point.
    fn card_at(&self, point: (f32, f32)) -> Option<crate::types::CardId> {
        self.model
            .cards()
            .iter()
            .rev()
            .find(|card| {
                let (x, y, w, h) = self.card_px(card);
                point.0 >= x && point.0 < x + w && point.1 >= y && point.1 < y + h
            })
            .map(|card| card.id.clone())
    }

    /// A card's pixel footprint in grid-local coordinates.
    fn card_px(&self, card: &Card) -> (f32, f32, f32, f32) {
        let cell = self.model.unit + self.model.gap;
        let units = card.footprint();
        (
            card.position.x as f32 * cell,
            card.position.y as f32 * cell,
            units.w as f32 * self.model.unit + (units.w - 1) as f32 * self.model.gap,
            units.h as f32 * self.model.unit + (units.h - 1) as f32 * self.model.gap,
        )
    }

    fn draw_grid_lines(
        &self,
        painter: &egui::Painter,
        canvas: egui::Rect,
        origin: egui::Pos2,
        cell: f32,
    ) {
        let color = if self.dark_mode {
            egui::Color32::from_gray(45)
        } else {
            egui::Color32::from_gray(220)
        };
        let stroke = egui::Stroke::new(1.0, color);

        for col in 0..=self.model.columns {
            let x = origin.x + col as f32 * cell - self.model.gap * 0.5;
            painter.line_segment(
                [egui::pos2(x, canvas.min.y), egui::pos2(x, canvas.max.y)],
                stroke,
            );
        }
        let mut y = origin.y - self.model.gap * 0.5;
        while y < canvas.max.y {
            painter.line_segment(
                [egui::pos2(canvas.min.x, y), egui::pos2(canvas.max.x, y)],
                stroke,
            );
            y += cell;
        }
    }

    fn draw_drop_shadow(&self, painter: &egui::Painter, origin: egui::Pos2) {
        let Some(shadow) = self.controller.drop_rect() else {
            return;
        };
        let Some(id) = self.controller.dragging() else {
            return;
        };
        let Some(card) = self.model.card(id) else {
            return;
        };
        let units = card.footprint();
        let rect = egui::Rect::from_min_size(
            egui::pos2(origin.x + shadow.left, origin.y + shadow.top),
            egui::vec2(
                units.w as f32 * self.model.unit + (units.w - 1) as f32 * self.model.gap,
                units.h as f32 * self.model.unit + (units.h - 1) as f32 * self.model.gap,
            ),
        );
        painter.rect_filled(
            rect,
            6.0,
            egui::Color32::from_rgba_unmultiplied(100, 150, 255, 40),
        );
        painter.rect_stroke(
            rect,
            6.0,
            egui::Stroke::new(1.5, egui::Color32::from_rgb(100, 150, 255)),
            StrokeKind::Inside,
        );
    }

    fn draw_cards(&self, painter: &egui::Painter, origin: egui::Pos2, cell: f32, now_ms: f64) {
        let dragging = self.controller.dragging();
        for card in self.model.cards() {
            if Some(card.id.as_str()) == dragging {
                continue;
            }
            let (x, y, w, h) = self.card_px(card);
            let top_left = match self.animations.iter().find(|a| a.anim.card_id == card.id) {
                Some(active) => {
                    let p = active.pos_px(now_ms, cell);
                    egui::pos2(origin.x + p.x, origin.y + p.y)
                }
                None => egui::pos2(origin.x + x, origin.y + y),
            };
            let rect = egui::Rect::from_min_size(top_left, egui::vec2(w, h));
            self.draw_card_body(painter, card, rect, 255);
        }
    }

    fn draw_dragged_card(&self, painter: &egui::Painter, response: &egui::Response) {
        let Some(id) = self.controller.dragging() else {
            return;
        };
        let Some(card) = self.model.card(id) else {
            return;
        };
        let Some(pointer) = response.interact_pointer_pos() else {
            return;
        };
        let (dx, dy) = self.controller.grab_offset().unwrap_or((0.0, 0.0));
        let (_, _, w, h) = self.card_px(card);
        let rect = egui::Rect::from_min_size(
            egui::pos2(pointer.x - dx, pointer.y - dy),
            egui::vec2(w, h),
        );
        self.draw_card_body(painter, card, rect, 210);
    }

    fn draw_card_body(&self, painter: &egui::Painter, card: &Card, rect: egui::Rect, alpha: u8) {
        let [r, g, b] = card.color;
        painter.rect_filled(
            rect,
            6.0,
            egui::Color32::from_rgba_unmultiplied(r, g, b, alpha),
        );
        let stroke_color = if self.dark_mode {
            egui::Color32::from_gray(90)
        } else {
            egui::Color32::from_gray(160)
        };
        painter.rect_stroke(rect, 6.0, egui::Stroke::new(1.0, stroke_color), StrokeKind::Inside);
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            &card.title,
            egui::FontId::proportional(13.0),
            egui::Color32::WHITE,
        );
    }
}
