//! Video panes
//!
//! The bot avatar on the left and a preview of the frames sent to the
//! backend on the right. Both are covered by a "Call Ended" overlay once the
//! call is over.

use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use egui::{self, Align2, ColorImage, FontId, Rect, RichText, Sense, TextureHandle, TextureOptions, Vec2};
use std::sync::Arc;
use tracing::warn;

/// Decoded preview texture, rebuilt when a new frame arrives
#[derive(Default)]
pub struct PreviewTexture {
    source: Option<Arc<Vec<u8>>>,
    texture: Option<TextureHandle>,
}

impl PreviewTexture {
    /// Texture for the latest frame, decoding it on change
    fn update(&mut self, ctx: &egui::Context, frame: Option<&Arc<Vec<u8>>>) -> Option<&TextureHandle> {
        let Some(frame) = frame else {
            self.source = None;
            self.texture = None;
            return None;
        };

        let unchanged = self.source.as_ref().is_some_and(|s| Arc::ptr_eq(s, frame));
        if !unchanged {
            self.source = Some(Arc::clone(frame));
            self.texture = decode_frame(frame)
                .map(|image| ctx.load_texture("self-view", image, TextureOptions::LINEAR));
        }

        self.texture.as_ref()
    }
}

/// Decode a JPEG/PNG frame into an egui image
pub fn decode_frame(bytes: &[u8]) -> Option<ColorImage> {
    match image::load_from_memory(bytes) {
        Ok(image) => {
            let rgba = image.to_rgba8();
            let size = [rgba.width() as usize, rgba.height() as usize];
            Some(ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
        }
        Err(e) => {
            warn!("Could not decode preview frame: {}", e);
            None
        }
    }
}

/// Side-by-side video panes
pub struct VideoPanes<'a> {
    state: &'a AppState,
    theme: &'a Theme,
    preview: &'a mut PreviewTexture,
}

impl<'a> VideoPanes<'a> {
    pub fn new(state: &'a AppState, theme: &'a Theme, preview: &'a mut PreviewTexture) -> Self {
        Self {
            state,
            theme,
            preview,
        }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        let flags = self.state.session.flags();
        let texture = self
            .preview
            .update(ui.ctx(), self.state.latest_frame.as_ref())
            .cloned();
        let pane_width = ((ui.available_width() - self.theme.spacing) / 2.0).max(120.0);
        let pane_size = Vec2::new(pane_width, pane_width * 0.75);

        ui.horizontal(|ui| {
            let (bot_rect, _) = ui.allocate_exact_size(pane_size, Sense::hover());
            self.paint_bot(ui, bot_rect, flags.speaking);
            if flags.call_ended {
                self.paint_ended(ui, bot_rect);
            }

            ui.add_space(self.theme.spacing);

            let (user_rect, _) = ui.allocate_exact_size(pane_size, Sense::hover());
            self.paint_user(ui, user_rect, texture.as_ref(), flags.user_active);
            if flags.call_ended {
                self.paint_ended(ui, user_rect);
            }
        });

        ui.horizontal(|ui| {
            ui.allocate_ui(Vec2::new(pane_size.x, 20.0), |ui| {
                ui.label(RichText::new("Bot").color(self.theme.text_secondary));
            });
            ui.add_space(self.theme.spacing);
            let user = self.state.session.current_user().unwrap_or("You");
            ui.label(RichText::new(user).color(self.theme.text_secondary));
        });
    }

    fn paint_bot(&self, ui: &egui::Ui, rect: Rect, speaking: bool) {
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, self.theme.card_rounding, self.theme.video_bg);

        let radius = rect.height() * 0.25;
        let pulse = if speaking {
            let t = ui.ctx().input(|i| i.time);
            ui.ctx().request_repaint();
            ((t * 6.0).sin() * 0.5 + 0.5) as f32
        } else {
            0.0
        };
        painter.circle_filled(rect.center(), radius, self.theme.primary);
        if speaking {
            painter.circle_stroke(
                rect.center(),
                radius + 4.0 + pulse * 6.0,
                egui::Stroke::new(3.0, self.theme.primary.gamma_multiply(1.0 - pulse * 0.5)),
            );
        }
    }

    fn paint_user(&self, ui: &egui::Ui, rect: Rect, texture: Option<&TextureHandle>, active: bool) {
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, self.theme.card_rounding, self.theme.video_bg);

        match texture {
            Some(texture) => {
                let image_rect = fit_rect(rect, texture.size_vec2());
                painter.image(
                    texture.id(),
                    image_rect,
                    Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            None => {
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    "No camera",
                    FontId::proportional(14.0),
                    self.theme.text_muted,
                );
            }
        }

        let dot = if active {
            self.theme.success
        } else {
            self.theme.text_muted
        };
        painter.circle_filled(rect.left_top() + Vec2::new(14.0, 14.0), 5.0, dot);
    }

    fn paint_ended(&self, ui: &egui::Ui, rect: Rect) {
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, self.theme.card_rounding, egui::Color32::from_black_alpha(200));
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            "Call Ended",
            FontId::proportional(20.0),
            self.theme.text_primary,
        );
    }
}

/// Largest rect with `size`'s aspect ratio centered inside `outer`
fn fit_rect(outer: Rect, size: Vec2) -> Rect {
    if size.x <= 0.0 || size.y <= 0.0 {
        return outer;
    }
    let scale = (outer.width() / size.x).min(outer.height() / size.y);
    Rect::from_center_size(outer.center(), size * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_rect_keeps_aspect() {
        let outer = Rect::from_min_size(egui::pos2(0.0, 0.0), Vec2::new(400.0, 300.0));
        let fitted = fit_rect(outer, Vec2::new(200.0, 200.0));
        assert_eq!(fitted.size(), Vec2::new(300.0, 300.0));
        assert_eq!(fitted.center(), outer.center());
    }

    #[test]
    fn test_decode_frame_rejects_garbage() {
        assert!(decode_frame(&[0xFF, 0xD8, 0x00]).is_none());
    }

    #[test]
    fn test_decode_frame_png() {
        let mut bytes = Vec::new();
        let image = image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let decoded = decode_frame(&bytes).unwrap();
        assert_eq!(decoded.size, [2, 3]);
    }
}
