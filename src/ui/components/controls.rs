//! Call controls
//!
//! Mic toggle, stop-speaking and end-call buttons plus the listening label.

use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use egui::{self, RichText, Vec2};

pub const MIC_START_LABEL: &str = "Start Mic";
pub const MIC_STOP_LABEL: &str = "Stop Mic";
pub const STOP_SPEAKING_LABEL: &str = "Stop Speaking";
pub const END_CALL_LABEL: &str = "End Call";

/// Control row below the video panes
pub struct Controls<'a> {
    state: &'a mut AppState,
    theme: &'a Theme,
}

impl<'a> Controls<'a> {
    pub fn new(state: &'a mut AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        let flags = self.state.session.flags();
        let mic_enabled = !flags.call_ended && self.state.session.recognizer_available();

        ui.horizontal(|ui| {
            let mic_label = if flags.listening {
                MIC_STOP_LABEL
            } else {
                MIC_START_LABEL
            };
            let mic_button = egui::Button::new(mic_label)
                .min_size(Vec2::new(96.0, 36.0))
                .rounding(self.theme.button_rounding);
            let mic_button = if flags.listening {
                mic_button.fill(self.theme.listening.gamma_multiply(0.4))
            } else {
                mic_button
            };

            let response = ui.add_enabled(mic_enabled, mic_button);
            let response = if self.state.session.recognizer_available() {
                response
            } else {
                response.on_disabled_hover_text("Speech recognition is not available")
            };
            if response.clicked() {
                self.state.toggle_mic();
            }

            if flags.speaking && !flags.call_ended {
                let button = egui::Button::new(STOP_SPEAKING_LABEL)
                    .min_size(Vec2::new(120.0, 36.0))
                    .rounding(self.theme.button_rounding)
                    .fill(self.theme.warning.gamma_multiply(0.5));
                if ui.add(button).clicked() {
                    self.state.stop_speaking();
                }
            }

            if !flags.call_ended {
                let button = egui::Button::new(RichText::new(END_CALL_LABEL).color(egui::Color32::WHITE))
                    .min_size(Vec2::new(96.0, 36.0))
                    .rounding(self.theme.button_rounding)
                    .fill(self.theme.error);
                if ui.add(button).clicked() {
                    self.state.end_call();
                }
            }

            ui.add_space(self.theme.spacing);

            let (text, color) = if flags.listening {
                ("Listening…", self.theme.listening)
            } else {
                ("Not listening", self.theme.text_muted)
            };
            ui.label(RichText::new(text).color(color));
        });
    }
}
