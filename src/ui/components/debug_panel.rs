//! Debug panel component
//!
//! Displays internal state information for debugging.

use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use egui::{self, RichText, ScrollArea};

/// Debug panel component
pub struct DebugPanel<'a> {
    state: &'a AppState,
    theme: &'a Theme,
}

impl<'a> DebugPanel<'a> {
    pub fn new(state: &'a AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        let info = &self.state.debug_info;
        let flags = self.state.session.flags();

        egui::Frame::none()
            .fill(self.theme.bg_secondary)
            .rounding(self.theme.card_rounding)
            .inner_margin(self.theme.spacing)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new("Debug Panel").strong().color(self.theme.text_primary));

                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            ui.label(
                                RichText::new(format!("{:.1} FPS", info.fps))
                                    .size(12.0)
                                    .family(egui::FontFamily::Monospace)
                                    .color(self.theme.text_muted),
                            );
                        });
                    });

                    ui.separator();

                    egui::Grid::new("debug_stats")
                        .num_columns(2)
                        .spacing([20.0, 4.0])
                        .show(ui, |ui| {
                            self.stat_row(ui, "Presence", &self.state.connection.label());
                            self.stat_row(ui, "Frame source", &info.frame_source);
                            self.stat_row(ui, "Frames sent", &info.frames_sent.to_string());
                            self.stat_row(ui, "User", self.state.session.current_user().unwrap_or(""));
                            self.stat_row(ui, "User active", &flags.user_active.to_string());
                            self.stat_row(ui, "Greeted", &flags.greeted.to_string());
                            self.stat_row(ui, "Messages", &self.state.session.messages().len().to_string());
                            self.stat_row(ui, "Pending chats", &self.state.session.pending_requests().to_string());
                            self.stat_row(
                                ui,
                                "Last reply",
                                &info.last_reply_ms.map(|ms| format!("{ms} ms")).unwrap_or_default(),
                            );
                            self.stat_row(ui, "Backend", &self.health_status());
                        });

                    if !info.last_context.is_empty() {
                        ui.add_space(self.theme.spacing_sm);
                        ui.label(RichText::new("Context").size(12.0).strong().color(self.theme.text_secondary));
                        for snippet in &info.last_context {
                            ui.label(RichText::new(snippet).size(11.0).color(self.theme.text_muted));
                        }
                    }

                    if let Some(error) = self.state.session.last_error() {
                        ui.add_space(self.theme.spacing_sm);
                        ui.horizontal(|ui| {
                            ui.label(RichText::new("⚠").color(self.theme.error));
                            ui.label(RichText::new(error).size(12.0).color(self.theme.error));
                        });
                    }

                    ui.add_space(self.theme.spacing_sm);
                    ui.separator();

                    ui.label(
                        RichText::new("Recent Logs")
                            .size(12.0)
                            .strong()
                            .color(self.theme.text_secondary),
                    );

                    ScrollArea::vertical()
                        .max_height(160.0)
                        .auto_shrink([false, false])
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            for msg in &info.log_messages {
                                ui.label(
                                    RichText::new(msg)
                                        .size(11.0)
                                        .family(egui::FontFamily::Monospace)
                                        .color(self.theme.text_muted),
                                );
                            }

                            if info.log_messages.is_empty() {
                                ui.label(
                                    RichText::new("No log messages")
                                        .size(11.0)
                                        .color(self.theme.text_muted)
                                        .italics(),
                                );
                            }
                        });
                });
            });
    }

    fn stat_row(&self, ui: &mut egui::Ui, label: &str, value: &str) {
        ui.label(RichText::new(label).size(12.0).color(self.theme.text_muted));

        let display_value = if value.is_empty() { "—" } else { value };
        ui.label(
            RichText::new(display_value)
                .size(12.0)
                .family(egui::FontFamily::Monospace)
                .color(self.theme.text_primary),
        );

        ui.end_row();
    }

    fn health_status(&self) -> String {
        match &self.state.debug_info.health {
            Some((true, _)) => "healthy".to_string(),
            Some((false, detail)) => format!("down ({detail})"),
            None => String::new(),
        }
    }
}
