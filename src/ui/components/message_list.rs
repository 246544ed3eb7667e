//! Message list component
//!
//! Displays the conversation history and the typing indicator.

use crate::messages::{Message, Sender};
use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use egui::{self, Align, Color32, RichText};

/// Message list component
pub struct MessageList<'a> {
    state: &'a AppState,
    theme: &'a Theme,
}

impl<'a> MessageList<'a> {
    pub fn new(state: &'a AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        let messages = self.state.session.messages().get_all();
        let bot_typing = self.state.session.flags().bot_typing;

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.add_space(self.theme.spacing_sm);

                    if messages.is_empty() && !bot_typing {
                        self.show_empty_state(ui);
                    }

                    for message in &messages {
                        self.show_message(ui, message);
                        ui.add_space(self.theme.spacing_sm);
                    }

                    if bot_typing {
                        self.show_typing_indicator(ui);
                    }

                    ui.add_space(self.theme.spacing_sm);
                });
            });
    }

    fn show_empty_state(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(self.theme.spacing_lg);
            ui.label(
                RichText::new("Say hello, or wait for the bot to spot you.")
                    .size(13.0)
                    .color(self.theme.text_muted),
            );
        });
    }

    fn show_message(&self, ui: &mut egui::Ui, message: &Message) {
        let is_user = message.is_from_user();
        let (bubble_color, text_color) = match message.sender {
            Sender::User => (self.theme.user_bubble, Color32::WHITE),
            Sender::Bot => (self.theme.bot_bubble, self.theme.text_primary),
        };
        let align = if is_user { Align::RIGHT } else { Align::LEFT };

        ui.with_layout(egui::Layout::top_down(align), |ui| {
            ui.label(
                RichText::new(message.sender.label())
                    .size(12.0)
                    .color(self.theme.text_muted),
            );

            let max_width = ui.available_width() * 0.8;

            egui::Frame::none()
                .fill(bubble_color)
                .rounding(self.theme.bubble_rounding)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    ui.set_max_width(max_width);
                    let response = ui.label(RichText::new(&message.text).color(text_color));
                    let label = match message.sender {
                        Sender::User => format!("User message: {}", message.text),
                        Sender::Bot => format!("Bot message: {}", message.text),
                    };
                    response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &label));
                });

            let time_str = message.timestamp.format("%H:%M").to_string();
            ui.label(RichText::new(time_str).size(10.0).color(self.theme.text_muted));
        });
    }

    fn show_typing_indicator(&self, ui: &mut egui::Ui) {
        ui.with_layout(egui::Layout::top_down(Align::LEFT), |ui| {
            egui::Frame::none()
                .fill(self.theme.bot_bubble)
                .rounding(self.theme.bubble_rounding)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        let t = ui.ctx().input(|i| i.time);
                        for i in 0..3 {
                            let alpha = ((t * 3.0 + i as f64 * 0.5).sin() * 0.5 + 0.5) as f32;
                            ui.label(
                                RichText::new("●")
                                    .size(10.0)
                                    .color(self.theme.text_muted.gamma_multiply(alpha)),
                            );
                        }
                        ui.label(
                            RichText::new("Bot is typing…")
                                .size(12.0)
                                .italics()
                                .color(self.theme.text_muted),
                        );
                    });
                });
        });

        ui.ctx().request_repaint();
    }
}
