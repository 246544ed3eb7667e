//! Main application struct and eframe integration
//!
//! This module contains `PresenceChatApp`, which implements `eframe::App`.

use crate::ui::components::{Controls, DebugPanel, InputBar, MessageList, PreviewTexture, VideoPanes};
use crate::ui::state::{AppState, ConnectionStatus};
use crate::ui::theme::Theme;
use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};
use std::time::{Duration, Instant};

pub const WINDOW_TITLE: &str = "Realtime Video Chatbot";

/// Repaint interval while idle, so worker events are picked up promptly
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Main application
pub struct PresenceChatApp {
    /// Application state
    state: AppState,
    /// Visual theme
    theme: Theme,
    /// Decoded self-view frame
    preview: PreviewTexture,
    /// Last frame time for FPS calculation
    last_frame_time: Instant,
}

impl PresenceChatApp {
    /// Create the application around `state`
    pub fn new(cc: &eframe::CreationContext<'_>, state: AppState) -> Self {
        let theme = Theme::dark();
        theme.apply(&cc.egui_ctx);
        Self::with_theme(state, theme)
    }

    /// Create the application without an eframe context
    pub fn with_theme(mut state: AppState, theme: Theme) -> Self {
        state.debug_info.add_log("UI initialized".to_string());
        Self {
            state,
            theme,
            preview: PreviewTexture::default(),
            last_frame_time: Instant::now(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    /// Poll workers and draw one frame
    pub fn render(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame_time).as_secs_f64();
        self.last_frame_time = now;
        self.state.update_fps(delta);

        self.state.poll_events();

        self.show_header(ctx);
        self.show_debug_panel(ctx);
        self.show_chat_area(ctx);
        self.show_call_area(ctx);

        if self.state.has_workers() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
    }

    /// Show the top header bar
    fn show_header(&mut self, ctx: &egui::Context) {
        TopBottomPanel::top("header")
            .frame(egui::Frame::none().fill(self.theme.bg_secondary).inner_margin(12.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new(WINDOW_TITLE)
                            .size(20.0)
                            .strong()
                            .color(self.theme.text_primary),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("🔍").on_hover_text("Toggle Debug Panel").clicked() {
                            self.state.show_debug_panel = !self.state.show_debug_panel;
                        }

                        let color = match self.state.connection {
                            ConnectionStatus::Connected => self.theme.success,
                            ConnectionStatus::Connecting => self.theme.warning,
                            ConnectionStatus::Disconnected(_) => self.theme.error,
                            ConnectionStatus::Closed => self.theme.text_muted,
                        };
                        ui.label(RichText::new(self.state.connection.label()).size(12.0).color(color));
                    });
                });
            });
    }

    /// Show the debug panel on the side
    fn show_debug_panel(&mut self, ctx: &egui::Context) {
        if !self.state.show_debug_panel {
            return;
        }

        SidePanel::right("debug_panel")
            .resizable(true)
            .default_width(300.0)
            .min_width(250.0)
            .max_width(500.0)
            .frame(egui::Frame::none().fill(self.theme.bg_primary).inner_margin(self.theme.spacing))
            .show(ctx, |ui| {
                DebugPanel::new(&self.state, &self.theme).show(ui);
            });
    }

    /// Chat history and form; gone once the call has ended
    fn show_chat_area(&mut self, ctx: &egui::Context) {
        if self.state.session.is_call_ended() {
            return;
        }

        SidePanel::left("chat_area")
            .resizable(true)
            .default_width(340.0)
            .min_width(260.0)
            .frame(egui::Frame::none().fill(self.theme.bg_primary).inner_margin(self.theme.spacing))
            .show(ctx, |ui| {
                TopBottomPanel::bottom("chat_form")
                    .frame(egui::Frame::none().inner_margin(egui::Margin::symmetric(0.0, 8.0)))
                    .show_inside(ui, |ui| {
                        InputBar::new(&mut self.state, &self.theme).show(ui);
                    });

                MessageList::new(&self.state, &self.theme).show(ui);
            });
    }

    /// Video panes and call controls
    fn show_call_area(&mut self, ctx: &egui::Context) {
        CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.bg_primary).inner_margin(self.theme.spacing))
            .show(ctx, |ui| {
                VideoPanes::new(&self.state, &self.theme, &mut self.preview).show(ui);
                ui.add_space(self.theme.spacing);
                Controls::new(&mut self.state, &self.theme).show(ui);
            });
    }
}

impl eframe::App for PresenceChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.render(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.state.debug_info.add_log("Shutting down".to_string());
        self.state.shutdown();
    }
}
