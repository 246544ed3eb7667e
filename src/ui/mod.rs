//! GUI implementation with egui/eframe
//!
//! Desktop user interface for the call: video panes, controls and chat.

mod app;
pub mod components;
mod state;
mod theme;

pub use app::{PresenceChatApp, WINDOW_TITLE};
pub use state::{AppState, ConnectionStatus, DebugInfo};
pub use theme::Theme;

/// Run the application until the window is closed
pub fn run(state: AppState) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([760.0, 480.0])
            .with_title(WINDOW_TITLE),
        ..Default::default()
    };

    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(|cc| Ok(Box::new(PresenceChatApp::new(cc, state)))),
    )
}
