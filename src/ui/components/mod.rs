//! UI components

mod controls;
mod debug_panel;
mod input_bar;
mod message_list;
mod video_panes;

pub use controls::{Controls, END_CALL_LABEL, MIC_START_LABEL, MIC_STOP_LABEL, STOP_SPEAKING_LABEL};
pub use debug_panel::DebugPanel;
pub use input_bar::InputBar;
pub use message_list::MessageList;
pub use video_panes::{decode_frame, PreviewTexture, VideoPanes};
