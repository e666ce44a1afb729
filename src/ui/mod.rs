//! Desktop chat window built with egui/eframe

mod app;
pub mod components;
mod theme;

pub use app::MurmurApp;
pub use theme::Theme;

use crate::controller::ChatController;

/// Open the chat window and block until it is closed
pub fn run(controller: ChatController) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([520.0, 720.0])
            .with_min_inner_size([360.0, 400.0])
            .with_title("Murmur"),
        ..Default::default()
    };

    eframe::run_native(
        "Murmur",
        options,
        Box::new(|cc| Ok(Box::new(MurmurApp::new(cc, controller)))),
    )
}
