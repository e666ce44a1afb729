//! Debug panel component

use crate::controller::ChatController;
use crate::ui::theme::Theme;
use egui::{self, RichText, ScrollArea};

pub struct DebugPanel<'a> {
    controller: &'a ChatController,
    theme: &'a Theme,
}

impl<'a> DebugPanel<'a> {
    pub fn new(controller: &'a ChatController, theme: &'a Theme) -> Self {
        Self { controller, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        let info = &self.controller.debug_info;

        ui.label(
            RichText::new("Debug Panel")
                .strong()
                .color(self.theme.text_primary),
        );
        ui.separator();

        egui::Grid::new("debug_stats")
            .num_columns(2)
            .spacing([20.0, 4.0])
            .show(ui, |ui| {
                self.stat_row(ui, "Service", &self.controller.config().base_url);
                self.stat_row(ui, "Ordering", &format!("{:?}", self.controller.config().ordering));
                self.stat_row(ui, "Messages", &self.controller.log.len().to_string());
                self.stat_row(ui, "Voice", &info.voice_status);
                self.stat_row(ui, "Transport", &info.transport_status);
            });

        ui.add_space(self.theme.spacing_sm);
        ui.label(RichText::new("Log").color(self.theme.text_muted));

        ScrollArea::vertical()
            .id_salt("debug_log")
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &info.log_messages {
                    ui.label(
                        RichText::new(line)
                            .size(11.0)
                            .family(egui::FontFamily::Monospace)
                            .color(self.theme.text_secondary),
                    );
                }
            });
    }

    fn stat_row(&self, ui: &mut egui::Ui, label: &str, value: &str) {
        ui.label(RichText::new(label).color(self.theme.text_muted));
        ui.label(
            RichText::new(if value.is_empty() { "-" } else { value })
                .family(egui::FontFamily::Monospace)
                .color(self.theme.text_secondary),
        );
        ui.end_row();
    }
}
