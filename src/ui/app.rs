//! eframe integration

use crate::controller::ChatController;
use crate::ui::components::{
    ConfirmChoice, ConfirmDialog, DebugPanel, InputBar, MessageList,
};
use crate::ui::theme::Theme;
use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};
use std::time::Duration;
use tracing::info;

/// Main window
pub struct MurmurApp {
    controller: ChatController,
    theme: Theme,
    /// Log revision the message list last scrolled for
    seen_revision: u64,
}

impl MurmurApp {
    pub fn new(cc: &eframe::CreationContext<'_>, controller: ChatController) -> Self {
        let theme = Theme::dark();
        theme.apply(&cc.egui_ctx);
        Self::with_theme(controller, theme)
    }

    /// Build without a creation context (used by UI tests)
    pub fn with_theme(controller: ChatController, theme: Theme) -> Self {
        Self {
            controller,
            theme,
            seen_revision: 0,
        }
    }

    pub fn controller(&self) -> &ChatController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ChatController {
        &mut self.controller
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        TopBottomPanel::top("header")
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_secondary)
                    .inner_margin(12.0),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new("Murmur")
                            .size(20.0)
                            .strong()
                            .color(self.theme.text_primary),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .button("🔍")
                            .on_hover_text("Toggle Debug Panel")
                            .clicked()
                        {
                            self.controller.show_debug_panel = !self.controller.show_debug_panel;
                        }

                        let response = ui.button("New chat").on_hover_text("Start a new conversation");
                        if response.clicked() {
                            self.controller.request_new_session();
                        }
                    });
                });
            });
    }

    fn show_input_area(&mut self, ctx: &egui::Context) {
        TopBottomPanel::bottom("input_area")
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_primary)
                    .inner_margin(self.theme.spacing),
            )
            .show(ctx, |ui| {
                InputBar::new(&mut self.controller, &self.theme).show(ui);
            });
    }

    fn show_debug_panel(&mut self, ctx: &egui::Context) {
        if !self.controller.show_debug_panel {
            return;
        }

        SidePanel::right("debug_panel")
            .resizable(true)
            .default_width(300.0)
            .min_width(220.0)
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_primary)
                    .inner_margin(self.theme.spacing),
            )
            .show(ctx, |ui| {
                DebugPanel::new(&self.controller, &self.theme).show(ui);
            });
    }

    fn show_content(&mut self, ctx: &egui::Context) {
        let revision = self.controller.log.revision();
        let scroll = revision != self.seen_revision;
        self.seen_revision = revision;

        CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.bg_primary))
            .show(ctx, |ui| {
                MessageList::new(&mut self.controller, &self.theme)
                    .scroll_to_newest(scroll)
                    .show(ui);
            });
    }

    fn show_confirm_dialog(&mut self, ctx: &egui::Context) {
        if !self.controller.is_confirm_pending() {
            return;
        }

        match ConfirmDialog::new(&self.theme).show(ctx) {
            Some(ConfirmChoice::Confirm) => self.controller.confirm_new_session(),
            Some(ConfirmChoice::Cancel) => self.controller.cancel_new_session(),
            None => {}
        }
    }

    /// One frame of UI against an arbitrary context
    pub fn frame(&mut self, ctx: &egui::Context) {
        self.controller.init();
        self.controller.poll_events();

        self.show_header(ctx);
        self.show_debug_panel(ctx);
        self.show_input_area(ctx);
        self.show_content(ctx);
        self.show_confirm_dialog(ctx);

        // Completions arrive off-thread; keep polling while any are due
        if self.controller.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}

impl eframe::App for MurmurApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.frame(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Murmur shutting down");
        self.controller.teardown();
    }
}
