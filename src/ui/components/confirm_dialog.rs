//! New-session confirmation prompt

use crate::ui::theme::Theme;
use egui::{self, Align2, RichText};

pub const NEW_SESSION_PROMPT: &str = "Start a new conversation? Your current chat will be saved.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmChoice {
    Confirm,
    Cancel,
}

pub struct ConfirmDialog<'a> {
    theme: &'a Theme,
}

impl<'a> ConfirmDialog<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self { theme }
    }

    /// Draw the prompt; returns the user's answer once given
    pub fn show(self, ctx: &egui::Context) -> Option<ConfirmChoice> {
        let mut choice = None;

        egui::Window::new("New conversation")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(RichText::new(NEW_SESSION_PROMPT).color(self.theme.text_primary));
                ui.add_space(self.theme.spacing_sm);

                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() {
                        choice = Some(ConfirmChoice::Confirm);
                    }
                    if ui.button("Cancel").clicked() {
                        choice = Some(ConfirmChoice::Cancel);
                    }
                });
            });

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            choice = Some(ConfirmChoice::Cancel);
        }

        choice
    }
}
