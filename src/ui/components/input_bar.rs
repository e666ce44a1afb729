//! Input bar component
//!
//! Mic toggle, single-line text input and Send button.

use crate::controller::ChatController;
use crate::speech::VoiceState;
use crate::ui::theme::Theme;
use egui::{self, Key, RichText, Vec2};

/// Input bar component for text and voice input
pub struct InputBar<'a> {
    controller: &'a mut ChatController,
    theme: &'a Theme,
}

impl<'a> InputBar<'a> {
    pub fn new(controller: &'a mut ChatController, theme: &'a Theme) -> Self {
        Self { controller, theme }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        egui::Frame::none()
            .fill(self.theme.bg_secondary)
            .rounding(self.theme.card_rounding)
            .inner_margin(self.theme.spacing_sm)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    // Hidden entirely when there is no recognizer
                    if self.controller.voice_state() != VoiceState::Unavailable {
                        self.show_mic_button(ui);
                        ui.add_space(self.theme.spacing_sm);
                    }

                    self.show_text_input(ui);

                    ui.add_space(self.theme.spacing_sm);

                    self.show_send_button(ui);
                });
            });
    }

    fn show_mic_button(&mut self, ui: &mut egui::Ui) {
        let listening = self.controller.voice_state() == VoiceState::Listening;

        let (icon, color) = if listening {
            ("⏹", self.theme.listening)
        } else {
            ("🎤", self.theme.text_secondary)
        };

        let button = egui::Button::new(RichText::new(icon).size(20.0).color(color))
            .min_size(Vec2::splat(40.0))
            .rounding(self.theme.button_rounding);

        let button = if listening {
            button.fill(self.theme.listening.gamma_multiply(0.2))
        } else {
            button
        };

        let response = ui.add(button);
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Voice input")
        });

        if listening {
            // Pulsing ring while capturing
            let t = ui.ctx().input(|i| i.time);
            let pulse = ((t * 3.0).sin() * 0.5 + 0.5) as f32;
            let rect = response.rect;
            ui.painter().circle_stroke(
                rect.center(),
                rect.width() / 2.0 + 2.0 + pulse * 3.0,
                egui::Stroke::new(2.0 * pulse, self.theme.listening),
            );
            ui.ctx().request_repaint();
        }

        let clicked = response.clicked();
        response.on_hover_text(self.controller.voice_tooltip());

        if clicked {
            self.controller.toggle_voice();
        }
    }

    fn show_text_input(&mut self, ui: &mut egui::Ui) {
        // Reserve space for the send button
        let available_width = ui.available_width() - 60.0;

        let text_edit = egui::TextEdit::singleline(&mut self.controller.input_text)
            .hint_text("Type a message...")
            .desired_width(available_width)
            .font(egui::TextStyle::Body)
            .margin(egui::Margin::symmetric(12.0, 8.0));

        let response = ui.add(text_edit);
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::TextEdit, true, "Message input")
        });

        // Single-line edits drop focus on Enter
        if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
            self.controller.submit();
            response.request_focus();
        }
    }

    fn show_send_button(&mut self, ui: &mut egui::Ui) {
        let can_send = !self.controller.input_text.trim().is_empty();

        let fill = if can_send {
            self.theme.primary
        } else {
            self.theme.bg_tertiary
        };

        let button = egui::Button::new(RichText::new("➤").size(18.0).color(egui::Color32::WHITE))
            .min_size(Vec2::splat(40.0))
            .rounding(self.theme.button_rounding)
            .fill(fill);

        let response = ui.add(button);
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Send message")
        });

        if response.clicked() {
            self.controller.submit();
        }

        response.on_hover_text("Send message (Enter)");
    }
}
