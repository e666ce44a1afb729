//! Message list component
//!
//! User entries sit on the right, assistant entries on the left, each with
//! its local timestamp.

use crate::controller::ChatController;
use crate::messages::{Message, Sender};
use crate::ui::theme::Theme;
use egui::{self, Align, Color32, RichText};
use uuid::Uuid;

pub struct MessageList<'a> {
    controller: &'a mut ChatController,
    theme: &'a Theme,
    scroll_to_newest: bool,
}

impl<'a> MessageList<'a> {
    pub fn new(controller: &'a mut ChatController, theme: &'a Theme) -> Self {
        Self {
            controller,
            theme,
            scroll_to_newest: false,
        }
    }

    /// Bring the last entry into view this frame
    pub fn scroll_to_newest(mut self, scroll: bool) -> Self {
        self.scroll_to_newest = scroll;
        self
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        let messages = self.controller.log.get_all();
        let mut replay: Option<Uuid> = None;

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.add_space(self.theme.spacing);

                    if messages.is_empty() {
                        self.show_empty_state(ui);
                    } else {
                        let last = messages.len() - 1;
                        for (i, message) in messages.iter().enumerate() {
                            let response = self.show_message(ui, message, &mut replay);
                            if i == last && self.scroll_to_newest {
                                response.scroll_to_me(Some(Align::BOTTOM));
                            }
                            ui.add_space(self.theme.spacing_sm);
                        }
                    }

                    ui.add_space(self.theme.spacing);
                });
            });

        if let Some(id) = replay {
            self.controller.replay_audio(id);
        }
    }

    fn show_empty_state(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(100.0);
            ui.label(
                RichText::new("No messages yet")
                    .size(20.0)
                    .color(self.theme.text_primary),
            );
            ui.add_space(self.theme.spacing_sm);
            ui.label(
                RichText::new("Type a message below or click the mic to speak.")
                    .color(self.theme.text_muted),
            );
        });
    }

    fn show_message(
        &self,
        ui: &mut egui::Ui,
        message: &Message,
        replay: &mut Option<Uuid>,
    ) -> egui::Response {
        let is_user = message.sender == Sender::User;
        let (bubble_color, text_color) = if is_user {
            (self.theme.user_bubble, Color32::WHITE)
        } else {
            (self.theme.assistant_bubble, self.theme.text_primary)
        };
        let align = if is_user { Align::RIGHT } else { Align::LEFT };

        ui.with_layout(egui::Layout::top_down(align), |ui| {
            let max_width = ui.available_width() * 0.75;

            egui::Frame::none()
                .fill(bubble_color)
                .rounding(self.theme.bubble_rounding)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    ui.set_max_width(max_width);

                    let label = if is_user {
                        format!("User message: {}", message.text)
                    } else {
                        format!("Assistant response: {}", message.text)
                    };
                    let response = ui.label(RichText::new(&message.text).color(text_color));
                    response.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &label)
                    });
                });

            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(message.display_time())
                        .size(11.0)
                        .color(self.theme.text_muted),
                );

                if message.audio_url.is_some() {
                    let response = ui
                        .small_button("🔊")
                        .on_hover_text("Play again");
                    if response.clicked() {
                        *replay = Some(message.id);
                    }
                }
            });
        })
        .response
    }
}
