use eframe::egui;

use crate::common::ChatMessage;

pub const EMPTY_STATE: &str = "No messages yet. Send the first message!";

/// What the message list drew this frame and what the user asked for.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChatAreaOutput {
    /// Id whose delete button was clicked.
    pub removed: Option<String>,
    pub rows_shown: usize,
    pub delete_buttons: usize,
    pub showed_empty_state: bool,
}

/// Message list, newest at the bottom.
pub fn render(ui: &mut egui::Ui, messages: &[ChatMessage], allow_delete: bool) -> ChatAreaOutput {
    let mut output = ChatAreaOutput::default();
    if messages.is_empty() {
        ui.vertical_centered(|ui| {
            ui.add_space(32.0);
            ui.weak(EMPTY_STATE);
        });
        output.showed_empty_state = true;
        return output;
    }

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for message in messages {
                ui.push_id(&message.id, |ui| {
                    egui::Frame::group(ui.style()).show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        ui.horizontal(|ui| {
                            ui.colored_label(egui::Color32::LIGHT_BLUE, &message.username);
                            ui.weak(message.time_label());
                            if allow_delete {
                                ui.with_layout(
                                    egui::Layout::right_to_left(egui::Align::Center),
                                    |ui| {
                                        output.delete_buttons += 1;
                                        if ui.small_button("Delete").clicked() {
                                            output.removed = Some(message.id.clone());
                                        }
                                    },
                                );
                            }
                        });
                        ui.label(&message.content);
                    });
                });
                output.rows_shown += 1;
            }
        });

    output
}
