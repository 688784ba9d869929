use eframe::egui;

use crate::common::types::{MAX_CONTENT_CHARS, MAX_USERNAME_CHARS};
use crate::ui::state::ComposeState;

/// Username and message fields plus the send button. Returns true when the
/// user asked to send.
pub fn render(ui: &mut egui::Ui, compose: &mut ComposeState) -> bool {
    let mut send = false;

    ui.add(
        egui::TextEdit::singleline(&mut compose.username)
            .hint_text("Your name (optional)")
            .char_limit(MAX_USERNAME_CHARS)
            .desired_width(f32::INFINITY),
    );

    ui.horizontal(|ui| {
        let can_send = compose.can_send();
        let label = if compose.is_sending() { "Sending…" } else { "Send" };
        let field_width = (ui.available_width() - 80.0).max(120.0);

        let response = ui.add(
            egui::TextEdit::singleline(&mut compose.input_text)
                .hint_text("Type your message...")
                .char_limit(MAX_CONTENT_CHARS)
                .desired_width(field_width),
        );

        if ui.add_enabled(can_send, egui::Button::new(label)).clicked() {
            send = true;
        }

        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            send = true;
            response.request_focus();
        }
    });

    send
}
