use eframe::egui;

use crate::ui::boundary::{BoundaryChoice, CaughtError, RecoveryAction};

pub fn render(ui: &mut egui::Ui, caught: &CaughtError) -> Option<BoundaryChoice> {
    let mut choice = None;
    let details = caught.details();

    ui.vertical_centered(|ui| {
        ui.add_space(48.0);
        egui::Frame::group(ui.style())
            .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(0xff, 0x44, 0x44)))
            .show(ui, |ui| {
                ui.set_max_width(448.0);
                ui.colored_label(
                    egui::Color32::from_rgb(0xcc, 0x00, 0x00),
                    egui::RichText::new(format!("⚠ {}", details.title)).strong(),
                );
                ui.label(details.description);
                ui.add_space(4.0);
                ui.small(format!("Error reference: {}", caught.reference()))
                    .on_hover_text(caught.message());
            });

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            if ui.button(details.action.label()).clicked() {
                choice = Some(BoundaryChoice::Recover(details.action));
            }
            if details.action != RecoveryAction::SignIn && ui.button("Contact Support").clicked() {
                choice = Some(BoundaryChoice::ContactSupport);
            }
        });
    });

    choice
}
