use eframe::egui;

use crate::ui::router::Route;

/// Stand-in for pages served by other parts of the site.
pub fn render_placeholder(ui: &mut egui::Ui, route: Route) -> Option<Route> {
    let mut next = None;
    ui.vertical_centered(|ui| {
        ui.add_space(48.0);
        ui.heading(route.title());
        ui.weak(route.path());
        ui.add_space(12.0);
        if ui.button("Back to chat").clicked() {
            next = Some(Route::Home);
        }
    });
    next
}

pub fn render_not_found(ui: &mut egui::Ui, path: &str) -> Option<Route> {
    let mut next = None;
    ui.vertical_centered(|ui| {
        ui.add_space(48.0);
        ui.heading(egui::RichText::new("404").size(64.0).strong());
        ui.heading("Oops! Page Not Found");
        ui.label(format!(
            "The page {path} doesn't exist or has been moved. You can find your way back home."
        ));
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            if ui.button("Return to Dashboard").clicked() {
                next = Some(Route::Home);
            }
            if ui.button("Contact Support").clicked() {
                next = Some(Route::Contact);
            }
        });
        ui.add_space(24.0);
        ui.weak("If you believe this is an error, please let us know.");
    });
    next
}
