use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::common::ChatCommand;
use crate::config::PageSettings;
use crate::network::ChangeStream;

use super::boundary::{self, BoundaryChoice, CaughtError, RecoveryAction};
use super::components::{error_view, pages};
use super::page::ChatPage;
use super::router::Route;

/// Live feed events arrive without user input, so keep frames coming.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ChatApp {
    route: Route,
    requested_path: String,
    page: Option<ChatPage>,
    caught: Option<CaughtError>,
    stream: Arc<dyn ChangeStream>,
    command_sender: mpsc::Sender<ChatCommand>,
    settings: PageSettings,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        stream: Arc<dyn ChangeStream>,
        command_sender: mpsc::Sender<ChatCommand>,
        settings: PageSettings,
        start_path: &str,
    ) -> Self {
        let mut app = Self {
            route: Route::Home,
            requested_path: start_path.to_string(),
            page: None,
            caught: None,
            stream,
            command_sender,
            settings,
        };
        app.navigate(Route::from_path(start_path));
        app
    }

    /// Switch pages. Leaving the chat page unmounts it, which releases its
    /// live feed subscription.
    fn navigate(&mut self, route: Route) {
        if route == Route::Home {
            if self.page.is_none() {
                self.mount_page();
            }
        } else {
            self.page = None;
        }
        if route != Route::NotFound {
            self.requested_path = route.path().to_string();
        }
        log::debug!("Navigated to {}", route.path());
        self.route = route;
    }

    fn mount_page(&mut self) {
        self.page = Some(ChatPage::mount(
            Arc::clone(&self.stream),
            self.command_sender.clone(),
            self.settings.clone(),
        ));
    }

    fn fail(&mut self, caught: CaughtError) {
        self.page = None;
        self.caught = Some(caught);
    }

    fn recover(&mut self, choice: BoundaryChoice) {
        self.caught = None;
        match choice {
            BoundaryChoice::Recover(RecoveryAction::Retry) => {
                self.page = None;
                self.navigate(self.route);
            }
            BoundaryChoice::Recover(RecoveryAction::SignIn) => self.navigate(Route::SignIn),
            BoundaryChoice::Recover(RecoveryAction::Home) => self.navigate(Route::Home),
            BoundaryChoice::ContactSupport => self.navigate(Route::Support),
        }
    }

    fn show_chat(&mut self, ui: &mut egui::Ui) {
        let Some(page) = self.page.as_mut() else {
            return;
        };

        let failure = match boundary::guard(|| page.show(ui)) {
            Ok(()) => page.take_failure().map(|err| CaughtError::new(&err)),
            Err(caught) => Some(caught),
        };
        if let Some(caught) = failure {
            self.fail(caught);
        }
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.vertical_centered(|ui| ui.heading("Live Public Chat"));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(caught) = &self.caught {
                if let Some(choice) = error_view::render(ui, caught) {
                    self.recover(choice);
                }
                return;
            }

            let next = match self.route {
                Route::Home => {
                    self.show_chat(ui);
                    None
                }
                Route::NotFound => pages::render_not_found(ui, &self.requested_path),
                route => pages::render_placeholder(ui, route),
            };
            if let Some(route) = next {
                self.navigate(route);
            }
        });

        ctx.request_repaint_after(POLL_INTERVAL);
    }
}
