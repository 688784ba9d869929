//! The chat page: message list, live feed and input form.

use std::sync::Arc;

use eframe::egui;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use crate::common::{ChatCommand, ServiceEvent};
use crate::config::PageSettings;
use crate::error::ChatError;
use crate::network::{ChangeStream, LiveFeedSubscriber};

use super::components::{chat_area, input_bar};
use super::state::{ComposeState, MessageStore};

pub struct ChatPage {
    store: MessageStore,
    compose: ComposeState,
    subscriber: LiveFeedSubscriber,
    commands: mpsc::Sender<ChatCommand>,
    reply_sender: mpsc::Sender<ServiceEvent>,
    replies: mpsc::Receiver<ServiceEvent>,
    settings: PageSettings,
    loaded: bool,
    failure: Option<ChatError>,
}

impl ChatPage {
    /// Subscribe to the live feed, then ask for the bulk load.
    pub fn mount(
        stream: Arc<dyn ChangeStream>,
        commands: mpsc::Sender<ChatCommand>,
        settings: PageSettings,
    ) -> Self {
        let (reply_sender, replies) = mpsc::channel(settings.channel_capacity.max(1));
        let mut page = Self {
            store: MessageStore::new(),
            compose: ComposeState::new(&settings.default_username),
            subscriber: LiveFeedSubscriber::new(stream),
            commands,
            reply_sender,
            replies,
            settings,
            loaded: false,
            failure: None,
        };

        if let Err(err) = page.subscriber.mount(page.settings.channel_capacity) {
            log::error!("Error subscribing to live messages: {err}");
        }

        let load = ChatCommand::LoadRecent {
            limit: page.settings.recent_limit,
            reply: page.reply_sender.clone(),
        };
        page.dispatch(load);
        page
    }

    /// Whether the bulk load has completed, successfully or not.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn compose(&self) -> &ComposeState {
        &self.compose
    }

    pub fn compose_mut(&mut self) -> &mut ComposeState {
        &mut self.compose
    }

    pub fn subscriber(&self) -> &LiveFeedSubscriber {
        &self.subscriber
    }

    /// A failure the page cannot recover from on its own.
    pub fn take_failure(&mut self) -> Option<ChatError> {
        self.failure.take()
    }

    /// Drain live events and service replies. Called once per frame.
    pub fn poll(&mut self) {
        if let Err(err) = self.subscriber.drain_into(&mut self.store) {
            // Cut off by the feed: the list can no longer be trusted to be
            // current, so hand over to the error boundary for a re-mount.
            self.failure = Some(err);
        }

        loop {
            match self.replies.try_recv() {
                Ok(event) => self.handle_reply(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Send the form contents. Returns whether a request was issued.
    pub fn submit(&mut self) -> bool {
        let Some(request) = self.compose.begin_submit() else {
            return false;
        };

        let command = ChatCommand::Submit {
            content: request.content,
            username: request.username,
            reply: self.reply_sender.clone(),
        };
        if self.dispatch(command) {
            true
        } else {
            self.compose.abort_submit();
            false
        }
    }

    /// Ask the gateway to delete `id`. The row leaves the list when the
    /// delete event comes back through the feed.
    pub fn remove(&mut self, id: &str) -> bool {
        if !self.settings.allow_delete {
            log::debug!("Delete of {id} ignored, deletion is disabled");
            return false;
        }
        let command = ChatCommand::Remove {
            id: id.to_string(),
            reply: self.reply_sender.clone(),
        };
        self.dispatch(command)
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        self.poll();

        egui::TopBottomPanel::bottom("chat_input")
            .resizable(false)
            .show_inside(ui, |ui| {
                ui.add_space(4.0);
                if input_bar::render(ui, &mut self.compose) {
                    self.submit();
                }
                ui.add_space(4.0);
            });

        let removed = egui::CentralPanel::default()
            .show_inside(ui, |ui| {
                if !self.loaded && self.store.is_empty() {
                    ui.vertical_centered(|ui| ui.spinner());
                    return None;
                }
                chat_area::render(ui, self.store.messages(), self.settings.allow_delete).removed
            })
            .inner;
        if let Some(id) = removed {
            self.remove(&id);
        }
    }

    fn handle_reply(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::Loaded(result) => {
                self.loaded = true;
                match result {
                    Ok(messages) => {
                        log::info!("Loaded {} messages", messages.len());
                        self.store.initialize(messages);
                    }
                    Err(err) => log::error!("Error loading messages: {err}"),
                }
            }
            ServiceEvent::Submitted(result) => self.compose.finish_submit(result.as_ref()),
            ServiceEvent::Removed { id, result } => match result {
                Ok(true) => log::debug!("Message {id} deleted"),
                Ok(false) => log::debug!("Message {id} was already gone"),
                Err(err) => log::error!("Error deleting message {id}: {err}"),
            },
        }
    }

    fn dispatch(&mut self, command: ChatCommand) -> bool {
        match self.commands.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("Chat service is busy, request dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                log::error!("Chat service is not running");
                self.failure = Some(ChatError::ServiceClosed);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ChatMessage, FeedEvent};
    use crate::network::{ChangeFeed, SubscriptionState};
    use chrono::{DateTime, Utc};

    struct Harness {
        feed: Arc<ChangeFeed>,
        commands: mpsc::Receiver<ChatCommand>,
        page: ChatPage,
    }

    fn settings(allow_delete: bool) -> PageSettings {
        PageSettings {
            allow_delete,
            ..PageSettings::default()
        }
    }

    fn mount(settings: PageSettings) -> Harness {
        let feed = Arc::new(ChangeFeed::new());
        let (cmd_tx, commands) = mpsc::channel(16);
        let page = ChatPage::mount(feed.clone(), cmd_tx, settings);
        Harness {
            feed,
            commands,
            page,
        }
    }

    fn take_load_reply(harness: &mut Harness) -> mpsc::Sender<ServiceEvent> {
        match harness.commands.try_recv().unwrap() {
            ChatCommand::LoadRecent { limit, reply } => {
                assert_eq!(limit, 100);
                reply
            }
            other => panic!("expected bulk load, got {other:?}"),
        }
    }

    fn bo_says_hi() -> ChatMessage {
        ChatMessage {
            id: "1".to_string(),
            username: "Bo".to_string(),
            content: "hi".to_string(),
            created_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn mount_subscribes_and_requests_the_bulk_load() {
        let mut harness = mount(settings(true));

        assert_eq!(
            harness.page.subscriber().state(),
            SubscriptionState::Active
        );
        assert_eq!(harness.feed.subscriber_count(), 1);
        take_load_reply(&mut harness);
    }

    #[test]
    fn empty_load_insert_and_delete_scenario() {
        let mut harness = mount(settings(true));
        let reply = take_load_reply(&mut harness);

        assert!(!harness.page.is_loaded());
        reply.try_send(ServiceEvent::Loaded(Ok(Vec::new()))).unwrap();
        harness.page.poll();
        assert!(harness.page.is_loaded());
        assert!(harness.page.store().is_empty());

        harness.feed.publish(&FeedEvent::Insert(bo_says_hi()));
        harness.page.poll();
        let rows: Vec<String> = harness
            .page
            .store()
            .messages()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rows, vec!["Bo: hi"]);
        assert_eq!(harness.page.store().messages()[0].created_at, bo_says_hi().created_at);

        harness.feed.publish(&FeedEvent::Delete {
            id: "1".to_string(),
        });
        harness.page.poll();
        assert!(harness.page.store().is_empty());
    }

    #[test]
    fn valid_submit_issues_exactly_one_request() {
        let mut harness = mount(settings(true));
        take_load_reply(&mut harness);

        harness.page.compose_mut().input_text = "hello".to_string();
        assert!(harness.page.submit());
        // In flight: the second attempt is rejected
        assert!(!harness.page.submit());

        let reply = match harness.commands.try_recv().unwrap() {
            ChatCommand::Submit {
                content,
                username,
                reply,
            } => {
                assert_eq!(content, "hello");
                assert_eq!(username, "Anonymous");
                reply
            }
            other => panic!("expected submit, got {other:?}"),
        };
        assert!(harness.commands.try_recv().is_err());

        // Input survives until the insert succeeds
        harness.page.poll();
        assert_eq!(harness.page.compose().input_text, "hello");

        reply
            .try_send(ServiceEvent::Submitted(Ok(bo_says_hi())))
            .unwrap();
        harness.page.poll();
        assert!(harness.page.compose().input_text.is_empty());
        assert!(!harness.page.compose().is_sending());
    }

    #[test]
    fn failed_submit_keeps_the_input() {
        let mut harness = mount(settings(true));
        take_load_reply(&mut harness);

        harness.page.compose_mut().input_text = "hello".to_string();
        harness.page.submit();
        let reply = match harness.commands.try_recv().unwrap() {
            ChatCommand::Submit { reply, .. } => reply,
            other => panic!("expected submit, got {other:?}"),
        };

        reply
            .try_send(ServiceEvent::Submitted(Err(ChatError::Server {
                status: 500,
                message: "boom".to_string(),
            })))
            .unwrap();
        harness.page.poll();
        assert_eq!(harness.page.compose().input_text, "hello");
        assert!(harness.page.compose().can_send());
    }

    #[test]
    fn remove_is_not_optimistic() {
        let mut harness = mount(settings(true));
        let reply = take_load_reply(&mut harness);
        reply
            .try_send(ServiceEvent::Loaded(Ok(vec![bo_says_hi()])))
            .unwrap();
        harness.page.poll();

        assert!(harness.page.remove("1"));
        assert!(matches!(
            harness.commands.try_recv().unwrap(),
            ChatCommand::Remove { ref id, .. } if id == "1"
        ));
        assert_eq!(harness.page.store().len(), 1);
    }

    #[test]
    fn remove_is_ignored_when_deletion_is_disabled() {
        let mut harness = mount(settings(false));
        take_load_reply(&mut harness);

        assert!(!harness.page.remove("1"));
        assert!(harness.commands.try_recv().is_err());
    }

    #[test]
    fn closed_service_is_reported_as_a_failure() {
        let mut harness = mount(settings(true));
        take_load_reply(&mut harness);
        harness.commands.close();

        harness.page.compose_mut().input_text = "hello".to_string();
        assert!(!harness.page.submit());
        assert!(!harness.page.compose().is_sending());
        assert!(matches!(
            harness.page.take_failure(),
            Some(ChatError::ServiceClosed)
        ));
    }

    #[test]
    fn falling_behind_the_feed_is_reported() {
        let mut harness = mount(PageSettings {
            channel_capacity: 2,
            ..PageSettings::default()
        });
        take_load_reply(&mut harness);

        for i in 0..5 {
            harness
                .feed
                .publish(&FeedEvent::Insert(ChatMessage::new("Bo", &format!("#{i}"))));
        }
        harness.page.poll();

        assert_eq!(harness.page.store().len(), 2);
        assert_eq!(
            harness.page.subscriber().state(),
            SubscriptionState::Unsubscribed
        );
        let failure = harness.page.take_failure();
        assert!(matches!(failure, Some(ChatError::Connection(_))));
        assert_eq!(
            crate::ui::boundary::ErrorDetails::for_error(&failure.unwrap()).action,
            crate::ui::boundary::RecoveryAction::Retry
        );
    }

    #[test]
    fn remounting_after_a_cut_off_resumes_live_updates() {
        let mut harness = mount(PageSettings {
            channel_capacity: 1,
            ..PageSettings::default()
        });
        take_load_reply(&mut harness);
        for i in 0..3 {
            harness
                .feed
                .publish(&FeedEvent::Insert(ChatMessage::new("Bo", &format!("#{i}"))));
        }
        harness.page.poll();
        assert!(harness.page.take_failure().is_some());

        // What the boundary's retry does: a fresh page on the same feed
        let (cmd_tx, _commands) = mpsc::channel(4);
        let mut page = ChatPage::mount(harness.feed.clone(), cmd_tx, PageSettings::default());
        let later = ChatMessage::new("Bo", "later");
        harness.feed.publish(&FeedEvent::Insert(later.clone()));
        page.poll();

        assert_eq!(page.store().messages(), &[later]);
        assert!(page.take_failure().is_none());
    }

    #[test]
    fn unmount_releases_the_subscription() {
        let harness = mount(settings(true));
        let feed = harness.feed.clone();
        drop(harness);

        assert_eq!(feed.subscriber_count(), 0);
    }
}
