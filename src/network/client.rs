use std::sync::Arc;

use tokio::sync::mpsc;

use crate::common::{ChatCommand, ServiceEvent};

use super::gateway::PersistenceGateway;

/// Background worker executing page requests against the gateway.
///
/// Each request runs as its own task so a slow insert does not hold up a
/// delete. Nothing is cancelled: a reply for a page that has since been
/// unmounted is dropped.
pub struct ChatService<G> {
    gateway: Arc<G>,
    command_receiver: mpsc::Receiver<ChatCommand>,
}

impl<G: PersistenceGateway> ChatService<G> {
    pub fn new(gateway: Arc<G>, command_receiver: mpsc::Receiver<ChatCommand>) -> Self {
        Self {
            gateway,
            command_receiver,
        }
    }

    pub async fn run(mut self) {
        log::info!("Chat service started");
        while let Some(command) = self.command_receiver.recv().await {
            self.handle_command(command);
        }
        log::info!("Chat service stopped");
    }

    fn handle_command(&self, command: ChatCommand) {
        let gateway = Arc::clone(&self.gateway);
        match command {
            ChatCommand::LoadRecent { limit, reply } => {
                spawn_request(reply, move || {
                    ServiceEvent::Loaded(gateway.fetch_recent(limit))
                });
            }
            ChatCommand::Submit {
                content,
                username,
                reply,
            } => {
                spawn_request(reply, move || {
                    ServiceEvent::Submitted(gateway.insert(&content, &username))
                });
            }
            ChatCommand::Remove { id, reply } => {
                spawn_request(reply, move || {
                    let result = gateway.delete(&id);
                    ServiceEvent::Removed { id, result }
                });
            }
        }
    }
}

fn spawn_request<F>(reply: mpsc::Sender<ServiceEvent>, work: F)
where
    F: FnOnce() -> ServiceEvent + Send + 'static,
{
    tokio::spawn(async move {
        let event = match tokio::task::spawn_blocking(work).await {
            Ok(event) => event,
            Err(err) => {
                log::error!("Chat request failed to complete: {err}");
                return;
            }
        };

        if reply.send(event).await.is_err() {
            log::debug!("Reply dropped, requesting page is gone");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::storage::MessageDatabase;
    use std::time::Duration;
    use tokio::time::timeout;

    fn start_service() -> (mpsc::Sender<ChatCommand>, Arc<MessageDatabase>) {
        let gateway = Arc::new(MessageDatabase::in_memory().unwrap());
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        tokio::spawn(ChatService::new(gateway.clone(), cmd_rx).run());
        (cmd_tx, gateway)
    }

    async fn next_reply(rx: &mut mpsc::Receiver<ServiceEvent>) -> ServiceEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("reply timed out")
            .expect("reply channel closed")
    }

    #[tokio::test]
    async fn submit_then_load() {
        let (commands, _gateway) = start_service();
        let (reply, mut replies) = mpsc::channel(4);

        commands
            .send(ChatCommand::Submit {
                content: "hi".to_string(),
                username: "Bo".to_string(),
                reply: reply.clone(),
            })
            .await
            .unwrap();
        let stored = match next_reply(&mut replies).await {
            ServiceEvent::Submitted(Ok(message)) => message,
            other => panic!("unexpected reply: {other:?}"),
        };

        commands
            .send(ChatCommand::LoadRecent { limit: 100, reply })
            .await
            .unwrap();
        match next_reply(&mut replies).await {
            ServiceEvent::Loaded(Ok(messages)) => assert_eq!(messages, vec![stored]),
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failures_come_back_as_replies() {
        let (commands, _gateway) = start_service();
        let (reply, mut replies) = mpsc::channel(4);

        commands
            .send(ChatCommand::Submit {
                content: "   ".to_string(),
                username: String::new(),
                reply,
            })
            .await
            .unwrap();

        assert!(matches!(
            next_reply(&mut replies).await,
            ServiceEvent::Submitted(Err(ChatError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn replies_to_unmounted_pages_are_dropped() {
        let (commands, gateway) = start_service();
        let (reply, replies) = mpsc::channel(4);
        drop(replies);

        commands
            .send(ChatCommand::Submit {
                content: "orphan".to_string(),
                username: "Bo".to_string(),
                reply,
            })
            .await
            .unwrap();

        // The write itself still lands
        timeout(Duration::from_secs(5), async {
            while gateway.message_count().unwrap() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("insert never completed");
    }

    #[tokio::test]
    async fn service_stops_when_commands_close() {
        let gateway = Arc::new(MessageDatabase::in_memory().unwrap());
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        let worker = tokio::spawn(ChatService::new(gateway, cmd_rx).run());

        drop(cmd_tx);
        timeout(Duration::from_secs(5), worker)
            .await
            .expect("service did not stop")
            .unwrap();
    }
}
