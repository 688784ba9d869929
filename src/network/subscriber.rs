//! Bridge from the change stream to the page's message store.

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError};

use super::feed::{ChangeStream, SubscriptionHandle};
use crate::common::FeedEvent;
use crate::error::{ChatError, Result};
use crate::ui::state::MessageStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribing,
    Active,
}

/// Owns one subscription for as long as the chat page is mounted.
///
/// Dropping the subscriber releases the subscription, so a page that goes
/// away (even mid-panic) leaves no handler behind on the stream.
pub struct LiveFeedSubscriber {
    stream: Arc<dyn ChangeStream>,
    state: SubscriptionState,
    handle: Option<SubscriptionHandle>,
    events: Option<mpsc::Receiver<FeedEvent>>,
}

impl LiveFeedSubscriber {
    pub fn new(stream: Arc<dyn ChangeStream>) -> Self {
        Self {
            stream,
            state: SubscriptionState::Unsubscribed,
            handle: None,
            events: None,
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Open the subscription. `capacity` bounds events buffered between
    /// frames; a subscriber that falls further behind is cut off by the feed.
    pub fn mount(&mut self, capacity: usize) -> Result<()> {
        if self.state != SubscriptionState::Unsubscribed {
            return Ok(());
        }

        self.state = SubscriptionState::Subscribing;
        let (sink, events) = mpsc::channel(capacity.max(1));
        match self.stream.subscribe(sink) {
            Ok(handle) => {
                log::info!("Live feed subscribed (subscription {})", handle.id().0);
                self.handle = Some(handle);
                self.events = Some(events);
                self.state = SubscriptionState::Active;
                Ok(())
            }
            Err(err) => {
                self.state = SubscriptionState::Unsubscribed;
                Err(err)
            }
        }
    }

    /// Apply every buffered event to `store`. Returns how many were applied.
    ///
    /// Fails once the stream has cut this subscriber off (it fell too far
    /// behind); events applied before the cut stay applied.
    pub fn drain_into(&mut self, store: &mut MessageStore) -> Result<usize> {
        let Some(events) = self.events.as_mut() else {
            return Ok(0);
        };

        let mut applied = 0;
        let mut closed = false;
        loop {
            match events.try_recv() {
                Ok(event) => {
                    dispatch(event, store);
                    applied += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    closed = true;
                    break;
                }
            }
        }

        if closed {
            log::warn!("Live feed closed by the change stream after {applied} events");
            self.teardown();
            return Err(ChatError::Connection(
                "live message feed was closed".to_string(),
            ));
        }
        Ok(applied)
    }

    /// Release the subscription. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.events = None;
        if let Some(handle) = self.handle.take() {
            let id = handle.id();
            self.stream.unsubscribe(handle);
            log::info!("Live feed unsubscribed (subscription {})", id.0);
        }
        self.state = SubscriptionState::Unsubscribed;
    }
}

impl Drop for LiveFeedSubscriber {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Route one change into the store.
pub fn dispatch(event: FeedEvent, store: &mut MessageStore) {
    match event {
        FeedEvent::Insert(message) => store.apply_insert(message),
        FeedEvent::Delete { id } => {
            store.apply_delete(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ChatMessage;
    use crate::error::ChatError;
    use crate::network::feed::ChangeFeed;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts unsubscribe calls on top of a real feed.
    struct CountingStream {
        feed: ChangeFeed,
        unsubscribes: AtomicUsize,
    }

    impl ChangeStream for CountingStream {
        fn subscribe(&self, sink: mpsc::Sender<FeedEvent>) -> Result<SubscriptionHandle> {
            self.feed.subscribe(sink)
        }

        fn unsubscribe(&self, handle: SubscriptionHandle) {
            self.unsubscribes.fetch_add(1, Ordering::SeqCst);
            self.feed.unsubscribe(handle);
        }
    }

    struct RefusingStream;

    impl ChangeStream for RefusingStream {
        fn subscribe(&self, _sink: mpsc::Sender<FeedEvent>) -> Result<SubscriptionHandle> {
            Err(ChatError::Connection("realtime endpoint unreachable".to_string()))
        }

        fn unsubscribe(&self, _handle: SubscriptionHandle) {}
    }

    fn counting_stream() -> Arc<CountingStream> {
        Arc::new(CountingStream {
            feed: ChangeFeed::new(),
            unsubscribes: AtomicUsize::new(0),
        })
    }

    #[test]
    fn mount_moves_to_active() {
        let stream = counting_stream();
        let mut subscriber = LiveFeedSubscriber::new(stream.clone());
        assert_eq!(subscriber.state(), SubscriptionState::Unsubscribed);

        subscriber.mount(8).unwrap();
        assert_eq!(subscriber.state(), SubscriptionState::Active);
        assert_eq!(stream.feed.subscriber_count(), 1);

        // Mounting twice does not open a second subscription
        subscriber.mount(8).unwrap();
        assert_eq!(stream.feed.subscriber_count(), 1);
    }

    #[test]
    fn failed_subscribe_returns_to_unsubscribed() {
        let mut subscriber = LiveFeedSubscriber::new(Arc::new(RefusingStream));
        let result = subscriber.mount(8);

        assert!(matches!(result, Err(ChatError::Connection(_))));
        assert_eq!(subscriber.state(), SubscriptionState::Unsubscribed);
    }

    #[test]
    fn events_flow_into_the_store() {
        let stream = counting_stream();
        let mut subscriber = LiveFeedSubscriber::new(stream.clone());
        subscriber.mount(8).unwrap();
        let mut store = MessageStore::new();

        let message = ChatMessage::new("Bo", "hi");
        stream.feed.publish(&FeedEvent::Insert(message.clone()));
        assert_eq!(subscriber.drain_into(&mut store).unwrap(), 1);
        assert_eq!(store.messages(), &[message.clone()]);

        stream.feed.publish(&FeedEvent::Delete { id: message.id });
        assert_eq!(subscriber.drain_into(&mut store).unwrap(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn teardown_releases_exactly_once() {
        let stream = counting_stream();
        let mut subscriber = LiveFeedSubscriber::new(stream.clone());
        subscriber.mount(8).unwrap();

        subscriber.teardown();
        subscriber.teardown();
        drop(subscriber);

        assert_eq!(stream.unsubscribes.load(Ordering::SeqCst), 1);
        assert_eq!(stream.feed.subscriber_count(), 0);
    }

    #[test]
    fn drop_releases_the_subscription() {
        let stream = counting_stream();
        {
            let mut subscriber = LiveFeedSubscriber::new(stream.clone());
            subscriber.mount(8).unwrap();
        }

        assert_eq!(stream.unsubscribes.load(Ordering::SeqCst), 1);
        assert_eq!(stream.feed.subscriber_count(), 0);
    }

    #[test]
    fn overflowing_subscriber_is_cut_off() {
        let stream = counting_stream();
        let mut subscriber = LiveFeedSubscriber::new(stream.clone());
        subscriber.mount(1).unwrap();
        let mut store = MessageStore::new();

        for i in 0..3 {
            stream
                .feed
                .publish(&FeedEvent::Insert(ChatMessage::new("Bo", &format!("#{i}"))));
        }

        let result = subscriber.drain_into(&mut store);
        assert!(matches!(result, Err(ChatError::Connection(_))));
        // The one event that fit was still applied
        assert_eq!(store.len(), 1);
        assert_eq!(subscriber.state(), SubscriptionState::Unsubscribed);
        assert_eq!(subscriber.drain_into(&mut store).unwrap(), 0);
    }
}
