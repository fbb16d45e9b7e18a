//! Live suggestion fan-out
//!
//! The only bridge from worker threads into the async runtime. `publish`
//! is synchronous and never waits: it hands the message to a dispatch task
//! on the runtime, which copies it into one unbounded channel per
//! subscriber. A subscriber whose channel is gone is dropped from the set
//! during dispatch; nobody else notices.

use crate::models::Suggestion;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use uuid::Uuid;

pub type Message = Arc<str>;

/// Receiving end handed to one subscriber connection
#[derive(Debug)]
pub struct Subscription {
    pub id: Uuid,
    receiver: mpsc::UnboundedReceiver<Message>,
}

impl Subscription {
    /// Next message in publish order; `None` once unsubscribed
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }
}

#[derive(Debug)]
pub struct Broadcaster {
    inbox: mpsc::UnboundedSender<Message>,
    subscribers: Arc<DashMap<Uuid, mpsc::UnboundedSender<Message>>>,
}

impl Broadcaster {
    /// Start the dispatch task on the current runtime
    pub fn start() -> Arc<Self> {
        Self::start_on(&Handle::current())
    }

    pub fn start_on(handle: &Handle) -> Arc<Self> {
        let (inbox, mut rx) = mpsc::unbounded_channel::<Message>();
        let subscribers: Arc<DashMap<Uuid, mpsc::UnboundedSender<Message>>> =
            Arc::new(DashMap::new());

        let targets = Arc::clone(&subscribers);
        handle.spawn(async move {
            while let Some(message) = rx.recv().await {
                dispatch(&targets, message);
            }
            tracing::debug!("[Broadcaster] Dispatch task finished");
        });

        Arc::new(Self { inbox, subscribers })
    }

    /// Queue a suggestion for every subscriber. Callable from any thread.
    pub fn publish(&self, suggestion: &Suggestion) {
        match serde_json::to_string(suggestion) {
            Ok(json) => self.publish_text(json),
            Err(e) => tracing::error!("[Broadcaster] Failed to serialize suggestion: {}", e),
        }
    }

    pub fn publish_text(&self, message: impl Into<Message>) {
        if self.inbox.send(message.into()).is_err() {
            tracing::warn!("[Broadcaster] Runtime gone, message dropped");
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.subscribers.insert(id, tx);
        tracing::debug!("[Broadcaster] Subscriber {} joined", id);
        Subscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: Uuid) {
        if self.subscribers.remove(&id).is_some() {
            tracing::debug!("[Broadcaster] Subscriber {} left", id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

fn dispatch(subscribers: &DashMap<Uuid, mpsc::UnboundedSender<Message>>, message: Message) {
    let dead: Vec<Uuid> = subscribers
        .iter()
        .filter(|entry| entry.value().send(Arc::clone(&message)).is_err())
        .map(|entry| *entry.key())
        .collect();

    for id in dead {
        subscribers.remove(&id);
        tracing::debug!("[Broadcaster] Dropped closed subscriber {}", id);
    }
}
