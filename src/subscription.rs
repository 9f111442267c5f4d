use std::sync::Arc;

use tokio::sync::mpsc;

/// `None` means "receive everything".
pub type Filter<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

const SUBSCRIBER_BUFFER: usize = 64;

struct Subscriber<T> {
    // Feeds a dedicated forwarding task, never awaited by `publish`.
    inbox: mpsc::UnboundedSender<T>,
    filter: Option<Filter<T>>,
}

pub(crate) struct Topic<T> {
    subscribers: Vec<Subscriber<T>>,
}

impl<T> Default for Topic<T> {
    fn default() -> Self {
        Self { subscribers: Vec::new() }
    }
}

impl<T> Topic<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// No replay: only events published after this call are delivered.
    pub(crate) fn subscribe(&mut self, filter: Option<Filter<T>>) -> mpsc::Receiver<T> {
        let (out_tx, out_rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let (inbox_tx, mut inbox_rx) = mpsc::unbounded_channel::<T>();

        // One forwarding task per subscriber keeps delivery order without
        // blocking the Serializer on a slow consumer.
        tokio::spawn(async move {
            while let Some(event) = inbox_rx.recv().await {
                if out_tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        self.subscribers.push(Subscriber { inbox: inbox_tx, filter });
        out_rx
    }

    /// Hand `event` to every subscriber whose filter accepts it. Never
    /// blocks: handing off to `inbox` is an unbounded, non-awaiting send.
    pub(crate) fn publish(&mut self, event: T) {
        self.subscribers.retain(|sub| {
            if let Some(filter) = &sub.filter {
                if !filter(&event) {
                    return !sub.inbox.is_closed();
                }
            }
            sub.inbox.send(event.clone()).is_ok()
        });
    }

    /// Drop every subscriber, closing each channel exactly once.
    pub(crate) fn close_all(&mut self) {
        self.subscribers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_only_post_subscription_events() {
        let mut topic: Topic<u32> = Topic::new();
        topic.publish(1);
        let mut rx = topic.subscribe(None);
        topic.publish(2);
        topic.publish(3);
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(3));
    }

    #[tokio::test]
    async fn filter_excludes_non_matching_events() {
        let mut topic: Topic<u32> = Topic::new();
        let filter: Filter<u32> = Arc::new(|v: &u32| *v % 2 == 0);
        let mut rx = topic.subscribe(Some(filter));
        topic.publish(1);
        topic.publish(2);
        topic.publish(3);
        topic.publish(4);
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(4));
    }

    #[tokio::test]
    async fn close_all_closes_every_subscriber_channel() {
        let mut topic: Topic<u32> = Topic::new();
        let mut rx = topic.subscribe(None);
        topic.close_all();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn delivery_order_matches_publish_order() {
        let mut topic: Topic<u32> = Topic::new();
        let mut rx = topic.subscribe(None);
        for i in 0..50 {
            topic.publish(i);
        }
        for i in 0..50 {
            assert_eq!(rx.recv().await, Some(i));
        }
    }
}
