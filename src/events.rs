//! Typed event stream for a crawl or download run, broadcast to any
//! number of subscribers (CLI, future GUI, test harness).

use tokio::sync::broadcast;

use crate::model::ScrapedData;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub enum CrawlEvent {
    Started { seed_url: String },
    Progress { done: usize, total: usize },
    Log { message: String },
    ResultsUpdated { snapshot: ScrapedData },
    CrawlFinished { results: ScrapedData },
    DownloadFinished { success: usize, total: usize },
    Error { message: String },
}

/// Wraps a `tokio::sync::broadcast` channel of `CrawlEvent`s. Cloning
/// shares the same underlying channel; subscribers that lag behind the
/// ring buffer miss events rather than blocking the publisher.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CrawlEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Returns the number of active subscribers it
    /// reached; `0` just means nobody is currently listening.
    pub fn publish(&self, event: CrawlEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn log(&self, message: impl Into<String>) {
        self.publish(CrawlEvent::Log { message: message.into() });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(CrawlEvent::Error { message: message.into() });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(CrawlEvent::Started { seed_url: "https://example.com".into() }), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.log("hello");
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, CrawlEvent::Log { message } if message == "hello"));
    }
}
