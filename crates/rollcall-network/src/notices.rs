use futures::{stream::BoxStream, StreamExt};
use rollcall_types::notice::Notice;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

/// In-process fan-out of page notices, backed by a broadcast channel.
#[derive(Clone)]
pub struct NoticeBoard {
    tx: broadcast::Sender<Notice>,
}

impl NoticeBoard {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, notice: Notice) {
        debug!("notice [{:?}/{:?}] {}", notice.level, notice.target, notice.message);
        // No subscribers is fine: nobody is looking at the page.
        let _ = self.tx.send(notice);
    }

    pub fn subscribe(&self) -> BoxStream<'static, Notice> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|notice| async move { notice.ok() })
            .boxed()
    }

    /// Raw receiver for callers that poll with `try_recv`.
    pub fn receiver(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(64)
    }
}
