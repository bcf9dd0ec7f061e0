// ── Reactive view stream ──
//
// Subscription type for consuming recomputed station views from the
// monitor.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::view::StationView;

/// A subscription to the monitor's published views.
///
/// Provides both point-in-time snapshot access and change notification
/// via [`changed`](Self::changed) or by converting to a `Stream`.
pub struct ViewStream {
    current: Arc<StationView>,
    receiver: watch::Receiver<Arc<StationView>>,
}

impl ViewStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<StationView>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The view captured at creation time or at the last `changed()`.
    pub fn current(&self) -> &Arc<StationView> {
        &self.current
    }

    /// The latest published view.
    pub fn latest(&self) -> Arc<StationView> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next recomputation. Returns `None` once the monitor
    /// has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<StationView>> {
        self.receiver.changed().await.ok()?;
        let view = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&view);
        Some(view)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    /// The first item is the view current at conversion time.
    pub fn into_stream(self) -> ViewWatchStream {
        ViewWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct ViewWatchStream {
    inner: WatchStream<Arc<StationView>>,
}

impl Stream for ViewWatchStream {
    type Item = Arc<StationView>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
