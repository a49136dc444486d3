//! # Observers
//!
//! An [`Observer`] receives every [`HolderEvent`] a holder emits. Nothing an observer does is
//! read back by the holder; it only watches.
//!
//! The default is [`TracingObserver`], which writes each event through `tracing`. Use
//! [`NoopObserver`] to silence progress output, or implement the trait to forward events
//! elsewhere:
//!
//! ```rust
//! use async_trait::async_trait;
//! use item_holder::{EventKind, HolderEvent, Observer};
//!
//! struct SlowStartWatcher;
//!
//! #[async_trait]
//! impl Observer for SlowStartWatcher {
//!     async fn on_event(&self, event: &HolderEvent) {
//!         if event.kind == EventKind::LoadingItem {
//!             println!("building {:?}", event.name);
//!         }
//!     }
//! }
//! ```

use crate::events::{EventKind, HolderEvent};
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait Observer: Send + Sync {
    async fn on_event(&self, event: &HolderEvent);
}

/// Logs every event at `info` with `name` and `consumer` fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

#[async_trait]
impl Observer for TracingObserver {
    async fn on_event(&self, event: &HolderEvent) {
        let name = event.name.as_deref();
        let consumer = event.consumer.as_deref();
        match event.kind {
            EventKind::LoadingItem | EventKind::ItemLoaded => {
                info!(name, consumer, "{}", event.kind.as_str())
            }
            EventKind::StoppingItem
            | EventKind::ItemStopped
            | EventKind::DestroyingItem
            | EventKind::ItemDestroyed => info!(name, "{}", event.kind.as_str()),
            EventKind::LoadInterrupted
            | EventKind::AllItemsLoaded
            | EventKind::AllItemsStopped
            | EventKind::AllItemsDestroyed => info!("{}", event.kind.as_str()),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

#[async_trait]
impl Observer for NoopObserver {
    async fn on_event(&self, _event: &HolderEvent) {}
}
