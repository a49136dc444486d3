//! # Test Helpers
//!
//! Small utilities for asserting what a holder did, without wiring real resources.
//!
//! | Helper | Records |
//! |--------|---------|
//! | [`RecordingObserver`] | every [`HolderEvent`] the holder emits |
//! | [`Journal`] | free-form entries from builders and hooks, in the order they ran |
//!
//! ```rust
//! use item_holder::mock::{Journal, RecordingObserver};
//! use item_holder::{EventKind, Holder, ItemDefinition, ItemPack};
//!
//! #[tokio::main]
//! async fn main() {
//!     let journal = Journal::new();
//!     let observer = RecordingObserver::new();
//!     let holder = Holder::builder().observer(observer.clone()).build();
//!
//!     let j = journal.clone();
//!     holder
//!         .load([ItemDefinition::new("server", move |_| {
//!             let j = j.clone();
//!             async move {
//!                 j.record("build server");
//!                 Ok(ItemPack::empty().with_stop(j.hook("stop server")).into())
//!             }
//!         })])
//!         .await
//!         .unwrap();
//!     holder.close().await.unwrap();
//!
//!     assert_eq!(journal.entries(), ["build server", "stop server"]);
//!     assert_eq!(observer.kinds().first(), Some(&EventKind::LoadingItem));
//! }
//! ```

use crate::error::BoxError;
use crate::events::{EventKind, HolderEvent};
use crate::observer::Observer;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::sync::Arc;

/// Keeps every event it receives. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<HolderEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HolderEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(|e| e.kind).collect()
    }

    /// Events of `kind`, rendered as `name` or `name@consumer`.
    pub fn names_for(&self, kind: EventKind) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .filter_map(|e| match (&e.name, &e.consumer) {
                (Some(name), Some(consumer)) => Some(format!("{name}@{consumer}")),
                (Some(name), None) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Observer for RecordingObserver {
    async fn on_event(&self, event: &HolderEvent) {
        self.events.lock().push(event.clone());
    }
}

/// A shared, ordered log. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.lock().iter().any(|e| e == entry)
    }

    /// A stop/destroy hook that records `entry` when run.
    pub fn hook(
        &self,
        entry: &str,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send + 'static {
        let journal = self.clone();
        let entry = entry.to_string();
        move || {
            async move {
                journal.record(entry);
                Ok::<_, BoxError>(())
            }
            .boxed()
        }
    }

    /// A hook that records `entry` and then fails with `message`.
    pub fn failing_hook(
        &self,
        entry: &str,
        message: &'static str,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send + 'static {
        let journal = self.clone();
        let entry = entry.to_string();
        move || {
            async move {
                journal.record(entry);
                Err::<(), _>(BoxError::from(message))
            }
            .boxed()
        }
    }
}
