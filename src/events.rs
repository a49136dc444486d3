//! # Progress Events
//!
//! Every step of a load or close is reported to the holder's [`Observer`](crate::Observer) as
//! a [`HolderEvent`].
//!
//! ```rust
//! use item_holder::{EventKind, HolderEvent};
//!
//! let ev = HolderEvent::new(EventKind::LoadingItem)
//!     .with_name("name")
//!     .with_consumer("item1");
//!
//! assert_eq!(ev.kind, EventKind::LoadingItem);
//! assert_eq!(ev.name.as_deref(), Some("name"));
//! assert_eq!(ev.consumer.as_deref(), Some("item1"));
//! ```

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Sets `name`, and `consumer` for per-consumer builds.
    LoadingItem,
    /// Sets `name`, and `consumer` for per-consumer builds.
    ItemLoaded,
    /// Close was requested; no further items are built.
    LoadInterrupted,
    AllItemsLoaded,
    /// Sets `name`.
    StoppingItem,
    /// Sets `name`.
    ItemStopped,
    AllItemsStopped,
    /// Sets `name`.
    DestroyingItem,
    /// Sets `name`.
    ItemDestroyed,
    AllItemsDestroyed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::LoadingItem => "loading item",
            EventKind::ItemLoaded => "item loaded",
            EventKind::LoadInterrupted => "loading interrupted",
            EventKind::AllItemsLoaded => "all items loaded",
            EventKind::StoppingItem => "stopping item",
            EventKind::ItemStopped => "item stopped",
            EventKind::AllItemsStopped => "all items stopped",
            EventKind::DestroyingItem => "destroying item",
            EventKind::ItemDestroyed => "item destroyed",
            EventKind::AllItemsDestroyed => "all items destroyed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolderEvent {
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer: Option<String>,
}

impl HolderEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            name: None,
            consumer: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_consumer(mut self, consumer: impl Into<String>) -> Self {
        self.consumer = Some(consumer.into());
        self
    }
}
