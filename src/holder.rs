//! # Holder
//!
//! The [`Holder`] builds a set of definitions in dependency order, serves the built items, and
//! tears everything down in reverse.
//!
//! ```rust
//! use item_holder::{Holder, ItemDefinition, ItemPack};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), item_holder::HolderError> {
//!     let holder = Holder::new();
//!     holder
//!         .load([
//!             ItemDefinition::new("greeting", |_| async { Ok(ItemPack::new("Hello").into()) }),
//!             ItemDefinition::new("shout", |ctx| async move {
//!                 let greeting = ctx.require::<&str>("greeting")?;
//!                 Ok(ItemPack::new(greeting.to_uppercase()).into())
//!             })
//!             .need("greeting"),
//!         ])
//!         .await?;
//!
//!     assert_eq!(*holder.get::<String>("shout")?.unwrap(), "HELLO");
//!     holder.close().await
//! }
//! ```
//!
//! ## Build pass
//!
//! Definitions are prepared (adapters, per-consumer expansion, duplicate check), sorted, and
//! then built strictly one after another. Each builder sees every item built before it. After
//! each item the close signal is checked: if `close` has been called, the remaining definitions
//! are skipped and the load ends with what has been built so far.
//!
//! ## Teardown pass
//!
//! `close` waits for the load to end, then runs every `stop` hook in reverse build order, then
//! every `destroy` hook in reverse build order. The first failing hook ends the pass.
//!
//! A failed `load` leaves the items built before the failure in place. Call `close` to tear
//! them down.

use crate::adapter::{prepare_definitions, AdapterRegistry};
use crate::definition::{BuildContext, CustomDefinition, Definition, Hook, ItemDefinition};
use crate::error::{BoxError, HolderError};
use crate::events::{EventKind, HolderEvent};
use crate::graph::sort_definitions;
use crate::observer::{Observer, TracingObserver};
use crate::registry::{Item, ItemRegistry};
use crate::state::{HolderState, Lifecycle, LoadedOnDrop};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};

/// A teardown action tagged with the item it belongs to.
struct LifecycleRecord {
    /// Registry name, used in errors.
    item: String,
    /// Event label, as reported when the item was loaded.
    name: String,
    consumer: Option<String>,
    action: Hook,
}

impl LifecycleRecord {
    fn event(&self, kind: EventKind) -> HolderEvent {
        labelled(kind, &self.name, self.consumer.as_deref())
    }
}

fn labelled(kind: EventKind, name: &str, consumer: Option<&str>) -> HolderEvent {
    let event = HolderEvent::new(kind).with_name(name);
    match consumer {
        Some(consumer) => event.with_consumer(consumer),
        None => event,
    }
}

/// Hooks in build order.
#[derive(Default)]
struct Teardown {
    stops: Vec<LifecycleRecord>,
    destroys: Vec<LifecycleRecord>,
}

pub struct Holder {
    lifecycle: Lifecycle,
    observer: Arc<dyn Observer>,
    adapters: AdapterRegistry,
    items: RwLock<ItemRegistry>,
    teardown: Mutex<Teardown>,
}

impl Default for Holder {
    fn default() -> Self {
        Self::new()
    }
}

impl Holder {
    /// A holder that reports progress through `tracing` and knows no adapters.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> HolderBuilder {
        HolderBuilder::default()
    }

    pub fn state(&self) -> HolderState {
        self.lifecycle.state()
    }

    /// Builds every definition. Callable once, on a fresh holder.
    ///
    /// Returns early, with `Ok`, when `close` is called while items are still being built.
    pub fn load<I>(&self, definitions: I) -> BoxFuture<'_, Result<(), HolderError>>
    where
        I: IntoIterator,
        I::Item: Into<Definition>,
    {
        let definitions: Vec<Definition> = definitions.into_iter().map(Into::into).collect();
        let span = info_span!("load", definitions = definitions.len());
        self.load_definitions(definitions).instrument(span).boxed()
    }

    async fn load_definitions(&self, definitions: Vec<Definition>) -> Result<(), HolderError> {
        self.lifecycle.begin_load()?;
        let _loaded = LoadedOnDrop(&self.lifecycle);

        let result = self.build_all(definitions).await;
        if let Err(e) = &result {
            warn!(error = %e, "load failed");
        }
        result
    }

    async fn build_all(&self, definitions: Vec<Definition>) -> Result<(), HolderError> {
        let definitions = prepare_definitions(definitions, &self.adapters)?;
        let definitions = sort_definitions(definitions)?;
        debug!(order = ?definitions.iter().map(ItemDefinition::name).collect::<Vec<_>>(), "build order");

        for definition in definitions {
            self.build_item(definition).await?;
            if self.lifecycle.is_closing() {
                debug!("close requested, skipping remaining definitions");
                self.emit(HolderEvent::new(EventKind::LoadInterrupted)).await;
                return Ok(());
            }
        }
        self.emit(HolderEvent::new(EventKind::AllItemsLoaded)).await;
        Ok(())
    }

    async fn build_item(&self, definition: ItemDefinition) -> Result<(), HolderError> {
        let (label, consumer) = definition.label();
        let (label, consumer) = (label.to_string(), consumer.map(str::to_string));
        let record = |action: Hook| LifecycleRecord {
            item: definition.name.clone(),
            name: label.clone(),
            consumer: consumer.clone(),
            action,
        };
        let event = |kind| labelled(kind, &label, consumer.as_deref());

        let context = BuildContext::new(label.clone(), consumer.clone(), self.items.read().clone());
        self.emit(event(EventKind::LoadingItem)).await;
        let pack = (definition.build)(context)
            .await
            .map_err(|source| HolderError::BuildFailed {
                name: definition.name.clone(),
                source,
            })?;
        self.emit(event(EventKind::ItemLoaded)).await;

        let Some(pack) = pack else {
            return Ok(());
        };
        {
            let mut teardown = self.teardown.lock();
            if let Some(action) = pack.stop {
                teardown.stops.push(record(action));
            }
            if let Some(action) = pack.destroy {
                teardown.destroys.push(record(action));
            }
        }
        if let Some(item) = pack.item {
            self.items.write().insert(definition.name, item);
        }
        Ok(())
    }

    /// Stops, then destroys, every built item. Callable once, after `load` has been called.
    ///
    /// If `load` is still running it is told to stop after its current item, and teardown
    /// starts once it has.
    pub async fn close(&self) -> Result<(), HolderError> {
        self.lifecycle.begin_close()?;
        self.teardown_all()
            .instrument(info_span!("close"))
            .await
            .inspect_err(|e| warn!(error = %e, "close failed"))
    }

    async fn teardown_all(&self) -> Result<(), HolderError> {
        self.lifecycle.wait_until_loaded().await;
        let Teardown { stops, destroys } = std::mem::take(&mut *self.teardown.lock());

        for record in stops.into_iter().rev() {
            self.emit(record.event(EventKind::StoppingItem)).await;
            let done = record.event(EventKind::ItemStopped);
            (record.action)().await.map_err(|source| stop_failed(&record.item, source))?;
            self.emit(done).await;
        }
        self.emit(HolderEvent::new(EventKind::AllItemsStopped)).await;

        for record in destroys.into_iter().rev() {
            self.emit(record.event(EventKind::DestroyingItem)).await;
            let done = record.event(EventKind::ItemDestroyed);
            (record.action)().await.map_err(|source| destroy_failed(&record.item, source))?;
            self.emit(done).await;
        }
        self.emit(HolderEvent::new(EventKind::AllItemsDestroyed)).await;

        self.lifecycle.mark_closed();
        Ok(())
    }

    /// The item built under `name`, or `None` if that definition produced no item or does not
    /// exist. Per-consumer instances are found under `template@consumer`. Fails outside the
    /// loaded state.
    pub fn get_item(&self, name: &str) -> Result<Option<Item>, HolderError> {
        self.lifecycle.ensure_readable()?;
        Ok(self.items.read().get(name))
    }

    /// [`get_item`](Self::get_item) downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Option<Arc<T>>, HolderError> {
        self.lifecycle.ensure_readable()?;
        Ok(self.items.read().get_as(name))
    }

    /// Snapshot of every built item. Fails outside the loaded state.
    pub fn items(&self) -> Result<ItemRegistry, HolderError> {
        self.lifecycle.ensure_readable()?;
        Ok(self.items.read().clone())
    }

    async fn emit(&self, event: HolderEvent) {
        self.observer.on_event(&event).await;
    }
}

fn stop_failed(name: &str, source: BoxError) -> HolderError {
    HolderError::StopFailed {
        name: name.to_string(),
        source,
    }
}

fn destroy_failed(name: &str, source: BoxError) -> HolderError {
    HolderError::DestroyFailed {
        name: name.to_string(),
        source,
    }
}

impl std::fmt::Debug for Holder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Holder")
            .field("state", &self.state())
            .field("adapters", &self.adapters)
            .finish_non_exhaustive()
    }
}

/// Construction-time options for a [`Holder`].
///
/// ```rust
/// use item_holder::{Holder, NoopObserver};
///
/// let holder = Holder::builder()
///     .observer(NoopObserver)
///     .adapter("constant", |custom| {
///         let value: i64 = custom.param("value")?;
///         Ok(custom.into_standard(move |_| async move {
///             Ok(item_holder::ItemPack::new(value).into())
///         }))
///     })
///     .build();
/// # drop(holder);
/// ```
#[derive(Default)]
pub struct HolderBuilder {
    observer: Option<Arc<dyn Observer>>,
    adapters: AdapterRegistry,
}

impl HolderBuilder {
    /// Replaces the default [`TracingObserver`].
    pub fn observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn shared_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Registers the adapter for custom definitions of type `kind`.
    pub fn adapter<F>(mut self, kind: impl Into<String>, adapter: F) -> Self
    where
        F: Fn(CustomDefinition) -> Result<ItemDefinition, BoxError> + Send + Sync + 'static,
    {
        self.adapters.register(kind, adapter);
        self
    }

    pub fn adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn build(self) -> Holder {
        Holder {
            lifecycle: Lifecycle::new(),
            observer: self.observer.unwrap_or_else(|| Arc::new(TracingObserver)),
            adapters: self.adapters,
            items: RwLock::new(ItemRegistry::default()),
            teardown: Mutex::new(Teardown::default()),
        }
    }
}
