//! # Item Holder
//!
//! > **Bootstrap a graph of subsystems in dependency order, and shut it down symmetrically.**
//!
//! An application declares its parts (a configuration object, a database handle, an HTTP
//! listener that needs the database, ...) as named [`ItemDefinition`]s. The [`Holder`] works out
//! the build order, builds each item exactly once, and later stops and destroys them in
//! reverse.
//!
//! ## 🚀 Core Concepts
//!
//! - **Definition**: a name, the names it needs, and an async builder.
//! - **Item**: whatever the builder produced. Later builders receive it through their
//!   [`BuildContext`]; callers read it with [`Holder::get`].
//! - **Stop / Destroy**: optional hooks in the [`ItemPack`]. On close every `stop` hook runs
//!   (dependents first), then every `destroy` hook (dependents first).
//! - **Adapter**: a function that turns a `type`-tagged [`CustomDefinition`] into a standard
//!   definition, registered on the [`HolderBuilder`].
//!
//! ## 🗺️ Module Tour
//!
//! - [`holder`]: the orchestrator ([`Holder::load`], [`Holder::close`], [`Holder::get_item`]).
//! - [`state`]: the `load` and `close` signals that decide which calls are legal.
//! - [`graph`]: duplicate detection and topological ordering.
//! - [`definition`] / [`adapter`]: definition shapes and how they are normalized.
//! - [`observer`] / [`events`]: structured progress reporting.
//! - [`mock`]: helpers for tests.
//!
//! ## Lifecycle
//!
//! ```text
//! new ──► load() ──► loading ──► loaded ──► close() ──► closing ──► closed
//!                       │                                  ▲
//!                       └──────────── close() ─────────────┘
//!                         (stops after the current item)
//! ```
//!
//! `load` and `close` may each be called once. `get_item` only works between the end of
//! `load` and the start of `close`.
//!
//! ## Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

pub mod adapter;
pub mod definition;
pub mod error;
pub mod events;
pub mod graph;
pub mod holder;
pub mod mock;
pub mod observer;
pub mod registry;
pub mod state;
pub mod tracing;

pub use adapter::{Adapter, AdapterRegistry};
pub use definition::{
    BuildContext, BuildFuture, CustomDefinition, Definition, Hook, ItemDefinition, ItemPack,
};
pub use error::{BoxError, HolderError, Operation};
pub use events::{EventKind, HolderEvent};
pub use holder::{Holder, HolderBuilder};
pub use observer::{NoopObserver, Observer, TracingObserver};
pub use registry::{Item, ItemRegistry};
pub use state::{CloseState, HolderState, LoadState};
