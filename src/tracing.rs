//! # Logging Setup
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by `RUST_LOG`.
//! The default [`TracingObserver`](crate::TracingObserver) writes load/close progress through
//! it:
//!
//! ```text
//! INFO load: loading item name="config"
//! INFO load: item loaded name="config"
//! INFO load: loading item name="name" consumer="item1"
//! INFO close: stopping item name="http"
//! ```
//!
//! ```bash
//! RUST_LOG=info cargo run     # progress events
//! RUST_LOG=debug cargo run    # plus build order, state transitions and adapter calls
//! ```

/// Call once, at the start of a binary.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
