//! # Lifecycle Signals
//!
//! A holder's lifecycle is two small signals rather than one combined enum:
//!
//! ```text
//! load:  init ──► loading ──► loaded
//! close: init ──► closing ──► closed      (only once load has left init)
//! ```
//!
//! Both are `tokio::sync::watch` channels. Transitions are check-and-set under the channel's
//! lock (`send_if_modified`), so two call sites racing on the same holder cannot both win.
//! `close` waits for `load == loaded` on the channel instead of polling, while the build loop
//! reads the close signal between items to decide whether to keep going.
//!
//! Neither signal ever moves backwards.

use crate::error::{HolderError, Operation};
use serde::Serialize;
use std::fmt;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Init,
    Loading,
    Loaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseState {
    Init,
    Closing,
    Closed,
}

/// The composed view of both signals.
///
/// `Closing` covers both "close requested while loading" and "close requested after loading";
/// the load signal tells the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HolderState {
    Init,
    Loading,
    Loaded,
    Closing,
    Closed,
}

impl HolderState {
    pub fn of(load: LoadState, close: CloseState) -> Self {
        match (load, close) {
            (_, CloseState::Closed) => HolderState::Closed,
            (_, CloseState::Closing) => HolderState::Closing,
            (LoadState::Init, CloseState::Init) => HolderState::Init,
            (LoadState::Loading, CloseState::Init) => HolderState::Loading,
            (LoadState::Loaded, CloseState::Init) => HolderState::Loaded,
        }
    }
}

impl fmt::Display for HolderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HolderState::Init => "init",
            HolderState::Loading => "loading",
            HolderState::Loaded => "loaded",
            HolderState::Closing => "closing",
            HolderState::Closed => "closed",
        };
        f.write_str(name)
    }
}

pub(crate) struct Lifecycle {
    load: watch::Sender<LoadState>,
    close: watch::Sender<CloseState>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (load, _) = watch::channel(LoadState::Init);
        let (close, _) = watch::channel(CloseState::Init);
        Self { load, close }
    }

    pub(crate) fn state(&self) -> HolderState {
        HolderState::of(*self.load.borrow(), *self.close.borrow())
    }

    /// `(init, init)` → `(loading, init)`.
    pub(crate) fn begin_load(&self) -> Result<(), HolderError> {
        // close cannot leave init while load is still init, so reading it first is enough
        let close = *self.close.borrow();
        let mut rejected = None;
        self.load.send_if_modified(|load| {
            if *load == LoadState::Init && close == CloseState::Init {
                *load = LoadState::Loading;
                true
            } else {
                rejected = Some(HolderState::of(*load, close));
                false
            }
        });
        match rejected {
            None => {
                debug!("load: init -> loading");
                Ok(())
            }
            Some(actual) => Err(HolderError::InvalidState {
                operation: Operation::Load,
                expected: "init",
                actual,
            }),
        }
    }

    /// Idempotent; called on every exit path of `load`.
    pub(crate) fn mark_loaded(&self) {
        let previous = self.load.send_replace(LoadState::Loaded);
        if previous != LoadState::Loaded {
            debug!("load: {previous:?} -> loaded");
        }
    }

    /// `load != init && close == init` → `close = closing`.
    pub(crate) fn begin_close(&self) -> Result<(), HolderError> {
        // load only moves forward, so a non-init value read here stays non-init
        let load = *self.load.borrow();
        let mut rejected = None;
        self.close.send_if_modified(|close| {
            if load != LoadState::Init && *close == CloseState::Init {
                *close = CloseState::Closing;
                true
            } else {
                rejected = Some(HolderState::of(load, *close));
                false
            }
        });
        match rejected {
            None => {
                debug!(?load, "close: init -> closing");
                Ok(())
            }
            Some(actual) => Err(HolderError::InvalidState {
                operation: Operation::Close,
                expected: "loading or loaded",
                actual,
            }),
        }
    }

    pub(crate) fn mark_closed(&self) {
        self.close.send_replace(CloseState::Closed);
        debug!("close: closing -> closed");
    }

    pub(crate) fn is_closing(&self) -> bool {
        *self.close.borrow() != CloseState::Init
    }

    pub(crate) async fn wait_until_loaded(&self) {
        let mut load = self.load.subscribe();
        // the sender lives in `self`, so the channel cannot close while we wait
        let _ = load.wait_for(|state| *state == LoadState::Loaded).await;
    }

    /// Items may only be read in `(loaded, init)`.
    pub(crate) fn ensure_readable(&self) -> Result<(), HolderError> {
        let actual = self.state();
        if actual == HolderState::Loaded {
            Ok(())
        } else {
            Err(HolderError::InvalidState {
                operation: Operation::GetItem,
                expected: "loaded",
                actual,
            })
        }
    }
}

/// Marks the load signal `loaded` when dropped, whether `load` returned normally, returned an
/// error, or its future was dropped mid-build.
pub(crate) struct LoadedOnDrop<'a>(pub(crate) &'a Lifecycle);

impl Drop for LoadedOnDrop<'_> {
    fn drop(&mut self) {
        self.0.mark_loaded();
    }
}
