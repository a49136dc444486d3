//! # Holder Errors
//!
//! Every failure the holder can report is a variant of [`HolderError`]. Failures raised by
//! caller code (builders, hooks, adapters) are carried as a boxed source so the original error
//! stays reachable through [`std::error::Error::source`].

use crate::state::HolderState;
use std::fmt;

/// Boxed error returned by builders, stop/destroy hooks and adapters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The public operation that was rejected by the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Close,
    GetItem,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Load => f.write_str("load"),
            Operation::Close => f.write_str("close"),
            Operation::GetItem => f.write_str("get item from"),
        }
    }
}

/// Errors that can occur while loading, querying or closing a holder.
#[derive(Debug, thiserror::Error)]
pub enum HolderError {
    #[error("definition name '{0}' is duplicated")]
    DuplicateDefinition(String),

    /// The definitions needing each other, in definition order.
    #[error("cyclic dependency found among items: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),

    #[error("item '{name}' needs unknown item '{need}'")]
    UnresolvedNeed { name: String, need: String },

    #[error("no adapter registered for type '{kind}' (definition '{name}')")]
    UnknownAdapter { kind: String, name: String },

    #[error("adapter for type '{kind}' rejected definition '{name}': {source}")]
    AdapterFailed {
        kind: String,
        name: String,
        source: BoxError,
    },

    /// A lifecycle contract violation. Never retried.
    #[error("cannot {operation} holder in state '{actual}', expected {expected}")]
    InvalidState {
        operation: Operation,
        expected: &'static str,
        actual: HolderState,
    },

    #[error("failed to build item '{name}': {source}")]
    BuildFailed { name: String, source: BoxError },

    #[error("failed to stop item '{name}': {source}")]
    StopFailed { name: String, source: BoxError },

    #[error("failed to destroy item '{name}': {source}")]
    DestroyFailed { name: String, source: BoxError },

    /// Raised inside builders by [`BuildContext::require`](crate::BuildContext::require).
    #[error("item '{name}' is not available as {expected}")]
    ItemUnavailable { name: String, expected: &'static str },
}

impl HolderError {
    /// True for errors caused by the shape of the definition set rather than by caller code.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            HolderError::DuplicateDefinition(_)
                | HolderError::CyclicDependency(_)
                | HolderError::UnresolvedNeed { .. }
                | HolderError::UnknownAdapter { .. }
                | HolderError::AdapterFailed { .. }
        )
    }

    pub fn is_cyclic(&self) -> bool {
        matches!(self, HolderError::CyclicDependency(_))
    }
}
