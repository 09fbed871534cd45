//! Resource state tracking.
//!
//! Each command list owns a [`LocalStateTracker`] which records transitions without any locking.
//! At submission, the queue locks the [`GlobalStateTable`], resolves the list's pending
//! transitions against it and then commits the list's final states.

pub mod barrier;
pub mod global;
pub mod local;
pub mod subresource;

pub use barrier::{Barrier, PendingTransition};
pub use global::{GlobalStateGuard, GlobalStateTable};
pub use local::LocalStateTracker;
pub use subresource::SubresourceState;
