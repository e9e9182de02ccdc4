//! # grappelli-reactive
//!
//! Fine-grained reactive core for grappelli.
//!
//! - [`Signal`]: a mutable cell that records who reads it and notifies them on write
//! - [`Effect`]: a computation that re-runs when a signal it read changes
//! - [`Memo`]: a derived, read-only value backed by an effect
//! - [`Trigger`] / [`KeyedTrigger`]: valueless nodes for containers that track reads per key
//! - [`untracked_effect`]: an ownership scope whose reads are invisible to the enclosing effect
//!
//! Notification is synchronous: every subscriber of a written signal runs once,
//! in subscription order, before the write returns. The subscriber list is
//! snapshotted first, so subscribers added or removed during the pass do not
//! affect it.
//!
//! ## Example
//!
//! ```ignore
//! use grappelli_reactive::{Effect, Memo, Signal};
//!
//! let first = Signal::new("Ada".to_string());
//! let greeting = Memo::new({
//!     let first = first.clone();
//!     move || format!("Hello, {}", first.get())
//! });
//!
//! Effect::new({
//!     let greeting = greeting.clone();
//!     move || println!("{}", greeting.get())
//! });
//!
//! first.set("Grace".to_string());
//! ```

#![warn(missing_docs)]

pub mod cleanup;
pub mod effect;
pub mod memo;
pub mod runtime;
pub mod signal;
pub mod trigger;

pub use cleanup::{Cleanup, Disposer, IntoCleanup, on_cleanup};
pub use effect::{Effect, effect, untracked_effect};
pub use memo::Memo;
pub use runtime::{NodeId, NodeType, Observer, Runtime, untrack, with_runtime};
pub use signal::Signal;
pub use trigger::{KeyedTrigger, Trigger};

/// Creates a signal. Alias of [`Signal::new`].
pub fn create_signal<T: 'static>(value: T) -> Signal<T> {
	Signal::new(value)
}
