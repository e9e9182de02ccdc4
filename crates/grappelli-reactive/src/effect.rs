//! Effect - Reactive Side Effects
//!
//! `Effect` represents a side effect that automatically re-runs when its dependencies change.
//! Dependencies are tracked automatically: any Signal read inside the effect closure
//! becomes a dependency, and the set is rebuilt from scratch on every run.
//!
//! ## Key Features
//!
//! - **Synchronous Re-execution**: A write to a dependency re-runs the effect before the write returns
//! - **Cleanup Support**: The closure may return a [`Cleanup`] that runs before the next run or on disposal
//! - **Ownership**: Effects created while another effect runs are owned by it and disposed
//!   before its next run
//! - **Untracked Scopes**: [`untracked_effect`] opens an ownership scope whose reads stay
//!   invisible to the enclosing effect
//!
//! ## Example
//!
//! ```ignore
//! use grappelli_reactive::{Cleanup, Effect, Signal};
//!
//! let count = Signal::new(0);
//!
//! let _effect = Effect::new({
//!     let count = count.clone();
//!     move || {
//!         let value = count.get();
//!         Cleanup::new(move || println!("leaving {value}"))
//!     }
//! });
//!
//! count.set(42); // Prints "leaving 0", then runs again
//! ```

use core::cell::RefCell;

use std::collections::BTreeMap;

use crate::cleanup::{Cleanup, Disposer, IntoCleanup, Owner};
use crate::runtime::{ExecutionGuard, NodeId, NodeType, Observer, try_with_runtime, with_runtime};

/// Type alias for stored effect functions
type EffectFn = Box<dyn FnMut() -> Option<Cleanup> + 'static>;

/// Storage entry for one live effect.
struct EffectSlot {
	/// `None` while the effect is running
	run: Option<EffectFn>,
	/// Cleanup returned by the last run
	cleanup: Option<Cleanup>,
	/// Effects and cleanups created during the last run
	owner: Owner,
	node_type: NodeType,
}

// Storage for Effect functions
//
// Functions are taken out of the map while they run, so a running effect can
// create, dispose, or notify other effects without a re-entrant borrow.
thread_local! {
	static EFFECTS: RefCell<BTreeMap<NodeId, EffectSlot>> = const { RefCell::new(BTreeMap::new()) };
}

/// A reactive effect that automatically re-runs when its dependencies change
///
/// The handle is a plain id: dropping it does not dispose the effect. Call
/// [`Effect::dispose`] (or the owner's disposal) to stop it.
#[derive(Debug, Clone)]
pub struct Effect {
	/// Unique identifier for this effect
	id: NodeId,
}

impl Effect {
	/// Create a new Effect that runs the given function
	///
	/// The function runs immediately, and re-runs whenever any Signal it read
	/// during its last run changes.
	///
	/// # Example
	///
	/// ```ignore
	/// let count = Signal::new(0);
	///
	/// Effect::new(move || {
	///     println!("Count: {}", count.get());
	/// });
	/// ```
	pub fn new<F, R>(f: F) -> Self
	where
		F: FnMut() -> R + 'static,
		R: IntoCleanup,
	{
		let effect = Self::register(NodeId::new(), NodeType::Effect, f);
		Self::execute_effect(effect.id);
		effect
	}

	/// Stores an effect function without running it.
	///
	/// The effect is attached to the current owner, if any.
	pub(crate) fn register<F, R>(id: NodeId, node_type: NodeType, f: F) -> Self
	where
		F: FnMut() -> R + 'static,
		R: IntoCleanup,
	{
		Self::register_owned(id, node_type, Owner::new(), f)
	}

	/// Like [`Effect::register`], with a caller-provided owner.
	///
	/// Whatever was created under `owner` before registration is disposed
	/// ahead of the first scheduled run.
	pub(crate) fn register_owned<F, R>(id: NodeId, node_type: NodeType, owner: Owner, mut f: F) -> Self
	where
		F: FnMut() -> R + 'static,
		R: IntoCleanup,
	{
		EFFECTS.with(|storage| {
			storage.borrow_mut().insert(
				id,
				EffectSlot {
					run: Some(Box::new(move || f().into_cleanup())),
					cleanup: None,
					owner,
					node_type,
				},
			);
		});

		if let Some(parent) = with_runtime(|rt| rt.current_owner()) {
			parent.push(Cleanup::new(move || dispose_effect(id)));
		}

		Self { id }
	}

	/// Execute an effect by its ID
	///
	/// Runs the previous cleanup and disposes owned effects first, then
	/// re-tracks dependencies. Does nothing when the effect is disposed or
	/// already running.
	pub(crate) fn execute_effect(effect_id: NodeId) {
		let taken = EFFECTS.with(|storage| {
			let mut storage = storage.borrow_mut();
			let slot = storage.get_mut(&effect_id)?;
			let run = slot.run.take()?;
			Some((run, slot.cleanup.take(), slot.owner.clone(), slot.node_type))
		});

		let Some((mut run, previous_cleanup, owner, node_type)) = taken else {
			tracing::trace!(?effect_id, "effect is disposed or already running, skipping");
			return;
		};

		if let Some(cleanup) = previous_cleanup {
			cleanup.run();
		}
		owner.dispose_all();

		with_runtime(|rt| rt.clear_dependencies(effect_id));

		let cleanup = {
			let _guard = ExecutionGuard::enter(
				Observer::new(effect_id, node_type),
				Some(owner.clone()),
			);
			run()
		};

		// Put the function back unless the effect was disposed during its own run
		let orphaned = EFFECTS.with(|storage| match storage.borrow_mut().get_mut(&effect_id) {
			Some(slot) => {
				slot.run = Some(run);
				slot.cleanup = cleanup;
				None
			}
			None => Some((run, cleanup)),
		});

		if let Some((run, cleanup)) = orphaned {
			drop(run);
			if let Some(cleanup) = cleanup {
				cleanup.run();
			}
			owner.dispose_all();
			with_runtime(|rt| rt.remove_node(effect_id));
		}
	}

	/// Get the NodeId of this effect
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Whether the effect has been disposed
	pub fn is_disposed(&self) -> bool {
		!EFFECTS.with(|storage| storage.borrow().contains_key(&self.id))
	}

	/// Dispose this effect
	///
	/// Runs its last cleanup and disposes owned effects. Calling this more
	/// than once is a no-op.
	pub fn dispose(&self) {
		dispose_effect(self.id);
	}

	/// Returns a shareable, idempotent disposer for this effect
	pub fn disposer(&self) -> Disposer {
		let id = self.id;
		Disposer::new(move || dispose_effect(id))
	}
}

/// Removes the effect from storage and runs its teardown.
fn dispose_effect(effect_id: NodeId) {
	let removed = EFFECTS
		.try_with(|storage| storage.borrow_mut().remove(&effect_id))
		.ok()
		.flatten();

	let Some(slot) = removed else {
		return;
	};

	if let Some(cleanup) = slot.cleanup {
		cleanup.run();
	}
	slot.owner.dispose_all();
	let _ = try_with_runtime(|rt| rt.remove_node(effect_id));
}

/// Runs `f` as an effect and returns its disposer.
pub fn effect<F, R>(f: F) -> Disposer
where
	F: FnMut() -> R + 'static,
	R: IntoCleanup,
{
	Effect::new(f).disposer()
}

/// Runs `f` once inside a fresh ownership scope whose reads are not tracked.
///
/// Effects created by `f` belong to the scope, not to the enclosing effect,
/// so the enclosing effect neither re-runs on their reads nor disposes them
/// when it re-runs. The returned [`Disposer`] tears the scope down.
///
/// ```ignore
/// let (value, scope) = untracked_effect(|| {
///     Effect::new(move || println!("{}", label.get()));
///     42
/// });
/// scope.dispose();
/// ```
pub fn untracked_effect<F, T>(f: F) -> (T, Disposer)
where
	F: FnOnce() -> T,
{
	let owner = Owner::new();
	let value = {
		let _guard = ExecutionGuard::enter(
			Observer::new(NodeId::new(), NodeType::Untracked),
			Some(owner.clone()),
		);
		f()
	};
	(value, Disposer::new(move || owner.dispose_all()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Signal;
	use serial_test::serial;
	use std::rc::Rc;

	#[test]
	#[serial]
	fn test_effect_runs_immediately() {
		let run_count = Rc::new(RefCell::new(0));
		let run_count_clone = run_count.clone();

		let _effect = Effect::new(move || {
			*run_count_clone.borrow_mut() += 1;
		});

		assert_eq!(*run_count.borrow(), 1);
	}

	#[test]
	#[serial]
	fn test_effect_tracks_dependency() {
		let signal = Signal::new(0);
		let signal_clone = signal.clone();

		let effect = Effect::new(move || {
			let _ = signal_clone.get();
		});

		with_runtime(|rt| {
			assert_eq!(rt.subscriber_count(signal.id()), 1);
			assert_eq!(rt.dependency_count(effect.id()), 1);
		});
	}

	#[test]
	#[serial]
	fn test_effect_reruns_synchronously() {
		let signal = Signal::new(0);
		let values = Rc::new(RefCell::new(Vec::new()));
		let values_clone = values.clone();

		let signal_clone = signal.clone();
		let _effect = Effect::new(move || {
			values_clone.borrow_mut().push(signal_clone.get());
		});

		signal.set(10);
		signal.set(20);
		assert_eq!(*values.borrow(), vec![0, 10, 20]);
	}

	#[test]
	#[serial]
	fn test_effect_with_multiple_signals() {
		let signal1 = Signal::new(1);
		let signal2 = Signal::new(2);
		let sum = Rc::new(RefCell::new(0));
		let sum_clone = sum.clone();

		let s1 = signal1.clone();
		let s2 = signal2.clone();
		let _effect = Effect::new(move || {
			*sum_clone.borrow_mut() = s1.get() + s2.get();
		});

		signal1.set(10);
		assert_eq!(*sum.borrow(), 12);

		signal2.set(20);
		assert_eq!(*sum.borrow(), 30);
	}

	#[test]
	#[serial]
	fn test_effect_dispose() {
		let signal = Signal::new(0);
		let run_count = Rc::new(RefCell::new(0));
		let run_count_clone = run_count.clone();

		let signal_clone = signal.clone();
		let effect = Effect::new(move || {
			let _ = signal_clone.get();
			*run_count_clone.borrow_mut() += 1;
		});

		effect.dispose();
		effect.dispose();
		assert!(effect.is_disposed());

		signal.set(10);
		assert_eq!(*run_count.borrow(), 1);
		assert_eq!(with_runtime(|rt| rt.subscriber_count(signal.id())), 0);
	}

	#[test]
	#[serial]
	fn test_stale_dependency_dropped() {
		let flag = Signal::new(true);
		let a = Signal::new(0);
		let b = Signal::new(0);
		let runs = Rc::new(RefCell::new(0));

		let (flag_c, a_c, b_c, runs_c) = (flag.clone(), a.clone(), b.clone(), runs.clone());
		let _effect = Effect::new(move || {
			*runs_c.borrow_mut() += 1;
			if flag_c.get() {
				let _ = a_c.get();
			} else {
				let _ = b_c.get();
			}
		});

		flag.set(false);
		assert_eq!(*runs.borrow(), 2);

		// `a` was only read on the first run
		a.set(1);
		assert_eq!(*runs.borrow(), 2);

		b.set(1);
		assert_eq!(*runs.borrow(), 3);
	}

	#[test]
	#[serial]
	fn test_cleanup_runs_before_next_run() {
		let signal = Signal::new(0);
		let log = Rc::new(RefCell::new(Vec::new()));

		let (signal_c, log_c) = (signal.clone(), log.clone());
		let effect = Effect::new(move || {
			let value = signal_c.get();
			log_c.borrow_mut().push(format!("run {value}"));
			let log_cleanup = log_c.clone();
			Cleanup::new(move || log_cleanup.borrow_mut().push(format!("cleanup {value}")))
		});

		signal.set(1);
		effect.dispose();

		assert_eq!(
			*log.borrow(),
			vec!["run 0", "cleanup 0", "run 1", "cleanup 1"]
		);
	}

	#[test]
	#[serial]
	fn test_nested_effect_disposed_on_parent_rerun() {
		let outer = Signal::new(0);
		let inner = Signal::new(0);
		let inner_runs = Rc::new(RefCell::new(0));

		let (outer_c, inner_c, runs_c) = (outer.clone(), inner.clone(), inner_runs.clone());
		let _parent = Effect::new(move || {
			let _ = outer_c.get();
			let inner_c = inner_c.clone();
			let runs_c = runs_c.clone();
			Effect::new(move || {
				let _ = inner_c.get();
				*runs_c.borrow_mut() += 1;
			});
		});

		assert_eq!(*inner_runs.borrow(), 1);

		outer.set(1);
		assert_eq!(*inner_runs.borrow(), 2);

		// Only the child created by the latest parent run is alive
		inner.set(1);
		assert_eq!(*inner_runs.borrow(), 3);
	}

	#[test]
	#[serial]
	fn test_untracked_effect_hides_reads_from_parent() {
		let outer = Signal::new(0);
		let hidden = Signal::new(0);
		let parent_runs = Rc::new(RefCell::new(0));

		let (outer_c, hidden_c, runs_c) = (outer.clone(), hidden.clone(), parent_runs.clone());
		let _parent = Effect::new(move || {
			let _ = outer_c.get();
			*runs_c.borrow_mut() += 1;
			let hidden_c = hidden_c.clone();
			let _ = untracked_effect(move || hidden_c.get());
		});

		hidden.set(5);
		assert_eq!(*parent_runs.borrow(), 1);

		outer.set(1);
		assert_eq!(*parent_runs.borrow(), 2);
	}

	#[test]
	#[serial]
	fn test_reentrant_write_does_not_loop() {
		let signal = Signal::new(0);
		let runs = Rc::new(RefCell::new(0));

		let (signal_c, runs_c) = (signal.clone(), runs.clone());
		let _effect = Effect::new(move || {
			*runs_c.borrow_mut() += 1;
			let value = signal_c.get();
			if value < 100 {
				signal_c.set(value + 1);
			}
		});

		assert_eq!(*runs.borrow(), 1);
		assert_eq!(signal.get_untracked(), 1);
	}

	#[test]
	#[serial]
	fn test_on_cleanup_inside_effect() {
		let signal = Signal::new(0);
		let cleaned = Rc::new(RefCell::new(0));

		let (signal_c, cleaned_c) = (signal.clone(), cleaned.clone());
		let _effect = Effect::new(move || {
			let _ = signal_c.get();
			let cleaned_c = cleaned_c.clone();
			crate::on_cleanup(move || *cleaned_c.borrow_mut() += 1);
		});

		signal.set(1);
		signal.set(2);
		assert_eq!(*cleaned.borrow(), 2);
	}
}
