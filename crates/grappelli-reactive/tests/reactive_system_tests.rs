//! Integration tests for the reactive core
//!
//! These tests verify:
//! 1. A write re-runs each subscribed effect exactly once before returning
//! 2. Writing an identical value re-runs nothing
//! 3. Cleanups run exactly once, before the next run's side effects
//! 4. Notification uses a snapshot of subscribers taken before the pass
//! 5. Untracked scopes isolate internal reads from the enclosing effect

use grappelli_reactive::{
	Cleanup, Effect, Memo, Signal, create_signal, effect, untracked_effect, with_runtime,
};
use proptest::prelude::*;
use rstest::*;
use serial_test::serial;
use std::cell::RefCell;
use std::rc::Rc;

/// Records every run of an effect.
#[fixture]
fn run_log() -> Rc<RefCell<Vec<String>>> {
	Rc::new(RefCell::new(Vec::new()))
}

// ============================================================================
// Dependency tracking
// ============================================================================

#[rstest]
#[serial]
fn test_each_write_reruns_effect_once(run_log: Rc<RefCell<Vec<String>>>) {
	let count = create_signal(0);

	let (count_c, log_c) = (count.clone(), run_log.clone());
	let _effect = Effect::new(move || {
		log_c.borrow_mut().push(format!("count={}", count_c.get()));
	});

	count.set(1);
	count.set(2);
	count.update(|n| *n += 5);

	assert_eq!(
		*run_log.borrow(),
		vec!["count=0", "count=1", "count=2", "count=7"]
	);
}

#[rstest]
#[serial]
fn test_identical_write_is_noop(run_log: Rc<RefCell<Vec<String>>>) {
	let name = Signal::new("ada".to_string());

	let (name_c, log_c) = (name.clone(), run_log.clone());
	let _effect = Effect::new(move || {
		log_c.borrow_mut().push(name_c.get());
	});

	name.set("ada".to_string());
	assert_eq!(run_log.borrow().len(), 1);
}

#[rstest]
#[serial]
fn test_subscription_order_is_preserved(run_log: Rc<RefCell<Vec<String>>>) {
	let source = Signal::new(0);

	for label in ["first", "second", "third"] {
		let (source_c, log_c) = (source.clone(), run_log.clone());
		Effect::new(move || {
			let _ = source_c.get();
			log_c.borrow_mut().push(label.to_string());
		});
	}
	run_log.borrow_mut().clear();

	source.set(1);
	assert_eq!(*run_log.borrow(), vec!["first", "second", "third"]);
}

// ============================================================================
// Cleanup ordering
// ============================================================================

#[rstest]
#[serial]
fn test_cleanup_precedes_rerun_and_runs_once(run_log: Rc<RefCell<Vec<String>>>) {
	let source = Signal::new(0);

	let (source_c, log_c) = (source.clone(), run_log.clone());
	let dispose = effect(move || {
		let value = source_c.get();
		log_c.borrow_mut().push(format!("run {value}"));
		let log_cleanup = log_c.clone();
		Cleanup::new(move || log_cleanup.borrow_mut().push(format!("cleanup {value}")))
	});

	source.set(1);
	dispose.dispose();
	dispose.dispose();
	source.set(2);

	assert_eq!(
		*run_log.borrow(),
		vec!["run 0", "cleanup 0", "run 1", "cleanup 1"]
	);
}

// ============================================================================
// Snapshot notification
// ============================================================================

#[rstest]
#[serial]
fn test_subscriber_added_during_pass_waits_for_next_write(run_log: Rc<RefCell<Vec<String>>>) {
	let source = Signal::new(0);
	let late_created = Rc::new(RefCell::new(false));

	let (source_c, log_c, created_c) = (source.clone(), run_log.clone(), late_created.clone());
	let _first = Effect::new(move || {
		let value = source_c.get();
		if value == 1 && !*created_c.borrow() {
			*created_c.borrow_mut() = true;
			let (source_late, log_late) = (source_c.clone(), log_c.clone());
			// Created inside `_first`, but parked in an untracked scope so the
			// next run of `_first` does not dispose it
			let _ = untracked_effect(move || {
				Effect::new(move || {
					log_late.borrow_mut().push(format!("late {}", source_late.get()));
				});
			});
		}
	});

	source.set(1);
	// The late effect ran once on creation, not as part of the pass
	assert_eq!(*run_log.borrow(), vec!["late 1"]);

	source.set(2);
	assert_eq!(*run_log.borrow(), vec!["late 1", "late 2"]);
}

#[rstest]
#[serial]
fn test_subscriber_disposed_during_pass_is_skipped(run_log: Rc<RefCell<Vec<String>>>) {
	let source = Signal::new(0);
	let victim: Rc<RefCell<Option<Effect>>> = Rc::new(RefCell::new(None));

	let (source_c, victim_c) = (source.clone(), victim.clone());
	let _killer = Effect::new(move || {
		if source_c.get() > 0 {
			if let Some(effect) = victim_c.borrow().as_ref() {
				effect.dispose();
			}
		}
	});

	let (source_c, log_c) = (source.clone(), run_log.clone());
	*victim.borrow_mut() = Some(Effect::new(move || {
		log_c.borrow_mut().push(format!("victim {}", source_c.get()));
	}));

	source.set(1);
	assert_eq!(*run_log.borrow(), vec!["victim 0"]);
}

// ============================================================================
// Untracked scopes
// ============================================================================

#[rstest]
#[serial]
fn test_untracked_scope_survives_parent_rerun(run_log: Rc<RefCell<Vec<String>>>) {
	let trigger = Signal::new(0);
	let item = Signal::new("a".to_string());
	let scopes = Rc::new(RefCell::new(Vec::new()));

	let (trigger_c, item_c, log_c, scopes_c) =
		(trigger.clone(), item.clone(), run_log.clone(), scopes.clone());
	let _outer = Effect::new(move || {
		if trigger_c.get() == 0 {
			let (item_c, log_c) = (item_c.clone(), log_c.clone());
			let ((), scope) = untracked_effect(move || {
				Effect::new(move || {
					log_c.borrow_mut().push(item_c.get());
				});
			});
			scopes_c.borrow_mut().push(scope);
		}
	});

	trigger.set(1);
	item.set("b".to_string());
	assert_eq!(*run_log.borrow(), vec!["a", "b"]);

	for scope in scopes.borrow().iter() {
		scope.dispose();
	}
	item.set("c".to_string());
	assert_eq!(*run_log.borrow(), vec!["a", "b"]);
}

#[rstest]
#[serial]
fn test_memo_chain() {
	let base = Signal::new(2);
	let base_c = base.clone();
	let squared = Memo::new(move || base_c.get() * base_c.get());
	let squared_c = squared.clone();
	let plus_one = Memo::new(move || squared_c.get() + 1);

	assert_eq!(plus_one.get(), 5);
	base.set(3);
	assert_eq!(plus_one.get(), 10);
}

#[rstest]
#[serial]
fn test_disposed_effect_leaves_no_graph_edges() {
	let source = Signal::new(0);
	let source_c = source.clone();
	let effect = Effect::new(move || {
		let _ = source_c.get();
	});

	effect.dispose();

	with_runtime(|rt| {
		assert_eq!(rt.subscriber_count(source.id()), 0);
		assert!(!rt.has_node(effect.id()));
	});
}

proptest! {
	/// For any write sequence, the effect runs once per value change.
	#[test]
	fn prop_runs_match_distinct_writes(writes in proptest::collection::vec(0i32..4, 0..40)) {
		let source = Signal::new(0);
		let runs = Rc::new(RefCell::new(0usize));

		let (source_c, runs_c) = (source.clone(), runs.clone());
		let effect = Effect::new(move || {
			let _ = source_c.get();
			*runs_c.borrow_mut() += 1;
		});

		let mut expected = 1;
		let mut current = 0;
		for value in writes {
			if value != current {
				expected += 1;
				current = value;
			}
			source.set(value);
		}

		prop_assert_eq!(*runs.borrow(), expected);
		effect.dispose();
	}
}
