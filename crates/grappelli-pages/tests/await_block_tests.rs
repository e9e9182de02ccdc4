//! Await block tests
//!
//! Success Criteria:
//! 1. Pending, resolved, and rejected branches render in turn
//! 2. Only the most recent promise may render its outcome
//! 3. Settlements after teardown are ignored
//!
//! Test Categories:
//! - Happy Path: 2 tests
//! - Race Conditions: 2 tests
//! - Teardown: 1 test

use grappelli_pages::{App, AwaitBlockConfig, BlockTable, Mounted, Node, Promise, Scope, Template, Value};
use grappelli_reactive::Signal;
use rstest::rstest;

fn html(source: &str) -> std::rc::Rc<Template> {
	Template::from_html(source, &BlockTable::new()).unwrap()
}

fn await_view(task: &Signal<Value>) -> (Node, Mounted) {
	let config = AwaitBlockConfig::new("task()")
		.pending(html("<p>loading</p>"))
		.then(Some("v"), html("<p>{{ v }}</p>"))
		.catch(Some("e"), html("<p>failed: {{ e }}</p>"));
	let view = Template::from_html(
		r#"<div><template data-block="await" data-block-id="load"></template></div>"#,
		&BlockTable::new().with("load", config),
	)
	.unwrap();

	let body = Node::element("body");
	let scope = Scope::new().with("task", task.clone());
	let mounted = App::default().mount_template(&view, &scope, &body).unwrap();
	(body, mounted)
}

// ============================================================================
// Happy Path
// ============================================================================

/// Tests that a pending promise shows the pending branch until it resolves
#[rstest]
fn test_pending_then_resolved() {
	let promise = Promise::pending();
	let task = Signal::new(Value::from(promise.clone()));
	let (body, _mounted) = await_view(&task);
	assert_eq!(body.inner_html(), "<div><p>loading</p></div>");

	promise.resolve("done");
	assert_eq!(body.inner_html(), "<div><p>done</p></div>");
}

/// Tests that a rejection renders the catch branch with the reason bound
#[rstest]
fn test_rejection_renders_catch() {
	let promise = Promise::pending();
	let task = Signal::new(Value::from(promise.clone()));
	let (body, _mounted) = await_view(&task);

	promise.reject("timeout");
	assert_eq!(body.inner_html(), "<div><p>failed: timeout</p></div>");
}

// ============================================================================
// Race Conditions
// ============================================================================

/// Tests that a superseded promise resolving late never replaces the newer result
#[rstest]
fn test_stale_resolution_is_ignored() {
	let first = Promise::pending();
	let second = Promise::pending();
	let task = Signal::new(Value::from(first.clone()));
	let (body, _mounted) = await_view(&task);

	task.set(Value::from(second.clone()));
	second.resolve("second");
	assert_eq!(body.inner_html(), "<div><p>second</p></div>");

	first.resolve("first");
	assert_eq!(body.inner_html(), "<div><p>second</p></div>");
}

/// Tests that a superseded promise settling while the newer one is pending changes nothing
#[rstest]
fn test_stale_rejection_while_pending() {
	let first = Promise::pending();
	let second = Promise::pending();
	let task = Signal::new(Value::from(first.clone()));
	let (body, _mounted) = await_view(&task);

	task.set(Value::from(second.clone()));
	first.reject("boom");
	assert_eq!(body.inner_html(), "<div><p>loading</p></div>");

	second.resolve("ok");
	assert_eq!(body.inner_html(), "<div><p>ok</p></div>");
}

// ============================================================================
// Teardown
// ============================================================================

/// Tests that settling after unmount touches nothing
#[rstest]
fn test_settlement_after_unmount() {
	let promise = Promise::pending();
	let task = Signal::new(Value::from(promise.clone()));
	let (body, mounted) = await_view(&task);

	mounted.unmount();
	assert_eq!(body.inner_html(), "");

	promise.resolve("late");
	assert_eq!(body.inner_html(), "");
}
