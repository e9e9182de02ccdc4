//! Keyed each-block reconciliation tests
//!
//! Success Criteria:
//! 1. Reordering moves existing rows instead of recreating them
//! 2. Index accessors follow each row to its new position
//! 3. The empty branch mounts and unmounts exactly once per transition
//! 4. Appending leaves existing rows untouched
//! 5. Duplicate keys reuse the earliest unused row
//!
//! Test Categories:
//! - Happy Path: 2 tests
//! - Edge Cases: 3 tests
//! - Property-based: 1 test

use std::cell::Cell;
use std::rc::Rc;

use grappelli_pages::{App, BlockTable, EachBlockConfig, Mounted, Node, Scope, Template, Value};
use grappelli_reactive::Signal;
use proptest::prelude::*;
use rstest::rstest;

fn entry(id: i32, label: &str) -> Value {
	Value::object([("id", Value::from(id)), ("label", Value::from(label))])
}

fn keyed_list(items: &Signal<Value>) -> (Node, Mounted) {
	let row = Template::from_html("<li>{{ item().label }}-{{ i() }}</li>", &BlockTable::new()).unwrap();
	let blocks = BlockTable::new().with("rows", EachBlockConfig::new("items", "item", row).index("i").key("id"));
	let list = Template::from_html(
		r#"<ul><template data-block="each" data-block-id="rows"></template></ul>"#,
		&blocks,
	)
	.unwrap();

	let body = Node::element("body");
	let scope = Scope::new().with("items", items.clone());
	let mounted = App::default().mount_template(&list, &scope, &body).unwrap();
	(body, mounted)
}

fn rows(body: &Node) -> Vec<Node> {
	let list = body
		.children()
		.into_iter()
		.find(|node| node.tag_name().as_deref() == Some("ul"))
		.unwrap();
	list.children()
		.into_iter()
		.filter(|node| node.tag_name().as_deref() == Some("li"))
		.collect()
}

fn texts(body: &Node) -> Vec<String> {
	rows(body).iter().map(Node::text_content).collect()
}

// ============================================================================
// Happy Path
// ============================================================================

/// Tests that a rotation moves every row and renumbers the indices
#[rstest]
fn test_reorder_moves_rows_and_updates_indices() {
	let (a, b, c) = (entry(1, "a"), entry(2, "b"), entry(3, "c"));
	let items = Signal::new(Value::array([a.clone(), b.clone(), c.clone()]));
	let (body, mounted) = keyed_list(&items);
	let before = rows(&body);
	assert_eq!(texts(&body), ["a-0", "b-1", "c-2"]);

	items.set(Value::array([c, a, b]));

	let after = rows(&body);
	assert_eq!(after.len(), 3);
	assert!(after[0].ptr_eq(&before[2]));
	assert!(after[1].ptr_eq(&before[0]));
	assert!(after[2].ptr_eq(&before[1]));
	assert_eq!(before[0].text_content(), "a-1");
	assert_eq!(before[1].text_content(), "b-2");
	assert_eq!(before[2].text_content(), "c-0");

	mounted.unmount();
	assert!(body.children().is_empty());
}

/// Tests that appending one item leaves the existing row and its text untouched
#[rstest]
fn test_append_does_not_touch_existing_rows() {
	let items = Signal::new(Value::array([entry(1, "a")]));
	let (body, _mounted) = keyed_list(&items);
	let first = rows(&body).remove(0);
	let snapshot: Vec<(Node, u64)> = std::iter::once(first.clone())
		.chain(first.children())
		.map(|node| {
			let version = node.version();
			(node, version)
		})
		.collect();

	let mut next = items.get_untracked().as_array().unwrap().to_vec();
	next.push(entry(2, "b"));
	items.set(Value::array(next));

	let after = rows(&body);
	assert_eq!(after.len(), 2);
	assert!(after[0].ptr_eq(&first));
	assert_eq!(after[1].text_content(), "b-1");
	for (node, version) in snapshot {
		assert_eq!(node.version(), version, "{} changed", node.to_html());
	}
}

// ============================================================================
// Edge Cases
// ============================================================================

/// Tests that the empty branch mounts and unmounts once per transition
#[rstest]
fn test_empty_branch_transitions() {
	let mounts = Rc::new(Cell::new(0));
	let unmounts = Rc::new(Cell::new(0));
	let track = {
		let (mounts, unmounts) = (mounts.clone(), unmounts.clone());
		Value::function("track", move |_| {
			mounts.set(mounts.get() + 1);
			let unmounts = unmounts.clone();
			Ok(Value::function("untrack", move |_| {
				unmounts.set(unmounts.get() + 1);
				Ok(Value::Undefined)
			}))
		})
	};

	let row = Template::from_html("<li>{{ item() }}</li>", &BlockTable::new()).unwrap();
	let empty = Template::from_html("<p use:track>nothing</p>", &BlockTable::new()).unwrap();
	let blocks = BlockTable::new().with("rows", EachBlockConfig::new("items", "item", row).empty(empty));
	let list = Template::from_html(
		r#"<ul><template data-block="each" data-block-id="rows"></template></ul>"#,
		&blocks,
	)
	.unwrap();

	let items = Signal::new(Value::array([]));
	let body = Node::element("body");
	let scope = Scope::new().with("items", items.clone()).with("track", track);
	let _mounted = App::default().mount_template(&list, &scope, &body).unwrap();
	assert_eq!(body.inner_html(), "<ul><p>nothing</p></ul>");
	assert_eq!((mounts.get(), unmounts.get()), (1, 0));

	items.set(Value::array([Value::from("x")]));
	assert_eq!(body.inner_html(), "<ul><li>x</li></ul>");
	assert_eq!((mounts.get(), unmounts.get()), (1, 1));

	items.set(Value::array([]));
	assert_eq!(body.inner_html(), "<ul><p>nothing</p></ul>");
	assert_eq!((mounts.get(), unmounts.get()), (2, 1));

	items.set(Value::array([]));
	assert_eq!((mounts.get(), unmounts.get()), (2, 1));
}

/// Tests that duplicate keys bind to the earliest unused old rows in order
#[rstest]
fn test_duplicate_keys_reuse_earliest_rows() {
	let items = Signal::new(Value::array([entry(2, "b"), entry(1, "a1"), entry(1, "a2")]));
	let (body, _mounted) = keyed_list(&items);
	let before = rows(&body);

	items.set(Value::array([entry(1, "x"), entry(1, "y")]));

	let after = rows(&body);
	assert_eq!(after.len(), 2);
	assert!(after[0].ptr_eq(&before[1]));
	assert!(after[1].ptr_eq(&before[2]));
	assert_eq!(texts(&body), ["x-0", "y-1"]);
	assert!(before[0].parent().is_none());
}

/// Tests that a nullish source renders as an empty list
#[rstest]
fn test_null_source_clears_rows() {
	let items = Signal::new(Value::array([entry(1, "a"), entry(2, "b")]));
	let (body, _mounted) = keyed_list(&items);
	assert_eq!(rows(&body).len(), 2);

	items.set(Value::Null);
	assert!(rows(&body).is_empty());
}

// ============================================================================
// Property-based
// ============================================================================

proptest! {
	/// Tests that any permutation of keyed items reuses every row
	#[test]
	fn prop_permutation_reuses_every_row(order in Just((0..6).collect::<Vec<i32>>()).prop_shuffle()) {
		let entries: Vec<Value> = (0..6).map(|id| entry(id, &format!("r{id}"))).collect();
		let items = Signal::new(Value::array(entries.clone()));
		let (body, mounted) = keyed_list(&items);
		let before = rows(&body);

		items.set(Value::array(order.iter().map(|&id| entries[id as usize].clone())));

		let after = rows(&body);
		prop_assert_eq!(after.len(), order.len());
		for (position, &id) in order.iter().enumerate() {
			prop_assert!(after[position].ptr_eq(&before[id as usize]));
			prop_assert_eq!(after[position].text_content(), format!("r{id}-{position}"));
		}
		mounted.unmount();
	}
}
