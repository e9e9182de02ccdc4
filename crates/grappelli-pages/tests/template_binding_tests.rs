//! Template compilation and binding tests
//!
//! Success Criteria:
//! 1. Static content produces no bindings and is never touched by updates
//! 2. Attribute bindings follow boolean and `value` semantics
//! 3. Event and two-way bindings route through the delegated listener table
//! 4. Conditional blocks switch content when the selected branch changes
//! 5. Instantiation errors are reported as typed errors
//! 6. Writes into plain objects and arrays update only their readers
//!
//! Test Categories:
//! - Compilation: 2 tests
//! - Bindings: 4 tests
//! - Blocks: 1 test
//! - Error Cases: 3 tests
//! - Deep State: 1 test

use std::rc::Rc;

use grappelli_pages::{
	App, BlockTable, EachBlockConfig, Event, IfBlockConfig, Mounted, Node, RenderError, Scope, Template, TemplateError,
	Value,
};
use grappelli_reactive::Signal;
use rstest::rstest;

fn html(source: &str) -> Rc<Template> {
	Template::from_html(source, &BlockTable::new()).unwrap()
}

fn mount(app: &App, template: &Rc<Template>, scope: &Scope) -> (Node, Mounted) {
	let body = Node::element("body");
	let mounted = app.mount_template(template, scope, &body).unwrap();
	(body, mounted)
}

fn descendants(node: &Node) -> Vec<Node> {
	let mut nodes = Vec::new();
	for child in node.children() {
		nodes.push(child.clone());
		nodes.extend(descendants(&child));
	}
	nodes
}

fn element(body: &Node, tag: &str) -> Node {
	descendants(body)
		.into_iter()
		.find(|node| node.tag_name().as_deref() == Some(tag))
		.unwrap()
}

// ============================================================================
// Compilation
// ============================================================================

/// Tests that only dynamic locations become bindings
#[rstest]
fn test_static_content_is_pruned() {
	let template = html("<div><h1>Title</h1><p>Count: {{ n() }}</p><footer>static</footer></div>");
	assert_eq!(template.bindings().len(), 1);
	assert_eq!(html("<div><h1>Title</h1></div>").bindings().len(), 0);
}

/// Tests that a marker without a table entry fails compilation
#[rstest]
fn test_missing_block_config() {
	let err = Template::from_html(
		r#"<div><template data-block="if" data-block-id="m3"></template></div>"#,
		&BlockTable::new(),
	)
	.unwrap_err();
	assert!(matches!(
		err,
		TemplateError::MissingBlockConfig { ref marker_id, ref directive } if marker_id == "m3" && directive == "if"
	));
}

// ============================================================================
// Bindings
// ============================================================================

/// Tests that an update rewrites the one bound text node and nothing else
#[rstest]
fn test_update_touches_only_bound_node() {
	let n = Signal::new(Value::from(1));
	let template = html("<div><h1>Title</h1><p>Count: {{ n() }}</p><footer>static</footer></div>");
	let (body, _mounted) = mount(&App::default(), &template, &Scope::new().with("n", n.clone()));
	let before: Vec<(Node, u64)> = descendants(&body)
		.into_iter()
		.map(|node| {
			let version = node.version();
			(node, version)
		})
		.collect();

	n.set(Value::from(2));

	let changed: Vec<&Node> = before
		.iter()
		.filter(|(node, version)| node.version() != *version)
		.map(|(node, _)| node)
		.collect();
	assert_eq!(changed.len(), 1);
	assert_eq!(changed[0].data().as_deref(), Some("2"));
	assert_eq!(
		body.inner_html(),
		"<div><h1>Title</h1><p>Count: 2</p><footer>static</footer></div>"
	);
}

/// Tests boolean attribute semantics and mixed static/dynamic attribute text
#[rstest]
fn test_attribute_semantics() {
	let busy = Signal::new(Value::from(true));
	let template = html(r#"<button disabled="{{ busy() }}" class="btn {{ kind }}">go</button>"#);
	let scope = Scope::new().with("busy", busy.clone()).with("kind", "primary");
	let (body, _mounted) = mount(&App::default(), &template, &scope);
	let button = element(&body, "button");

	assert_eq!(button.attribute("disabled").as_deref(), Some(""));
	assert_eq!(button.attribute("class").as_deref(), Some("btn primary"));

	busy.set(Value::from(false));
	assert!(!button.has_attribute("disabled"));
	assert_eq!(button.to_html(), r#"<button class="btn primary">go</button>"#);
}

/// Tests that click handlers fire for the element and for its descendants
#[rstest]
fn test_event_binding_via_delegation() {
	let count = Signal::new(Value::from(0));
	let template = html(r#"<button onclick="{{ () => count.set(count() + 1) }}"><span>{{ count() }}</span></button>"#);
	let app = App::default();
	let (body, mounted) = mount(&app, &template, &Scope::new().with("count", count.clone()));
	let button = element(&body, "button");
	let label = element(&body, "span");

	assert!(app.dispatch(&Event::new("click", &button)));
	assert!(app.dispatch(&Event::new("click", &label)));
	assert_eq!(count.get_untracked(), Value::from(2));
	assert_eq!(label.text_content(), "2");

	mounted.unmount();
	assert!(!app.dispatch(&Event::new("click", &button)));
	assert_eq!(count.get_untracked(), Value::from(2));
}

/// Tests that bind:value keeps the signal and the property in step
#[rstest]
fn test_two_way_value_binding() {
	let name = Signal::new(Value::from("Ada"));
	let app = App::default();
	let (body, _mounted) = mount(
		&app,
		&html(r#"<input bind:value="{{ name }}">"#),
		&Scope::new().with("name", name.clone()),
	);
	let input = element(&body, "input");
	assert_eq!(input.property("value"), Some(Value::from("Ada")));

	input.set_property("value", Value::from("Bob"));
	app.dispatch(&Event::new("input", &input));
	assert_eq!(name.get_untracked(), Value::from("Bob"));

	name.set(Value::from("Cy"));
	assert_eq!(input.property("value"), Some(Value::from("Cy")));
}

// ============================================================================
// Blocks
// ============================================================================

/// Tests an if / else-if / else chain through every branch
#[rstest]
fn test_if_chain_switches_branches() {
	let n = Signal::new(Value::from(10));
	let config = IfBlockConfig::new("n() > 5", html("<b>big</b>"))
		.else_if("n() > 0", html("<i>small</i>"))
		.otherwise(html("<u>none</u>"));
	let template = Template::from_html(
		r#"<p><template data-block="if" data-block-id="size"></template></p>"#,
		&BlockTable::new().with("size", config),
	)
	.unwrap();
	let (body, _mounted) = mount(&App::default(), &template, &Scope::new().with("n", n.clone()));
	assert_eq!(body.inner_html(), "<p><b>big</b></p>");

	n.set(Value::from(3));
	assert_eq!(body.inner_html(), "<p><i>small</i></p>");

	n.set(Value::from(0));
	assert_eq!(body.inner_html(), "<p><u>none</u></p>");
}

// ============================================================================
// Error Cases
// ============================================================================

/// Tests that an identifier missing from the scope fails instantiation
#[rstest]
fn test_unknown_identifier() {
	let err = App::default()
		.mount_template(&html("<p>{{ missing }}</p>"), &Scope::new(), &Node::element("body"))
		.unwrap_err();
	assert!(matches!(err, RenderError::Expression { ref expression, .. } if expression == "missing"));
}

/// Tests that bind: requires a signal target
#[rstest]
fn test_bind_target_must_be_signal() {
	let err = App::default()
		.mount_template(
			&html(r#"<input bind:value="{{ name }}">"#),
			&Scope::new().with("name", "plain"),
			&Node::element("body"),
		)
		.unwrap_err();
	assert!(matches!(
		err,
		RenderError::BindTargetNotSignal { ref property, .. } if property == "value"
	));
}

/// Tests that use: requires a function in scope
#[rstest]
fn test_action_must_be_function() {
	let body = Node::element("body");
	let err = App::default()
		.mount_template(&html("<div use:tooltip></div>"), &Scope::new().with("tooltip", 3), &body)
		.unwrap_err();
	assert!(matches!(err, RenderError::UnknownAction(ref name) if name == "tooltip"));
	assert_eq!(body.child_count(), 0);
}

// ============================================================================
// Deep State
// ============================================================================

/// Tests that handlers mutating plain state re-render only what read it
#[rstest]
fn test_object_and_array_writes_from_handlers() {
	let todo = |title: &str| Value::object([("title", Value::from(title)), ("done", Value::from(false))]);
	let todos = Value::array([todo("a"), todo("b")]);
	let row = html(r#"<li onclick="{{ () => todo().done = !todo().done }}">{{ todo().title }}:{{ todo().done }}</li>"#);
	let template = Template::from_html(
		r#"<ul><template data-block="each" data-block-id="rows"></template></ul><button onclick="{{ () => todos.push({ title: 'c', done: false }) }}">add</button>"#,
		&BlockTable::new().with("rows", EachBlockConfig::new("todos", "todo", row)),
	)
	.unwrap();
	let app = App::default();
	let (body, _mounted) = mount(&app, &template, &Scope::new().with("todos", todos.clone()));
	let rows = || -> Vec<Node> {
		descendants(&body)
			.into_iter()
			.filter(|node| node.tag_name().as_deref() == Some("li"))
			.collect()
	};
	let (first, second) = (rows()[0].clone(), rows()[1].clone());
	let versions = |node: &Node| descendants(node).iter().map(Node::version).collect::<Vec<_>>();
	let second_versions = versions(&second);

	assert!(app.dispatch(&Event::new("click", &first)));
	assert_eq!(first.text_content(), "a:true");
	assert_eq!(versions(&second), second_versions);

	assert!(app.dispatch(&Event::new("click", &element(&body, "button"))));
	let after = rows();
	assert_eq!(after.len(), 3);
	assert!(after[0].ptr_eq(&first) && after[1].ptr_eq(&second));
	assert_eq!(
		after.iter().map(Node::text_content).collect::<Vec<_>>(),
		["a:true", "b:false", "c:false"]
	);
	assert_eq!(todos.as_array().map(|items| items.len()), Some(3));
}
