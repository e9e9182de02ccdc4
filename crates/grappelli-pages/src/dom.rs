//! In-memory DOM host.
//!
//! A small node tree with the operations the runtime needs from a document:
//! creation, deep cloning, attribute and property access, and child
//! insertion/removal. Nodes are reference-counted handles; cloning a [`Node`]
//! clones the handle, [`Node::clone_deep`] clones the tree.
//!
//! Every node carries a mutation counter ([`Node::version`]) bumped by any
//! change to its own text, attributes, properties, or child list. Tests use it
//! to prove that an update left a node untouched.

pub mod html;

use core::cell::{Cell, RefCell};
use core::fmt;

use std::borrow::Cow;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::value::Value;

/// Kind of a DOM node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
	/// Container whose children move on insertion
	Fragment,
	/// Element with a tag, attributes, and properties
	Element,
	/// Text node
	Text,
	/// Comment node, used for block boundaries
	Comment,
}

enum NodeData {
	Fragment,
	Element {
		tag: String,
		attributes: IndexMap<String, String>,
		properties: IndexMap<String, Value>,
	},
	Text(String),
	Comment(String),
}

struct NodeInner {
	data: RefCell<NodeData>,
	parent: RefCell<Weak<NodeInner>>,
	children: RefCell<Vec<Node>>,
	version: Cell<u64>,
}

/// Handle to a DOM node
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

impl Node {
	fn with_data(data: NodeData) -> Self {
		Self(Rc::new(NodeInner {
			data: RefCell::new(data),
			parent: RefCell::new(Weak::new()),
			children: RefCell::new(Vec::new()),
			version: Cell::new(0),
		}))
	}

	/// Creates an empty fragment.
	pub fn fragment() -> Self {
		Self::with_data(NodeData::Fragment)
	}

	/// Creates an element.
	pub fn element(tag: impl Into<String>) -> Self {
		Self::with_data(NodeData::Element {
			tag: tag.into().to_ascii_lowercase(),
			attributes: IndexMap::new(),
			properties: IndexMap::new(),
		})
	}

	/// Creates a text node.
	pub fn text(text: impl Into<String>) -> Self {
		Self::with_data(NodeData::Text(text.into()))
	}

	/// Creates a comment node.
	pub fn comment(text: impl Into<String>) -> Self {
		Self::with_data(NodeData::Comment(text.into()))
	}

	/// Kind of this node.
	pub fn kind(&self) -> NodeKind {
		match &*self.0.data.borrow() {
			NodeData::Fragment => NodeKind::Fragment,
			NodeData::Element { .. } => NodeKind::Element,
			NodeData::Text(_) => NodeKind::Text,
			NodeData::Comment(_) => NodeKind::Comment,
		}
	}

	/// Whether both handles point at the same node.
	pub fn ptr_eq(&self, other: &Node) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Stable address of the node, usable as a map key while the node lives.
	pub fn key(&self) -> usize {
		Rc::as_ptr(&self.0) as usize
	}

	/// Number of mutations applied to this node.
	pub fn version(&self) -> u64 {
		self.0.version.get()
	}

	fn touch(&self) {
		self.0.version.set(self.0.version.get() + 1);
	}

	/// Lowercase tag name of an element.
	pub fn tag_name(&self) -> Option<String> {
		match &*self.0.data.borrow() {
			NodeData::Element { tag, .. } => Some(tag.clone()),
			_ => None,
		}
	}

	/// Content of a text or comment node.
	pub fn data(&self) -> Option<String> {
		match &*self.0.data.borrow() {
			NodeData::Text(text) | NodeData::Comment(text) => Some(text.clone()),
			_ => None,
		}
	}

	/// Replaces the content of a text or comment node.
	pub fn set_data(&self, value: impl Into<String>) {
		let value = value.into();
		let changed = match &mut *self.0.data.borrow_mut() {
			NodeData::Text(text) | NodeData::Comment(text) => {
				*text = value;
				true
			}
			_ => false,
		};
		if changed {
			self.touch();
		}
	}

	/// Concatenated text of this node and its descendants.
	pub fn text_content(&self) -> String {
		match &*self.0.data.borrow() {
			NodeData::Text(text) => return text.clone(),
			NodeData::Comment(_) => return String::new(),
			_ => {}
		}
		self.children()
			.iter()
			.map(Node::text_content)
			.collect::<String>()
	}

	/// Reads an attribute.
	pub fn attribute(&self, name: &str) -> Option<String> {
		match &*self.0.data.borrow() {
			NodeData::Element { attributes, .. } => attributes.get(name).cloned(),
			_ => None,
		}
	}

	/// Whether the element has the attribute.
	pub fn has_attribute(&self, name: &str) -> bool {
		self.attribute(name).is_some()
	}

	/// Attribute names in document order.
	pub fn attribute_names(&self) -> Vec<String> {
		match &*self.0.data.borrow() {
			NodeData::Element { attributes, .. } => attributes.keys().cloned().collect(),
			_ => Vec::new(),
		}
	}

	/// Sets an attribute. No-op on non-elements.
	pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
		let value = value.into();
		let changed = match &mut *self.0.data.borrow_mut() {
			NodeData::Element { attributes, .. } => {
				attributes.insert(name.to_string(), value);
				true
			}
			_ => false,
		};
		if changed {
			self.touch();
		}
	}

	/// Removes an attribute, preserving the order of the rest.
	pub fn remove_attribute(&self, name: &str) {
		let removed = match &mut *self.0.data.borrow_mut() {
			NodeData::Element { attributes, .. } => attributes.shift_remove(name).is_some(),
			_ => false,
		};
		if removed {
			self.touch();
		}
	}

	/// Reads a property (`value`, `checked`, ...).
	///
	/// Falls back to the attribute of the same name when the property was
	/// never written.
	pub fn property(&self, name: &str) -> Option<Value> {
		match &*self.0.data.borrow() {
			NodeData::Element {
				properties,
				attributes,
				..
			} => properties
				.get(name)
				.cloned()
				.or_else(|| attributes.get(name).map(|v| Value::from(v.as_str()))),
			_ => None,
		}
	}

	/// Writes a property.
	pub fn set_property(&self, name: &str, value: Value) {
		let changed = match &mut *self.0.data.borrow_mut() {
			NodeData::Element { properties, .. } => {
				properties.insert(name.to_string(), value);
				true
			}
			_ => false,
		};
		if changed {
			self.touch();
		}
	}

	/// Parent node, if attached.
	pub fn parent(&self) -> Option<Node> {
		self.0.parent.borrow().upgrade().map(Node)
	}

	/// Snapshot of the child list.
	pub fn children(&self) -> Vec<Node> {
		self.0.children.borrow().clone()
	}

	/// Number of children.
	pub fn child_count(&self) -> usize {
		self.0.children.borrow().len()
	}

	/// Child at `index`.
	pub fn child(&self, index: usize) -> Option<Node> {
		self.0.children.borrow().get(index).cloned()
	}

	/// First child.
	pub fn first_child(&self) -> Option<Node> {
		self.child(0)
	}

	/// Last child.
	pub fn last_child(&self) -> Option<Node> {
		self.0.children.borrow().last().cloned()
	}

	/// Position within the parent's child list.
	pub fn index_in_parent(&self) -> Option<usize> {
		let parent = self.parent()?;
		let children = parent.0.children.borrow();
		children.iter().position(|child| child.ptr_eq(self))
	}

	/// Next sibling.
	pub fn next_sibling(&self) -> Option<Node> {
		let parent = self.parent()?;
		let index = self.index_in_parent()?;
		parent.child(index + 1)
	}

	/// Previous sibling.
	pub fn previous_sibling(&self) -> Option<Node> {
		let parent = self.parent()?;
		let index = self.index_in_parent()?;
		index.checked_sub(1).and_then(|i| parent.child(i))
	}

	/// Whether `self` is `other` or one of its descendants.
	pub fn is_inside(&self, other: &Node) -> bool {
		let mut current = Some(self.clone());
		while let Some(node) = current {
			if node.ptr_eq(other) {
				return true;
			}
			current = node.parent();
		}
		false
	}

	/// Detaches this node from its parent.
	pub fn remove(&self) {
		let Some(parent) = self.parent() else {
			return;
		};
		parent.0.children.borrow_mut().retain(|child| !child.ptr_eq(self));
		*self.0.parent.borrow_mut() = Weak::new();
		parent.touch();
	}

	/// Appends a child. Fragments are emptied into the list.
	pub fn append_child(&self, child: &Node) {
		self.insert_before(child, None);
	}

	/// Inserts `child` before `reference` (or at the end when `None`).
	///
	/// A fragment argument moves all of its children, leaving it empty. A
	/// reference that is not a child of `self` appends.
	pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
		let moving = if child.kind() == NodeKind::Fragment {
			let moved = core::mem::take(&mut *child.0.children.borrow_mut());
			if !moved.is_empty() {
				child.touch();
			}
			moved
		} else {
			child.remove();
			vec![child.clone()]
		};

		if moving.is_empty() {
			return;
		}

		{
			let mut children = self.0.children.borrow_mut();
			let mut index = reference
				.and_then(|r| children.iter().position(|c| c.ptr_eq(r)))
				.unwrap_or(children.len());
			for node in moving {
				*node.0.parent.borrow_mut() = Rc::downgrade(&self.0);
				children.insert(index, node);
				index += 1;
			}
		}
		self.touch();
	}

	/// Replaces this node with `replacement` in its parent.
	pub fn replace_with(&self, replacement: &Node) {
		if let Some(parent) = self.parent() {
			parent.insert_before(replacement, Some(self));
			self.remove();
		}
	}

	/// Deep clone with fresh identity and zeroed mutation counters.
	pub fn clone_deep(&self) -> Node {
		let data = match &*self.0.data.borrow() {
			NodeData::Fragment => NodeData::Fragment,
			NodeData::Element {
				tag,
				attributes,
				properties,
			} => NodeData::Element {
				tag: tag.clone(),
				attributes: attributes.clone(),
				properties: properties.clone(),
			},
			NodeData::Text(text) => NodeData::Text(text.clone()),
			NodeData::Comment(text) => NodeData::Comment(text.clone()),
		};
		let copy = Node::with_data(data);
		{
			let mut children = copy.0.children.borrow_mut();
			for child in self.0.children.borrow().iter() {
				let child_copy = child.clone_deep();
				*child_copy.0.parent.borrow_mut() = Rc::downgrade(&copy.0);
				children.push(child_copy);
			}
		}
		copy
	}

	/// Follows a path of child indices from this node.
	pub fn resolve_path(&self, path: &[usize]) -> Option<Node> {
		let mut current = self.clone();
		for &index in path {
			current = current.child(index)?;
		}
		Some(current)
	}

	/// Serializes the node. Comments are omitted unless `comments` is set.
	pub fn to_html_with(&self, comments: bool) -> String {
		let mut output = String::new();
		self.write_html(&mut output, comments);
		output
	}

	/// Serializes the node without comments.
	pub fn to_html(&self) -> String {
		self.to_html_with(false)
	}

	/// Serializes only the children.
	pub fn inner_html(&self) -> String {
		let mut output = String::new();
		for child in self.children() {
			child.write_html(&mut output, false);
		}
		output
	}

	fn write_html(&self, output: &mut String, comments: bool) {
		match &*self.0.data.borrow() {
			NodeData::Fragment => {}
			NodeData::Text(text) => {
				output.push_str(&html_escape(text));
				return;
			}
			NodeData::Comment(text) => {
				if comments {
					output.push_str("<!--");
					output.push_str(text);
					output.push_str("-->");
				}
				return;
			}
			NodeData::Element {
				tag, attributes, ..
			} => {
				output.push('<');
				output.push_str(tag);
				for (name, value) in attributes {
					output.push(' ');
					output.push_str(name);
					if !value.is_empty() {
						output.push_str("=\"");
						output.push_str(&html_escape(value));
						output.push('"');
					}
				}
				output.push('>');
				if is_void_element(tag) {
					return;
				}
			}
		}

		for child in self.0.children.borrow().iter() {
			child.write_html(output, comments);
		}

		if let NodeData::Element { tag, .. } = &*self.0.data.borrow() {
			output.push_str("</");
			output.push_str(tag);
			output.push('>');
		}
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &*self.0.data.borrow() {
			NodeData::Fragment => write!(f, "#fragment({})", self.child_count()),
			NodeData::Element { tag, .. } => write!(f, "<{tag}>"),
			NodeData::Text(text) => write!(f, "#text({text:?})"),
			NodeData::Comment(text) => write!(f, "<!--{text}-->"),
		}
	}
}

/// Removes every node from `start` through `end` inclusive.
///
/// Both must share a parent, with `start` at or before `end`.
pub fn remove_range(start: &Node, end: &Node) {
	for node in collect_range(start, end) {
		node.remove();
	}
}

/// Nodes from `start` through `end` inclusive, following sibling links.
pub fn collect_range(start: &Node, end: &Node) -> Vec<Node> {
	let mut nodes = Vec::new();
	let mut current = Some(start.clone());
	while let Some(node) = current {
		let done = node.ptr_eq(end);
		current = if done { None } else { node.next_sibling() };
		nodes.push(node);
	}
	nodes
}

/// Whether the tag never has children or a closing tag.
pub fn is_void_element(tag: &str) -> bool {
	matches!(
		tag,
		"area"
			| "base" | "br"
			| "col" | "embed"
			| "hr" | "img"
			| "input" | "link"
			| "meta" | "source"
			| "track" | "wbr"
	)
}

/// Escapes HTML special characters.
fn html_escape(s: &str) -> Cow<'_, str> {
	if s.contains(['&', '<', '>', '"', '\'']) {
		let mut escaped = String::with_capacity(s.len() + 8);
		for c in s.chars() {
			match c {
				'&' => escaped.push_str("&amp;"),
				'<' => escaped.push_str("&lt;"),
				'>' => escaped.push_str("&gt;"),
				'"' => escaped.push_str("&quot;"),
				'\'' => escaped.push_str("&#x27;"),
				_ => escaped.push(c),
			}
		}
		Cow::Owned(escaped)
	} else {
		Cow::Borrowed(s)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn list() -> (Node, Node, Node, Node) {
		let ul = Node::element("ul");
		let a = Node::element("li");
		let b = Node::element("li");
		let c = Node::element("li");
		ul.append_child(&a);
		ul.append_child(&b);
		ul.append_child(&c);
		(ul, a, b, c)
	}

	#[rstest]
	fn test_siblings_and_parent() {
		let (ul, a, b, c) = list();
		assert!(a.next_sibling().unwrap().ptr_eq(&b));
		assert!(c.previous_sibling().unwrap().ptr_eq(&b));
		assert!(a.previous_sibling().is_none());
		assert!(b.parent().unwrap().ptr_eq(&ul));
	}

	#[rstest]
	fn test_insert_before_moves_existing_child() {
		let (ul, a, _b, c) = list();
		ul.insert_before(&c, Some(&a));
		let order: Vec<bool> = ul.children().iter().map(|n| n.ptr_eq(&c)).collect();
		assert_eq!(order, vec![true, false, false]);
		assert_eq!(ul.child_count(), 3);
	}

	#[rstest]
	fn test_fragment_insertion_empties_fragment() {
		let fragment = Node::fragment();
		fragment.append_child(&Node::text("x"));
		fragment.append_child(&Node::text("y"));
		let div = Node::element("div");
		div.append_child(&fragment);
		assert_eq!(fragment.child_count(), 0);
		assert_eq!(div.text_content(), "xy");
	}

	#[rstest]
	fn test_clone_deep_is_independent() {
		let (ul, a, _, _) = list();
		a.set_attribute("class", "first");
		let copy = ul.clone_deep();
		copy.first_child().unwrap().set_attribute("class", "changed");
		assert_eq!(a.attribute("class").as_deref(), Some("first"));
		assert!(!copy.ptr_eq(&ul));
	}

	#[rstest]
	fn test_version_counts_own_mutations_only() {
		let (ul, a, b, _) = list();
		let before = (ul.version(), a.version(), b.version());
		a.set_attribute("id", "x");
		assert_eq!(a.version(), before.1 + 1);
		assert_eq!(b.version(), before.2);
		assert_eq!(ul.version(), before.0);
	}

	#[rstest]
	fn test_remove_range() {
		let (ul, a, b, c) = list();
		remove_range(&a, &b);
		assert_eq!(ul.child_count(), 1);
		assert!(ul.first_child().unwrap().ptr_eq(&c));
	}

	#[rstest]
	fn test_to_html_escapes_and_skips_comments() {
		let div = Node::element("div");
		div.set_attribute("title", "a\"b");
		div.append_child(&Node::comment("marker"));
		div.append_child(&Node::text("1 < 2"));
		div.append_child(&Node::element("br"));
		assert_eq!(div.to_html(), "<div title=\"a&quot;b\">1 &lt; 2<br></div>");
		assert_eq!(
			div.to_html_with(true),
			"<div title=\"a&quot;b\"><!--marker-->1 &lt; 2<br></div>"
		);
	}

	#[rstest]
	fn test_property_falls_back_to_attribute() {
		let input = Node::element("input");
		input.set_attribute("value", "initial");
		assert_eq!(input.property("value"), Some(Value::from("initial")));
		input.set_property("value", Value::from("typed"));
		assert_eq!(input.property("value"), Some(Value::from("typed")));
	}
}
