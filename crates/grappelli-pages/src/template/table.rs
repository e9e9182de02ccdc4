//! Block configurations referenced by marker ids.
//!
//! The markup parser leaves `<template data-block="..." data-block-id="...">`
//! markers in the fragment and records what each marker stands for in a
//! [`BlockTable`]. Sub-templates are compiled before the table is built, so a
//! configuration only holds shared, immutable [`Template`]s.

use core::fmt;

use std::collections::HashMap;
use std::rc::Rc;

use crate::template::Template;

/// Kind of block a marker stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
	/// `if` / `else if` / `else`
	If,
	/// Keyed list
	Each,
	/// Promise states
	Await,
	/// Child component
	Component,
}

impl Directive {
	/// Marker spelling.
	pub fn as_str(self) -> &'static str {
		match self {
			Directive::If => "if",
			Directive::Each => "each",
			Directive::Await => "await",
			Directive::Component => "component",
		}
	}

	/// Parses the marker spelling.
	pub fn parse(name: &str) -> Option<Self> {
		match name {
			"if" => Some(Directive::If),
			"each" => Some(Directive::Each),
			"await" => Some(Directive::Await),
			"component" => Some(Directive::Component),
			_ => None,
		}
	}
}

impl fmt::Display for Directive {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One segment of an if block.
#[derive(Debug, Clone)]
pub struct IfBranch {
	/// Condition; `None` for the trailing `else`.
	pub condition: Option<String>,
	/// Content rendered while this segment is selected.
	pub content: Rc<Template>,
}

/// `if` / `else if` / `else` chain.
#[derive(Debug, Clone)]
pub struct IfBlockConfig {
	branches: Vec<IfBranch>,
}

impl IfBlockConfig {
	/// Starts a chain with its first condition.
	pub fn new(condition: impl Into<String>, content: Rc<Template>) -> Self {
		Self {
			branches: vec![IfBranch {
				condition: Some(condition.into()),
				content,
			}],
		}
	}

	/// Appends an `else if` segment.
	pub fn else_if(mut self, condition: impl Into<String>, content: Rc<Template>) -> Self {
		self.branches.push(IfBranch {
			condition: Some(condition.into()),
			content,
		});
		self
	}

	/// Appends the `else` segment.
	pub fn otherwise(mut self, content: Rc<Template>) -> Self {
		self.branches.push(IfBranch {
			condition: None,
			content,
		});
		self
	}

	/// Segments in evaluation order.
	pub fn branches(&self) -> &[IfBranch] {
		&self.branches
	}
}

/// How an each item is bound in the item scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemPattern {
	/// `as item`
	Name(String),
	/// `as { id, label }`
	Fields(Vec<String>),
}

impl ItemPattern {
	/// Destructuring pattern over the given fields.
	pub fn fields<I, S>(fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		ItemPattern::Fields(fields.into_iter().map(Into::into).collect())
	}
}

impl From<&str> for ItemPattern {
	fn from(name: &str) -> Self {
		ItemPattern::Name(name.to_string())
	}
}

/// Keyed list block.
#[derive(Debug, Clone)]
pub struct EachBlockConfig {
	/// Expression producing the array.
	pub source: String,
	/// Item binding.
	pub item: ItemPattern,
	/// Optional index binding.
	pub index: Option<String>,
	/// Item fields forming the key; empty means the item itself.
	pub key_fields: Vec<String>,
	/// Per-item content.
	pub content: Rc<Template>,
	/// Content shown while the list is empty.
	pub empty: Option<Rc<Template>>,
}

impl EachBlockConfig {
	/// Iterates `source`, binding each item as `item`.
	pub fn new(source: impl Into<String>, item: impl Into<ItemPattern>, content: Rc<Template>) -> Self {
		Self {
			source: source.into(),
			item: item.into(),
			index: None,
			key_fields: Vec::new(),
			content,
			empty: None,
		}
	}

	/// Exposes the item index under `name`.
	pub fn index(mut self, name: impl Into<String>) -> Self {
		self.index = Some(name.into());
		self
	}

	/// Adds an item field to the key.
	pub fn key(mut self, field: impl Into<String>) -> Self {
		self.key_fields.push(field.into());
		self
	}

	/// Content shown while the list is empty.
	pub fn empty(mut self, content: Rc<Template>) -> Self {
		self.empty = Some(content);
		self
	}
}

/// A `then` or `catch` segment.
#[derive(Debug, Clone)]
pub struct AwaitBranch {
	/// Name bound to the settled value.
	pub binding: Option<String>,
	/// Segment content.
	pub content: Rc<Template>,
}

/// Promise block.
#[derive(Debug, Clone)]
pub struct AwaitBlockConfig {
	/// Expression producing a promise (or a plain value).
	pub source: String,
	/// Content while pending.
	pub pending: Option<Rc<Template>>,
	/// Content on resolution.
	pub then: Option<AwaitBranch>,
	/// Content on rejection or evaluation failure.
	pub catch: Option<AwaitBranch>,
}

impl AwaitBlockConfig {
	/// Awaits `source`.
	pub fn new(source: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			pending: None,
			then: None,
			catch: None,
		}
	}

	/// Content while pending.
	pub fn pending(mut self, content: Rc<Template>) -> Self {
		self.pending = Some(content);
		self
	}

	/// Content on resolution, with the value bound to `binding`.
	pub fn then(mut self, binding: Option<&str>, content: Rc<Template>) -> Self {
		self.then = Some(AwaitBranch {
			binding: binding.map(str::to_string),
			content,
		});
		self
	}

	/// Content on rejection, with the reason bound to `binding`.
	pub fn catch(mut self, binding: Option<&str>, content: Rc<Template>) -> Self {
		self.catch = Some(AwaitBranch {
			binding: binding.map(str::to_string),
			content,
		});
		self
	}
}

/// A prop handed to a child component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
	/// Literal string.
	Static(String),
	/// Expression evaluated once in the parent scope.
	Expression(String),
}

/// Child component reference.
#[derive(Debug, Clone)]
pub struct ComponentBlockConfig {
	/// Registered component name.
	pub name: String,
	/// Props in declaration order.
	pub props: Vec<(String, PropValue)>,
	/// Content for the child's `<slot>`.
	pub slot: Option<Rc<Template>>,
}

impl ComponentBlockConfig {
	/// References the component registered as `name`.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			props: Vec::new(),
			slot: None,
		}
	}

	/// Adds a prop evaluated in the parent scope.
	pub fn prop(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
		self.props
			.push((name.into(), PropValue::Expression(expression.into())));
		self
	}

	/// Adds a literal string prop.
	pub fn static_prop(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.props.push((name.into(), PropValue::Static(value.into())));
		self
	}

	/// Content rendered in place of the child's `<slot>`.
	pub fn slot(mut self, content: Rc<Template>) -> Self {
		self.slot = Some(content);
		self
	}
}

/// Configuration of one block marker.
#[derive(Debug, Clone)]
pub enum BlockConfig {
	/// Conditional
	If(IfBlockConfig),
	/// List
	Each(EachBlockConfig),
	/// Promise
	Await(AwaitBlockConfig),
	/// Child component
	Component(ComponentBlockConfig),
}

impl BlockConfig {
	/// Directive this configuration serves.
	pub fn directive(&self) -> Directive {
		match self {
			BlockConfig::If(_) => Directive::If,
			BlockConfig::Each(_) => Directive::Each,
			BlockConfig::Await(_) => Directive::Await,
			BlockConfig::Component(_) => Directive::Component,
		}
	}
}

impl From<IfBlockConfig> for BlockConfig {
	fn from(config: IfBlockConfig) -> Self {
		BlockConfig::If(config)
	}
}

impl From<EachBlockConfig> for BlockConfig {
	fn from(config: EachBlockConfig) -> Self {
		BlockConfig::Each(config)
	}
}

impl From<AwaitBlockConfig> for BlockConfig {
	fn from(config: AwaitBlockConfig) -> Self {
		BlockConfig::Await(config)
	}
}

impl From<ComponentBlockConfig> for BlockConfig {
	fn from(config: ComponentBlockConfig) -> Self {
		BlockConfig::Component(config)
	}
}

/// Side table from marker id to block configuration.
#[derive(Debug, Clone, Default)]
pub struct BlockTable {
	entries: HashMap<String, Rc<BlockConfig>>,
}

impl BlockTable {
	/// Empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds or replaces the configuration for `id`.
	pub fn with(mut self, id: impl Into<String>, config: impl Into<BlockConfig>) -> Self {
		self.insert(id, config);
		self
	}

	/// Adds or replaces the configuration for `id`.
	pub fn insert(&mut self, id: impl Into<String>, config: impl Into<BlockConfig>) -> &mut Self {
		self.entries.insert(id.into(), Rc::new(config.into()));
		self
	}

	/// Looks a marker id up.
	pub fn get(&self, id: &str) -> Option<&Rc<BlockConfig>> {
		self.entries.get(id)
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether the table is empty.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
