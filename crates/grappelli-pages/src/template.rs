//! Compiled templates.
//!
//! A [`Template`] is compiled once from a DOM fragment and a [`BlockTable`],
//! then instantiated any number of times. Instantiation deep-clones the
//! master fragment, resolves every descriptor path against the clone, and
//! wires the bindings inside an untracked ownership scope.
//!
//! ```ignore
//! let row = Template::from_html("<li>{{ item().label }}</li>", &BlockTable::new())?;
//! let blocks = BlockTable::new().with("m1", EachBlockConfig::new("items", "item", row).key("id"));
//! let list = Template::from_html(
//!     r#"<ul><template data-block="each" data-block-id="m1"></template></ul>"#,
//!     &blocks,
//! )?;
//! ```

mod compiler;
pub mod descriptor;
mod instantiate;
pub mod table;

use core::fmt;

use std::rc::Rc;

pub use descriptor::{BindingDescriptor, BindingKind, TextPart, split_interpolation};
pub use instantiate::Rendered;
pub use table::{
	AwaitBlockConfig, AwaitBranch, BlockConfig, BlockTable, ComponentBlockConfig, Directive,
	EachBlockConfig, IfBlockConfig, IfBranch, ItemPattern, PropValue,
};

use crate::dom::Node;
use crate::dom::html::parse_fragment;
use crate::error::{RenderResult, TemplateResult};
use crate::render::RenderContext;
use crate::scope::Scope;

/// Master fragment plus the descriptors of its dynamic locations.
pub struct Template {
	master: Node,
	bindings: Vec<BindingDescriptor>,
}

impl Template {
	fn from_parts(master: Node, bindings: Vec<BindingDescriptor>) -> Self {
		Self { master, bindings }
	}

	/// Compiles a parsed fragment. The input is copied, not modified.
	///
	/// # Errors
	///
	/// [`TemplateError`](crate::TemplateError) on a marker without a
	/// configuration, a malformed expression, or an unterminated `{{`.
	pub fn compile(fragment: &Node, blocks: &BlockTable) -> TemplateResult<Rc<Template>> {
		compiler::compile(fragment, blocks).map(Rc::new)
	}

	/// Parses and compiles markup.
	///
	/// # Errors
	///
	/// As [`Template::compile`], plus markup errors.
	pub fn from_html(html: &str, blocks: &BlockTable) -> TemplateResult<Rc<Template>> {
		Self::compile(&parse_fragment(html)?, blocks)
	}

	/// Descriptors in depth-first order.
	pub fn bindings(&self) -> &[BindingDescriptor] {
		&self.bindings
	}

	/// Serialized master fragment, comments omitted.
	pub fn master_html(&self) -> String {
		self.master.to_html()
	}

	pub(crate) fn master(&self) -> &Node {
		&self.master
	}

	/// Clones the master and wires its bindings against `scope`.
	///
	/// The returned nodes are detached until inserted with
	/// [`Rendered::insert_before`].
	///
	/// # Errors
	///
	/// Configuration errors: unknown identifiers, a `bind:` target that is
	/// not a signal, unknown actions or components, cyclic components.
	pub fn instantiate(self: &Rc<Self>, scope: &Scope, cx: &RenderContext) -> RenderResult<Rendered> {
		instantiate::instantiate(self, scope, cx)
	}
}

impl fmt::Debug for Template {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Template")
			.field("master", &self.master.to_html_with(true))
			.field("bindings", &self.bindings.len())
			.finish()
	}
}
