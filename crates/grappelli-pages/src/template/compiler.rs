//! One-time static analysis of a template fragment.
//!
//! The compiler walks a private copy of the fragment depth-first and records a
//! [`BindingDescriptor`] for every dynamic feature it finds. While walking it
//! also rewrites the copy into the master clone source: interpolated text is
//! split into separate text nodes, directive and interpolated attributes are
//! stripped, and block markers and `<slot>` elements become anchor comments.
//! Nodes with nothing dynamic below them produce no descriptors and need no
//! work at instantiation beyond the clone.

use std::rc::Rc;

use crate::debug_log;
use crate::dom::{Node, NodeKind};
use crate::error::{TemplateError, TemplateResult};
use crate::expr;
use crate::template::Template;
use crate::template::descriptor::{
	BindingDescriptor, BindingKind, TextPart, directive_expression, split_interpolation,
};
use crate::template::table::{BlockTable, Directive};

/// Data of the comment opening every instantiated range.
pub(crate) const RANGE_START: &str = "[";
/// Data of the comment closing every instantiated range.
pub(crate) const RANGE_END: &str = "]";

pub(super) fn compile(input: &Node, blocks: &BlockTable) -> TemplateResult<Template> {
	let master = Node::fragment();
	master.append_child(&Node::comment(RANGE_START));
	match input.kind() {
		NodeKind::Fragment => {
			for child in input.children() {
				master.append_child(&child.clone_deep());
			}
		}
		_ => master.append_child(&input.clone_deep()),
	}
	master.append_child(&Node::comment(RANGE_END));

	let mut walker = Walker {
		blocks,
		path: Vec::new(),
		bindings: Vec::new(),
	};
	walker.children(&master)?;

	debug_log!(
		bindings = walker.bindings.len(),
		"compiled template: {}",
		master.to_html_with(true)
	);
	Ok(Template::from_parts(master, walker.bindings))
}

struct Walker<'a> {
	blocks: &'a BlockTable,
	path: Vec<usize>,
	bindings: Vec<BindingDescriptor>,
}

impl Walker<'_> {
	fn push(&mut self, kind: BindingKind) {
		self.bindings.push(BindingDescriptor {
			path: self.path.clone(),
			kind,
		});
	}

	fn children(&mut self, parent: &Node) -> TemplateResult<()> {
		let mut index = 0;
		while let Some(child) = parent.child(index) {
			self.path.push(index);
			let occupied = self.node(&child)?;
			self.path.pop();
			index += occupied;
		}
		Ok(())
	}

	/// Visits a node and returns how many sibling slots it now occupies.
	fn node(&mut self, node: &Node) -> TemplateResult<usize> {
		match node.kind() {
			NodeKind::Text => self.text(node),
			NodeKind::Element => {
				self.element(node)?;
				Ok(1)
			}
			NodeKind::Comment | NodeKind::Fragment => Ok(1),
		}
	}

	fn text(&mut self, node: &Node) -> TemplateResult<usize> {
		let data = node.data().unwrap_or_default();
		if !data.contains("{{") {
			return Ok(1);
		}
		let Some(parent) = node.parent() else {
			return Ok(1);
		};
		let parts = split_interpolation(&data)?;
		let Some((&base, prefix)) = self.path.split_last() else {
			return Ok(1);
		};
		let prefix = prefix.to_vec();

		for (offset, part) in parts.iter().enumerate() {
			let replacement = match part {
				TextPart::Static(text) => Node::text(text.clone()),
				TextPart::Dynamic(expression) => {
					check_syntax(expression)?;
					let mut path = prefix.clone();
					path.push(base + offset);
					self.bindings.push(BindingDescriptor {
						path,
						kind: BindingKind::Text {
							expression: expression.clone(),
						},
					});
					Node::text("")
				}
			};
			parent.insert_before(&replacement, Some(node));
		}
		node.remove();
		Ok(parts.len())
	}

	fn element(&mut self, node: &Node) -> TemplateResult<()> {
		let tag = node.tag_name().unwrap_or_default();
		if tag == "template" && node.has_attribute("data-block") {
			return self.marker(node, &tag);
		}
		if tag == "slot" {
			return self.slot(node);
		}

		for name in node.attribute_names() {
			let value = node.attribute(&name).unwrap_or_default();
			let kind = if let Some(property) = name.strip_prefix("bind:") {
				let expression = directive_expression(&value);
				check_syntax(expression)?;
				Some(BindingKind::Bind {
					property: property.to_string(),
					event: bind_event(&tag, property).to_string(),
					expression: expression.to_string(),
				})
			} else if let Some(action) = name.strip_prefix("use:") {
				let argument = directive_expression(&value);
				let argument = if argument.is_empty() {
					None
				} else {
					check_syntax(argument)?;
					Some(argument.to_string())
				};
				Some(BindingKind::Action {
					name: action.to_string(),
					argument,
				})
			} else if let Some(event) = name.strip_prefix("on").filter(|_| value.contains("{{")) {
				let expression = directive_expression(&value);
				check_syntax(expression)?;
				Some(BindingKind::Event {
					event: event.to_string(),
					expression: expression.to_string(),
				})
			} else if value.contains("{{") {
				let parts = split_interpolation(&value)?;
				for part in &parts {
					if let TextPart::Dynamic(expression) = part {
						check_syntax(expression)?;
					}
				}
				Some(BindingKind::Attribute {
					name: name.clone(),
					parts,
				})
			} else {
				None
			};

			if let Some(kind) = kind {
				node.remove_attribute(&name);
				self.push(kind);
			}
		}

		self.children(node)
	}

	fn marker(&mut self, node: &Node, tag: &str) -> TemplateResult<()> {
		let declared = node.attribute("data-block").unwrap_or_default();
		let directive = Directive::parse(&declared)
			.ok_or_else(|| TemplateError::UnknownDirective(declared.clone()))?;
		let id = node
			.attribute("data-block-id")
			.filter(|id| !id.is_empty())
			.ok_or_else(|| TemplateError::MarkerWithoutId {
				tag: tag.to_string(),
			})?;
		let config = self
			.blocks
			.get(&id)
			.ok_or_else(|| TemplateError::MissingBlockConfig {
				marker_id: id.clone(),
				directive: directive.to_string(),
			})?;
		if config.directive() != directive {
			return Err(TemplateError::DirectiveMismatch {
				marker_id: id,
				declared,
				configured: config.directive().to_string(),
			});
		}

		node.replace_with(&Node::comment(format!("{directive}:{id}")));
		self.push(BindingKind::Block(config.clone()));
		Ok(())
	}

	fn slot(&mut self, node: &Node) -> TemplateResult<()> {
		let fallback = if node.child_count() > 0 {
			let content = Node::fragment();
			for child in node.children() {
				content.append_child(&child);
			}
			Some(Rc::new(compile(&content, self.blocks)?))
		} else {
			None
		};
		node.replace_with(&Node::comment("slot"));
		self.push(BindingKind::Slot { fallback });
		Ok(())
	}
}

fn check_syntax(expression: &str) -> TemplateResult<()> {
	expr::validate(expression).map_err(|source| TemplateError::MalformedExpression {
		expression: expression.to_string(),
		source,
	})
}

/// Event that writes a `bind:` property back into its signal.
fn bind_event(tag: &str, property: &str) -> &'static str {
	match property {
		"checked" => "click",
		"value" if tag == "select" => "change",
		"value" => "input",
		_ => "change",
	}
}
