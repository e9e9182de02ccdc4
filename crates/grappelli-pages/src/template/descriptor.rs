//! Binding descriptors: one per dynamic location of a template.

use std::rc::Rc;

use crate::error::{TemplateError, TemplateResult};
use crate::template::Template;
use crate::template::table::BlockConfig;

/// A dynamic location and how to keep it up to date.
#[derive(Debug, Clone)]
pub struct BindingDescriptor {
	/// Child indices from the template root to the bound node.
	pub path: Vec<usize>,
	/// What is bound there.
	pub kind: BindingKind,
}

/// Static or interpolated run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPart {
	/// Literal text.
	Static(String),
	/// Expression between `{{` and `}}`.
	Dynamic(String),
}

/// The dynamic feature a descriptor stands for.
#[derive(Debug, Clone)]
pub enum BindingKind {
	/// Text node whose data is the expression's display value.
	Text {
		/// Expression text.
		expression: String,
	},
	/// Attribute built from static and interpolated parts.
	Attribute {
		/// Attribute name.
		name: String,
		/// Parts concatenated in order.
		parts: Vec<TextPart>,
	},
	/// Delegated `on<event>` listener.
	Event {
		/// Event name without the `on` prefix.
		event: String,
		/// Expression producing the handler.
		expression: String,
	},
	/// `bind:<property>` two-way binding.
	Bind {
		/// Node property kept in sync.
		property: String,
		/// Event that writes the property back.
		event: String,
		/// Expression producing the signal.
		expression: String,
	},
	/// `use:<name>` action.
	Action {
		/// Context name of the action function.
		name: String,
		/// Argument expression.
		argument: Option<String>,
	},
	/// Block marker replaced by an anchor comment.
	Block(Rc<BlockConfig>),
	/// `<slot>` replaced by an anchor comment.
	Slot {
		/// Children of the `<slot>` element, shown without slot content.
		fallback: Option<Rc<Template>>,
	},
}

impl BindingKind {
	/// Short label used in logs.
	pub fn label(&self) -> &'static str {
		match self {
			BindingKind::Text { .. } => "text",
			BindingKind::Attribute { .. } => "attribute",
			BindingKind::Event { .. } => "event",
			BindingKind::Bind { .. } => "bind",
			BindingKind::Action { .. } => "action",
			BindingKind::Block(_) => "block",
			BindingKind::Slot { .. } => "slot",
		}
	}
}

/// Splits text into static and `{{ }}` runs. Empty static runs are dropped.
///
/// # Errors
///
/// [`TemplateError::UnterminatedInterpolation`] when a `{{` has no `}}`.
pub fn split_interpolation(text: &str) -> TemplateResult<Vec<TextPart>> {
	let mut parts = Vec::new();
	let mut rest = text;
	while let Some(open) = rest.find("{{") {
		if open > 0 {
			parts.push(TextPart::Static(rest[..open].to_string()));
		}
		let after = &rest[open + 2..];
		let close = after
			.find("}}")
			.ok_or_else(|| TemplateError::UnterminatedInterpolation(text.to_string()))?;
		parts.push(TextPart::Dynamic(after[..close].trim().to_string()));
		rest = &after[close + 2..];
	}
	if !rest.is_empty() {
		parts.push(TextPart::Static(rest.to_string()));
	}
	Ok(parts)
}

/// Expression of a directive attribute: `{{ expr }}` or a bare expression.
pub(crate) fn directive_expression(value: &str) -> &str {
	let trimmed = value.trim();
	trimmed
		.strip_prefix("{{")
		.and_then(|inner| inner.strip_suffix("}}"))
		.map_or(trimmed, str::trim)
}
