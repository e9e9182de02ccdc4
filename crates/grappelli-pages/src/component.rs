//! Components: a compiled template plus a setup function.
//!
//! The setup function receives the props and the component's
//! [`RenderContext`], registers lifecycle callbacks and context values, and
//! returns the scope the template is instantiated against.
//!
//! ```ignore
//! let counter = Component::new(
//!     "Counter",
//!     Template::from_html(r#"<button onclick="{{ increment }}">{{ count() }}</button>"#, &BlockTable::new())?,
//!     |props, cx| {
//!         let count = Signal::new(props.get("start").cloned().unwrap_or(Value::from(0)));
//!         cx.on_mount(|_| info_log!("counter mounted"))?;
//!         let c = count.clone();
//!         Ok(Scope::new()
//!             .with("count", count)
//!             .with("increment", Value::function("increment", move |_| {
//!                 c.update(|n| *n = Value::from(n.to_number() + 1.0));
//!                 Ok(Value::Undefined)
//!             })))
//!     },
//! );
//! ```

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use std::rc::Rc;

use crate::error::RenderResult;
use crate::render::RenderContext;
use crate::scope::Scope;
use crate::template::Template;

/// Setup function signature.
pub type SetupFn = dyn Fn(&Scope, &RenderContext) -> RenderResult<Scope>;

static NEXT_COMPONENT_ID: AtomicUsize = AtomicUsize::new(1);

/// A reusable component definition.
#[derive(Clone)]
pub struct Component {
	id: usize,
	name: Rc<str>,
	template: Rc<Template>,
	setup: Rc<SetupFn>,
}

impl Component {
	/// Defines a component with a setup function.
	pub fn new<F>(name: impl Into<Rc<str>>, template: Rc<Template>, setup: F) -> Self
	where
		F: Fn(&Scope, &RenderContext) -> RenderResult<Scope> + 'static,
	{
		Self {
			id: NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed),
			name: name.into(),
			template,
			setup: Rc::new(setup),
		}
	}

	/// A component whose template sees its props directly.
	pub fn stateless(name: impl Into<Rc<str>>, template: Rc<Template>) -> Self {
		Self::new(name, template, |props, _| Ok(props.clone()))
	}

	/// Identity used for cycle detection; clones share it.
	pub fn id(&self) -> usize {
		self.id
	}

	/// Registered name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Compiled template.
	pub fn template(&self) -> &Rc<Template> {
		&self.template
	}

	pub(crate) fn setup(&self, props: &Scope, cx: &RenderContext) -> RenderResult<Scope> {
		(self.setup)(props, cx)
	}
}

impl fmt::Debug for Component {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Component")
			.field("id", &self.id)
			.field("name", &self.name)
			.finish()
	}
}
