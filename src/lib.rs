//! # grappelli
//!
//! A client-side UI runtime: templates compiled once from markup, kept in sync
//! with application state through fine-grained reactivity.
//!
//! ## Crates
//!
//! - [`reactive`]: signals, effects, memos, and ownership-based disposal
//! - [`pages`]: template compiler, block reconcilers, components, lifecycle, and context
//!
//! ## Feature Flags
//!
//! - `debug-hooks` - Enables `debug_log!` output (template tracing, listener installation)
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use grappelli::prelude::*;
//!
//! let row = Template::from_html("<li>{{ item() }}</li>", &BlockTable::new())?;
//! let list = Template::from_html(
//!     r#"<ul><template data-block="each" data-block-id="rows"></template></ul>"#,
//!     &BlockTable::new().with("rows", EachBlockConfig::new("items", "item", row)),
//! )?;
//!
//! let items = Signal::new(Value::array([Value::from("a"), Value::from("b")]));
//! let body = Node::element("body");
//! let app = App::default();
//! app.mount_template(&list, &Scope::new().with("items", items.clone()), &body)?;
//! assert_eq!(body.inner_html(), "<ul><li>a</li><li>b</li></ul>");
//! ```

#![warn(missing_docs)]

pub mod pages;
pub mod reactive;

pub use pages::{App, Component, Mounted, RenderContext, RuntimeConfig, Scope, Template, Value};
pub use reactive::{Effect, Memo, Signal};

/// Commonly used types.
pub mod prelude {
	pub use crate::pages::{
		App, AwaitBlockConfig, BlockTable, Component, ComponentBlockConfig, EachBlockConfig, Event,
		IfBlockConfig, Mounted, Node, Promise, RenderContext, RenderError, RenderResult, RuntimeConfig,
		Scope, Template, TemplateError, Value,
	};
	pub use crate::reactive::{Cleanup, Effect, Memo, Signal, on_cleanup, untrack};
}
