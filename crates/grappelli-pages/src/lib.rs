//! grappelli pages - templates, blocks, and components over a reactive core
//!
//! Templates are compiled once from a DOM fragment into a master clone source
//! plus binding descriptors, then instantiated any number of times. Each
//! instantiation wires one effect per dynamic text or attribute location, one
//! delegated listener per event binding, and one reconciler per block.
//!
//! ## Architecture
//!
//! - [`dom`]: in-memory DOM host and HTML fragment parser
//! - [`value`]: dynamic values held by template scopes
//! - [`store`]: deep reactive objects and arrays behind object and array values
//! - [`expr`]: binding expression language, compiled to closures and memoized
//! - [`template`]: the compiler, binding descriptors, and block configurations
//! - [`render`]: the explicit render context (lifecycle frame, context chain, ancestors)
//! - [`component`]: template + setup function
//! - [`app`]: application root (component registry, event delegation, mount queue)
//! - [`logging`]: `tracing` macros under the `grappelli` target
//!
//! ## Example
//!
//! ```ignore
//! use grappelli_pages::{App, BlockTable, Component, Node, Scope, Template, Value};
//! use grappelli_reactive::Signal;
//!
//! let template = Template::from_html("<p>Hello, {{ name() }}!</p>", &BlockTable::new())?;
//! let app = App::default();
//! app.register(Component::stateless("Greeting", template));
//!
//! let name = Signal::new(Value::from("world"));
//! let body = Node::element("body");
//! let mounted = app.mount("Greeting", Scope::new().with("name", name.clone()), &body)?;
//! name.set(Value::from("grappelli"));
//! assert_eq!(body.inner_html(), "<p>Hello, grappelli!</p>");
//! mounted.unmount();
//! ```

#![warn(missing_docs)]

#[doc(hidden)]
pub use tracing as __tracing;

pub mod logging;

pub mod app;
mod blocks;
pub mod component;
pub mod config;
pub mod context;
pub mod dom;
pub mod error;
pub mod events;
pub mod expr;
pub mod lifecycle;
pub mod promise;
pub mod render;
pub mod scope;
pub mod store;
pub mod template;
pub mod value;

pub use app::{App, Mounted};
pub use component::{Component, SetupFn};
pub use config::{CacheSettings, EachSettings, RuntimeConfig};
pub use context::{ContextChain, MountContext};
pub use dom::html::parse_fragment;
pub use dom::{Node, NodeKind};
pub use error::{
	ConfigError, EvalError, EvalResult, ExprError, LifecycleError, RenderError, RenderResult,
	TemplateError, TemplateResult,
};
pub use events::{Event, EventDelegator};
pub use expr::{CompiledExpr, compile_cached};
pub use lifecycle::LifecycleFrame;
pub use promise::{Promise, Settlement};
pub use render::RenderContext;
pub use scope::Scope;
pub use store::{ReactiveArray, ReactiveObject};
pub use template::{
	AwaitBlockConfig, BindingDescriptor, BindingKind, BlockConfig, BlockTable,
	ComponentBlockConfig, EachBlockConfig, IfBlockConfig, ItemPattern, Rendered, Template,
};
pub use value::{Function, KeyAtom, Value};
