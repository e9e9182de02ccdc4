//! Error types for template compilation, instantiation, and evaluation.
//!
//! Configuration errors (`ExprError`, `TemplateError`, `LifecycleError`, and
//! most `RenderError` variants) are fatal and bubble to the caller.
//! `EvalError` is produced at update time and is logged by the effect that hit
//! it; it never escapes that effect.

use thiserror::Error;

/// Result type for template compilation.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Result type for instantiation and mounting.
pub type RenderResult<T> = Result<T, RenderError>;

/// Result type for expression evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised while parsing or resolving an expression.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ExprError {
	/// A token appeared where it is not allowed.
	#[error("unexpected token '{found}' at offset {offset}")]
	UnexpectedToken {
		/// Text of the offending token.
		found: String,
		/// Byte offset into the expression.
		offset: usize,
	},

	/// The expression ended early.
	#[error("unexpected end of expression, expected {expected}")]
	UnexpectedEnd {
		/// What the parser was looking for.
		expected: String,
	},

	/// A string literal has no closing quote.
	#[error("unterminated string starting at offset {0}")]
	UnterminatedString(usize),

	/// The left side of `=` is not a property or index access.
	#[error("invalid assignment target '{target}' at offset {offset}")]
	InvalidAssignment {
		/// Source text of the target.
		target: String,
		/// Byte offset into the expression.
		offset: usize,
	},

	/// A character outside the expression grammar.
	#[error("unexpected character '{found}' at offset {offset}")]
	UnexpectedChar {
		/// The character.
		found: char,
		/// Byte offset into the expression.
		offset: usize,
	},

	/// An identifier that is neither a context key, a parameter, nor a builtin.
	#[error("unknown identifier '{name}' (available: {available})")]
	UnknownIdentifier {
		/// The identifier.
		name: String,
		/// Comma-separated names that were in scope.
		available: String,
	},
}

/// Errors raised while evaluating a compiled expression.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum EvalError {
	/// Tried to call something that is not a function or signal.
	#[error("{0} is not a function")]
	NotCallable(String),

	/// Tried to read a property of undefined or null.
	#[error("cannot read property '{property}' of {target}")]
	NoProperty {
		/// Property name.
		property: String,
		/// Display of the receiver.
		target: String,
	},

	/// Tried to assign a property the receiver cannot hold.
	#[error("cannot assign property '{property}' of {target}")]
	ReadOnlyProperty {
		/// Property name.
		property: String,
		/// Type of the receiver.
		target: String,
	},

	/// Operand types do not fit the operation.
	#[error("type error: {0}")]
	Type(String),

	/// A user function reported a failure.
	#[error("{0}")]
	Thrown(String),
}

/// Errors raised while compiling a template.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TemplateError {
	/// A block marker whose id is missing from the block table.
	#[error("no block configuration for marker '{marker_id}' ({directive})")]
	MissingBlockConfig {
		/// Marker id found in the fragment.
		marker_id: String,
		/// Directive type on the marker.
		directive: String,
	},

	/// A block marker without a `data-block-id` attribute.
	#[error("block marker <{tag}> has no data-block-id")]
	MarkerWithoutId {
		/// Tag name of the marker element.
		tag: String,
	},

	/// The marker's directive does not match its configuration.
	#[error("marker '{marker_id}' is declared as '{declared}' but configured as '{configured}'")]
	DirectiveMismatch {
		/// Marker id.
		marker_id: String,
		/// Directive on the marker.
		declared: String,
		/// Kind of the stored configuration.
		configured: String,
	},

	/// Unrecognized directive on a marker.
	#[error("unknown block directive '{0}'")]
	UnknownDirective(String),

	/// A binding expression failed to parse.
	#[error("malformed expression `{expression}`: {source}")]
	MalformedExpression {
		/// The expression text.
		expression: String,
		/// Parse failure.
		#[source]
		source: ExprError,
	},

	/// A `{{` without a matching `}}`.
	#[error("unterminated interpolation in `{0}`")]
	UnterminatedInterpolation(String),

	/// A binding path does not resolve in the cloned fragment.
	#[error("binding path {path:?} does not resolve in the template clone")]
	UnresolvedPath {
		/// Child indices from the fragment root.
		path: Vec<usize>,
	},

	/// Template markup could not be parsed.
	#[error("invalid markup at offset {offset}: {message}")]
	Html {
		/// Byte offset into the markup.
		offset: usize,
		/// Failure description.
		message: String,
	},
}

/// Errors raised by lifecycle and context operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LifecycleError {
	/// The frame the call would target has already been sealed.
	#[error("{operation} called with no active lifecycle frame")]
	NoActiveFrame {
		/// `on_mount`, `on_unmount`, or `set_context`.
		operation: &'static str,
	},
}

/// Errors raised while instantiating templates and components.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
	/// Template compilation failed.
	#[error(transparent)]
	Template(#[from] TemplateError),

	/// An expression did not resolve against the context keys.
	#[error("cannot compile `{expression}`: {source}")]
	Expression {
		/// The expression text.
		expression: String,
		/// Resolution failure.
		#[source]
		source: ExprError,
	},

	/// A lifecycle call outside of its frame.
	#[error(transparent)]
	Lifecycle(#[from] LifecycleError),

	/// A component instantiates itself, directly or through descendants.
	#[error("cyclic component reference: {}", chain.join(" -> "))]
	CyclicComponent {
		/// Component names from the outermost ancestor to the repeated one.
		chain: Vec<String>,
	},

	/// A component marker names an unregistered component.
	#[error("unknown component '{0}'")]
	UnknownComponent(String),

	/// `use:name` refers to a context value that is not a function.
	#[error("action '{0}' is not a function in the current context")]
	UnknownAction(String),

	/// `bind:` target did not evaluate to a signal.
	#[error("bind:{property} target `{expression}` is not a signal")]
	BindTargetNotSignal {
		/// Bound property.
		property: String,
		/// Target expression.
		expression: String,
	},

	/// A component setup function failed.
	#[error("component '{component}' setup failed: {message}")]
	Setup {
		/// Component name.
		component: String,
		/// Failure description.
		message: String,
	},

	/// An expression failed while building the initial render.
	#[error("evaluating `{expression}` during instantiation: {source}")]
	Evaluation {
		/// The expression text.
		expression: String,
		/// Evaluation failure.
		#[source]
		source: EvalError,
	},
}

/// Errors raised while loading runtime configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
	/// Reading the configuration file failed.
	#[error("failed to read config file {path}: {source}")]
	Io {
		/// Path that was read.
		path: String,
		/// Underlying I/O error.
		#[source]
		source: std::io::Error,
	},

	/// The TOML document is invalid.
	#[error("invalid runtime config: {0}")]
	Parse(#[from] toml::de::Error),

	/// An environment override has an unparsable value.
	#[error("invalid value '{value}' for {variable}")]
	InvalidEnv {
		/// Variable name.
		variable: String,
		/// Offending value.
		value: String,
	},
}
