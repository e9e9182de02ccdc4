//! Runtime configuration.
//!
//! Supports TOML documents and environment variable overrides.
//!
//! ```toml
//! trace_templates = true
//! log_evaluation_errors = true
//!
//! [each]
//! warn_duplicate_keys = false
//!
//! [cache]
//! expression_warn_threshold = 10000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Environment variable overriding [`RuntimeConfig::trace_templates`].
pub const ENV_TRACE_TEMPLATES: &str = "GRAPPELLI_TRACE_TEMPLATES";

/// Environment variable overriding [`EachSettings::warn_duplicate_keys`].
pub const ENV_WARN_DUPLICATE_KEYS: &str = "GRAPPELLI_WARN_DUPLICATE_KEYS";

/// Configuration for one application root.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
	/// Log template compilation and instantiation at debug level
	pub trace_templates: bool,

	/// Log expressions that fail at update time
	pub log_evaluation_errors: bool,

	/// Each-block settings
	pub each: EachSettings,

	/// Expression cache settings
	pub cache: CacheSettings,
}

impl Default for RuntimeConfig {
	fn default() -> Self {
		Self {
			trace_templates: false,
			log_evaluation_errors: true,
			each: EachSettings::default(),
			cache: CacheSettings::default(),
		}
	}
}

/// Each-block settings.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EachSettings {
	/// Warn when a source collection yields the same key twice
	pub warn_duplicate_keys: bool,
}

impl Default for EachSettings {
	fn default() -> Self {
		Self {
			warn_duplicate_keys: true,
		}
	}
}

/// Expression cache settings.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
	/// Entry count above which a one-time growth warning is logged
	pub expression_warn_threshold: usize,
}

impl Default for CacheSettings {
	fn default() -> Self {
		Self {
			expression_warn_threshold: 4096,
		}
	}
}

impl RuntimeConfig {
	/// Load configuration from a TOML file.
	///
	/// # Errors
	///
	/// Returns error if file cannot be read or parsed.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
			path: path.as_ref().display().to_string(),
			source: e,
		})?;

		Self::from_toml_str(&content)
	}

	/// Parse configuration from a TOML string.
	pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(content)?)
	}

	/// Apply overrides from the process environment.
	pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
		self.with_overrides_from(|name| std::env::var(name).ok())
	}

	/// Apply overrides from an arbitrary variable lookup.
	///
	/// Accepted boolean spellings are `1/0`, `true/false`, `yes/no`, `on/off`.
	pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(value) = lookup(ENV_TRACE_TEMPLATES) {
			self.trace_templates = parse_flag(ENV_TRACE_TEMPLATES, &value)?;
		}
		if let Some(value) = lookup(ENV_WARN_DUPLICATE_KEYS) {
			self.each.warn_duplicate_keys = parse_flag(ENV_WARN_DUPLICATE_KEYS, &value)?;
		}
		Ok(self)
	}

	/// Builder-style setter for `trace_templates`.
	pub fn trace_templates(mut self, enabled: bool) -> Self {
		self.trace_templates = enabled;
		self
	}

	/// Builder-style setter for `each.warn_duplicate_keys`.
	pub fn warn_duplicate_keys(mut self, enabled: bool) -> Self {
		self.each.warn_duplicate_keys = enabled;
		self
	}
}

fn parse_flag(variable: &str, value: &str) -> Result<bool, ConfigError> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(ConfigError::InvalidEnv {
			variable: variable.to_string(),
			value: value.to_string(),
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::io::Write;

	#[rstest]
	fn test_defaults() {
		let config = RuntimeConfig::default();
		assert!(!config.trace_templates);
		assert!(config.log_evaluation_errors);
		assert!(config.each.warn_duplicate_keys);
		assert_eq!(config.cache.expression_warn_threshold, 4096);
	}

	#[rstest]
	fn test_partial_toml_keeps_defaults() {
		let config = RuntimeConfig::from_toml_str(
			r#"
			trace_templates = true

			[cache]
			expression_warn_threshold = 10
			"#,
		)
		.unwrap();

		assert!(config.trace_templates);
		assert!(config.each.warn_duplicate_keys);
		assert_eq!(config.cache.expression_warn_threshold, 10);
	}

	#[rstest]
	fn test_invalid_toml() {
		let result = RuntimeConfig::from_toml_str("trace_templates = \"maybe\"");
		assert!(matches!(result, Err(ConfigError::Parse(_))));
	}

	#[rstest]
	fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[each]\nwarn_duplicate_keys = false").unwrap();

		let config = RuntimeConfig::from_file(file.path()).unwrap();
		assert!(!config.each.warn_duplicate_keys);
	}

	#[rstest]
	fn test_missing_file() {
		let result = RuntimeConfig::from_file("/nonexistent/grappelli.toml");
		assert!(matches!(result, Err(ConfigError::Io { .. })));
	}

	#[rstest]
	#[case("1", true)]
	#[case("off", false)]
	#[case("Yes", true)]
	fn test_env_override(#[case] raw: &str, #[case] expected: bool) {
		let config = RuntimeConfig::default()
			.with_overrides_from(|name| (name == ENV_TRACE_TEMPLATES).then(|| raw.to_string()))
			.unwrap();
		assert_eq!(config.trace_templates, expected);
	}

	#[rstest]
	fn test_env_override_rejects_garbage() {
		let result = RuntimeConfig::default()
			.with_overrides_from(|name| (name == ENV_WARN_DUPLICATE_KEYS).then(|| "sometimes".to_string()));
		assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
	}
}
