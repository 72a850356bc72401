//! Environment variable source.

use crate::source::ValueSource;

/// Default separator for multi-valued variables (`PATH`-like lists).
pub const DEFAULT_SEPARATOR: char = ';';

/// Reads process environment variables, optionally under a prefix.
///
/// With prefix `APP_`, key `Port` reads variable `APP_Port`. Variables are
/// read on every lookup; nothing is cached.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: char,
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvSource {
    pub fn new() -> Self {
        EnvSource {
            prefix: String::new(),
            separator: DEFAULT_SEPARATOR,
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        EnvSource {
            prefix: prefix.into(),
            ..Self::new()
        }
    }

    /// Separator used by [`ValueSource::resolve_many`].
    pub fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    fn variable(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl ValueSource for EnvSource {
    fn description(&self) -> String {
        if self.prefix.is_empty() {
            "environment".to_string()
        } else {
            format!("environment ({}*)", self.prefix)
        }
    }

    fn resolve_one(&self, key: &str) -> Option<String> {
        if key.is_empty() || key.contains(['=', '\0']) {
            return None;
        }
        std::env::var(self.variable(key)).ok()
    }

    fn resolve_many(&self, key: &str) -> Option<Vec<String>> {
        let value = self.resolve_one(key)?;
        Some(
            value
                .split(self.separator)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}
