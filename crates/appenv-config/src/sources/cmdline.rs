//! Command line argument source.

use crate::source::ValueSource;

/// Key/value pairs parsed from program arguments.
///
/// Accepted forms:
/// - `--key=value`, `-key=value`, `/key=value`
/// - `--key:value`, `-key:value`, `/key:value`
/// - `key=value` without a prefix
/// - `--flag` / `-flag` / `/flag` alone, which sets the key to `true`
///
/// Anything else is kept as a positional argument. A repeated key yields
/// several values; single lookups return the last occurrence.
#[derive(Debug, Clone, Default)]
pub struct CommandLineSource {
    pairs: Vec<(String, String)>,
    positional: Vec<String>,
}

impl CommandLineSource {
    /// Parse the current process arguments, skipping the program name.
    pub fn from_env() -> Self {
        Self::from_args(std::env::args().skip(1))
    }

    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut source = CommandLineSource::default();
        for arg in args {
            let arg = arg.as_ref();
            match parse_arg(arg) {
                Some((key, value)) => source.pairs.push((key.to_string(), value.to_string())),
                None => source.positional.push(arg.to_string()),
            }
        }
        source
    }

    /// Arguments that are not key/value pairs, in order.
    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn parse_arg(arg: &str) -> Option<(&str, &str)> {
    let (prefixed, body) = if let Some(rest) = arg.strip_prefix("--") {
        (true, rest)
    } else if let Some(rest) = arg.strip_prefix(['-', '/']) {
        (true, rest)
    } else {
        (false, arg)
    };

    match body.find(['=', ':']) {
        Some(0) => None,
        Some(at) => Some((&body[..at], &body[at + 1..])),
        None if prefixed && !body.is_empty() => Some((body, "true")),
        None => None,
    }
}

impl ValueSource for CommandLineSource {
    fn description(&self) -> String {
        "command line".to_string()
    }

    fn resolve_one(&self, key: &str) -> Option<String> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn resolve_many(&self, key: &str) -> Option<Vec<String>> {
        let values: Vec<String> = self
            .pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect();
        (!values.is_empty()).then_some(values)
    }
}
