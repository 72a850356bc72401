//! `%name%` placeholder detection and expansion.
//!
//! A placeholder is `%` followed by one or more of `[A-Za-z0-9_.-]` and a
//! closing `%`. There is no escaping. Names are looked up exactly as written,
//! but a resolved name replaces every spelling of its placeholder: resolving
//! `home` replaces `%home%`, `%HOME%` and `%Home%` alike.

use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%([A-Za-z0-9_.\-]+)%").unwrap());

/// Distinct placeholder names in `text`, left to right.
pub fn placeholder_names(text: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(text) {
        if let Some(name) = caps.get(1).map(|m| m.as_str()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// True when `text` contains at least one placeholder.
pub fn has_placeholders(text: &str) -> bool {
    PLACEHOLDER.is_match(text)
}

/// Replace every case-insensitive occurrence of `%name%` with `replacement`.
///
/// The replacement is inserted literally and is not scanned again.
pub fn replace_placeholder(text: &str, name: &str, replacement: &str) -> String {
    let token = format!("%{}%", name);
    let needle = token.as_bytes();
    let haystack = text.as_bytes();

    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;
    // The token is ASCII, so every match starts and ends on a char boundary.
    while i + needle.len() <= haystack.len() {
        if haystack[i..i + needle.len()].eq_ignore_ascii_case(needle) {
            out.push_str(&text[copied..i]);
            out.push_str(replacement);
            i += needle.len();
            copied = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&text[copied..]);
    out
}

/// Names being expanded along the current resolution path.
///
/// Each recursion level pushes one link onto the caller's stack frame, so
/// the guard lives exactly as long as the lookup that created it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpansionChain<'a> {
    link: Option<(&'a str, &'a ExpansionChain<'a>)>,
}

impl<'a> ExpansionChain<'a> {
    /// Empty chain for a top-level lookup.
    pub fn root() -> Self {
        ExpansionChain { link: None }
    }

    /// Chain extended by `name`.
    pub fn push<'b>(&'b self, name: &'b str) -> ExpansionChain<'b>
    where
        'a: 'b,
    {
        ExpansionChain {
            link: Some((name, self)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }

    /// Names from innermost to outermost.
    pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        let mut cursor = self.link;
        std::iter::from_fn(move || {
            let (name, parent) = cursor?;
            cursor = parent.link;
            Some(name)
        })
    }
}

/// Expand the placeholders of `text`.
///
/// For each distinct name not already on `chain`, `lookup` is called with
/// the name and the chain extended by it. A `Some` result replaces all
/// occurrences of that placeholder; `None` leaves them verbatim. Names on
/// the chain are skipped, which breaks reference cycles.
pub fn expand<F>(text: &str, chain: &ExpansionChain<'_>, mut lookup: F) -> String
where
    F: FnMut(&str, &ExpansionChain<'_>) -> Option<String>,
{
    let mut expanded = text.to_string();
    for name in placeholder_names(text) {
        if chain.contains(name) {
            continue;
        }
        let nested = chain.push(name);
        if let Some(value) = lookup(name, &nested) {
            expanded = replace_placeholder(&expanded, name, &value);
        }
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn expand_with(text: &str, values: &HashMap<&str, &str>) -> String {
        fn go(text: &str, chain: &ExpansionChain<'_>, values: &HashMap<&str, &str>) -> String {
            expand(text, chain, |name, nested| {
                values.get(name).map(|raw| go(raw, nested, values))
            })
        }
        go(text, &ExpansionChain::root(), values)
    }

    #[test]
    fn test_names_are_distinct_and_ordered() {
        assert_eq!(placeholder_names("%B%-%a%-%B%-%A%"), vec!["B", "a", "A"]);
        assert_eq!(placeholder_names("%x.y-z_1%"), vec!["x.y-z_1"]);
        assert!(placeholder_names("100% sure").is_empty());
        assert!(placeholder_names("%%").is_empty());
        assert!(placeholder_names("%a b%").is_empty());
    }

    #[test]
    fn test_adjacent_placeholders() {
        assert_eq!(placeholder_names("%A%%B%"), vec!["A", "B"]);
        assert_eq!(placeholder_names("%A%B%"), vec!["A"]);
    }

    #[test]
    fn test_replace_is_case_insensitive_and_literal() {
        assert_eq!(replace_placeholder("%Home%/x/%HOME%", "home", "$1"), "$1/x/$1");
        assert_eq!(replace_placeholder("ä%k%ö", "K", "v"), "ävö");
        assert_eq!(replace_placeholder("%kk%", "k", "v"), "%kk%");
    }

    #[test]
    fn test_dot_in_name_is_literal() {
        assert_eq!(replace_placeholder("%a.b% %axb%", "a.b", "v"), "v %axb%");
    }

    #[test]
    fn test_expand_nested() {
        let values = HashMap::from([("A", "x"), ("B", "%A%y"), ("C", "%B%-%A%")]);
        assert_eq!(expand_with("%C%", &values), "xy-x");
    }

    #[test]
    fn test_unresolved_left_verbatim() {
        let values = HashMap::from([("A", "x")]);
        assert_eq!(expand_with("%A%-%missing%", &values), "x-%missing%");
    }

    #[test]
    fn test_cycle_terminates() {
        let values = HashMap::from([("A", "%B%"), ("B", "%A%")]);
        assert_eq!(expand_with("%A%", &values), "%A%");
        let values = HashMap::from([("A", "%a%")]);
        assert_eq!(expand_with("%A%", &values), "%a%");
    }

    #[test]
    fn test_spellings_are_distinct_names() {
        let values = HashMap::from([("a", "v")]);
        assert_eq!(expand_with("%A%-%a%", &values), "v-v");
        let values = HashMap::from([("A", "%a%"), ("a", "v")]);
        assert_eq!(expand_with("%A%", &values), "v");
    }

    #[test]
    fn test_chain() {
        let root = ExpansionChain::root();
        let a = root.push("A");
        let b = a.push("b");
        assert!(b.contains("A"));
        assert!(b.contains("b"));
        assert!(!b.contains("a"));
        assert!(!a.contains("b"));
        assert_eq!(b.names().collect::<Vec<_>>(), vec!["b", "A"]);
        assert_eq!(root.names().count(), 0);
    }
}
