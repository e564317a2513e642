//! Reference expansion for leaf values.
//!
//! A reference is text enclosed by two occurrences of the delimiter
//! (`%db/host%`). References prefixed with the environment prefix
//! (`%env.HOME%`) are looked up in the environment; all others are resolved
//! as paths and expanded recursively before being substituted.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::trace;

use crate::domain::error::{DomainError, DomainResult};

pub const DEFAULT_DELIMITER: char = '%';
pub const DEFAULT_ENV_PREFIX: &str = "env.";
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Lookup boundary used while expanding references.
pub trait ReferenceResolver {
    /// Raw value at `path`, `None` when the path matches zero or several nodes.
    fn resolve_path(&self, path: &str) -> DomainResult<Option<String>>;

    /// Environment or system property value.
    fn resolve_env(&self, name: &str) -> Option<String>;
}

/// Expands delimited references in text values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expander {
    delimiter: char,
    env_prefix: String,
    max_depth: usize,
}

impl Default for Expander {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER, DEFAULT_ENV_PREFIX, DEFAULT_MAX_DEPTH)
    }
}

impl Expander {
    pub fn new(delimiter: char, env_prefix: impl Into<String>, max_depth: usize) -> Self {
        Self {
            delimiter,
            env_prefix: env_prefix.into(),
            max_depth,
        }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    /// Fully expand `raw`, resolving every reference.
    pub fn expand(&self, raw: &str, resolver: &dyn ReferenceResolver) -> DomainResult<String> {
        self.expand_value(raw, resolver, &mut Vec::new())
    }

    /// Look up `path` and fully expand its value.
    ///
    /// The path itself counts as the first link of the reference chain, so a
    /// value referring back to its own path is reported as cyclic.
    pub fn expand_path(&self, path: &str, resolver: &dyn ReferenceResolver) -> DomainResult<String> {
        self.expand_reference_path(path, resolver, &mut Vec::new())
    }

    /// Expand only environment references, leaving path references in place.
    ///
    /// Used at load time, before the merged tree exists.
    pub fn expand_env_only<F>(&self, raw: &str, lookup: F) -> DomainResult<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let spans = self.spans(raw)?;
        let mut result = raw.to_string();
        for &(start, end) in spans.iter().rev() {
            let reference = self.reference_at(raw, start, end);
            if let Some(name) = reference.strip_prefix(self.env_prefix.as_str()) {
                let replacement = lookup(name).ok_or_else(|| DomainError::missing(reference))?;
                result.replace_range(start..end + self.delimiter.len_utf8(), &replacement);
            }
        }
        Ok(result)
    }

    /// Byte offsets of each (opening, closing) delimiter pair, left to right.
    fn spans(&self, raw: &str) -> DomainResult<Vec<(usize, usize)>> {
        let positions: Vec<usize> = raw.match_indices(self.delimiter).map(|(i, _)| i).collect();
        if positions.len() % 2 != 0 {
            return Err(DomainError::malformed(
                raw,
                format!("unmatched delimiter '{}'", self.delimiter),
            ));
        }
        Ok(positions.chunks(2).map(|pair| (pair[0], pair[1])).collect())
    }

    fn reference_at<'r>(&self, raw: &'r str, start: usize, end: usize) -> &'r str {
        &raw[start + self.delimiter.len_utf8()..end]
    }

    fn expand_value(
        &self,
        raw: &str,
        resolver: &dyn ReferenceResolver,
        chain: &mut Vec<String>,
    ) -> DomainResult<String> {
        let spans = self.spans(raw)?;
        if spans.is_empty() {
            return Ok(raw.to_string());
        }

        // Right to left keeps the offsets of the remaining spans valid.
        let mut result = raw.to_string();
        for &(start, end) in spans.iter().rev() {
            let reference = self.reference_at(raw, start, end);
            let replacement = match reference.strip_prefix(self.env_prefix.as_str()) {
                Some(name) => resolver
                    .resolve_env(name)
                    .ok_or_else(|| DomainError::missing(reference))?,
                None => self.expand_reference_path(reference, resolver, chain)?,
            };
            trace!("expand: {} -> {}", reference, replacement);
            result.replace_range(start..end + self.delimiter.len_utf8(), &replacement);
        }
        Ok(result)
    }

    fn expand_reference_path(
        &self,
        path: &str,
        resolver: &dyn ReferenceResolver,
        chain: &mut Vec<String>,
    ) -> DomainResult<String> {
        if chain.iter().any(|p| p == path) || chain.len() >= self.max_depth {
            let mut cycle = chain.clone();
            cycle.push(path.to_string());
            return Err(DomainError::CyclicReference { chain: cycle });
        }

        let raw = resolver
            .resolve_path(path)?
            .ok_or_else(|| DomainError::missing(path))?;

        chain.push(path.to_string());
        let expanded = self.expand_value(&raw, resolver, chain);
        chain.pop();
        expanded
    }
}

/// Tokens of a message pattern: an escaped apostrophe, a quoted literal
/// span (closed by `'` or the end of the pattern), or a numbered placeholder.
fn message_token() -> &'static Regex {
    static MESSAGE_TOKEN: OnceLock<Regex> = OnceLock::new();
    MESSAGE_TOKEN.get_or_init(|| {
        Regex::new(r"''|'((?:[^']|'')*)(?:'|$)|\{(\d+)\}").expect("valid message pattern")
    })
}

/// Fill numbered placeholders (`{0}`, `{1}`, ...) from `args`.
///
/// Apostrophes quote: `''` is a literal `'`, and text between single quotes
/// is copied without its quotes and never treated as a placeholder.
/// Placeholders without a matching argument are left untouched. Without any
/// args the pattern is returned as is.
pub fn format_message<S: AsRef<str>>(pattern: &str, args: &[S]) -> String {
    if args.is_empty() {
        return pattern.to_string();
    }
    message_token()
        .replace_all(pattern, |caps: &Captures| {
            if let Some(quoted) = caps.get(1) {
                return quoted.as_str().replace("''", "'");
            }
            match caps.get(2) {
                Some(index) => index
                    .as_str()
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| args.get(i))
                    .map(|a| a.as_ref().to_string())
                    .unwrap_or_else(|| caps[0].to_string()),
                None => "'".to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapResolver {
        paths: HashMap<&'static str, &'static str>,
        env: HashMap<&'static str, &'static str>,
    }

    impl MapResolver {
        fn new(paths: &[(&'static str, &'static str)]) -> Self {
            Self {
                paths: paths.iter().copied().collect(),
                env: HashMap::new(),
            }
        }

        fn with_env(mut self, key: &'static str, value: &'static str) -> Self {
            self.env.insert(key, value);
            self
        }
    }

    impl ReferenceResolver for MapResolver {
        fn resolve_path(&self, path: &str) -> DomainResult<Option<String>> {
            if path.starts_with('/') {
                return Err(DomainError::InvalidPath { path: path.into() });
            }
            Ok(self.paths.get(path).map(|v| v.to_string()))
        }

        fn resolve_env(&self, name: &str) -> Option<String> {
            self.env.get(name).map(|v| v.to_string())
        }
    }

    #[test]
    fn given_no_delimiters_when_expanding_then_unchanged() {
        let resolver = MapResolver::new(&[]);
        let result = Expander::default().expand("plain value", &resolver).unwrap();
        assert_eq!(result, "plain value");
    }

    #[test]
    fn given_nested_references_when_expanding_then_resolved_transitively() {
        let resolver = MapResolver::new(&[("a", "%b%"), ("b", "<%c%>"), ("c", "X")]);
        let result = Expander::default().expand_path("a", &resolver).unwrap();
        assert_eq!(result, "<X>");
    }

    #[test]
    fn given_several_references_when_expanding_then_all_replaced() {
        let resolver = MapResolver::new(&[("db/host", "localhost"), ("db/port", "5432")]);
        let result = Expander::default()
            .expand("jdbc://%db/host%:%db/port%/app", &resolver)
            .unwrap();
        assert_eq!(result, "jdbc://localhost:5432/app");
    }

    #[test]
    fn given_env_reference_when_expanding_then_uses_environment() {
        let resolver = MapResolver::new(&[]).with_env("FOO", "bar");
        let result = Expander::default().expand("x-%env.FOO%", &resolver).unwrap();
        assert_eq!(result, "x-bar");
    }

    #[test]
    fn given_missing_env_when_expanding_then_missing_reference() {
        let resolver = MapResolver::new(&[]);
        let err = Expander::default().expand("%env.FOO%", &resolver).unwrap_err();
        assert_eq!(err, DomainError::missing("env.FOO"));
    }

    #[test]
    fn given_odd_delimiters_when_expanding_then_malformed() {
        let resolver = MapResolver::new(&[("a", "1")]);
        let err = Expander::default().expand("%a", &resolver).unwrap_err();
        assert!(matches!(err, DomainError::MalformedValue { .. }));
    }

    #[test]
    fn given_cycle_when_expanding_then_cyclic_reference() {
        let resolver = MapResolver::new(&[("a", "%b%"), ("b", "%a%")]);
        let err = Expander::default().expand_path("a", &resolver).unwrap_err();
        assert_eq!(
            err,
            DomainError::CyclicReference {
                chain: vec!["a".into(), "b".into(), "a".into()]
            }
        );
    }

    #[test]
    fn given_repeated_reference_in_one_value_when_expanding_then_not_cyclic() {
        let resolver = MapResolver::new(&[("a", "%b%-%b%"), ("b", "x")]);
        let result = Expander::default().expand_path("a", &resolver).unwrap();
        assert_eq!(result, "x-x");
    }

    #[test]
    fn given_chain_deeper_than_limit_when_expanding_then_fails() {
        let resolver = MapResolver::new(&[("a", "%b%"), ("b", "%c%"), ("c", "end")]);
        let expander = Expander::new('%', "env.", 2);
        let err = expander.expand_path("a", &resolver).unwrap_err();
        assert!(matches!(err, DomainError::CyclicReference { .. }));
    }

    #[test]
    fn given_custom_delimiter_when_expanding_then_used() {
        let resolver = MapResolver::new(&[("name", "world")]);
        let expander = Expander::new('$', "sys.", DEFAULT_MAX_DEPTH);
        assert_eq!(expander.expand("100% $name$", &resolver).unwrap(), "100% world");
    }

    #[test]
    fn given_path_reference_when_env_only_then_left_in_place() {
        let expander = Expander::default();
        let result = expander
            .expand_env_only("%env.USER%@%db/host%", |name| {
                (name == "USER").then(|| "alice".to_string())
            })
            .unwrap();
        assert_eq!(result, "alice@%db/host%");
    }

    #[test]
    fn given_args_when_formatting_then_placeholders_filled() {
        assert_eq!(
            format_message("{0} and {1}", &["Monday", "April"]),
            "Monday and April"
        );
        assert_eq!(format_message("{0} {2}", &["a"]), "a {2}");
        assert_eq!(format_message("{0}", &[] as &[&str]), "{0}");
    }

    #[test]
    fn given_doubled_apostrophe_when_formatting_then_single_apostrophe() {
        assert_eq!(format_message("It''s {0}", &["Monday"]), "It's Monday");
    }

    #[test]
    fn given_quoted_placeholder_when_formatting_then_kept_literal() {
        assert_eq!(format_message("'{0}' is {0}", &["x"]), "{0} is x");
        assert_eq!(format_message("'It''s' {0}", &["x"]), "It's x");
    }

    #[test]
    fn given_unpaired_brace_in_quotes_when_formatting_then_copied() {
        assert_eq!(format_message("'{' {0} '}'", &["x"]), "{ x }");
        assert_eq!(format_message("{0} 'rest {1}", &["x", "y"]), "x rest {1}");
    }
}
