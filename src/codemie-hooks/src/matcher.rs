//! Matcher patterns for selecting hooks.
//!
//! A matcher decides whether a configured hook entry applies to an event
//! subject (usually a tool name). Three forms are supported:
//!
//! - `*` matches everything
//! - a plain word such as `Bash` is compared literally and case-sensitively
//! - anything containing a regex metacharacter (`Edit|Write`, `mcp__.*`) is
//!   compiled as a regular expression that must match the whole subject
//!
//! Invalid regular expressions never fail a match. They fall back to a
//! literal comparison so a typo in a config file only ever narrows a hook to
//! its own spelling.

use std::collections::HashMap;

use parking_lot::Mutex;
use regex::Regex;

/// Characters that switch a pattern from literal to regex matching.
const REGEX_METACHARACTERS: &[char] = &[
    '.', '^', '$', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|', '\\',
];

lazy_static::lazy_static! {
    /// Compiled regexes keyed by source pattern. `None` records a pattern that
    /// failed to compile so it is not retried on every event.
    static ref REGEX_CACHE: Mutex<HashMap<String, Option<Regex>>> = Mutex::new(HashMap::new());
}

/// Outcome of [`PatternMatcher::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternValidation {
    /// Whether the pattern can be used as a matcher.
    pub valid: bool,
    /// Non-fatal remarks about the pattern.
    pub warnings: Vec<String>,
}

/// Stateless matcher for hook patterns.
pub struct PatternMatcher;

impl PatternMatcher {
    /// Returns true if `pattern` applies to `subject`.
    pub fn matches(pattern: &str, subject: &str) -> bool {
        if pattern == "*" {
            return true;
        }

        if Self::is_literal(pattern) {
            return pattern == subject;
        }

        match Self::compiled(pattern) {
            Some(re) => re.is_match(subject),
            None => pattern == subject,
        }
    }

    /// Returns every pattern that matches `subject`, in input order.
    pub fn find_matches<'a, S: AsRef<str>>(patterns: &'a [S], subject: &str) -> Vec<&'a str> {
        patterns
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| Self::matches(p, subject))
            .collect()
    }

    /// Check a pattern for problems without matching anything.
    pub fn validate(pattern: &str) -> PatternValidation {
        let mut warnings = Vec::new();

        if pattern.is_empty() {
            return PatternValidation {
                valid: false,
                warnings: vec!["Pattern cannot be empty".to_string()],
            };
        }

        if pattern.trim() != pattern {
            warnings.push(
                "Pattern has leading or trailing whitespace, which is matched literally"
                    .to_string(),
            );
        }

        let mut valid = true;
        if pattern != "*" && Self::has_regex_metacharacters(pattern) {
            if let Err(e) = Regex::new(&anchor(pattern)) {
                valid = false;
                warnings.push(format!("Invalid regular expression: {}", e));
            } else if has_unescaped_dot(pattern) && has_other_metacharacters(pattern) {
                warnings.push(
                    "Pattern contains '.', which matches any character; escape it as '\\.' for a literal dot"
                        .to_string(),
                );
            }
        }

        PatternValidation { valid, warnings }
    }

    /// True when the pattern contains at least one regex metacharacter.
    pub fn has_regex_metacharacters(pattern: &str) -> bool {
        pattern.contains(REGEX_METACHARACTERS)
    }

    /// True when the pattern is compared as a plain string.
    pub fn is_literal(pattern: &str) -> bool {
        !Self::has_regex_metacharacters(pattern)
    }

    fn compiled(pattern: &str) -> Option<Regex> {
        let mut cache = REGEX_CACHE.lock();
        cache
            .entry(pattern.to_string())
            .or_insert_with(|| Regex::new(&anchor(pattern)).ok())
            .clone()
    }
}

/// Wrap a pattern so it must match the entire subject.
fn anchor(pattern: &str) -> String {
    format!("^(?:{})$", pattern)
}

fn has_unescaped_dot(pattern: &str) -> bool {
    let mut escaped = false;
    for c in pattern.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '.' => return true,
            _ => {}
        }
    }
    false
}

fn has_other_metacharacters(pattern: &str) -> bool {
    pattern
        .chars()
        .any(|c| c != '.' && REGEX_METACHARACTERS.contains(&c))
}
