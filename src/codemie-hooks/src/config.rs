//! Hook configuration loading and management.
//!
//! The on-disk shape follows the Claude Code settings format:
//!
//! ```json
//! {
//!   "hooks": {
//!     "PreToolUse": [
//!       { "matcher": "Bash", "hooks": [{ "type": "command", "command": "./guard.sh", "timeout": 10 }] }
//!     ]
//!   }
//! }
//! ```
//!
//! The `hooks` wrapper is optional; a bare event map is accepted too.

use crate::matcher::PatternMatcher;
use crate::{HookError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kind of hook. Only shell commands are supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    #[default]
    Command,
}

/// A single hook command from config.
///
/// Two definitions with the same kind, command and timeout are the same hook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HookDefinition {
    /// Hook kind (`"command"`).
    #[serde(rename = "type", default)]
    pub kind: HookKind,
    /// Shell command line to run.
    pub command: String,
    /// Timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl HookDefinition {
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            kind: HookKind::Command,
            command: command.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }
}

/// A matcher and the hooks it guards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookMatcher {
    /// Pattern tested against the event subject. `None` applies always.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    /// Hooks to run when the matcher applies.
    #[serde(default)]
    pub hooks: Vec<HookDefinition>,
}

impl HookMatcher {
    pub fn new(hooks: Vec<HookDefinition>) -> Self {
        Self {
            matcher: None,
            hooks,
        }
    }

    pub fn with_matcher(mut self, matcher: impl Into<String>) -> Self {
        self.matcher = Some(matcher.into());
        self
    }

    /// Pattern used for matching, `*` when none is configured.
    pub fn pattern(&self) -> &str {
        self.matcher.as_deref().unwrap_or("*")
    }

    /// Whether this entry applies to an event with the given subject.
    ///
    /// Events without a subject are matched unconditionally.
    pub fn applies_to(&self, subject: Option<&str>) -> bool {
        match subject {
            Some(subject) => PatternMatcher::matches(self.pattern(), subject),
            None => true,
        }
    }
}

/// Hook configuration: event name to ordered matcher entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HooksConfiguration {
    events: IndexMap<String, Vec<HookMatcher>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigDocument {
    Wrapped { hooks: HooksConfiguration },
    Bare(HooksConfiguration),
}

impl HooksConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a matcher entry for an event.
    pub fn with_entry(mut self, event: impl Into<String>, entry: HookMatcher) -> Self {
        self.events.entry(event.into()).or_default().push(entry);
        self
    }

    /// Parse from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let document: ConfigDocument = serde_json::from_str(content)?;
        Ok(match document {
            ConfigDocument::Wrapped { hooks } => hooks,
            ConfigDocument::Bare(config) => config,
        })
    }

    /// Load from a JSON file.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&content).map_err(|e| match e {
            HookError::Config(source) => HookError::InvalidConfiguration {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Matcher entries configured for an event, in config order.
    pub fn entries_for(&self, event: &str) -> &[HookMatcher] {
        self.events.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Configured event names, in config order.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.events.values().all(|entries| entries.is_empty())
    }

    /// Merge with another config (other's entries are appended).
    pub fn merge(&mut self, other: HooksConfiguration) {
        for (event, entries) in other.events {
            self.events.entry(event).or_default().extend(entries);
        }
    }

    /// Collect warnings for matchers and hook definitions that look wrong.
    ///
    /// Nothing here is fatal; an invalid matcher still matches its own spelling.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (event, entries) in &self.events {
            for (i, entry) in entries.iter().enumerate() {
                if let Some(ref matcher) = entry.matcher {
                    let validation = PatternMatcher::validate(matcher);
                    for warning in validation.warnings {
                        warnings.push(format!("{}[{}] matcher {:?}: {}", event, i, matcher, warning));
                    }
                }

                if entry.hooks.is_empty() {
                    warnings.push(format!("{}[{}]: no hooks configured", event, i));
                }

                for hook in &entry.hooks {
                    if hook.command.trim().is_empty() {
                        warnings.push(format!("{}[{}]: hook has empty command", event, i));
                    }
                    if hook.timeout == Some(0) {
                        warnings.push(format!(
                            "{}[{}]: hook {:?} has a zero timeout",
                            event, i, hook.command
                        ));
                    }
                }
            }
        }

        warnings
    }
}
