//! Hook verdicts and their aggregated form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Verdict rendered by a hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Let the action proceed.
    #[default]
    Allow,
    /// Refuse the action.
    Deny,
    /// Stop the action with an error shown to the agent.
    Block,
    /// Explicitly approve the action.
    Approve,
}

impl Decision {
    /// Parse a decision string. Anything unrecognised is `Allow`.
    pub fn parse_lenient(value: &str) -> Decision {
        match value {
            "deny" => Decision::Deny,
            "block" => Decision::Block,
            "approve" => Decision::Approve,
            _ => Decision::Allow,
        }
    }

    /// Merge priority; higher wins.
    pub fn priority(&self) -> u8 {
        match self {
            Decision::Block => 3,
            Decision::Deny => 2,
            Decision::Approve => 1,
            Decision::Allow => 0,
        }
    }

    /// Returns true if the decision stops the action.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Decision::Block | Decision::Deny)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
            Decision::Block => "block",
            Decision::Approve => "approve",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized verdict of a single hook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResult {
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppress_output: Option<bool>,
}

impl HookResult {
    pub fn allow() -> Self {
        Self::default()
    }

    pub fn with_decision(decision: Decision) -> Self {
        Self {
            decision,
            ..Self::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = Some(context.into());
        self
    }

    pub fn with_updated_input(mut self, input: Map<String, Value>) -> Self {
        self.updated_input = Some(input);
        self
    }

    pub fn with_suppress_output(mut self, suppress: bool) -> Self {
        self.suppress_output = Some(suppress);
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.decision.is_blocking()
    }
}

/// Why a hook produced no verdict at all.
#[derive(Debug, Error)]
pub enum HookExecutionError {
    /// Failed to spawn the command.
    #[error("Failed to spawn hook command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// Hook command timed out.
    #[error("Hook `{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },
    /// Failed while waiting for the command's output.
    #[error("I/O error running hook `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// The task running the hook panicked or was cancelled.
    #[error("Hook task for `{command}` did not complete: {message}")]
    Join { command: String, message: String },
}

/// Settled state of one hook: a verdict, or the reason there is none.
pub type HookOutcome = std::result::Result<HookResult, HookExecutionError>;

/// Merged verdict of every hook run for one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppress_output: Option<bool>,
    pub hooks_executed: usize,
    pub hooks_succeeded: usize,
    pub hooks_failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl AggregatedResult {
    /// Result for an event with no applicable hooks.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_blocking(&self) -> bool {
        self.decision.is_blocking()
    }
}
