//! Hook events and the input payload passed to hook commands.
//!
//! Every hook process receives the payload twice: as JSON in the
//! `CODEMIE_HOOK_INPUT` environment variable and as JSON on stdin.

use crate::context::HookExecutionContext;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const ENV_SESSION_ID: &str = "CODEMIE_SESSION_ID";
pub const ENV_HOOK_EVENT: &str = "CODEMIE_HOOK_EVENT";
pub const ENV_AGENT_NAME: &str = "CODEMIE_AGENT_NAME";
pub const ENV_PROFILE_NAME: &str = "CODEMIE_PROFILE_NAME";
pub const ENV_HOOK_INPUT: &str = "CODEMIE_HOOK_INPUT";

/// Lifecycle events hooks can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookEvent {
    /// Session started or resumed.
    SessionStart,
    /// Session ended.
    SessionEnd,
    /// Before a tool is used.
    PreToolUse,
    /// After a tool is used.
    PostToolUse,
    /// A user prompt was submitted.
    UserPromptSubmit,
    /// The agent finished responding.
    Stop,
    /// A subagent finished responding.
    SubagentStop,
    /// Before context compaction.
    PreCompact,
    /// System notification.
    Notification,
}

/// Optional, event-specific payload fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventField {
    ToolName,
    ToolInput,
    Source,
    Reason,
    AgentId,
    AgentTranscriptPath,
    StopHookActive,
}

impl HookEvent {
    pub const ALL: [HookEvent; 9] = [
        HookEvent::SessionStart,
        HookEvent::SessionEnd,
        HookEvent::PreToolUse,
        HookEvent::PostToolUse,
        HookEvent::UserPromptSubmit,
        HookEvent::Stop,
        HookEvent::SubagentStop,
        HookEvent::PreCompact,
        HookEvent::Notification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::SessionStart => "SessionStart",
            HookEvent::SessionEnd => "SessionEnd",
            HookEvent::PreToolUse => "PreToolUse",
            HookEvent::PostToolUse => "PostToolUse",
            HookEvent::UserPromptSubmit => "UserPromptSubmit",
            HookEvent::Stop => "Stop",
            HookEvent::SubagentStop => "SubagentStop",
            HookEvent::PreCompact => "PreCompact",
            HookEvent::Notification => "Notification",
        }
    }

    /// Events whose subject is a tool name.
    pub fn is_tool_scoped(&self) -> bool {
        matches!(self, HookEvent::PreToolUse | HookEvent::PostToolUse)
    }

    /// Whether this event carries the given optional field.
    pub fn defines(&self, field: EventField) -> bool {
        use EventField::*;
        match self {
            HookEvent::PreToolUse | HookEvent::PostToolUse => {
                matches!(field, ToolName | ToolInput)
            }
            HookEvent::SessionStart => matches!(field, Source),
            HookEvent::SessionEnd => matches!(field, Reason),
            HookEvent::Stop => matches!(field, StopHookActive),
            HookEvent::SubagentStop => {
                matches!(field, AgentId | AgentTranscriptPath | StopHookActive)
            }
            HookEvent::UserPromptSubmit | HookEvent::PreCompact | HookEvent::Notification => {
                false
            }
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookEvent::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown hook event: {}", s))
    }
}

/// Event data supplied by the caller alongside the event name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFields {
    pub tool_name: Option<String>,
    pub tool_input: Option<serde_json::Value>,
    pub source: Option<String>,
    pub reason: Option<String>,
    pub agent_id: Option<String>,
    pub agent_transcript_path: Option<String>,
    pub stop_hook_active: Option<bool>,
}

impl EventFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, name: impl Into<String>, input: serde_json::Value) -> Self {
        self.tool_name = Some(name.into());
        self.tool_input = Some(input);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_agent(
        mut self,
        agent_id: impl Into<String>,
        transcript_path: impl Into<String>,
    ) -> Self {
        self.agent_id = Some(agent_id.into());
        self.agent_transcript_path = Some(transcript_path.into());
        self
    }

    pub fn with_stop_hook_active(mut self, active: bool) -> Self {
        self.stop_hook_active = Some(active);
        self
    }

    /// Drop fields the event does not define. Unknown events keep everything.
    fn restrict_to(mut self, event: Option<HookEvent>) -> Self {
        let Some(event) = event else {
            return self;
        };
        if !event.defines(EventField::ToolName) {
            self.tool_name = None;
        }
        if !event.defines(EventField::ToolInput) {
            self.tool_input = None;
        }
        if !event.defines(EventField::Source) {
            self.source = None;
        }
        if !event.defines(EventField::Reason) {
            self.reason = None;
        }
        if !event.defines(EventField::AgentId) {
            self.agent_id = None;
        }
        if !event.defines(EventField::AgentTranscriptPath) {
            self.agent_transcript_path = None;
        }
        if !event.defines(EventField::StopHookActive) {
            self.stop_hook_active = None;
        }
        self
    }
}

/// JSON document describing the event to a hook command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookInput {
    pub session_id: String,
    pub transcript_path: String,
    pub permission_mode: String,
    pub hook_event_name: String,
    pub cwd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_transcript_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_hook_active: Option<bool>,
}

impl HookInput {
    pub fn new(event_name: &str, context: &HookExecutionContext, fields: EventFields) -> Self {
        let fields = fields.restrict_to(event_name.parse().ok());
        Self {
            session_id: context.session_id.clone(),
            transcript_path: context.transcript_path.to_string_lossy().to_string(),
            permission_mode: context.permission_mode.clone(),
            hook_event_name: event_name.to_string(),
            cwd: context.working_dir.to_string_lossy().to_string(),
            tool_name: fields.tool_name,
            tool_input: fields.tool_input,
            source: fields.source,
            reason: fields.reason,
            agent_id: fields.agent_id,
            agent_transcript_path: fields.agent_transcript_path,
            stop_hook_active: fields.stop_hook_active,
        }
    }

    pub fn to_json(&self) -> String {
        // Only strings, bools and already-valid JSON values; cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Environment variables set on the hook process.
    pub fn as_env(&self, context: &HookExecutionContext) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert(ENV_SESSION_ID.to_string(), context.session_id.clone());
        env.insert(ENV_HOOK_EVENT.to_string(), self.hook_event_name.clone());
        env.insert(ENV_AGENT_NAME.to_string(), context.agent_name.clone());
        env.insert(ENV_PROFILE_NAME.to_string(), context.profile_name.clone());
        env.insert(ENV_HOOK_INPUT.to_string(), self.to_json());
        env
    }
}
