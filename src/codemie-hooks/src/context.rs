//! Per-session execution context handed to every hook.

use std::path::{Path, PathBuf};

/// Permission mode reported when none is configured.
pub const DEFAULT_PERMISSION_MODE: &str = "default";

/// Supplies the identity of the running agent session.
///
/// Implemented by whatever owns session state (credentials store, session
/// manager, test fixture). The executor never reaches for global state; the
/// context is built from a source once and then frozen.
pub trait SessionSource: Send + Sync {
    fn session_id(&self) -> String;
    fn transcript_path(&self) -> PathBuf;
    fn agent_name(&self) -> String;
    fn profile_name(&self) -> String;

    fn permission_mode(&self) -> String {
        DEFAULT_PERMISSION_MODE.to_string()
    }
}

/// Immutable context shared by all hooks of one agent session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookExecutionContext {
    /// Agent session identifier.
    pub session_id: String,
    /// Working directory hooks run in.
    pub working_dir: PathBuf,
    /// Path of the session transcript.
    pub transcript_path: PathBuf,
    /// Permission mode of the session (`default`, `plan`, ...).
    pub permission_mode: String,
    /// Name of the agent being governed.
    pub agent_name: String,
    /// Active profile name.
    pub profile_name: String,
}

impl HookExecutionContext {
    pub fn new(session_id: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            session_id: session_id.into(),
            working_dir: working_dir.into(),
            transcript_path: PathBuf::new(),
            permission_mode: DEFAULT_PERMISSION_MODE.to_string(),
            agent_name: String::new(),
            profile_name: String::new(),
        }
    }

    /// Build a context from an injected session source.
    pub fn from_source(source: &dyn SessionSource, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            session_id: source.session_id(),
            working_dir: working_dir.into(),
            transcript_path: source.transcript_path(),
            permission_mode: source.permission_mode(),
            agent_name: source.agent_name(),
            profile_name: source.profile_name(),
        }
    }

    pub fn with_transcript(mut self, path: impl Into<PathBuf>) -> Self {
        self.transcript_path = path.into();
        self
    }

    pub fn with_permission_mode(mut self, mode: impl Into<String>) -> Self {
        self.permission_mode = mode.into();
        self
    }

    pub fn with_agent(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = agent_name.into();
        self
    }

    pub fn with_profile(mut self, profile_name: impl Into<String>) -> Self {
        self.profile_name = profile_name.into();
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSession;

    impl SessionSource for FixedSession {
        fn session_id(&self) -> String {
            "sess-42".to_string()
        }
        fn transcript_path(&self) -> PathBuf {
            PathBuf::from("/tmp/sess-42.jsonl")
        }
        fn agent_name(&self) -> String {
            "claude".to_string()
        }
        fn profile_name(&self) -> String {
            "work".to_string()
        }
    }

    #[test]
    fn test_builder_defaults() {
        let ctx = HookExecutionContext::new("s1", "/project");
        assert_eq!(ctx.session_id, "s1");
        assert_eq!(ctx.working_dir(), Path::new("/project"));
        assert_eq!(ctx.permission_mode, "default");
        assert!(ctx.agent_name.is_empty());
    }

    #[test]
    fn test_builder_chain() {
        let ctx = HookExecutionContext::new("s1", "/project")
            .with_transcript("/tmp/t.jsonl")
            .with_permission_mode("plan")
            .with_agent("claude")
            .with_profile("default");
        assert_eq!(ctx.transcript_path, PathBuf::from("/tmp/t.jsonl"));
        assert_eq!(ctx.permission_mode, "plan");
        assert_eq!(ctx.agent_name, "claude");
        assert_eq!(ctx.profile_name, "default");
    }

    #[test]
    fn test_from_source() {
        let ctx = HookExecutionContext::from_source(&FixedSession, "/work");
        assert_eq!(ctx.session_id, "sess-42");
        assert_eq!(ctx.transcript_path, PathBuf::from("/tmp/sess-42.jsonl"));
        assert_eq!(ctx.permission_mode, DEFAULT_PERMISSION_MODE);
        assert_eq!(ctx.agent_name, "claude");
        assert_eq!(ctx.profile_name, "work");
        assert_eq!(ctx.working_dir, PathBuf::from("/work"));
    }
}
