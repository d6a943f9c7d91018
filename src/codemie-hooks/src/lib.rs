//! Hook execution engine for CodeMie agents.
//!
//! Runs externally configured shell commands at agent lifecycle checkpoints
//! and merges their verdicts into a single decision:
//! - Session lifecycle events (SessionStart, SessionEnd)
//! - Tool use events (PreToolUse, PostToolUse), matched by tool name
//! - Stop and SubagentStop
//!
//! # Fail-open
//!
//! A hook that cannot be spawned, times out or prints garbage never blocks
//! the agent. Such hooks degrade to `allow` and are reported through the
//! counters and `errors` of the [`AggregatedResult`]. Enforcing the decision
//! is up to the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use codemie_hooks::{HookExecutionContext, HookExecutor, HooksConfiguration};
//!
//! let config = HooksConfiguration::load_from_file(path).await?;
//! let context = HookExecutionContext::new(session_id, cwd)
//!     .with_agent("claude")
//!     .with_profile("default");
//! let executor = HookExecutor::new(config, context);
//!
//! let result = executor.on_pre_tool_use("Bash", tool_input).await;
//! if result.is_blocking() {
//!     // refuse the tool call using result.reason
//! }
//! ```

pub mod aggregator;
pub mod config;
pub mod context;
pub mod decision;
pub mod executor;
pub mod matcher;
pub mod payload;

pub use aggregator::{DecisionAggregator, DEFAULT_BLOCK_REASON};
pub use config::{HookDefinition, HookKind, HookMatcher, HooksConfiguration};
pub use context::{HookExecutionContext, SessionSource};
pub use decision::{AggregatedResult, Decision, HookExecutionError, HookOutcome, HookResult};
pub use executor::{CacheKey, HookExecutor, DEFAULT_TIMEOUT_SECS};
pub use matcher::{PatternMatcher, PatternValidation};
pub use payload::{EventFields, HookEvent, HookInput};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HookError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid hook configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("Invalid hook configuration in {}: {source}", path.display())]
    InvalidConfiguration {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, HookError>;
