//! Hook executor for running hooks.

use crate::aggregator::DecisionAggregator;
use crate::config::{HookDefinition, HooksConfiguration};
use crate::context::HookExecutionContext;
use crate::decision::{AggregatedResult, HookExecutionError, HookOutcome};
use crate::payload::{EventFields, HookEvent, HookInput};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Timeout applied to hooks that do not configure one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Key under which an aggregated result is cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub event: String,
    pub subject: Option<String>,
}

impl CacheKey {
    pub fn new(event: &str, subject: Option<&str>) -> Self {
        Self {
            event: event.to_string(),
            subject: subject.map(str::to_string),
        }
    }
}

/// Shell used to interpret hook command lines.
#[derive(Debug, Clone)]
struct Shell {
    program: String,
    flag: String,
}

impl Default for Shell {
    fn default() -> Self {
        #[cfg(windows)]
        let (program, flag) = ("cmd", "/C");
        #[cfg(not(windows))]
        let (program, flag) = ("sh", "-c");

        Self {
            program: program.to_string(),
            flag: flag.to_string(),
        }
    }
}

/// Everything a spawned hook task needs, detached from the executor.
struct Invocation {
    hook: HookDefinition,
    shell: Shell,
    cwd: PathBuf,
    env: Arc<HashMap<String, String>>,
    payload: Arc<String>,
    timeout: Duration,
}

/// Executor for running hooks.
///
/// Results are cached per `(event, subject)` for the lifetime of the
/// executor; call [`HookExecutor::clear_cache`] to run hooks again.
pub struct HookExecutor {
    /// Hook configuration for the active profile.
    config: HooksConfiguration,
    /// Session context passed to every hook.
    context: HookExecutionContext,
    /// Default timeout in seconds.
    default_timeout: u64,
    shell: Shell,
    /// Aggregated results by event and subject.
    cache: RwLock<HashMap<CacheKey, AggregatedResult>>,
}

impl HookExecutor {
    pub fn new(config: HooksConfiguration, context: HookExecutionContext) -> Self {
        Self {
            config,
            context,
            default_timeout: DEFAULT_TIMEOUT_SECS,
            shell: Shell::default(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.default_timeout = secs;
        self
    }

    /// Use a different shell, e.g. `("bash", "-c")`.
    pub fn with_shell(mut self, program: impl Into<String>, flag: impl Into<String>) -> Self {
        self.shell = Shell {
            program: program.into(),
            flag: flag.into(),
        };
        self
    }

    pub fn context(&self) -> &HookExecutionContext {
        &self.context
    }

    pub fn config(&self) -> &HooksConfiguration {
        &self.config
    }

    /// Discard all cached results.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    /// Keys that currently have a cached result.
    pub async fn cached_keys(&self) -> Vec<CacheKey> {
        self.cache.read().await.keys().cloned().collect()
    }

    /// Hooks that apply to an event, deduplicated, in config order.
    pub fn applicable_hooks(&self, event_name: &str, subject: Option<&str>) -> Vec<HookDefinition> {
        let hooks: IndexSet<&HookDefinition> = self
            .config
            .entries_for(event_name)
            .iter()
            .filter(|entry| entry.applies_to(subject))
            .flat_map(|entry| entry.hooks.iter())
            .collect();

        hooks.into_iter().cloned().collect()
    }

    /// Run hooks for an event with no event-specific fields.
    pub async fn execute_event(&self, event_name: &str, subject: Option<&str>) -> AggregatedResult {
        self.execute_event_with(event_name, subject, EventFields::default())
            .await
    }

    /// Run every applicable hook for an event and merge their verdicts.
    ///
    /// Never fails: hooks that cannot be run are recorded in
    /// [`AggregatedResult::errors`] and do not affect the decision.
    pub async fn execute_event_with(
        &self,
        event_name: &str,
        subject: Option<&str>,
        mut fields: EventFields,
    ) -> AggregatedResult {
        let hooks = self.applicable_hooks(event_name, subject);
        if hooks.is_empty() {
            debug!("No hooks configured for {} ({:?})", event_name, subject);
            return AggregatedResult::empty();
        }

        let key = CacheKey::new(event_name, subject);
        if let Some(cached) = self.cache.read().await.get(&key) {
            debug!("Using cached hook result for {} ({:?})", event_name, subject);
            return cached.clone();
        }

        let tool_scoped = event_name
            .parse::<HookEvent>()
            .map(|e| e.is_tool_scoped())
            .unwrap_or(false);
        if tool_scoped && fields.tool_name.is_none() {
            fields.tool_name = subject.map(str::to_string);
        }

        let input = HookInput::new(event_name, &self.context, fields);
        let env = Arc::new(input.as_env(&self.context));
        let payload = Arc::new(input.to_json());

        debug!("Running {} hook(s) for {}", hooks.len(), event_name);
        let start = Instant::now();

        let spawned: Vec<_> = hooks
            .into_iter()
            .map(|hook| {
                let command = hook.command.clone();
                let invocation = Invocation {
                    timeout: Duration::from_secs(hook.timeout.unwrap_or(self.default_timeout)),
                    hook,
                    shell: self.shell.clone(),
                    cwd: self.context.working_dir.clone(),
                    env: env.clone(),
                    payload: payload.clone(),
                };
                (command, tokio::spawn(Self::run_hook(invocation)))
            })
            .collect();

        let (commands, handles): (Vec<String>, Vec<_>) = spawned.into_iter().unzip();
        let outcomes: Vec<HookOutcome> = futures::future::join_all(handles)
            .await
            .into_iter()
            .zip(commands)
            .map(|(joined, command)| {
                joined.unwrap_or_else(|e| {
                    Err(HookExecutionError::Join {
                        command,
                        message: e.to_string(),
                    })
                })
            })
            .collect();

        let aggregated = DecisionAggregator::merge(outcomes);
        info!(
            "Hooks for {} finished in {}ms: decision={} executed={} succeeded={} failed={}",
            event_name,
            start.elapsed().as_millis(),
            aggregated.decision,
            aggregated.hooks_executed,
            aggregated.hooks_succeeded,
            aggregated.hooks_failed
        );

        self.cache.write().await.insert(key, aggregated.clone());
        aggregated
    }

    /// Run PreToolUse hooks for a tool call.
    pub async fn on_pre_tool_use(
        &self,
        tool_name: &str,
        tool_input: serde_json::Value,
    ) -> AggregatedResult {
        let fields = EventFields::new().with_tool(tool_name, tool_input);
        self.execute_event_with(HookEvent::PreToolUse.as_str(), Some(tool_name), fields)
            .await
    }

    /// Run PostToolUse hooks for a tool call.
    pub async fn on_post_tool_use(
        &self,
        tool_name: &str,
        tool_input: serde_json::Value,
    ) -> AggregatedResult {
        let fields = EventFields::new().with_tool(tool_name, tool_input);
        self.execute_event_with(HookEvent::PostToolUse.as_str(), Some(tool_name), fields)
            .await
    }

    /// Run session start hooks. `source` is e.g. `startup` or `resume`.
    pub async fn on_session_start(&self, source: &str) -> AggregatedResult {
        let fields = EventFields::new().with_source(source);
        self.execute_event_with(HookEvent::SessionStart.as_str(), None, fields)
            .await
    }

    /// Run session end hooks.
    pub async fn on_session_end(&self, reason: &str) -> AggregatedResult {
        let fields = EventFields::new().with_reason(reason);
        self.execute_event_with(HookEvent::SessionEnd.as_str(), None, fields)
            .await
    }

    /// Run stop hooks.
    pub async fn on_stop(&self, stop_hook_active: bool) -> AggregatedResult {
        let fields = EventFields::new().with_stop_hook_active(stop_hook_active);
        self.execute_event_with(HookEvent::Stop.as_str(), None, fields)
            .await
    }

    /// Run subagent stop hooks.
    pub async fn on_subagent_stop(
        &self,
        agent_id: &str,
        agent_transcript_path: &str,
        stop_hook_active: bool,
    ) -> AggregatedResult {
        let fields = EventFields::new()
            .with_agent(agent_id, agent_transcript_path)
            .with_stop_hook_active(stop_hook_active);
        self.execute_event_with(HookEvent::SubagentStop.as_str(), None, fields)
            .await
    }

    /// Run user prompt submit hooks.
    pub async fn on_user_prompt_submit(&self) -> AggregatedResult {
        self.execute_event(HookEvent::UserPromptSubmit.as_str(), None)
            .await
    }

    /// Run one hook to completion or timeout.
    async fn run_hook(invocation: Invocation) -> HookOutcome {
        let Invocation {
            hook,
            shell,
            cwd,
            env,
            payload,
            timeout,
        } = invocation;
        let start = Instant::now();

        debug!("Executing hook: {}", hook.command);

        let mut command = Command::new(&shell.program);
        command
            .arg(&shell.flag)
            .arg(&hook.command)
            .current_dir(&cwd)
            .envs(env.iter())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| {
            error!("Failed to spawn hook {}: {}", hook.command, source);
            HookExecutionError::Spawn {
                command: hook.command.clone(),
                source,
            }
        })?;

        // Hooks may ignore stdin entirely, so a broken pipe is not an error.
        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                let _ = stdin.write_all(payload.as_bytes()).await;
            });
        }

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                error!("Hook {} execution error: {}", hook.command, source);
                return Err(HookExecutionError::Io {
                    command: hook.command,
                    source,
                });
            }
            Err(_) => {
                error!("Hook {} timed out after {}s", hook.command, timeout.as_secs());
                return Err(HookExecutionError::Timeout {
                    command: hook.command,
                    secs: timeout.as_secs(),
                });
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        if exit_code == 0 {
            info!("Hook {} completed successfully in {}ms", hook.command, duration_ms);
        } else {
            warn!(
                "Hook {} exited with code {} in {}ms",
                hook.command, exit_code, duration_ms
            );
        }

        Ok(DecisionAggregator::parse(&stdout, &stderr, exit_code))
    }
}
