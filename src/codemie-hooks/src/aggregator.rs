//! Turning raw hook output into verdicts, and merging verdicts.
//!
//! Exit code contract:
//!
//! | exit | meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | success; stdout may carry a JSON decision            |
//! | 2    | blocking error; stderr is the reason                 |
//! | else | non-blocking failure; logged and treated as `allow`  |

use crate::decision::{AggregatedResult, Decision, HookOutcome, HookResult};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Reason used when a hook exits with 2 and prints nothing to stderr.
pub const DEFAULT_BLOCK_REASON: &str = "Hook returned blocking error (exit code 2)";

const BLOCKING_EXIT_CODE: i32 = 2;

/// Parses and merges hook verdicts.
pub struct DecisionAggregator;

impl DecisionAggregator {
    /// Interpret one hook's output.
    pub fn parse(stdout: &str, stderr: &str, exit_code: i32) -> HookResult {
        if exit_code == BLOCKING_EXIT_CODE {
            let stderr = stderr.trim();
            let reason = if stderr.is_empty() {
                DEFAULT_BLOCK_REASON.to_string()
            } else {
                stderr.to_string()
            };
            return HookResult::with_decision(Decision::Block).with_reason(reason);
        }

        if exit_code != 0 {
            warn!("Hook exited with code {}: {}", exit_code, stderr.trim());
            return HookResult::allow().with_reason(format!(
                "Hook failed with exit code {} (continuing): {}",
                exit_code,
                stderr.trim()
            ));
        }

        let stdout = stdout.trim();
        if stdout.is_empty() {
            return HookResult::allow();
        }

        match serde_json::from_str::<Value>(stdout) {
            Ok(value @ Value::Object(_)) => Self::validate_result(value),
            _ => {
                debug!("Hook stdout is not a JSON object, treating as context");
                HookResult::allow().with_context(stdout)
            }
        }
    }

    /// Normalize a decoded JSON verdict, dropping fields of the wrong type.
    pub fn validate_result(candidate: Value) -> HookResult {
        let Value::Object(mut fields) = candidate else {
            return HookResult::allow();
        };

        let decision = fields
            .get("decision")
            .and_then(Value::as_str)
            .map(Decision::parse_lenient)
            .unwrap_or_default();

        HookResult {
            decision,
            reason: take_string(&mut fields, "reason"),
            additional_context: take_string(&mut fields, "additionalContext"),
            updated_input: match fields.remove("updatedInput") {
                Some(Value::Object(input)) => Some(input),
                _ => None,
            },
            suppress_output: fields.get("suppressOutput").and_then(Value::as_bool),
        }
    }

    /// Merge settled hook outcomes into a single result.
    ///
    /// The highest-priority decision wins (`block` > `deny` > `approve` >
    /// `allow`) and carries the reason of the first result at that level.
    /// Failed outcomes count as executed and failed but never influence the
    /// decision.
    pub fn merge(outcomes: Vec<HookOutcome>) -> AggregatedResult {
        let mut aggregated = AggregatedResult::empty();
        let mut winner: Option<(Decision, Option<String>)> = None;
        let mut contexts: Vec<String> = Vec::new();
        let mut updated_input: Option<Map<String, Value>> = None;

        for outcome in outcomes {
            aggregated.hooks_executed += 1;

            let result = match outcome {
                Ok(result) => result,
                Err(e) => {
                    aggregated.hooks_failed += 1;
                    aggregated.errors.push(e.to_string());
                    continue;
                }
            };
            aggregated.hooks_succeeded += 1;

            let replaces = match &winner {
                Some((current, _)) => result.decision.priority() > current.priority(),
                None => true,
            };
            if replaces {
                winner = Some((result.decision, result.reason.clone()));
            }

            if let Some(context) = result.additional_context.filter(|c| !c.is_empty()) {
                contexts.push(context);
            }

            if let Some(input) = result.updated_input {
                updated_input.get_or_insert_with(Map::new).extend(input);
            }

            if result.suppress_output == Some(true) {
                aggregated.suppress_output = Some(true);
            }
        }

        if let Some((decision, reason)) = winner {
            aggregated.decision = decision;
            aggregated.reason = reason;
        }
        if !contexts.is_empty() {
            aggregated.additional_context = Some(contexts.join("\n\n"));
        }
        aggregated.updated_input = updated_input;

        aggregated
    }

    pub fn is_blocking(result: &HookResult) -> bool {
        result.decision.is_blocking()
    }

    pub fn is_aggregated_blocking(result: &AggregatedResult) -> bool {
        result.decision.is_blocking()
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::HookExecutionError;
    use serde_json::json;

    fn ok(decision: Decision) -> HookOutcome {
        Ok(HookResult::with_decision(decision))
    }

    fn failed(command: &str) -> HookOutcome {
        Err(HookExecutionError::Spawn {
            command: command.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        })
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_parse_empty_success() {
        assert_eq!(DecisionAggregator::parse("", "", 0), HookResult::allow());
        assert_eq!(DecisionAggregator::parse("  \n", "", 0), HookResult::allow());
    }

    #[test]
    fn test_parse_exit_two_uses_stderr() {
        let result = DecisionAggregator::parse("", "err", 2);
        assert_eq!(result.decision, Decision::Block);
        assert_eq!(result.reason.as_deref(), Some("err"));

        let result = DecisionAggregator::parse("ignored", "  dangerous command\n", 2);
        assert_eq!(result.reason.as_deref(), Some("dangerous command"));
    }

    #[test]
    fn test_parse_exit_two_default_reason() {
        let result = DecisionAggregator::parse("", "", 2);
        assert_eq!(result.decision, Decision::Block);
        assert_eq!(result.reason.as_deref(), Some(DEFAULT_BLOCK_REASON));
    }

    #[test]
    fn test_parse_other_exit_codes_allow() {
        let result = DecisionAggregator::parse("", "boom", 1);
        assert_eq!(result.decision, Decision::Allow);
        let reason = result.reason.unwrap();
        assert!(reason.contains("exit code 1"));
        assert!(reason.contains("boom"));

        let result = DecisionAggregator::parse(r#"{"decision":"block"}"#, "", 127);
        assert_eq!(result.decision, Decision::Allow);
    }

    #[test]
    fn test_parse_plain_text_is_context() {
        let result = DecisionAggregator::parse("not json", "", 0);
        assert_eq!(result.decision, Decision::Allow);
        assert_eq!(result.additional_context.as_deref(), Some("not json"));

        // JSON that is not an object is still just text.
        let result = DecisionAggregator::parse("[1, 2]", "", 0);
        assert_eq!(result.additional_context.as_deref(), Some("[1, 2]"));
    }

    #[test]
    fn test_parse_json_decision() {
        let stdout = r#"{"decision": "deny", "reason": "protected path", "suppressOutput": true}"#;
        let result = DecisionAggregator::parse(stdout, "", 0);
        assert_eq!(result.decision, Decision::Deny);
        assert_eq!(result.reason.as_deref(), Some("protected path"));
        assert_eq!(result.suppress_output, Some(true));
    }

    #[test]
    fn test_validate_result_drops_bad_fields() {
        let result = DecisionAggregator::validate_result(json!({
            "decision": "explode",
            "reason": 42,
            "additionalContext": "ctx",
            "updatedInput": [1, 2],
            "suppressOutput": "yes"
        }));
        assert_eq!(result, HookResult::allow().with_context("ctx"));
    }

    #[test]
    fn test_validate_result_keeps_good_fields() {
        let result = DecisionAggregator::validate_result(json!({
            "decision": "approve",
            "reason": "trusted",
            "updatedInput": {"command": "ls -la"},
            "suppressOutput": false
        }));
        assert_eq!(result.decision, Decision::Approve);
        assert_eq!(result.reason.as_deref(), Some("trusted"));
        assert_eq!(result.updated_input, Some(object(json!({"command": "ls -la"}))));
        assert_eq!(result.suppress_output, Some(false));
    }

    #[test]
    fn test_validate_result_missing_decision() {
        let result = DecisionAggregator::validate_result(json!({}));
        assert_eq!(result.decision, Decision::Allow);
        assert_eq!(DecisionAggregator::validate_result(json!("deny")), HookResult::allow());
    }

    #[test]
    fn test_merge_priority_is_order_independent() {
        let permutations = [
            [Decision::Allow, Decision::Block, Decision::Deny],
            [Decision::Allow, Decision::Deny, Decision::Block],
            [Decision::Block, Decision::Allow, Decision::Deny],
            [Decision::Block, Decision::Deny, Decision::Allow],
            [Decision::Deny, Decision::Allow, Decision::Block],
            [Decision::Deny, Decision::Block, Decision::Allow],
        ];
        for perm in permutations {
            let merged = DecisionAggregator::merge(perm.iter().map(|d| ok(*d)).collect());
            assert_eq!(merged.decision, Decision::Block, "{:?}", perm);
            assert_eq!(merged.hooks_executed, 3);
            assert_eq!(merged.hooks_succeeded, 3);
        }
    }

    #[test]
    fn test_merge_approve_beats_allow() {
        let merged = DecisionAggregator::merge(vec![ok(Decision::Allow), ok(Decision::Approve)]);
        assert_eq!(merged.decision, Decision::Approve);
    }

    #[test]
    fn test_merge_reason_from_first_at_winning_level() {
        let merged = DecisionAggregator::merge(vec![
            Ok(HookResult::allow().with_reason("fine")),
            Ok(HookResult::with_decision(Decision::Deny).with_reason("first deny")),
            Ok(HookResult::with_decision(Decision::Deny).with_reason("second deny")),
        ]);
        assert_eq!(merged.decision, Decision::Deny);
        assert_eq!(merged.reason.as_deref(), Some("first deny"));
    }

    #[test]
    fn test_merge_joins_context() {
        let merged = DecisionAggregator::merge(vec![
            Ok(HookResult::allow().with_context("A")),
            Ok(HookResult::with_decision(Decision::Block)),
            Ok(HookResult::allow().with_context("")),
            Ok(HookResult::with_decision(Decision::Deny).with_context("B")),
        ]);
        assert_eq!(merged.additional_context.as_deref(), Some("A\n\nB"));
    }

    #[test]
    fn test_merge_updated_input_later_wins() {
        let merged = DecisionAggregator::merge(vec![
            Ok(HookResult::allow().with_updated_input(object(json!({"a": 1})))),
            Ok(HookResult::allow().with_updated_input(object(json!({"b": 2, "a": 3})))),
        ]);
        assert_eq!(merged.updated_input, Some(object(json!({"a": 3, "b": 2}))));
    }

    #[test]
    fn test_merge_all_failed_is_allow() {
        let merged = DecisionAggregator::merge(vec![failed("missing-a"), failed("missing-b")]);
        assert_eq!(merged.decision, Decision::Allow);
        assert_eq!(merged.hooks_executed, 2);
        assert_eq!(merged.hooks_succeeded, 0);
        assert_eq!(merged.hooks_failed, 2);
        assert_eq!(merged.errors.len(), 2);
        assert!(merged.errors[0].contains("missing-a"));
    }

    #[test]
    fn test_merge_mixed_failures_do_not_block() {
        let merged = DecisionAggregator::merge(vec![failed("x"), ok(Decision::Approve)]);
        assert_eq!(merged.decision, Decision::Approve);
        assert_eq!(merged.hooks_executed, 2);
        assert_eq!(merged.hooks_succeeded, 1);
        assert_eq!(merged.hooks_failed, 1);
    }

    #[test]
    fn test_merge_suppress_output() {
        let merged = DecisionAggregator::merge(vec![
            Ok(HookResult::allow().with_suppress_output(false)),
            Ok(HookResult::allow().with_suppress_output(true)),
        ]);
        assert_eq!(merged.suppress_output, Some(true));

        let merged = DecisionAggregator::merge(vec![ok(Decision::Allow)]);
        assert_eq!(merged.suppress_output, None);
    }

    #[test]
    fn test_merge_empty() {
        assert_eq!(DecisionAggregator::merge(vec![]), AggregatedResult::empty());
    }

    #[test]
    fn test_blocking_helpers() {
        assert!(DecisionAggregator::is_blocking(&HookResult::with_decision(Decision::Deny)));
        assert!(!DecisionAggregator::is_blocking(&HookResult::allow()));

        let merged = DecisionAggregator::merge(vec![ok(Decision::Block)]);
        assert!(DecisionAggregator::is_aggregated_blocking(&merged));
        let merged = DecisionAggregator::merge(vec![ok(Decision::Approve)]);
        assert!(!DecisionAggregator::is_aggregated_blocking(&merged));
    }
}
