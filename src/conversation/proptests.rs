//! Property-based tests for the conversation store
//!
//! These tests verify key invariants hold across arbitrary operation sequences.

use super::*;
use proptest::prelude::*;
use std::collections::HashMap;

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// Operations the controller can apply, minus `reset` which starts over
#[derive(Debug, Clone)]
enum Op {
    User(String),
    BeginAssistant,
    Append(String),
    System(String),
    BeginTool(String),
    Result { id: String, is_error: bool },
    Clear,
}

fn arb_id() -> impl Strategy<Value = String> {
    prop_oneof![Just("t1"), Just("t2"), Just("t3"), Just("ghost")].prop_map(String::from)
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[a-z ]{0,10}".prop_map(Op::User),
        Just(Op::BeginAssistant),
        "[a-zA-Z ]{0,10}".prop_map(Op::Append),
        "[a-z ]{0,10}".prop_map(Op::System),
        arb_id().prop_map(Op::BeginTool),
        (arb_id(), any::<bool>()).prop_map(|(id, is_error)| Op::Result { id, is_error }),
        Just(Op::Clear),
    ]
}

/// Apply an op, returning whether it is one of the ops allowed to add messages
fn apply(conv: &mut Conversation, op: Op) -> bool {
    match op {
        Op::User(text) => {
            conv.append_user_message(text);
            true
        }
        Op::BeginAssistant => {
            conv.begin_assistant_message();
            true
        }
        Op::Append(text) => {
            conv.append_to_last(&text);
            false
        }
        Op::System(text) => {
            conv.append_system_message(format!("Error: {text}"));
            true
        }
        Op::BeginTool(id) => {
            let _ = conv.begin_tool_call(id, "tool", "{}");
            false
        }
        Op::Result { id, is_error } => {
            let result = if is_error {
                ToolResult::error(id, "failed")
            } else {
                ToolResult::success(id, "ok")
            };
            let _ = conv.record_tool_result(result);
            true
        }
        Op::Clear => {
            conv.clear_active_tool_calls();
            false
        }
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Message count never decreases, and only grows through appending ops
    #[test]
    fn prop_append_monotonicity(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let mut conv = Conversation::new();
        for op in ops {
            let before = conv.messages().len();
            let may_grow = apply(&mut conv, op.clone());
            let after = conv.messages().len();
            prop_assert!(after >= before, "count shrank on {:?}", op);
            if !may_grow {
                prop_assert_eq!(after, before, "{:?} added a message", op);
            }
        }
    }

    // Earlier messages never change once a newer one exists
    #[test]
    fn prop_history_prefix_is_immutable(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let mut conv = Conversation::new();
        for op in ops {
            let before = conv.messages().to_vec();
            apply(&mut conv, op);
            let frozen = before.len().saturating_sub(1);
            prop_assert_eq!(&conv.messages()[..frozen], &before[..frozen]);
        }
    }

    // Content is the concatenation of the chunks regardless of boundaries
    #[test]
    fn prop_content_accumulation(chunks in proptest::collection::vec("[a-zA-Z0-9 ]{0,8}", 0..20)) {
        let mut conv = Conversation::new();
        conv.begin_assistant_message();
        for chunk in &chunks {
            conv.append_to_last(chunk);
        }
        prop_assert_eq!(conv.messages().len(), 1);
        prop_assert_eq!(&conv.last_message().unwrap().content, &chunks.concat());
    }

    // Observed status of every tool call only moves forward
    #[test]
    fn prop_tool_status_monotonicity(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let mut conv = Conversation::new();
        let mut seen: HashMap<String, ToolStatus> = HashMap::new();

        for op in ops {
            let cleared = matches!(op, Op::Clear);
            apply(&mut conv, op);
            if cleared {
                // Calls leave the active set; a reused id is a new call
                seen.clear();
                continue;
            }
            for (id, call) in conv.active_tool_calls() {
                if let Some(previous) = seen.get(id) {
                    prop_assert!(
                        *previous == call.status || previous.can_advance_to(call.status),
                        "{} regressed from {:?} to {:?}", id, previous, call.status
                    );
                }
                seen.insert(id.clone(), call.status);
            }
        }
    }

    // A result matching neither an active call nor the last message changes nothing
    #[test]
    fn prop_unmatched_result_is_inert(
        ops in proptest::collection::vec(arb_op(), 0..30),
        content in "[a-z]{0,10}",
        is_error in any::<bool>()
    ) {
        let mut conv = Conversation::new();
        for op in ops {
            apply(&mut conv, op);
        }

        let ghost = "never-announced";
        let before = conv.clone();
        let result = ToolResult { tool_call_id: ghost.to_string(), content, is_error };
        let outcome = conv.record_tool_result(result);

        prop_assert_eq!(outcome, Ok(ResultOutcome::Unmatched));
        prop_assert_eq!(conv, before);
    }

    // Active ids stay unique no matter how often they are announced
    #[test]
    fn prop_active_ids_unique(ids in proptest::collection::vec(arb_id(), 0..20)) {
        let mut conv = Conversation::new();
        conv.begin_assistant_message();
        let mut accepted = 0usize;
        for id in &ids {
            if conv.begin_tool_call(id.clone(), "tool", "{}").is_ok() {
                accepted += 1;
            }
        }
        prop_assert_eq!(conv.active_tool_calls().len(), accepted);
        let refs = &conv.last_message().unwrap().tool_calls;
        prop_assert_eq!(refs.len(), accepted);
    }
}
