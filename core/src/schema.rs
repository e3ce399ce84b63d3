//! Wrapper advisory arguments: the `__wrapper_*` fields injected into every
//! wrapped tool's input schema, split back out of incoming arguments and
//! turned into the policy request's agent context.

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use mcp_types::ToolInputSchema;

use crate::policy_types::AgentContext;

pub const WRAPPER_ARG_PREFIX: &str = "__wrapper_";

pub const WRAPPER_USER_PROMPT: &str = "__wrapper_userPrompt";
pub const WRAPPER_USER_PROMPT_ID: &str = "__wrapper_userPromptId";
pub const WRAPPER_CONTEXT_SUMMARY: &str = "__wrapper_contextSummary";
pub const WRAPPER_MODEL_INTENT: &str = "__wrapper_modelIntent";
pub const WRAPPER_MODEL_PLAN: &str = "__wrapper_modelPlan";
pub const WRAPPER_MODEL_EXPECTED_OUTPUTS: &str = "__wrapper_modelExpectedOutputs";
pub const WRAPPER_CURRENT_FILES: &str = "__wrapper_currentFiles";

/// The six string-valued advisory fields and their schema descriptions.
const STRING_FIELDS: &[(&str, &str)] = &[
    (
        WRAPPER_USER_PROMPT,
        "The user prompt that led to this tool call, verbatim",
    ),
    (
        WRAPPER_USER_PROMPT_ID,
        "Opaque id grouping every tool call caused by one user prompt",
    ),
    (
        WRAPPER_CONTEXT_SUMMARY,
        "Short summary of the conversation context relevant to this call",
    ),
    (
        WRAPPER_MODEL_INTENT,
        "Single-sentence intent of the tool call",
    ),
    (
        WRAPPER_MODEL_PLAN,
        "The model's plan for this and subsequent tool calls",
    ),
    (
        WRAPPER_MODEL_EXPECTED_OUTPUTS,
        "What output the model expects this call to produce",
    ),
];

const CURRENT_FILES_DESCRIPTION: &str = "Workspace files currently relevant to this tool call";

/// Split tool-call arguments into `(wrapper_args, tool_args)` by the
/// `__wrapper_` prefix. Non-object argument values produce two empty maps.
pub fn split_wrapper_arguments(
    arguments: Option<&Value>,
) -> (Map<String, Value>, Map<String, Value>) {
    let mut wrapper_args = Map::new();
    let mut tool_args = Map::new();
    if let Some(Value::Object(map)) = arguments {
        for (key, value) in map {
            if key.starts_with(WRAPPER_ARG_PREFIX) {
                wrapper_args.insert(key.clone(), value.clone());
            } else {
                tool_args.insert(key.clone(), value.clone());
            }
        }
    }
    (wrapper_args, tool_args)
}

fn string_arg(wrapper_args: &Map<String, Value>, key: &str) -> String {
    wrapper_args
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Build the policy `agent_context` from the advisory arguments.
pub fn agent_context_from_wrapper_args(wrapper_args: &Map<String, Value>) -> AgentContext {
    AgentContext {
        last_user_prompt: string_arg(wrapper_args, WRAPPER_USER_PROMPT),
        context_summary: string_arg(wrapper_args, WRAPPER_CONTEXT_SUMMARY),
        user_prompt_id: string_arg(wrapper_args, WRAPPER_USER_PROMPT_ID),
        intent: string_arg(wrapper_args, WRAPPER_MODEL_INTENT),
        plan: string_arg(wrapper_args, WRAPPER_MODEL_PLAN),
        expected_outputs: string_arg(wrapper_args, WRAPPER_MODEL_EXPECTED_OUTPUTS),
    }
}

/// `__wrapper_currentFiles` as a string list, tolerating absence and
/// ill-typed entries.
pub fn current_files_from_wrapper_args(wrapper_args: &Map<String, Value>) -> Vec<String> {
    wrapper_args
        .get(WRAPPER_CURRENT_FILES)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Merge the advisory properties into a tool's input schema.
///
/// Non-destructive and idempotent: existing properties win, `required` is
/// never touched, and re-applying the merge changes nothing.
pub fn merge_input_schema(schema: &ToolInputSchema) -> ToolInputSchema {
    let mut merged = schema.clone();
    let properties = merged.properties.get_or_insert_with(Map::new);

    for (name, description) in STRING_FIELDS {
        if !properties.contains_key(*name) {
            properties.insert(
                (*name).to_string(),
                json!({"type": "string", "description": description}),
            );
        }
    }
    if !properties.contains_key(WRAPPER_CURRENT_FILES) {
        properties.insert(
            WRAPPER_CURRENT_FILES.to_string(),
            json!({
                "type": "array",
                "items": {"type": "string"},
                "description": CURRENT_FILES_DESCRIPTION,
            }),
        );
    }

    merged
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;

    fn base_schema() -> ToolInputSchema {
        serde_json::from_value(json!({
            "type": "object",
            "properties": {"message": {"type": "string"}},
            "required": ["message"]
        }))
        .unwrap()
    }

    #[test]
    fn split_separates_advisory_from_tool_args() {
        let arguments = json!({
            "message": "Hello world",
            "__wrapper_userPrompt": "echo",
            "__wrapper_userPromptId": "p-1",
            "__wrapper_currentFiles": ["src/main.rs"]
        });
        let (wrapper_args, tool_args) = split_wrapper_arguments(Some(&arguments));
        assert_eq!(tool_args.len(), 1);
        assert_eq!(tool_args["message"], "Hello world");
        assert_eq!(wrapper_args.len(), 3);
        assert_eq!(wrapper_args["__wrapper_userPrompt"], "echo");
    }

    #[test]
    fn split_tolerates_missing_and_non_object_arguments() {
        let (w, t) = split_wrapper_arguments(None);
        assert!(w.is_empty() && t.is_empty());
        let (w, t) = split_wrapper_arguments(Some(&json!("not an object")));
        assert!(w.is_empty() && t.is_empty());
    }

    #[test]
    fn agent_context_maps_every_field() {
        let arguments = json!({
            "__wrapper_userPrompt": "do the thing",
            "__wrapper_userPromptId": "p-2",
            "__wrapper_contextSummary": "working on tests",
            "__wrapper_modelIntent": "run one tool",
            "__wrapper_modelPlan": "call echo then stop",
            "__wrapper_modelExpectedOutputs": "echoed text",
        });
        let (wrapper_args, _) = split_wrapper_arguments(Some(&arguments));
        let ctx = agent_context_from_wrapper_args(&wrapper_args);
        assert_eq!(ctx.last_user_prompt, "do the thing");
        assert_eq!(ctx.user_prompt_id, "p-2");
        assert_eq!(ctx.context_summary, "working on tests");
        assert_eq!(ctx.intent, "run one tool");
        assert_eq!(ctx.plan, "call echo then stop");
        assert_eq!(ctx.expected_outputs, "echoed text");
    }

    #[test]
    fn current_files_tolerates_mixed_content() {
        let (wrapper_args, _) = split_wrapper_arguments(Some(&json!({
            "__wrapper_currentFiles": ["a.rs", 42, "b.rs"]
        })));
        assert_eq!(
            current_files_from_wrapper_args(&wrapper_args),
            vec!["a.rs", "b.rs"]
        );
    }

    #[test]
    fn merge_adds_all_seven_fields_and_keeps_existing() {
        let merged = merge_input_schema(&base_schema());
        let properties = merged.properties.as_ref().unwrap();
        assert!(properties.contains_key("message"));
        for field in [
            WRAPPER_USER_PROMPT,
            WRAPPER_USER_PROMPT_ID,
            WRAPPER_CONTEXT_SUMMARY,
            WRAPPER_MODEL_INTENT,
            WRAPPER_MODEL_PLAN,
            WRAPPER_MODEL_EXPECTED_OUTPUTS,
            WRAPPER_CURRENT_FILES,
        ] {
            assert!(properties.contains_key(field), "missing {field}");
        }
        // Wrapper fields are advisory, never required.
        assert_eq!(merged.required, Some(vec!["message".to_string()]));
        assert_eq!(
            properties[WRAPPER_MODEL_INTENT]["description"],
            "Single-sentence intent of the tool call"
        );
        assert_eq!(properties[WRAPPER_CURRENT_FILES]["type"], "array");
    }

    #[test]
    fn merge_is_idempotent() {
        let once = merge_input_schema(&base_schema());
        let twice = merge_input_schema(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_does_not_clobber_colliding_properties() {
        let schema: ToolInputSchema = serde_json::from_value(json!({
            "type": "object",
            "properties": {
                "__wrapper_userPrompt": {"type": "string", "description": "tool's own"}
            }
        }))
        .unwrap();
        let merged = merge_input_schema(&schema);
        assert_eq!(
            merged.properties.unwrap()["__wrapper_userPrompt"]["description"],
            "tool's own"
        );
    }

    #[test]
    fn merge_handles_schema_without_properties() {
        let schema: ToolInputSchema = serde_json::from_value(json!({"type": "object"})).unwrap();
        let merged = merge_input_schema(&schema);
        assert_eq!(merged.properties.unwrap().len(), 7);
        assert_eq!(merged.required, None);
    }
}
