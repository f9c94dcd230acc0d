//! Built-in prompts for conversational question answering.

use crate::types::PromptDefinition;

/// Rephrases a follow-up question into a standalone question.
pub const CONDENSE_PROMPT_ID: &str = "qa.condense";

/// Answers a question from retrieved code passages.
pub const ANSWER_PROMPT_ID: &str = "qa.answer";

const CONDENSE_TEMPLATE: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question.

Chat History:
{{chat_history}}
Follow Up Input: {{question}}
Standalone question:";

const ANSWER_TEMPLATE: &str = "Use the following excerpts from building and accessibility codes \
to answer the question at the end.
If you don't know the answer, just say you don't know. Do not try to make up an answer.
If the question is not related to the excerpts, politely respond that you can only answer \
questions about the selected codes.

{{context}}

Question: {{question}}
Helpful answer in markdown:";

/// All built-in prompt IDs.
pub const BUILTIN_IDS: [&str; 2] = [CONDENSE_PROMPT_ID, ANSWER_PROMPT_ID];

/// Look up a built-in prompt by ID.
pub fn builtin(id: &str) -> Option<PromptDefinition> {
    match id {
        CONDENSE_PROMPT_ID => Some(PromptDefinition {
            id: CONDENSE_PROMPT_ID.to_string(),
            title: "Condense follow-up question".to_string(),
            api_version: "1.0".to_string(),
            system: None,
            temperature: Some(0.0),
            template: CONDENSE_TEMPLATE.to_string(),
        }),
        ANSWER_PROMPT_ID => Some(PromptDefinition {
            id: ANSWER_PROMPT_ID.to_string(),
            title: "Answer from code excerpts".to_string(),
            api_version: "1.0".to_string(),
            system: Some(
                "You are a helpful assistant for architects, builders and inspectors.".to_string(),
            ),
            temperature: Some(0.0),
            template: ANSWER_TEMPLATE.to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ids_resolve() {
        for id in BUILTIN_IDS {
            let def = builtin(id).unwrap();
            assert_eq!(def.id, id);
            assert!(!def.template.is_empty());
        }
        assert!(builtin("qa.unknown").is_none());
    }

    #[test]
    fn test_templates_reference_expected_variables() {
        let condense = builtin(CONDENSE_PROMPT_ID).unwrap();
        assert!(condense.template.contains("{{chat_history}}"));
        assert!(condense.template.contains("{{question}}"));

        let answer = builtin(ANSWER_PROMPT_ID).unwrap();
        assert!(answer.template.contains("{{context}}"));
        assert!(answer.template.contains("{{question}}"));
    }
}
