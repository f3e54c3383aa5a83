//! # Default Prompt Templates
//!
//! The answer prompt sent to the local model. It can be overridden through the
//! `llm.prompt_template` configuration key.

/// The default template for answering a question from retrieved context.
///
/// Placeholders: `{context}`, `{question}`
pub const DEFAULT_ANSWER_PROMPT: &str = r#"You are an assistant helping a retail company, TestWarehouse, analyze its operations.
TestWarehouse runs global stores selling products from electronics to clothing.
It tracks data on customers, employees, sales, suppliers, inventory, deliveries, issues, and ratings.

Relevant data: {context}
Question: {question}
"#;

/// Fills `{context}` and `{question}` into `template`.
///
/// The question is substituted last so placeholder-like text inside the
/// retrieved context is left untouched.
pub fn render_answer_prompt(template: &str, context: &str, question: &str) -> String {
    match template.split_once("{context}") {
        Some((before, after)) => format!(
            "{}{}{}",
            before.replace("{question}", question),
            context,
            after.replace("{question}", question)
        ),
        None => template.replace("{question}", question),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_answer_prompt() {
        let rendered = render_answer_prompt("C={context} Q={question}", "rows", "how many?");
        assert_eq!(rendered, "C=rows Q=how many?");
    }

    #[test]
    fn test_render_leaves_placeholders_in_context_alone() {
        let rendered = render_answer_prompt("{context}|{question}", "note: {question}", "q");
        assert_eq!(rendered, "note: {question}|q");
    }

    #[test]
    fn test_default_prompt_has_both_placeholders() {
        assert!(DEFAULT_ANSWER_PROMPT.contains("{context}"));
        assert!(DEFAULT_ANSWER_PROMPT.contains("{question}"));
    }
}
