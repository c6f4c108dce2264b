use crate::llm::models::Prompt;

const SYSTEM_PROMPT: &str = "You are a SQL expert. Generate only valid DuckDB SQL queries without any explanation or formatting.";

/// Builds the prompt for one question. Pure: the same inputs always give the
/// same prompt.
pub fn build_prompt(schema: &str, question: &str) -> Prompt {
    let user = format!(
        r#"You are a SQL expert. Given the following database schema and a question, generate a valid DuckDB SQL query.

{}

Question: {}

Generate ONLY the SQL query without any explanation or markdown formatting. The query should be executable DuckDB SQL."#,
        schema, question
    );

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
