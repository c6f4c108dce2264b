use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::llm::LlmError;

static FENCE_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:sql)?").expect("fence marker pattern is valid")
});

/// Strips markdown code fences (```sql and ```) and surrounding whitespace
/// from raw model output.
pub fn sanitize_sql(raw: &str) -> Result<String, LlmError> {
    let sql = FENCE_MARKERS.replace_all(raw.trim(), "");
    let sql = sql.trim();

    if sql.is_empty() {
        return Err(LlmError::EmptyGeneration);
    }

    debug!("Sanitized SQL: {}", sql);
    Ok(sql.to_string())
}
