use regex::Regex;

/// Cleans the SQL text returned by the generation endpoint.
///
/// The service wraps statements in Markdown fences and over-escapes
/// identifiers (`\_`, `\*`), so the raw string is not directly runnable.
/// Runs of backslashes collapse to one before the escapes are undone, the
/// fence markers are stripped, and surrounding whitespace is trimmed.
pub fn sanitize_generated_sql(raw: &str) -> String {
    let collapsed = Regex::new(r"\\+").unwrap().replace_all(raw, r"\");
    let unescaped = collapsed.replace(r"\*", "*").replace(r"\_", "_");
    let without_fences = Regex::new("```sql\n?").unwrap().replace_all(&unescaped, "");
    without_fences.replace("```", "").trim().to_string()
}
