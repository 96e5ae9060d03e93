//! Filename conventions for cloned line WAVs.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static ILLEGAL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());
static LLM_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^llm_\d+_[\d.]+s_").unwrap());
static SORT_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)[-_]").unwrap());

/// Sanitize dialogue text into a filename-safe fragment.
///
/// Illegal filesystem characters become `_`, runs of `_` collapse, a
/// leading `llm_<digits>_<n>s_` marker is stripped and the result is
/// truncated to 50 code points.
pub fn sanitize_text(text: &str) -> String {
    let cleaned = LLM_MARKER.replace(text.trim(), "");
    let cleaned = ILLEGAL.replace_all(&cleaned, "_");
    let cleaned = UNDERSCORE_RUNS.replace_all(&cleaned, "_");
    cleaned.chars().take(50).collect()
}

/// Filename for a cloned line: `<sort>_<sanitized>.wav`, with an extra
/// index suffix when the same sort key occurs more than once.
pub fn line_filename(sort: i64, text: &str, dup_index: Option<usize>) -> String {
    let clean = sanitize_text(text);
    match dup_index {
        Some(i) => format!("{}_{}_{}.wav", sort, clean, i),
        None => format!("{}_{}.wav", sort, clean),
    }
}

/// Parse the leading sort key from a cloned-line filename.
pub fn parse_sort_prefix(filename: &str) -> Option<i64> {
    SORT_PREFIX
        .captures(filename)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
