//! String utility functions.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_\-]*)\}").unwrap());
static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").unwrap());

/// Words too common to signal relevance between a task and an agent.
const STOPWORDS: &[&str] = &[
    "and", "the", "for", "with", "from", "into", "that", "this", "these", "those", "are", "was",
    "were", "will", "your", "you", "our", "their", "its", "all", "any", "each", "about", "over",
    "under", "then", "than", "using", "use", "make", "task", "agent", "based", "provide",
];

/// Minimum token length kept as a keyword.
const MIN_KEYWORD_LEN: usize = 3;

/// Minimum length of the shorter token for a prefix match.
const MIN_PREFIX_LEN: usize = 4;

/// Interpolate placeholders (e.g., `{key}`) in a string while leaving JSON untouched.
///
/// Only interpolates placeholders that follow the pattern `{variable_name}` where
/// `variable_name` starts with a letter/underscore and contains only alphanumeric chars,
/// underscores, and hyphens.
///
/// # Errors
/// Returns an error naming the first template variable not found in `inputs`.
pub fn interpolate_only(input: &str, inputs: &HashMap<String, String>) -> Result<String, String> {
    if !input.contains('{') {
        return Ok(input.to_string());
    }

    let variables: Vec<String> = VARIABLE_PATTERN
        .captures_iter(input)
        .map(|cap| cap[1].to_string())
        .collect();

    if let Some(missing) = variables.iter().find(|v| !inputs.contains_key(*v)) {
        return Err(format!(
            "Template variable '{}' not found in inputs dictionary",
            missing
        ));
    }

    let mut result = input.to_string();
    for var in &variables {
        if let Some(value) = inputs.get(var) {
            let placeholder = format!("{{{}}}", var);
            result = result.replace(&placeholder, value);
        }
    }

    Ok(result)
}

/// Extract distinct lowercase keywords from free text, in first-seen order.
pub fn keywords(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut out: Vec<String> = Vec::new();
    for m in WORD_PATTERN.find_iter(&lowered) {
        let word = m.as_str();
        if word.len() < MIN_KEYWORD_LEN || STOPWORDS.contains(&word) {
            continue;
        }
        if !out.iter().any(|w| w == word) {
            out.push(word.to_string());
        }
    }
    out
}

/// Whether two keywords refer to the same concept: equal, or one a prefix
/// of the other when the shorter has at least four characters
/// ("research" / "researcher").
pub fn keywords_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.len() >= MIN_PREFIX_LEN && long.starts_with(short)
}
