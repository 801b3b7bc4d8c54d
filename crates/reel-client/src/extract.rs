//! Best-effort structured-data recovery from model text.
//!
//! Models wrap their JSON in markdown fences, prose preambles, and trailing
//! commentary. Recovery strips the first fenced block if one exists, then
//! tries the outermost `{..}` slice followed by the outermost `[..]` slice
//! under a strict parse. On failure the result is `None`, never a partial
//! or best-guess structure; downstream normalization must not operate on
//! malformed data.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Recover a JSON value from free-form model text.
pub fn extract_json(raw: &str) -> Option<Value> {
    let text = strip_fences(raw).trim();

    // Whichever bracket kind opens first gets the first parse attempt; the
    // other is the fallback when the slice turns out to be prose.
    let order = match (text.find('{'), text.find('[')) {
        (Some(brace), Some(bracket)) if bracket < brace => [('[', ']'), ('{', '}')],
        _ => [('{', '}'), ('[', ']')],
    };

    for (open, close) in order {
        if let (Some(start), Some(end)) = (text.find(open), text.rfind(close)) {
            if end > start {
                if let Ok(value) = serde_json::from_str(&text[start..=end]) {
                    return Some(value);
                }
            }
        }
    }

    None
}

/// Recover a typed structure from free-form model text.
pub fn extract_records<T: DeserializeOwned>(raw: &str) -> Option<T> {
    extract_json(raw).and_then(|value| serde_json::from_value(value).ok())
}

/// Return the contents of the first fenced code block, or the input
/// unchanged when no complete fence is present.
fn strip_fences(raw: &str) -> &str {
    let fenced = if let Some(start) = raw.find("```json") {
        &raw[start + 7..]
    } else if let Some(start) = raw.find("```") {
        &raw[start + 3..]
    } else {
        return raw;
    };

    match fenced.find("```") {
        Some(end) => &fenced[..end],
        None => raw,
    }
}
