//! Helpers for digging structured payloads out of model text.
//!
//! Models wrap JSON in Markdown fences, preamble prose, and trailing
//! commentary. These helpers normalize that before any parse attempt; the
//! parse itself stays strict.

use regex::Regex;
use std::sync::OnceLock;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:[A-Za-z0-9_-]+)?\s*(.*?)\s*```").expect("fence regex"))
}

/// Strip a Markdown code-fence wrapper, returning the fenced body when one
/// exists and the trimmed input otherwise.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(caps) = fence_re().captures(trimmed) {
        return caps[1].trim().to_string();
    }
    trimmed.to_string()
}

/// Extract the first balanced `{...}` block, honoring JSON string literals
/// and escapes. Returns `None` when no balanced object exists.
pub fn first_balanced_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
