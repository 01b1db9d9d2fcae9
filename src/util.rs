use std::env;

/// Retrieves an environment variable and splits it into a vector of strings
/// based on a delimiter.
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .collect()
}

/// Extracts the first balanced `{...}` span from raw model output.
///
/// Tolerates surrounding prose and markdown code fences. Brace depth is
/// tracked character by character, skipping braces inside JSON string
/// literals, so nested objects do not over-match the way a greedy regex
/// would. Returns `None` when no balanced object is present.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let stripped = strip_code_fences(raw);

    let start = stripped.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in stripped[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&stripped[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Cuts the body out of a fenced code block if the text carries one;
/// otherwise returns the input unchanged.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(open) = trimmed.find("```") {
        let after_fence = &trimmed[open + 3..];
        // Skip an optional language tag on the fence line.
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(close) = body.find("```") {
            return &body[..close];
        }
        return body;
    }
    trimmed
}
