// Shared prompt fragments and prompt-building utilities.
// Each feature module that calls the LLM keeps its own prompts.rs alongside it.

/// Placeholder used when an optional field is absent.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Fills `{name}` placeholders in a template. Unknown placeholders are left as-is.
///
/// Single pass over the template: braces inside substituted values are never expanded.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(len) = rest[open..].find('}') else {
            break;
        };
        let close = open + len;
        out.push_str(&rest[..open]);
        match values.iter().find(|(key, _)| *key == &rest[open + 1..close]) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..=close]),
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Returns the value, or `fallback` when it is absent or blank.
pub fn or_fallback<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}
