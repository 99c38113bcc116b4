//! Wildcard matching for keys and module filters
//!
//! `*` matches any run of characters (including none) and `?` matches exactly
//! one. Matching is anchored and ignores case. Every other character is
//! literal.

use regex::RegexBuilder;

/// Whether the text contains a wildcard character
pub fn is_pattern(text: &str) -> bool {
    text.contains(['*', '?'])
}

/// Match `input` against `pattern`
///
/// A pattern without wildcards only matches itself.
pub fn matches(input: &str, pattern: &str) -> bool {
    if input == pattern {
        return true;
    }
    if !is_pattern(pattern) {
        return false;
    }

    let translated = regex::escape(pattern).replace(r"\*", ".*").replace(r"\?", ".");
    match RegexBuilder::new(&format!("^{}$", translated))
        .case_insensitive(true)
        .build()
    {
        Ok(regex) => regex.is_match(input),
        Err(error) => {
            tracing::warn!(pattern, %error, "Invalid wildcard pattern");
            false
        }
    }
}

/// Whether a module path is selected by a filter
///
/// A filter without wildcards selects the module itself and everything nested
/// under it; a wildcard filter is matched against the full path.
pub fn module_matches(module: &str, filter: &str) -> bool {
    if is_pattern(filter) {
        return matches(module, filter);
    }
    module == filter
        || module
            .strip_prefix(filter)
            .is_some_and(|rest| rest.starts_with("::"))
}

/// Whether a decorator key selects a registration key
///
/// No key selects only unkeyed registrations. A key selects keyed
/// registrations equal to it or, when it is a pattern, matching it.
pub fn key_selects(decorator_key: Option<&str>, registration_key: Option<&str>) -> bool {
    match (decorator_key, registration_key) {
        (None, None) => true,
        (Some(pattern), Some(key)) => key == pattern || (is_pattern(pattern) && matches(key, pattern)),
        _ => false,
    }
}
