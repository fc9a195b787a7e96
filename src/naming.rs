//! Identifier case conversion.
//!
//! Server-side identifiers are snake_case; everything that crosses the wire
//! boundary (interface names, field names, accessor names) is converted to
//! the TypeScript convention here.

/// Convert a snake_case identifier to PascalCase.
///
/// Leading underscores are dropped: `"_nisse"` becomes `"Nisse"`.
pub fn to_pascal(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut at_boundary = true;
    for ch in s.chars() {
        if ch == '_' {
            at_boundary = true;
            continue;
        }
        if at_boundary && ch.is_ascii_alphabetic() {
            result.extend(ch.to_uppercase());
        } else {
            result.push(ch);
        }
        at_boundary = false;
    }
    result
}

/// Convert a snake_case identifier to camelCase.
pub fn to_camel(s: &str) -> String {
    let pascal = to_pascal(s);
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}
