//! Identifier casing helpers shared by configuration and code generation.

/// Convert `snake_case`, `kebab-case`, `camelCase` or dotted names to PascalCase.
///
/// Word boundaries are any non-alphanumeric characters; existing inner
/// capitals are preserved so `userRoles` becomes `UserRoles`.
pub fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for part in name.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars);
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}
