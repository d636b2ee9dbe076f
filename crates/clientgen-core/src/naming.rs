use heck::{ToLowerCamelCase, ToPascalCase};

const RESERVED_WORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "null", "package", "private", "protected", "public", "return", "short",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "true", "try", "void", "volatile", "while",
];

fn has_separator(name: &str) -> bool {
    name.chars().any(|c| matches!(c, '_' | '-' | ' ' | '.' | '/'))
}

/// PascalCase an identifier. Identifiers without separators keep their inner casing.
pub fn to_pascal(name: &str) -> String {
    if has_separator(name) {
        return name.to_pascal_case();
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// camelCase an identifier. Identifiers without separators keep their inner casing.
pub fn to_camel(name: &str) -> String {
    if has_separator(name) {
        return name.to_lower_camel_case();
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Keep letters, digits, `_` and `-`.
pub fn remove_invalid_chars(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// English plural of a name; names already ending in `s` are kept.
pub fn plural(name: &str) -> String {
    if name.is_empty() || name.ends_with('s') || name.ends_with('S') {
        return name.to_string();
    }
    let lower = name.to_lowercase();
    if lower.ends_with('y') {
        let before = lower.chars().rev().nth(1);
        if before.is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{}ies", &name[..name.len() - 1]);
        }
    }
    if lower.ends_with('x') || lower.ends_with("ch") || lower.ends_with("sh") || lower.ends_with('z')
    {
        return format!("{name}es");
    }
    format!("{name}s")
}

pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Property identifier for a wire name, escaped with a `Property` suffix when reserved.
pub fn property_name(name: &str) -> String {
    let camel = to_camel(&remove_invalid_chars(name).replace('-', "_"));
    if is_reserved(&camel) {
        format!("{camel}Property")
    } else {
        camel
    }
}

/// Method parameter identifier, escaped with a `Param` suffix when reserved.
pub fn parameter_name(name: &str) -> String {
    let camel = to_camel(&remove_invalid_chars(name).replace('-', "_"));
    if is_reserved(&camel) {
        format!("{camel}Param")
    } else {
        camel
    }
}

/// Constant-style enum member name: `fooBar.baz` becomes `FOO_BAR_BAZ`.
pub fn enum_member_name(value: &str) -> String {
    let trimmed = value.trim_matches('_');
    let replaced: String = trimmed
        .chars()
        .map(|c| if matches!(c, '\\' | '/' | '.' | '+' | ' ' | '-') { '_' } else { c })
        .collect();
    let cleaned = remove_invalid_chars(&replaced);

    let mut result = String::with_capacity(cleaned.len() + 4);
    let mut prev: Option<char> = None;
    for c in cleaned.chars() {
        if c == '_' && prev == Some('_') {
            continue;
        }
        if c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase()) {
            result.push('_');
        }
        result.push(c);
        prev = Some(c);
    }

    let upper = result.trim_matches('_').to_uppercase();
    if upper.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("_{upper}")
    } else {
        upper
    }
}

/// Getter name for a client property: `isFoo` booleans keep their prefix.
pub fn getter_name(name: &str, is_boolean: bool) -> String {
    if is_boolean {
        if name.starts_with("is") && name.chars().nth(2).is_some_and(|c| c.is_uppercase()) {
            to_camel(name)
        } else {
            format!("is{}", to_pascal(name))
        }
    } else {
        format!("get{}", to_pascal(name))
    }
}
