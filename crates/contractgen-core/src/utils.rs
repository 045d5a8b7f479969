//! String transformation utilities for code generation

use std::collections::HashSet;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

static NON_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("valid regex"));

static PACKAGE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("valid regex")
});

static KOTLIN_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "as", "break", "class", "continue", "do", "else", "false", "for", "fun", "if", "in",
        "interface", "is", "null", "object", "package", "return", "super", "this", "throw",
        "true", "try", "typealias", "typeof", "val", "var", "when", "while",
    ]
    .into_iter()
    .collect()
});

/// Convert a string to snake_case
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let mut prev_is_lowercase = false;

    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            // Word boundary on a lower -> upper transition
            if i > 0 && prev_is_lowercase {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
            prev_is_lowercase = false;
        } else if ch.is_alphanumeric() {
            result.push(ch);
            prev_is_lowercase = ch.is_lowercase() || ch.is_ascii_digit();
        } else if !result.is_empty() && !result.ends_with('_') {
            result.push('_');
            prev_is_lowercase = false;
        }
    }

    result.trim_matches('_').to_string()
}

/// Convert a string to UpperCamelCase (PascalCase)
pub fn to_upper_camel_case(s: &str) -> String {
    to_snake_case(s)
        .split('_')
        .filter(|s| !s.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}

/// Convert a string to lowerCamelCase
pub fn to_lower_camel_case(s: &str) -> String {
    let upper_camel = to_upper_camel_case(s);
    let mut chars = upper_camel.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
    }
}

/// Turn an arbitrary name into a Kotlin identifier, quoting keywords with backticks
pub fn kotlin_identifier(name: &str) -> String {
    let mut ident = NON_IDENT.replace_all(name, "_").into_owned();
    if ident.is_empty() {
        ident.push('_');
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if KOTLIN_KEYWORDS.contains(ident.as_str()) {
        format!("`{ident}`")
    } else {
        ident
    }
}

/// Name of an enum constant for a raw enum value (e.g. `in-stock` -> `IN_STOCK`)
pub fn enum_constant_name(value: &str) -> String {
    let snake = to_snake_case(value).to_uppercase();
    kotlin_identifier(if snake.is_empty() { "EMPTY" } else { &snake })
}

/// Whether `name` is a dotted JVM package name such as `com.example.api`
pub fn is_valid_package_name(name: &str) -> bool {
    PACKAGE_NAME.is_match(name)
}

/// Relative directory of a dotted package (`com.example.api` -> `com/example/api`)
pub fn package_path(package: &str) -> PathBuf {
    package.split('.').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("findPetsByStatus"), "find_pets_by_status");
        assert_eq!(to_snake_case("FindPetsByStatus"), "find_pets_by_status");
        assert_eq!(to_snake_case("find-pets-by-status"), "find_pets_by_status");
        assert_eq!(to_snake_case("find_pets_by_status"), "find_pets_by_status");
        assert_eq!(to_snake_case("HTTPResponse"), "httpresponse");
        assert_eq!(to_snake_case("getHTTPResponse"), "get_httpresponse");
        assert_eq!(to_snake_case("get HTTP Response"), "get_http_response");
        assert_eq!(to_snake_case("/widgets/{id}"), "widgets_id");
    }

    #[test]
    fn test_to_upper_camel_case() {
        assert_eq!(to_upper_camel_case("find_pets_by_status"), "FindPetsByStatus");
        assert_eq!(to_upper_camel_case("findPetsByStatus"), "FindPetsByStatus");
        assert_eq!(to_upper_camel_case("find-pets-by-status"), "FindPetsByStatus");
        assert_eq!(to_upper_camel_case("FIND_PETS_BY_STATUS"), "FindPetsByStatus");
        assert_eq!(to_upper_camel_case("campus reservations"), "CampusReservations");
    }

    #[test]
    fn test_to_lower_camel_case() {
        assert_eq!(to_lower_camel_case("find_pets_by_status"), "findPetsByStatus");
        assert_eq!(to_lower_camel_case("getWidget"), "getWidget");
        assert_eq!(to_lower_camel_case("get /widgets/{id}"), "getWidgetsId");
        assert_eq!(to_lower_camel_case(""), "");
    }

    #[test]
    fn test_kotlin_identifier() {
        assert_eq!(kotlin_identifier("name"), "name");
        assert_eq!(kotlin_identifier("object"), "`object`");
        assert_eq!(kotlin_identifier("1st"), "_1st");
        assert_eq!(kotlin_identifier("x-trace"), "x_trace");
    }

    #[test]
    fn test_enum_constant_name() {
        assert_eq!(enum_constant_name("in-stock"), "IN_STOCK");
        assert_eq!(enum_constant_name("available"), "AVAILABLE");
        assert_eq!(enum_constant_name("1"), "_1");
        assert_eq!(enum_constant_name(""), "EMPTY");
    }

    #[test]
    fn test_package_helpers() {
        assert!(is_valid_package_name("com.woowahan.campus.api"));
        assert!(!is_valid_package_name("com..api"));
        assert!(!is_valid_package_name("9com.api"));
        assert_eq!(
            package_path("com.example.api"),
            PathBuf::from("com").join("example").join("api")
        );
    }
}
