//! `{{name}}` placeholders in snippet commands.
//!
//! A placeholder is `{{`, an optional `.`, then ASCII letters, digits, `_` or
//! whitespace, then `}}`. The field name is the first word inside it, so
//! `{{name}}`, `{{.name}}` and `{{ name }}` all refer to `name`.

use std::collections::HashMap;

use regex::{Captures, Regex};

lazy_static::lazy_static! {
    static ref FIELD_RE: Regex = Regex::new(r"\{\{\.?[A-Za-z0-9_ \t\n\r\x0C]+\}\}").unwrap();
    static ref FIELD_NAME_RE: Regex = Regex::new(r"[A-Za-z0-9_]+").unwrap();
}

/// Values supplied for the fields of one command.
pub type FieldValues = HashMap<String, String>;

fn field_name(placeholder: &str) -> Option<&str> {
    FIELD_NAME_RE.find(placeholder).map(|m| m.as_str())
}

/// Returns the distinct field names in `text`, in first-seen order.
pub fn parse_fields(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for name in FIELD_RE.find_iter(text).filter_map(|m| field_name(m.as_str())) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    names
}

/// Substitutes every placeholder that has a value.
///
/// Placeholders without a value are left as written.
pub fn resolve(text: &str, values: &FieldValues) -> String {
    FIELD_RE
        .replace_all(text, |caps: &Captures| {
            let placeholder = &caps[0];
            match field_name(placeholder).and_then(|name| values.get(name)) {
                Some(value) => value.clone(),
                None => placeholder.to_string(),
            }
        })
        .into_owned()
}

/// Fields of `text` that `values` does not cover.
pub fn missing_fields(text: &str, values: &FieldValues) -> Vec<String> {
    parse_fields(text)
        .into_iter()
        .filter(|name| !values.contains_key(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn fields_in_first_seen_order() {
        assert_eq!(parse_fields("cp {{source}} {{dest}}"), vec!["source", "dest"]);
    }

    #[test]
    fn repeated_fields_are_reported_once() {
        assert_eq!(
            parse_fields("cp {{dest}} {{source}} {{.dest}} {{ source }}"),
            vec!["dest", "source"]
        );
    }

    #[test]
    fn no_placeholders_no_fields() {
        assert!(parse_fields("ls -la").is_empty());
        assert!(parse_fields("echo {single} {{}} {{-x}}").is_empty());
    }

    #[test]
    fn blank_placeholder_has_no_name() {
        assert!(parse_fields("echo {{   }}").is_empty());
        assert_eq!(resolve("echo {{   }}", &values(&[])), "echo {{   }}");
    }

    #[test]
    fn only_ascii_whitespace_pads_a_placeholder() {
        assert!(parse_fields("echo {{\u{00A0}name}}").is_empty());
        assert_eq!(parse_fields("echo {{\tname\n}}"), vec!["name"]);
    }

    #[test]
    fn resolves_every_occurrence() {
        let vals = values(&[("source", "a.txt"), ("dest", "b dir")]);
        assert_eq!(resolve("cp {{source}} {{.dest}}", &vals), "cp a.txt b dir");
        assert_eq!(resolve("{{ source }}-{{source}}", &vals), "a.txt-a.txt");
    }

    #[test]
    fn missing_values_stay_literal() {
        let vals = values(&[("source", "a")]);
        assert_eq!(resolve("cp {{source}} {{dest}}", &vals), "cp a {{dest}}");
        assert_eq!(missing_fields("cp {{source}} {{dest}}", &vals), vec!["dest"]);
    }

    #[test]
    fn values_are_not_rescanned() {
        let vals = values(&[("a", "{{b}}"), ("b", "nope")]);
        assert_eq!(resolve("echo {{a}}", &vals), "echo {{b}}");
    }
}
