//! A minimal LDAP filter grammar and evaluator (component H, ambient): equality, substring, and
//! the three boolean combinators, sufficient for the Filter strategy (§4.B.4). Not a
//! general-purpose LDAP filter engine; e.g. approximate (`~=`) and ordering (`>=`, `<=`) matches
//! are not supported.

use crate::entry::Entry;
use crate::schema::Schema;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Equality { attr: String, value: String },
    Substring { attr: String, parts: Vec<String> },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FilterParseError(pub String);

impl Filter {
    pub fn parse(text: &str) -> Result<Filter, FilterParseError> {
        let text = text.trim();
        let (filter, rest) = parse_filter(text)?;
        if !rest.trim().is_empty() {
            return Err(FilterParseError(format!(
                "unexpected trailing content: '{}'",
                rest
            )));
        }
        Ok(filter)
    }

    /// Canonical string form, used for duplicate detection (§4.F) independent of incidental
    /// whitespace differences in the source text.
    pub fn canonical_form(&self) -> String {
        self.to_string()
    }

    pub fn evaluate(&self, entry: &Entry, schema: &Schema) -> bool {
        match self {
            Filter::Equality { attr, value } => entry
                .values(attr)
                .iter()
                .any(|v| values_equal(v, value, schema.is_case_exact(attr))),
            Filter::Substring { attr, parts } => entry
                .values(attr)
                .iter()
                .any(|v| substring_matches(v, parts, schema.is_case_exact(attr))),
            Filter::And(children) => children.iter().all(|f| f.evaluate(entry, schema)),
            Filter::Or(children) => children.iter().any(|f| f.evaluate(entry, schema)),
            Filter::Not(inner) => !inner.evaluate(entry, schema),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Equality { attr, value } => write!(f, "({}={})", attr, value),
            Filter::Substring { attr, parts } => write!(f, "({}={})", attr, parts.join("*")),
            Filter::And(children) => {
                write!(f, "(&")?;
                for c in children {
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
            Filter::Or(children) => {
                write!(f, "(|")?;
                for c in children {
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
            Filter::Not(inner) => write!(f, "(!{})", inner),
        }
    }
}

fn values_equal(actual: &str, expected: &str, case_exact: bool) -> bool {
    if case_exact {
        normalize_whitespace(actual) == normalize_whitespace(expected)
    } else {
        normalize_whitespace(actual).eq_ignore_ascii_case(&normalize_whitespace(expected))
    }
}

fn substring_matches(actual: &str, parts: &[String], case_exact: bool) -> bool {
    let hay = if case_exact {
        actual.to_string()
    } else {
        actual.to_ascii_lowercase()
    };
    let mut cursor = 0usize;
    for (index, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        let needle = if case_exact {
            part.clone()
        } else {
            part.to_ascii_lowercase()
        };
        if index == 0 {
            if !hay[cursor..].starts_with(&needle) {
                return false;
            }
            cursor += needle.len();
        } else if index == parts.len() - 1 {
            if !hay[cursor..].ends_with(&needle) {
                return false;
            }
        } else {
            match hay[cursor..].find(&needle) {
                Some(pos) => cursor += pos + needle.len(),
                None => return false,
            }
        }
    }
    true
}

fn normalize_whitespace(value: &str) -> String {
    value.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses one parenthesized filter expression, returning the remainder of the input.
fn parse_filter(text: &str) -> Result<(Filter, &str), FilterParseError> {
    let text = text
        .strip_prefix('(')
        .ok_or_else(|| FilterParseError(format!("expected '(' at '{}'", text)))?;

    match text.chars().next() {
        Some('&') => parse_combinator(&text[1..], Filter::And as fn(Vec<Filter>) -> Filter),
        Some('|') => parse_combinator(&text[1..], Filter::Or as fn(Vec<Filter>) -> Filter),
        Some('!') => {
            let (inner, rest) = parse_filter(&text[1..])?;
            let rest = rest
                .strip_prefix(')')
                .ok_or_else(|| FilterParseError("expected closing ')' after '!'".to_string()))?;
            Ok((Filter::Not(Box::new(inner)), rest))
        }
        _ => parse_simple(text),
    }
}

fn parse_combinator(
    mut text: &str,
    make: fn(Vec<Filter>) -> Filter,
) -> Result<(Filter, &str), FilterParseError> {
    let mut children = Vec::new();
    while text.starts_with('(') {
        let (child, rest) = parse_filter(text)?;
        children.push(child);
        text = rest;
    }
    let rest = text
        .strip_prefix(')')
        .ok_or_else(|| FilterParseError("expected closing ')'".to_string()))?;
    Ok((make(children), rest))
}

fn parse_simple(text: &str) -> Result<(Filter, &str), FilterParseError> {
    let close = text
        .find(')')
        .ok_or_else(|| FilterParseError(format!("unterminated filter: '{}'", text)))?;
    let (body, rest) = text.split_at(close);
    let rest = &rest[1..];

    let eq = body
        .find('=')
        .ok_or_else(|| FilterParseError(format!("expected '=' in '{}'", body)))?;
    let attr = body[..eq].trim().to_ascii_lowercase();
    let value = &body[eq + 1..];

    if attr.is_empty() {
        return Err(FilterParseError(format!("missing attribute in '{}'", body)));
    }

    if value.contains('*') {
        let parts = value.split('*').map(|s| s.to_string()).collect();
        Ok((Filter::Substring { attr, parts }, rest))
    } else {
        Ok((
            Filter::Equality {
                attr,
                value: value.to_string(),
            },
            rest,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(attrs: &[(&str, &[&str])]) -> Entry {
        use crate::dn::Dn;
        let attrs = attrs
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect();
        Entry::new(Dn::parse("uid=alice,dc=example").unwrap(), "uid=alice,dc=example".to_string(), attrs)
    }

    #[test]
    fn parses_and_evaluates_equality() {
        let filter = Filter::parse("(ou=Engineering)").unwrap();
        let schema = Schema::empty();
        assert!(filter.evaluate(&entry(&[("ou", &["Engineering"])]), &schema));
        assert!(!filter.evaluate(&entry(&[("ou", &["Sales"])]), &schema));
    }

    #[test]
    fn equality_is_case_insensitive_without_schema() {
        let filter = Filter::parse("(ou=engineering)").unwrap();
        let schema = Schema::empty();
        assert!(filter.evaluate(&entry(&[("ou", &["Engineering"])]), &schema));
    }

    #[test]
    fn substring_matches_prefix_suffix_and_middle() {
        let filter = Filter::parse("(cn=al*ce)").unwrap();
        let schema = Schema::empty();
        assert!(filter.evaluate(&entry(&[("cn", &["alice"])]), &schema));
        assert!(!filter.evaluate(&entry(&[("cn", &["bob"])]), &schema));
    }

    #[test]
    fn and_or_not_combinators() {
        let schema = Schema::empty();
        let and = Filter::parse("(&(ou=Eng)(cn=alice))").unwrap();
        assert!(and.evaluate(&entry(&[("ou", &["Eng"]), ("cn", &["alice"])]), &schema));
        assert!(!and.evaluate(&entry(&[("ou", &["Eng"]), ("cn", &["bob"])]), &schema));

        let or = Filter::parse("(|(ou=Eng)(ou=Sales))").unwrap();
        assert!(or.evaluate(&entry(&[("ou", &["Sales"])]), &schema));

        let not = Filter::parse("(!(ou=Eng))").unwrap();
        assert!(not.evaluate(&entry(&[("ou", &["Sales"])]), &schema));
        assert!(!not.evaluate(&entry(&[("ou", &["Eng"])]), &schema));
    }

    #[test]
    fn canonical_form_ignores_incidental_source_whitespace() {
        let a = Filter::parse("(ou=Engineering)").unwrap();
        let b = Filter::parse("(ou=Engineering)").unwrap();
        assert_eq!(a.canonical_form(), b.canonical_form());
    }

    #[test]
    fn rejects_malformed_filter() {
        assert!(Filter::parse("ou=Engineering)").is_err());
        assert!(Filter::parse("(ou Engineering)").is_err());
    }
}
