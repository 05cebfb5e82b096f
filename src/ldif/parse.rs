//! Turns a tokenized `RawRecord` into a parsed `Entry` (component H, ambient): the DN line plus an
//! ordered multimap of attribute name to values, decoding base64 (`::`) values.

use crate::dn::Dn;
use crate::entry::Entry;
use crate::error::RecordError;
use base64::{engine::general_purpose, Engine};

pub fn parse_entry(record: &crate::ldif::record::RawRecord) -> Result<Entry, RecordError> {
    let mut lines = record.lines.iter();
    let first = lines
        .next()
        .ok_or_else(|| RecordError::Recoverable("empty record".to_string()))?;

    let (dn_text, _) = parse_attribute_line(first)
        .map_err(|e| RecordError::Recoverable(format!("malformed DN line: {}", e)))?;
    let (dn_attr, dn_value) = dn_text;
    if !dn_attr.eq_ignore_ascii_case("dn") {
        return Err(RecordError::Recoverable(format!(
            "expected 'dn:' as the first line, got '{}:'",
            dn_attr
        )));
    }

    let dn = Dn::parse(&dn_value)
        .map_err(|e| RecordError::Recoverable(format!("malformed DN '{}': {}", dn_value, e.0)))?;

    let mut attributes: Vec<(String, Vec<String>)> = Vec::new();
    for line in lines {
        let ((attr, value), _) = parse_attribute_line(line)
            .map_err(|e| RecordError::Recoverable(format!("malformed attribute line: {}", e)))?;
        match attributes.iter_mut().find(|(a, _)| *a == attr) {
            Some((_, values)) => values.push(value),
            None => attributes.push((attr, vec![value])),
        }
    }

    Ok(Entry::new(dn, dn_value, attributes))
}

/// Parses one `attr: value` or `attr:: base64value` line, returning `(attr, decoded-value)`.
fn parse_attribute_line(line: &str) -> Result<((String, String), ()), String> {
    let colon = line
        .find(':')
        .ok_or_else(|| format!("no ':' separator in '{}'", line))?;
    let attr = line[..colon].to_string();
    if attr.is_empty() {
        return Err(format!("empty attribute name in '{}'", line));
    }
    let rest = &line[colon + 1..];
    let value = if let Some(b64) = rest.strip_prefix(':') {
        let decoded = general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|e| format!("invalid base64: {}", e))?;
        String::from_utf8(decoded).map_err(|e| format!("non-UTF8 base64 value: {}", e))?
    } else {
        rest.trim_start().to_string()
    };
    Ok(((attr, value), ()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldif::record::RawRecord;

    fn record(lines: &[&str]) -> RawRecord {
        RawRecord {
            seq: 0,
            lines: lines.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn parses_simple_entry() {
        let r = record(&[
            "dn: uid=alice,ou=People,dc=example,dc=com",
            "uid: alice",
            "mail: alice@example.com",
            "mail: alice@work.example.com",
        ]);
        let entry = parse_entry(&r).unwrap();
        assert_eq!(entry.first_value("uid"), Some("alice"));
        assert_eq!(entry.values("mail"), vec!["alice@example.com", "alice@work.example.com"]);
    }

    #[test]
    fn decodes_base64_values() {
        // "hello" base64-encoded.
        let r = record(&["dn: uid=alice,dc=example", "description:: aGVsbG8="]);
        let entry = parse_entry(&r).unwrap();
        assert_eq!(entry.first_value("description"), Some("hello"));
    }

    #[test]
    fn rejects_missing_dn_line() {
        let r = record(&["uid: alice"]);
        assert!(parse_entry(&r).is_err());
    }

    #[test]
    fn rejects_line_without_colon() {
        let r = record(&["dn: uid=alice,dc=example", "not-a-valid-line"]);
        assert!(parse_entry(&r).is_err());
    }
}
