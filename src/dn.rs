//! Distinguished name parsing and ancestry, canonicalized the way the dispatcher and parent map
//! need: attribute names folded to lowercase, values trimmed, whitespace-collapsed, and folded to
//! lowercase (the default case-insensitive equality rule absent a schema).
//!
//! This does not support multivalued RDNs (`+`) or non-UTF8 binary-valued RDNs; like
//! `other_examples`'s `simple-ldap` crate, these are rare enough in practice to leave out of a
//! splitting tool that otherwise treats entries opaquely.

use std::fmt;

/// A single attribute-value pair within an RDN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rdn {
    attr: String,
    value: String,
}

impl Rdn {
    pub fn attr(&self) -> &str {
        &self.attr
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attr, self.value)
    }
}

/// A parsed, canonicalized distinguished name. RDNs are stored closest-to-root last, i.e. in the
/// same left-to-right order they appeared in the source text (`uid=alice,ou=People,dc=example`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dn {
    rdns: Vec<Rdn>,
}

#[derive(Debug, thiserror::Error)]
#[error("malformed DN component: '{0}'")]
pub struct DnParseError(pub String);

impl Dn {
    /// Parses a DN string into its normalized component sequence. Splits on unescaped commas, then
    /// each RDN on the first unescaped `=`.
    pub fn parse(text: &str) -> Result<Dn, DnParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Dn { rdns: Vec::new() });
        }
        let mut rdns = Vec::new();
        for component in split_unescaped(text, ',') {
            let component = component.trim();
            if component.is_empty() {
                continue;
            }
            let (attr, value) = component
                .split_once('=')
                .ok_or_else(|| DnParseError(component.to_string()))?;
            let attr = attr.trim().to_ascii_lowercase();
            if attr.is_empty() {
                return Err(DnParseError(component.to_string()));
            }
            let value = normalize_value(value);
            rdns.push(Rdn { attr, value });
        }
        Ok(Dn { rdns })
    }

    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// The canonical string key used in the parent map; stable across process runs.
    pub fn canonical_key(&self) -> String {
        self.rdns
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Strict ancestry: `self` is a descendant of `ancestor` iff `ancestor`'s RDN sequence is a
    /// proper suffix of `self`'s.
    pub fn is_below(&self, ancestor: &Dn) -> bool {
        self.rdns.len() > ancestor.rdns.len() && self.ends_with(ancestor)
    }

    pub fn equals(&self, other: &Dn) -> bool {
        self.rdns == other.rdns
    }

    fn ends_with(&self, ancestor: &Dn) -> bool {
        let offset = self.rdns.len() - ancestor.rdns.len();
        self.rdns[offset..] == ancestor.rdns[..]
    }

    /// Returns the direct parent DN, or `None` if this is the root (empty) DN.
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            None
        } else {
            Some(Dn {
                rdns: self.rdns[1..].to_vec(),
            })
        }
    }

    /// The RDN immediately below `base`, or `None` if `self` is not strictly below `base`.
    pub fn relative_component(&self, base: &Dn) -> Option<&Rdn> {
        if !self.is_below(base) {
            return None;
        }
        let offset = self.rdns.len() - base.rdns.len();
        self.rdns.get(offset - 1)
    }

    /// Walks up from `self` until reaching the DN exactly one RDN below `base`. `self` must be
    /// strictly below `base` (enforced by the caller via `is_below`).
    pub fn ancestor_one_below_base(&self, base: &Dn) -> Dn {
        let offset = self.rdns.len() - base.rdns.len();
        debug_assert!(offset >= 1);
        Dn {
            rdns: self.rdns[offset - 1..].to_vec(),
        }
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_key())
    }
}

/// Trims the value, collapses internal ASCII whitespace runs to a single space, and folds to
/// ASCII lowercase — the default case-insensitive attribute equality rule absent a schema (see
/// design note on schema optionality). The canonicalizer has no schema to consult, so every value
/// gets the default treatment; `Schema::is_case_exact` only affects filter evaluation, which reads
/// entry attribute values directly rather than through this canonicalizer.
fn normalize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_was_space = false;
    for ch in value.trim().chars() {
        if ch.is_ascii_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch.to_ascii_lowercase());
            last_was_space = false;
        }
    }
    out
}

/// Splits `text` on unescaped occurrences of `sep`, treating a backslash as an escape for the next
/// character (so `\,` does not split).
fn split_unescaped(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            current.push(ch);
            if let Some(next) = chars.next() {
                current.push(next);
            }
        } else if ch == sep {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    parts.push(current);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dn(s: &str) -> Dn {
        Dn::parse(s).unwrap()
    }

    #[test]
    fn parses_and_lowercases_attribute_names_and_values() {
        let d = dn("CN=Alice, OU=People , DC=example,DC=com");
        assert_eq!(d.canonical_key(), "cn=alice,ou=people,dc=example,dc=com");
    }

    #[test]
    fn equals_is_normalized() {
        assert!(dn("CN=Alice,DC=example").equals(&dn("cn=alice,  dc=Example")));
        assert!(!dn("cn=Alice,dc=example").equals(&dn("cn=Bob,dc=example")));
    }

    #[test]
    fn ancestry_is_case_insensitive_on_values() {
        let base = dn("ou=People,dc=example,dc=com");
        let child = dn("uid=Alice,ou=people,dc=EXAMPLE,dc=com");
        assert!(child.is_below(&base));
    }

    #[test]
    fn strict_ancestry() {
        let base = dn("ou=People,dc=example,dc=com");
        let child = dn("uid=alice,ou=People,dc=example,dc=com");
        let grandchild = dn("cn=x,uid=alice,ou=People,dc=example,dc=com");
        assert!(child.is_below(&base));
        assert!(grandchild.is_below(&base));
        assert!(!base.is_below(&base));
        assert!(!dn("dc=example,dc=com").is_below(&base));
    }

    #[test]
    fn relative_component_is_the_rdn_directly_below_base() {
        let base = dn("ou=People,dc=example,dc=com");
        let child = dn("uid=alice,ou=People,dc=example,dc=com");
        let rdn = child.relative_component(&base).unwrap();
        assert_eq!(rdn.to_string(), "uid=alice");

        let grandchild = dn("cn=x,uid=alice,ou=People,dc=example,dc=com");
        let rdn = grandchild.relative_component(&base).unwrap();
        assert_eq!(rdn.to_string(), "uid=alice");

        assert!(base.relative_component(&base).is_none());
    }

    #[test]
    fn ancestor_one_below_base_walks_up_to_the_sibling_level() {
        let base = dn("ou=People,dc=example,dc=com");
        let grandchild = dn("cn=x,uid=alice,ou=People,dc=example,dc=com");
        let ancestor = grandchild.ancestor_one_below_base(&base);
        assert_eq!(ancestor.canonical_key(), "uid=alice,ou=People,dc=example,dc=com");
    }

    #[test]
    fn parent_of_root_is_none() {
        assert!(dn("dc=com").parent().unwrap().is_root());
        assert!(Dn::parse("").unwrap().parent().is_none());
    }

    #[test]
    fn rejects_component_without_equals() {
        assert!(Dn::parse("not-a-valid-rdn,dc=example").is_err());
    }
}
