//! The parsed entry the router and pipeline operate on, and its LDIF serialization.

use crate::dn::Dn;

/// A parsed LDIF entry: a DN plus an ordered multimap of attribute name to values, in the order
/// they appeared in the source. Values are kept as UTF-8 text; base64-encoded (`::`) values are
/// decoded by the reader before an `Entry` is constructed.
#[derive(Debug, Clone)]
pub struct Entry {
    dn: Dn,
    dn_text: String,
    attributes: Vec<(String, Vec<String>)>,
}

impl Entry {
    pub fn new(dn: Dn, dn_text: String, attributes: Vec<(String, Vec<String>)>) -> Self {
        Entry {
            dn,
            dn_text,
            attributes,
        }
    }

    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    /// Values of the named attribute, in entry order, ignoring case of the attribute name.
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .flat_map(|(_, values)| values.iter().map(|v| v.as_str()))
            .collect()
    }

    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(|v| v.as_str())
    }

    /// Byte-exact LDIF serialization of this entry, terminated by a blank line (invariant 4 of the
    /// data model: "A translated entry's serialized bytes are a byte-exact LDIF representation
    /// terminated by at least one blank line.").
    pub fn to_ldif(&self) -> String {
        let mut out = String::new();
        out.push_str("dn: ");
        out.push_str(&self.dn_text);
        out.push('\n');
        for (attr, values) in &self.attributes {
            for value in values {
                out.push_str(attr);
                out.push_str(": ");
                out.push_str(value);
                out.push('\n');
            }
        }
        out.push('\n');
        out
    }
}
