//! LDIF record tokenizing (component G): groups raw input lines into logical records, joining
//! folded continuation lines per RFC 2849 ("a line that begins with a single space is a
//! continuation of the previous line").

use std::io::{self, BufRead};

/// The raw, still-folded-and-commented lines belonging to one LDIF record, plus the source
/// sequence number the reader assigned it.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub seq: u64,
    /// Logical lines: folding already undone, comments and the leading `version:` line removed.
    pub lines: Vec<String>,
}

impl RawRecord {
    /// Re-renders the raw lines as they'd appear on disk, used when writing a malformed record
    /// into the `.errors` shard (§4.E).
    pub fn raw_text(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

/// Reads logical records off `input`, skipping a leading version line and comments, and joining
/// folded continuation lines. Yields `Err` exactly once, on the read that failed, and never yields
/// again afterward (the caller treats this as `UnrecoverableParseError`).
pub struct RecordReader<R> {
    lines: io::Lines<R>,
    next_seq: u64,
    pending: Option<String>,
    seen_first_line: bool,
    errored: bool,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        RecordReader {
            lines: reader.lines(),
            next_seq: 0,
            pending: None,
            seen_first_line: false,
            errored: false,
        }
    }

    fn next_logical_line(&mut self) -> io::Result<Option<String>> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }
        let mut current = match self.lines.next() {
            None => return Ok(None),
            Some(line) => line?,
        };
        if !self.seen_first_line {
            self.seen_first_line = true;
            if current.trim_start().starts_with("version:") {
                current = match self.lines.next() {
                    None => return Ok(None),
                    Some(line) => line?,
                };
            }
        }
        loop {
            match self.lines.next() {
                Some(Ok(next)) if next.starts_with(' ') => {
                    current.push_str(&next[1..]);
                }
                Some(Ok(next)) => {
                    self.pending = Some(next);
                    break;
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        Ok(Some(current))
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = io::Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.errored {
            return None;
        }
        let mut lines = Vec::new();
        loop {
            match self.next_logical_line() {
                Ok(Some(line)) => {
                    if line.starts_with('#') {
                        continue;
                    }
                    if line.trim().is_empty() {
                        if lines.is_empty() {
                            continue;
                        }
                        break;
                    }
                    lines.push(line);
                }
                Ok(None) => break,
                Err(e) => {
                    self.errored = true;
                    return Some(Err(e));
                }
            }
        }
        if lines.is_empty() {
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        Some(Ok(RawRecord { seq, lines }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn records(text: &str) -> Vec<RawRecord> {
        RecordReader::new(Cursor::new(text.as_bytes()))
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn splits_on_blank_lines_and_skips_version() {
        let text = "version: 1\n\ndn: dc=example,dc=com\nobjectClass: domain\n\ndn: ou=People,dc=example,dc=com\nobjectClass: organizationalUnit\n";
        let recs = records(text);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].seq, 0);
        assert_eq!(recs[1].seq, 1);
        assert_eq!(recs[0].lines[0], "dn: dc=example,dc=com");
    }

    #[test]
    fn joins_folded_continuation_lines() {
        let text = "dn: cn=A very long common\n name,dc=example,dc=com\nobjectClass: person\n\n";
        let recs = records(text);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].lines[0], "dn: cn=A very long commonname,dc=example,dc=com");
    }

    #[test]
    fn skips_comment_lines() {
        let text = "# a comment\ndn: dc=example,dc=com\n# another comment\nobjectClass: domain\n\n";
        let recs = records(text);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].lines, vec!["dn: dc=example,dc=com", "objectClass: domain"]);
    }
}
