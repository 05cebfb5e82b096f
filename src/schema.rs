//! Minimal schema loader (component H, ambient): reads `attributeTypes` lines out of one or more
//! LDIF-formatted schema files to learn which attributes use case-sensitive equality. Absence of
//! schema is not an error for the hash/fewest-entries strategies, which fall back to the ASCII
//! default (§9, "Schema optionality").

use crate::error::SchemaError;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// The per-attribute equality rules this tool cares about: whether comparisons fold case.
/// Everything not explicitly listed as case-exact defaults to case-insensitive, per §9.
#[derive(Debug, Default, Clone)]
pub struct Schema {
    case_exact_attributes: HashSet<String>,
}

impl Schema {
    pub fn empty() -> Self {
        Schema::default()
    }

    pub fn is_case_exact(&self, attribute: &str) -> bool {
        self.case_exact_attributes
            .contains(&attribute.to_ascii_lowercase())
    }

    /// Resolves the schema files for the given explicit paths (files or directories), or, if none
    /// are given, `$INSTANCE_ROOT/config/schema/*.ldif` sorted by name (§6, "Environment"). Returns
    /// an empty list rather than erroring when nothing is found; callers that require a schema to
    /// be present (the Filter strategy, per §4.H/§9) check for that themselves.
    pub fn resolve_files(explicit_paths: &[PathBuf]) -> Result<Vec<PathBuf>, SchemaError> {
        if explicit_paths.is_empty() {
            Ok(default_schema_files())
        } else {
            let mut files = Vec::new();
            for path in explicit_paths {
                collect_ldif_files(path, &mut files)?;
            }
            Ok(files)
        }
    }

    /// Parses schema out of the given files (already resolved via [`Schema::resolve_files`]).
    /// Absence of any file is not an error here (§9, "Schema optionality"); callers that require a
    /// schema to exist at all check the resolved file list themselves before calling this.
    pub fn load_from_files(files: &[PathBuf]) -> Result<Schema, SchemaError> {
        let mut schema = Schema::empty();
        for file in files {
            let text = fs::read_to_string(file).map_err(|source| SchemaError::Read {
                path: file.clone(),
                source,
            })?;
            parse_attribute_types(&text, &mut schema);
        }
        Ok(schema)
    }
}

fn default_schema_files() -> Vec<PathBuf> {
    let Ok(instance_root) = std::env::var("INSTANCE_ROOT") else {
        return Vec::new();
    };
    let dir = Path::new(&instance_root).join("config").join("schema");
    let mut files = Vec::new();
    let _ = collect_ldif_files(&dir, &mut files);
    files
}

fn collect_ldif_files(path: &Path, out: &mut Vec<PathBuf>) -> Result<(), SchemaError> {
    if path.is_dir() {
        let mut entries: Vec<PathBuf> = fs::read_dir(path)
            .map_err(|source| SchemaError::Read {
                path: path.to_path_buf(),
                source,
            })?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == "ldif").unwrap_or(false))
            .collect();
        entries.sort();
        out.extend(entries);
    } else if path.is_file() {
        out.push(path.to_path_buf());
    }
    Ok(())
}

/// Extracts the attribute name and `caseExactMatch` flag out of RFC 4512-ish `attributeTypes`
/// description lines. This is a pragmatic subset: enough to learn equality-sensitivity, not a full
/// schema description parser.
fn parse_attribute_types(text: &str, schema: &mut Schema) {
    for line in text.lines() {
        let line = line.trim();
        if !line.starts_with("attributeTypes:") {
            continue;
        }
        let body = line["attributeTypes:".len()..].trim();
        let name = extract_quoted_after(body, "NAME");
        let is_case_exact = body.contains("caseExactMatch") || body.contains("caseExactIA5Match");
        if let (Some(name), true) = (name, is_case_exact) {
            schema.case_exact_attributes.insert(name.to_ascii_lowercase());
        }
    }
}

fn extract_quoted_after<'a>(body: &'a str, keyword: &str) -> Option<&'a str> {
    let idx = body.find(keyword)?;
    let rest = &body[idx + keyword.len()..];
    let start = rest.find('\'')? + 1;
    let end = rest[start..].find('\'')? + start;
    Some(&rest[start..end])
}
