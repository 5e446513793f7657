//! The precomputed search index: loading, validation and building.

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{Result, SearchError};

/// One searchable post. `path` doubles as the post's URL stem.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: String,
    pub content: String,
}

impl Document {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Document {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Read and parse the index file without validating its shape.
pub fn load_index(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).map_err(|source| SearchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SearchError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Turn the raw index into documents.
///
/// The top level must be an array. Entries without a string `path` and a
/// string `content` are skipped rather than rejected.
pub fn documents_from_value(value: &Value) -> Result<Vec<Document>> {
    let items = value.as_array().ok_or_else(|| {
        SearchError::malformed(format!("expected an array, found {}", json_kind(value)))
    })?;

    let mut documents = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = item.get("path").and_then(Value::as_str);
        let content = item.get("content").and_then(Value::as_str);
        match (path, content) {
            (Some(path), Some(content)) if !content.is_empty() => {
                documents.push(Document::new(path, content));
            }
            _ => log::debug!("Skipping search index entry {i}: missing path or content"),
        }
    }

    Ok(documents)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Remove a leading `---` delimited front matter block.
pub fn strip_front_matter(content: &str) -> &str {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return content;
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        if line.trim_end() == "---" {
            return rest[offset..].trim_start_matches(['\r', '\n']);
        }
    }
    content
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| SearchError::ExcludePattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| SearchError::ExcludePattern {
        pattern: patterns.join(","),
        source,
    })
}

/// Walk `root` and collect every post with one of `extensions`.
///
/// Paths are relative to `root`, use `/` separators and drop the extension,
/// so `/posts/{path}.html` resolves to the rendered page.
pub fn build_index(root: &Path, extensions: &[String], exclude: &[String]) -> Result<Vec<Document>> {
    let extensions: HashSet<String> = extensions.iter().map(|e| e.trim().to_lowercase()).collect();
    let excludes = build_globset(exclude)?;

    let mut builder = WalkBuilder::new(root);
    builder.hidden(true).git_ignore(true).git_global(true);

    let mut documents = Vec::new();
    for entry in builder.build().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            continue;
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if !extensions.contains(&ext) {
            continue;
        }

        let rel = path.strip_prefix(root).unwrap_or(path);
        if excludes.is_match(rel) {
            log::debug!("Excluded {}", rel.display());
            continue;
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };

        let stem = rel.with_extension("");
        let doc_path = stem
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        documents.push(Document::new(doc_path, strip_front_matter(&content).trim_end()));
    }

    documents.sort_by(|a, b| a.path.cmp(&b.path));
    log::info!("Indexed {} documents under {}", documents.len(), root.display());
    Ok(documents)
}

/// Write documents as the JSON array the site serves.
pub fn write_index(documents: &[Document], output: &Path) -> Result<()> {
    let json = serde_json::to_string(documents).map_err(|source| SearchError::Json {
        path: output.to_path_buf(),
        source,
    })?;
    fs::write(output, json).map_err(|source| SearchError::Io {
        path: output.to_path_buf(),
        source,
    })
}
