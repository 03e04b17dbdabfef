//! Work-item discovery from a posts directory.
//!
//! The filename is the stable id across runs (the publish log keys on it);
//! the stem becomes the title. Optional YAML front matter is stripped from
//! the body.

use std::path::Path;

use inkpost_common::{InkpostError, Result};
use inkpost_engine::pipeline::WorkItem;

/// Collect `.md` files from `dir`, sorted by filename for a stable order.
pub fn discover(dir: &Path) -> Result<Vec<WorkItem>> {
    if !dir.is_dir() {
        return Err(InkpostError::precondition(format!(
            "posts directory not found: {}",
            dir.display()
        )));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| {
        InkpostError::precondition(format!("reading posts directory {}: {e}", dir.display()))
    })?;
    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
        .collect();
    paths.sort();

    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            InkpostError::precondition(format!("reading {}: {e}", path.display()))
        })?;
        let (Some(id), Some(stem)) = (
            path.file_name().and_then(|n| n.to_str()),
            path.file_stem().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        items.push(WorkItem {
            id: id.to_string(),
            title: stem.to_string(),
            body: strip_front_matter(&raw).trim().to_string(),
        });
    }
    Ok(items)
}

/// Drop a leading front matter block delimited by `---` lines; the
/// platforms never see metadata. Only whole delimiter lines count, so a
/// literal `---` inside a value never ends the block early.
fn strip_front_matter(raw: &str) -> &str {
    let Some(rest) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        return raw;
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return &rest[offset + line.len()..];
        }
        offset += line.len();
    }
    raw
}
