//! Key paths of a Helm `values.yaml` document.

use helmchk_core::{Path, PathSet};
use serde_yaml::Value as YamlValue;
use vfs::VfsPath;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read values document {path}")]
    Read {
        path: String,
        #[source]
        source: vfs::VfsError,
    },

    #[error("failed to parse values document {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Parse a values document from its YAML source.
///
/// `name` is only used for error messages. YAML merge keys (`<<`) are
/// applied, as Helm does when loading values.
///
/// # Errors
///
/// Returns [`DocumentError::Parse`] if `src` is not valid YAML.
pub fn parse_values_document(name: &str, src: &str) -> Result<YamlValue, DocumentError> {
    let parse_err = |source| DocumentError::Parse {
        path: name.to_string(),
        source,
    };
    let mut doc: YamlValue = serde_yaml::from_str(src).map_err(parse_err)?;
    doc.apply_merge().map_err(parse_err)?;
    Ok(doc)
}

/// Read, parse and extract the key paths of the values document at `path`.
///
/// # Errors
///
/// Returns a [`DocumentError`] if the file cannot be read or parsed.
pub fn load_values_paths(path: &VfsPath) -> Result<PathSet, DocumentError> {
    let src = path.read_to_string().map_err(|source| DocumentError::Read {
        path: path.as_str().to_string(),
        source,
    })?;
    let doc = parse_values_document(path.as_str(), &src)?;
    let paths = extract_values_paths(&doc);
    tracing::debug!(path = path.as_str(), count = paths.len(), "extracted values paths");
    Ok(paths)
}

/// Every path reachable in `doc`, including the root and every container.
///
/// All elements of a sequence collapse onto a single wildcard segment.
#[must_use]
pub fn extract_values_paths(doc: &YamlValue) -> PathSet {
    let mut paths = PathSet::new();
    walk_values(doc, Path::root(), &mut paths);
    paths
}

fn walk_values(node: &YamlValue, path: Path, out: &mut PathSet) {
    match node {
        YamlValue::Mapping(mapping) => {
            for (key, value) in mapping {
                walk_values(value, path.child(key_text(key)), out);
            }
        }
        YamlValue::Sequence(items) => {
            let element = path.wildcard();
            for item in items {
                walk_values(item, element.clone(), out);
            }
        }
        YamlValue::Tagged(tagged) => {
            walk_values(&tagged.value, path.clone(), out);
        }
        YamlValue::Null | YamlValue::Bool(_) | YamlValue::Number(_) | YamlValue::String(_) => {}
    }
    out.insert(path);
}

/// Stable textual form of a mapping key.
fn key_text(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        YamlValue::Tagged(tagged) => key_text(&tagged.value),
        other => flow_text(other),
    }
}

/// Compact flow-style rendering, used for non-string keys.
fn flow_text(value: &YamlValue) -> String {
    match value {
        YamlValue::Null => "null".to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::String(s) => s.clone(),
        YamlValue::Sequence(items) => {
            let items: Vec<String> = items.iter().map(flow_text).collect();
            format!("[{}]", items.join(", "))
        }
        YamlValue::Mapping(mapping) => {
            let entries: Vec<String> = mapping
                .iter()
                .map(|(k, v)| format!("{}: {}", flow_text(k), flow_text(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        YamlValue::Tagged(tagged) => format!("{} {}", tagged.tag, flow_text(&tagged.value)),
    }
}
