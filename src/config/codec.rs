//! Reading and writing config files in one of two textual formats.
//!
//! The format is sniffed on read: text whose first non-whitespace character
//! is `{` is lenient JSON (JSON5, so comments and unquoted keys are fine),
//! anything else is YAML. The detected format travels with the tree so the
//! next write uses the same one.

use crate::error::{ConfigError, Result};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// On-disk serialization format of a config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// Braced JSON, read leniently, written compact.
    #[default]
    Json,
    /// Block YAML with sorted keys.
    Yaml,
}

impl Format {
    /// Detect the format of non-empty file text.
    pub fn sniff(text: &str) -> Self {
        if text.trim_start().starts_with('{') {
            Format::Json
        } else {
            Format::Yaml
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed config file together with the format it was written in.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFile {
    pub tree: Value,
    pub format: Format,
}

impl Default for LoadedFile {
    fn default() -> Self {
        Self {
            tree: Value::Object(Map::new()),
            format: Format::default(),
        }
    }
}

/// Parse config text. `path` is only used for error reporting.
pub fn parse(text: &str, path: &Path) -> Result<LoadedFile> {
    if text.trim().is_empty() {
        return Ok(LoadedFile::default());
    }

    let format = Format::sniff(text);
    let tree = match format {
        Format::Json => {
            json5::from_str::<Value>(text).map_err(|e| ConfigError::parse(format, path, e))?
        }
        Format::Yaml => {
            serde_yaml::from_str::<Value>(text).map_err(|e| ConfigError::parse(format, path, e))?
        }
    };

    // A YAML document holding only comments deserializes to null.
    let tree = match tree {
        Value::Null => Value::Object(Map::new()),
        tree => tree,
    };

    Ok(LoadedFile { tree, format })
}

/// Read and parse a config file.
///
/// Text that is not valid UTF-8 is a parse error, not an I/O error, so it
/// is never mistaken for an unreadable file and overwritten.
pub fn load(path: &Path) -> Result<LoadedFile> {
    debug!(path = %path.display(), "reading config");
    let bytes = std::fs::read(path).map_err(|e| ConfigError::io(path, e))?;
    let text = String::from_utf8(bytes).map_err(|e| {
        let format = Format::sniff(&String::from_utf8_lossy(e.as_bytes()));
        ConfigError::parse(format, path, e.utf8_error())
    })?;
    parse(&text, path)
}

/// Remove null entries and empty mappings, bottom-up.
///
/// A mapping emptied by pruning its children is pruned as well. Lists are
/// left as they are.
pub fn shake(tree: Value) -> Value {
    match tree {
        Value::Object(map) => Value::Object(shake_map(map)),
        other => other,
    }
}

fn shake_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::Object(child) => {
                let child = shake_map(child);
                (!child.is_empty()).then(|| (key, Value::Object(child)))
            }
            other => Some((key, other)),
        })
        .collect()
}

fn is_blank(tree: &Value) -> bool {
    match tree {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Render a tree as file text after shaking it.
///
/// A tree with nothing left after shaking renders as the empty string.
pub fn render(tree: &Value, format: Format) -> Result<String> {
    let shaken = shake(tree.clone());
    if is_blank(&shaken) {
        return Ok(String::new());
    }

    let serialize_err = |e: &dyn std::fmt::Display| ConfigError::Serialize {
        format,
        message: e.to_string(),
    };
    match format {
        Format::Json => serde_json::to_string(&shaken).map_err(|e| serialize_err(&e)),
        Format::Yaml => serde_yaml::to_string(&shaken).map_err(|e| serialize_err(&e)),
    }
}

/// Write a tree to `path` in the given format, creating parent directories.
///
/// The text is fully rendered before anything touches the disk.
pub fn save(path: &Path, tree: &Value, format: Format) -> Result<()> {
    let text = render(tree, format)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
    }

    debug!(path = %path.display(), %format, bytes = text.len(), "writing config");
    std::fs::write(path, text).map_err(|e| ConfigError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn p() -> &'static Path {
        Path::new("/test/aio")
    }

    #[test]
    fn test_sniff() {
        assert_eq!(Format::sniff("{ a: 1 }"), Format::Json);
        assert_eq!(Format::sniff("\n\t  {}"), Format::Json);
        assert_eq!(Format::sniff("a: 1"), Format::Yaml);
        assert_eq!(Format::sniff("- 1"), Format::Yaml);
    }

    #[test]
    fn test_parse_empty_defaults_to_json() {
        assert_eq!(parse("", p()).unwrap(), LoadedFile::default());
        assert_eq!(
            parse("  \n\t ", p()).unwrap(),
            LoadedFile {
                tree: json!({}),
                format: Format::Json
            }
        );
    }

    #[test]
    fn test_parse_yaml() {
        let loaded = parse("a: 12", p()).unwrap();
        assert_eq!(loaded.tree, json!({"a": 12}));
        assert_eq!(loaded.format, Format::Yaml);
    }

    #[test]
    fn test_parse_comment_only_yaml() {
        let loaded = parse("# nothing here\n", p()).unwrap();
        assert_eq!(loaded.tree, json!({}));
        assert_eq!(loaded.format, Format::Yaml);
    }

    #[test]
    fn test_parse_lenient_json() {
        let loaded = parse("{ a: 12, // trailing\n 'b': [1, 2,], }", p()).unwrap();
        assert_eq!(loaded.tree, json!({"a": 12, "b": [1, 2]}));
        assert_eq!(loaded.format, Format::Json);
    }

    #[test]
    fn test_parse_json_error() {
        let err = parse("{{{{{", p()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: Format::Json, .. }));
    }

    #[test]
    fn test_parse_yaml_error() {
        let err = parse("a: [1, 2", p()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: Format::Yaml, .. }));
    }

    #[test]
    fn test_shake_cascades() {
        let tree = json!({"a": 12, "b": {"c": {}, "d": null}, "e": {"f": {"g": null}}});
        assert_eq!(shake(tree), json!({"a": 12}));
    }

    #[test]
    fn test_shake_keeps_lists_and_falsy_scalars() {
        let tree = json!({"a": [], "b": [null, {}], "c": false, "d": 0, "e": ""});
        assert_eq!(shake(tree.clone()), tree);
    }

    #[test]
    fn test_render_empty_is_empty_string() {
        assert_eq!(render(&json!({}), Format::Yaml).unwrap(), "");
        assert_eq!(render(&json!({}), Format::Json).unwrap(), "");
        assert_eq!(render(&Value::Null, Format::Json).unwrap(), "");
        assert_eq!(render(&json!({"a": {"b": null}}), Format::Yaml).unwrap(), "");
    }

    #[test]
    fn test_render_yaml_sorted() {
        let text = render(&json!({"b": {"d": 1, "c": 2}, "a": 12}), Format::Yaml).unwrap();
        assert_eq!(text, "a: 12\nb:\n  c: 2\n  d: 1\n");
    }

    #[test]
    fn test_render_yaml_removes_leaves() {
        let text = render(&json!({"a": 12, "b": {"c": {}, "d": 1}}), Format::Yaml).unwrap();
        assert_eq!(text, "a: 12\nb:\n  d: 1\n");
    }

    #[test]
    fn test_render_json_compact() {
        let text = render(&json!({"a": 12, "b": {"c": "x"}}), Format::Json).unwrap();
        assert_eq!(text, r#"{"a":12,"b":{"c":"x"}}"#);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a/b/c/file.yaml");
        save(&path, &json!({"a": 12}), Format::Yaml).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a: 12\n");

        // Existing directories are fine.
        save(&path, &json!({"a": 13}), Format::Yaml).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a: 13\n");
    }

    #[test]
    fn test_save_empty_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("aio");
        save(&path, &json!({"gone": null}), Format::Yaml).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
        assert_eq!(load(&path).unwrap(), LoadedFile::default());
    }

    #[test]
    fn test_yaml_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("aio");
        let tree = json!({
            "pgb": {"name": "app", "auth_token": "abc"},
            "list": [1, "two", {"three": 3}],
            "flag": true,
            "ratio": 0.5
        });
        save(&path, &tree, Format::Yaml).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.tree, tree);
        assert_eq!(loaded.format, Format::Yaml);
    }

    #[test]
    fn test_json_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("aio");
        let tree = json!({"a": {"b": [1, 2]}, "c": "d", "drop": null});
        save(&path, &tree, Format::Json).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.tree, json!({"a": {"b": [1, 2]}, "c": "d"}));
        assert_eq!(loaded.format, Format::Json);
    }

    #[test]
    fn test_load_invalid_utf8_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("aio");
        std::fs::write(&path, b"keep: me\nname: caf\xE9\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: Format::Yaml, .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = load(&temp.path().join("nope")).unwrap_err();
        assert!(err.is_not_found());
    }
}
