//! Loading `KEY=VALUE` pairs from a `.env` file into the environment.
//!
//! Variables already present in the environment always win; the file only
//! fills in what is missing. Loading is idempotent per resolved `.env` path:
//! the [`Dotenv`] marker remembers the last path it tried, so a new working
//! directory triggers a fresh load but a repeated call does nothing.

use crate::env::Environment;
use regex_lite::Regex;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// Name of the bootstrap file, relative to the working directory.
pub const DOTENV_FILE: &str = ".env";

static SINGLE_QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*([^=\n#]+?)[ \t]*=[ \t]*'((?:''|[^'])*)'"#).expect("valid regex")
});

static DOUBLE_QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*([^=\n#]+?)[ \t]*=[ \t]*"((?:""|[^"])*)""#).expect("valid regex")
});

static UNQUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*([^=\n#]+?)[ \t]*=[ \t]*([^'" \t\r\n].*)$"#).expect("valid regex")
});

/// Parse `.env` text into a map.
///
/// Each line is matched against three value forms, in precedence order:
/// single-quoted (`''` escapes a quote), double-quoted (`""` escapes a
/// quote), and bare (a trailing ` #comment` is dropped and the rest
/// trimmed). Quoted values may span lines. When a key appears more than
/// once, the last line wins.
pub fn parse(text: &str) -> BTreeMap<String, String> {
    // Line offset -> assignment. The first form to claim a line keeps it.
    let mut lines: BTreeMap<usize, (String, String)> = BTreeMap::new();
    let mut claim = |regex: &Regex, unescape: &dyn Fn(&str) -> String| {
        for caps in regex.captures_iter(text) {
            let Some(line) = caps.get(0) else { continue };
            lines
                .entry(line.start())
                .or_insert_with(|| (caps[1].to_string(), unescape(&caps[2])));
        }
    };

    claim(&*SINGLE_QUOTED, &|value| value.replace("''", "'"));
    claim(&*DOUBLE_QUOTED, &|value| value.replace("\"\"", "\""));
    claim(&*UNQUOTED, &|value| {
        let value = value.find(" #").map_or(value, |at| &value[..at]);
        value.trim().to_string()
    });

    lines.into_values().collect()
}

/// What a call to [`Dotenv::load`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DotenvStatus {
    /// This path was already handled earlier; nothing was read.
    AlreadyLoaded,
    /// No `.env` file exists.
    Missing,
    /// The file exists but could not be read; the error was logged.
    Unreadable,
    /// The file was read. Holds the newly added variable names, sorted.
    Loaded(Vec<String>),
}

/// Idempotency marker for `.env` loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dotenv {
    loaded: Option<PathBuf>,
}

impl Dotenv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the last `.env` file a load was attempted for.
    pub fn loaded(&self) -> Option<&Path> {
        self.loaded.as_deref()
    }

    /// Forget the marker so the next [`load`](Self::load) reads the file again.
    pub fn reset(&mut self) {
        self.loaded = None;
    }

    /// Hoist variables from `<cwd>/.env` into `env`.
    ///
    /// Read errors other than a missing file are logged and otherwise
    /// ignored. The marker is set whatever the outcome, so a broken file is
    /// not retried on every reload.
    pub fn load(&mut self, env: &mut dyn Environment) -> DotenvStatus {
        let file = env.current_dir().join(DOTENV_FILE);
        if self.loaded.as_deref() == Some(file.as_path()) {
            return DotenvStatus::AlreadyLoaded;
        }

        let status = match std::fs::read_to_string(&file) {
            Ok(text) => {
                debug!(path = %file.display(), "loading environment variables");
                let added = hoist(parse(&text), env);
                if added.is_empty() {
                    debug!("no environment variables added");
                } else {
                    debug!(keys = %added.join(", "), "added environment variables");
                }
                DotenvStatus::Loaded(added)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => DotenvStatus::Missing,
            Err(e) => {
                debug!(
                    path = %file.display(),
                    error = %e,
                    "cannot read environment variables, skipping"
                );
                DotenvStatus::Unreadable
            }
        };

        self.loaded = Some(file);
        status
    }
}

/// Add every parsed variable the environment does not already have.
fn hoist(vars: BTreeMap<String, String>, env: &mut dyn Environment) -> Vec<String> {
    let mut added = Vec::new();
    for (key, value) in vars {
        if !env.contains(&key) {
            env.set_var(&key, &value);
            added.push(key);
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MemoryEnv;
    use tempfile::TempDir;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n   \n").is_empty());
    }

    #[test]
    fn test_parse_single() {
        let text = "A=12\nB='12'\nC=\"12\"\n";
        assert_eq!(parse(text), map(&[("A", "12"), ("B", "12"), ("C", "12")]));
    }

    #[test]
    fn test_parse_comments() {
        let text = "# leading comment\nA=#comment\nB=1 # trailing\n#C=3\n";
        assert_eq!(parse(text), map(&[("A", "#comment"), ("B", "1")]));
    }

    #[test]
    fn test_parse_multiline() {
        let text = "A='\n12'\nB=\"\n12\"\nC=1\n";
        assert_eq!(parse(text), map(&[("A", "\n12"), ("B", "\n12"), ("C", "1")]));
    }

    #[test]
    fn test_parse_quotes() {
        let text = "A='   12''  \n'\nB=\"   12\"\" \n\"\nC='  12  '\n";
        assert_eq!(
            parse(text),
            map(&[("A", "   12'  \n"), ("B", "   12\" \n"), ("C", "  12  ")])
        );
    }

    #[test]
    fn test_parse_spacing_and_crlf() {
        let text = "  A = 1  \r\nB= 'x'\r\n";
        assert_eq!(parse(text), map(&[("A", "1"), ("B", "x")]));
    }

    #[test]
    fn test_parse_duplicate_key_last_wins() {
        assert_eq!(parse("A=1\nA=2\n"), map(&[("A", "2")]));
        assert_eq!(parse("A='quoted'\nA=bare\n"), map(&[("A", "bare")]));
        assert_eq!(parse("A=bare\nA=\"quoted\"\n"), map(&[("A", "quoted")]));
        assert_eq!(parse("A='1'\nB=2\nA='3'\n"), map(&[("A", "3"), ("B", "2")]));
    }

    #[test]
    fn test_parse_empty_value_skipped() {
        assert!(parse("A=\n").is_empty());
        assert_eq!(parse("A=''\n"), map(&[("A", "")]));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let mut env = MemoryEnv::new(temp.path());
        let mut dotenv = Dotenv::new();

        assert_eq!(dotenv.load(&mut env), DotenvStatus::Missing);
        assert_eq!(dotenv.loaded(), Some(temp.path().join(".env").as_path()));
        assert_eq!(env, MemoryEnv::new(temp.path()));
    }

    #[test]
    fn test_load_adds_new_keys_only() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".env"), "A=1\nB=2\n").unwrap();
        let mut env = MemoryEnv::new(temp.path()).with_var("A", "12");
        let mut dotenv = Dotenv::new();

        assert_eq!(dotenv.load(&mut env), DotenvStatus::Loaded(vec!["B".to_string()]));
        assert_eq!(env.var("A").as_deref(), Some("12"));
        assert_eq!(env.var("B").as_deref(), Some("2"));
    }

    #[test]
    fn test_load_nothing_added() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".env"), "A=1").unwrap();
        let mut env = MemoryEnv::new(temp.path()).with_var("A", "12");

        assert_eq!(Dotenv::new().load(&mut env), DotenvStatus::Loaded(vec![]));
        assert_eq!(env.var("A").as_deref(), Some("12"));
    }

    #[test]
    fn test_load_is_idempotent_per_path() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".env"), "A=1\n").unwrap();
        let mut env = MemoryEnv::new(temp.path());
        let mut dotenv = Dotenv::new();

        assert!(matches!(dotenv.load(&mut env), DotenvStatus::Loaded(_)));

        // Changes to the file are not picked up until the marker moves.
        std::fs::write(temp.path().join(".env"), "A=1\nB=2\n").unwrap();
        assert_eq!(dotenv.load(&mut env), DotenvStatus::AlreadyLoaded);
        assert_eq!(env.var("B"), None);

        dotenv.reset();
        assert_eq!(dotenv.load(&mut env), DotenvStatus::Loaded(vec!["B".to_string()]));
    }

    #[test]
    fn test_load_changed_cwd_reloads() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(second.path().join(".env"), "C=3\n").unwrap();
        let mut env = MemoryEnv::new(first.path());
        let mut dotenv = Dotenv::new();

        assert_eq!(dotenv.load(&mut env), DotenvStatus::Missing);
        env.set_current_dir(second.path());
        assert_eq!(dotenv.load(&mut env), DotenvStatus::Loaded(vec!["C".to_string()]));
    }

    #[test]
    fn test_load_unreadable_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        // A directory where the file should be cannot be read as text.
        std::fs::create_dir(temp.path().join(".env")).unwrap();
        let mut env = MemoryEnv::new(temp.path());
        let mut dotenv = Dotenv::new();

        assert_eq!(dotenv.load(&mut env), DotenvStatus::Unreadable);
        assert_eq!(dotenv.load(&mut env), DotenvStatus::AlreadyLoaded);
    }
}
