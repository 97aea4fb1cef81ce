//! Access to environment variables and the working directory.
//!
//! The store and the dotenv loader never call `std::env` directly; they go
//! through [`Environment`] so the process environment can be swapped for an
//! in-memory one.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use tracing::warn;

use crate::config::set_value;

/// Prefix marking environment variables that belong in the config tree.
pub const ENV_PREFIX: &str = "AIO_";

/// Variables and working directory visible to the config store.
pub trait Environment {
    /// All variables, in any order.
    fn vars(&self) -> Vec<(String, String)>;

    fn var(&self, key: &str) -> Option<String>;

    fn set_var(&mut self, key: &str, value: &str);

    fn current_dir(&self) -> PathBuf;

    fn contains(&self, key: &str) -> bool {
        self.var(key).is_some()
    }
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    fn var(&self, key: &str) -> Option<String> {
        std::env::var_os(key).and_then(|v| v.into_string().ok())
    }

    fn set_var(&mut self, key: &str, value: &str) {
        // SAFETY: the store is single-threaded; variables are only written
        // while loading `.env`, before any reader threads exist.
        unsafe {
            std::env::set_var(key, value);
        }
    }

    fn current_dir(&self) -> PathBuf {
        resolve_current_dir(std::env::current_dir(), std::env::var_os("PWD").map(PathBuf::from))
    }
}

/// Working directory, falling back to an absolute `$PWD` and then to `.`
/// when the OS cannot report it. Fallbacks are logged.
fn resolve_current_dir(cwd: io::Result<PathBuf>, pwd: Option<PathBuf>) -> PathBuf {
    match cwd {
        Ok(dir) => dir,
        Err(e) => {
            let fallback = pwd
                .filter(|dir| dir.is_absolute())
                .unwrap_or_else(|| PathBuf::from("."));
            warn!(
                error = %e,
                fallback = %fallback.display(),
                "cannot read working directory"
            );
            fallback
        }
    }
}

/// An in-memory environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryEnv {
    vars: BTreeMap<String, String>,
    cwd: PathBuf,
}

impl MemoryEnv {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            vars: BTreeMap::new(),
            cwd: cwd.into(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn remove_var(&mut self, key: &str) -> Option<String> {
        self.vars.remove(key)
    }

    pub fn set_current_dir(&mut self, cwd: impl Into<PathBuf>) {
        self.cwd = cwd.into();
    }
}

impl Environment for MemoryEnv {
    fn vars(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn set_var(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    fn current_dir(&self) -> PathBuf {
        self.cwd.clone()
    }
}

/// Map an environment variable name to a config dot path.
///
/// Returns `None` unless the name starts with `AIO_` (any case) followed by
/// at least one character. The remainder is lowercased and split once, at
/// its first run of underscores: `AIO_PGB_AUTH_TOKEN` becomes
/// `pgb.auth_token`.
pub fn env_key_to_path(key: &str) -> Option<String> {
    let prefix = key.get(..ENV_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(ENV_PREFIX) {
        return None;
    }
    let rest = &key[ENV_PREFIX.len()..];
    if rest.is_empty() {
        return None;
    }

    let rest = rest.to_lowercase();
    let path = match rest.find('_') {
        Some(start) => {
            let section = &rest[..start];
            let tail = rest[start..].trim_start_matches('_');
            format!("{section}.{tail}")
        }
        None => rest,
    };
    Some(path)
}

/// Build the `env` source tree from every `AIO_*` variable.
///
/// Values are always imported as strings. Variables are visited in name
/// order so collisions resolve the same way on every run. Returns the tree
/// and the imported paths.
pub fn scan_env(env: &dyn Environment) -> (Value, Vec<String>) {
    let mut vars = env.vars();
    vars.sort();

    let mut tree = Value::Object(Map::new());
    let mut keys = Vec::new();
    for (key, value) in vars {
        if let Some(path) = env_key_to_path(&key) {
            tree = set_value(&path, Value::String(value), Some(&tree));
            keys.push(path);
        }
    }
    (tree, keys)
}
