//! Layered configuration store.
//!
//! Holds one tree per source and the merged view of all three. Sources are
//! re-read from disk and the environment on every reload; the merged view is
//! always derived, never written directly.

use super::access::{get_value, set_value};
use super::codec::{self, Format, LoadedFile};
use super::merge::merge;
use crate::dotenv::Dotenv;
use crate::env::{Environment, ProcessEnv, scan_env};
use crate::error::{ConfigError, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the global config file explicitly.
pub const CONFIG_FILE_VAR: &str = "AIO_CONFIG_FILE";

/// File name of the global config inside the config base directory.
pub const GLOBAL_FILE_NAME: &str = "aio";

/// File name of the project-local config inside the working directory.
pub const LOCAL_FILE_NAME: &str = ".aio";

/// Configuration source, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    /// User-wide config file.
    Global,
    /// Config file in the working directory.
    Local,
    /// `AIO_*` environment variables (highest precedence).
    Env,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Global => write!(f, "global"),
            Source::Local => write!(f, "local"),
            Source::Env => write!(f, "env"),
        }
    }
}

/// Locations of the file-backed sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub global_file: PathBuf,
    pub local_file: PathBuf,
}

impl ConfigPaths {
    pub fn new(global_file: impl Into<PathBuf>, local_file: impl Into<PathBuf>) -> Self {
        Self {
            global_file: global_file.into(),
            local_file: local_file.into(),
        }
    }

    /// Discover config paths from the environment.
    ///
    /// Global: `$AIO_CONFIG_FILE`, else `$XDG_CONFIG_HOME/aio`, else
    /// `~/.config/aio`. Local: `<cwd>/.aio`.
    pub fn discover(env: &dyn Environment) -> Result<Self> {
        let var = |key: &str| env.var(key).filter(|v| !v.is_empty());

        let global_file = match var(CONFIG_FILE_VAR) {
            Some(file) => PathBuf::from(file),
            None => {
                let base = match var("XDG_CONFIG_HOME") {
                    Some(xdg) => PathBuf::from(xdg),
                    None => var("HOME")
                        .map(PathBuf::from)
                        .or_else(dirs::home_dir)
                        .ok_or(ConfigError::HomeDirUnavailable)?
                        .join(".config"),
                };
                base.join(GLOBAL_FILE_NAME)
            }
        };

        Ok(Self {
            global_file,
            local_file: env.current_dir().join(LOCAL_FILE_NAME),
        })
    }
}

/// A file-backed source: where it lives, what it holds, how it is written.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub tree: Value,
    pub format: Format,
}

impl SourceFile {
    fn empty(path: PathBuf) -> Self {
        Self {
            path,
            tree: Value::Object(Map::new()),
            format: Format::default(),
        }
    }
}

/// Read a source file for reload.
///
/// A missing file is an empty tree. Other I/O errors are logged and also
/// yield an empty tree. Parse errors propagate.
fn read_source(path: &Path) -> Result<LoadedFile> {
    match codec::load(path) {
        Ok(loaded) => Ok(loaded),
        Err(e) if e.is_not_found() => Ok(LoadedFile::default()),
        Err(e @ ConfigError::Io { .. }) => {
            warn!(path = %path.display(), error = %e, "cannot read config, treating as empty");
            Ok(LoadedFile::default())
        }
        Err(e) => Err(e),
    }
}

fn display_key(path: &str) -> &str {
    if path.trim().is_empty() { "<all>" } else { path }
}

/// Merged read/write view over the global file, the local file and the
/// environment.
#[derive(Debug, Clone)]
pub struct ConfigStore<E: Environment = ProcessEnv> {
    env: E,
    dotenv: Dotenv,
    global: SourceFile,
    local: SourceFile,
    envs: Value,
    values: Value,
}

impl ConfigStore<ProcessEnv> {
    /// Open the store for the current process and load every source.
    pub fn load() -> Result<Self> {
        Self::with_env(ProcessEnv)
    }
}

impl<E: Environment> ConfigStore<E> {
    /// Open a store whose paths are discovered from `env`.
    pub fn with_env(env: E) -> Result<Self> {
        let paths = ConfigPaths::discover(&env)?;
        Self::with_paths(paths, env)
    }

    /// Open a store with explicit file locations.
    pub fn with_paths(paths: ConfigPaths, env: E) -> Result<Self> {
        let mut store = Self {
            env,
            dotenv: Dotenv::new(),
            global: SourceFile::empty(paths.global_file),
            local: SourceFile::empty(paths.local_file),
            envs: Value::Object(Map::new()),
            values: Value::Object(Map::new()),
        };
        store.reload()?;
        Ok(store)
    }

    /// Re-read `.env`, both files and the environment, then rebuild the
    /// merged view.
    pub fn reload(&mut self) -> Result<&mut Self> {
        self.dotenv.load(&mut self.env);

        let global = read_source(&self.global.path)?;
        let local = read_source(&self.local.path)?;
        self.global.tree = global.tree;
        self.global.format = global.format;
        self.local.tree = local.tree;
        self.local.format = local.format;

        let (envs, keys) = scan_env(&self.env);
        if !keys.is_empty() {
            debug!(keys = %keys.join(", "), "reading env variables");
        }
        self.envs = envs;

        self.values = merge([&self.global.tree, &self.local.tree, &self.envs]);
        Ok(self)
    }

    fn tree(&self, source: Option<Source>) -> &Value {
        match source {
            None => &self.values,
            Some(Source::Global) => &self.global.tree,
            Some(Source::Local) => &self.local.tree,
            Some(Source::Env) => &self.envs,
        }
    }

    /// Value at `path` in the merged view, or `None` if absent.
    ///
    /// The empty path returns the whole merged tree.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.get_from(path, None)
    }

    /// Value at `path` in one source, or in the merged view for `None`.
    pub fn get_from(&self, path: &str, source: Option<Source>) -> Option<Value> {
        let source_name = source.map_or("merged".to_string(), |s| s.to_string());
        debug!(key = display_key(path), source = %source_name, "reading config");
        get_value(self.tree(source), path).cloned()
    }

    /// Write `value` at `path` in the global file, or the local file when
    /// `local` is set, then reload.
    ///
    /// The file keeps the format it was read in. A blank path replaces the
    /// whole file.
    pub fn set(&mut self, path: &str, value: Value, local: bool) -> Result<&mut Self> {
        let file = if local { &self.local } else { &self.global };
        let to_save = set_value(path, value, Some(&file.tree));

        debug!(
            key = display_key(path),
            path = %file.path.display(),
            "writing config"
        );
        codec::save(&file.path, &to_save, file.format)?;
        self.reload()
    }

    /// Remove `path` from the global or local file, then reload.
    pub fn delete(&mut self, path: &str, local: bool) -> Result<&mut Self> {
        self.set(path, Value::Null, local)
    }

    /// The file backing `source`; `None` for [`Source::Env`].
    pub fn file(&self, source: Source) -> Option<&SourceFile> {
        match source {
            Source::Global => Some(&self.global),
            Source::Local => Some(&self.local),
            Source::Env => None,
        }
    }

    pub fn paths(&self) -> ConfigPaths {
        ConfigPaths::new(&self.global.path, &self.local.path)
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    /// Mutable access to the environment. Changes are picked up on the next
    /// [`reload`](Self::reload).
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn dotenv(&self) -> &Dotenv {
        &self.dotenv
    }
}
