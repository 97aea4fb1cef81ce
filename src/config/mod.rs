//! Layered configuration system.
//!
//! Consolidates configuration from three sources, lowest precedence first:
//! 1. **Global** - `$AIO_CONFIG_FILE`, `$XDG_CONFIG_HOME/aio` or `~/.config/aio`
//! 2. **Local** - `$CWD/.aio`
//! 3. **Env** - `AIO_<SECTION>_<KEY>` environment variables, after `$CWD/.env`
//!    has been hoisted into the environment
//!
//! ## Merge Strategy
//! - Mappings merge field-by-field, later sources win
//! - Lists and scalars are replaced entirely
//! - An explicit null overrides whatever lower sources hold
//!
//! ## File Formats
//! - Text starting with `{` is lenient JSON (JSON5), everything else is YAML
//! - Each file is written back in the format it was read in

mod access;
mod codec;
mod merge;
mod store;

pub use access::{get_value, segments, set_value};
pub use codec::{Format, LoadedFile, load, parse, render, save, shake};
pub use merge::{MergeAction, Shape, deep_merge, merge, merge_policy};
pub use store::{
    CONFIG_FILE_VAR, ConfigPaths, ConfigStore, GLOBAL_FILE_NAME, LOCAL_FILE_NAME, Source,
    SourceFile,
};
