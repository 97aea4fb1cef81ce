//! CLI command definitions for aio-config
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::config::Source;
use clap::{Args, Parser, Subcommand};

/// Read and write layered aio configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the value at KEY (the whole tree when omitted)
    Get(GetArgs),

    /// Print the whole tree
    List(ListArgs),

    /// Store VALUE at KEY; reads piped stdin when VALUE is omitted
    Set(SetArgs),

    /// Remove KEY
    Delete(DeleteArgs),
}

/// Which source to read from; the merged view when none is given.
#[derive(Args, Debug, Default, Clone, Copy)]
#[group(multiple = false)]
pub struct SourceArgs {
    /// Read only the global config file
    #[arg(short, long)]
    pub global: bool,

    /// Read only the local config file
    #[arg(long)]
    pub local: bool,

    /// Read only values imported from AIO_* environment variables
    #[arg(short, long)]
    pub env: bool,
}

impl SourceArgs {
    pub fn source(&self) -> Option<Source> {
        if self.global {
            Some(Source::Global)
        } else if self.local {
            Some(Source::Local)
        } else if self.env {
            Some(Source::Env)
        } else {
            None
        }
    }
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Dot-separated key, e.g. `pgb.auth_token`
    #[arg(default_value = "")]
    pub key: String,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Print as JSON instead of YAML
    #[arg(short, long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print as JSON instead of YAML
    #[arg(short, long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Dot-separated key
    pub key: String,

    /// Value to store; taken as a literal string unless --json is given
    pub value: Option<String>,

    /// Write to the local config file instead of the global one
    #[arg(long)]
    pub local: bool,

    /// Parse VALUE as (lenient) JSON
    #[arg(short, long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Dot-separated key
    pub key: String,

    /// Delete from the local config file instead of the global one
    #[arg(long)]
    pub local: bool,
}
