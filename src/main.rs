//! aio-config
//!
//! Command-line access to the layered aio configuration store.

use aio_config::cli::{Cli, Command, GetArgs, SetArgs};
use aio_config::config::{ConfigStore, Source};
use aio_config::logging::{self, LogTarget};
use aio_config::pipe::PipedInput;
use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::Value;
use std::process::ExitCode;
use tracing::debug;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut store = ConfigStore::load().context("failed to load configuration")?;
    debug!(paths = ?store.paths(), "configuration loaded");

    match cli.command {
        Command::Get(args) => run_get(&store, &args),
        Command::List(args) => print_value(&store, "", args.source.source(), args.json),
        Command::Set(args) => {
            run_set(&mut store, args)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Delete(args) => {
            store.delete(&args.key, args.local)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_get(store: &ConfigStore, args: &GetArgs) -> Result<ExitCode> {
    print_value(store, &args.key, args.source.source(), args.json)
}

/// Print the value at `key`; exit code 1 with no output when absent.
fn print_value(
    store: &ConfigStore,
    key: &str,
    source: Option<Source>,
    json: bool,
) -> Result<ExitCode> {
    let Some(value) = store.get_from(key, source) else {
        return Ok(ExitCode::FAILURE);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", serde_yaml::to_string(&value)?);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_set(store: &mut ConfigStore, args: SetArgs) -> Result<()> {
    let value = match args.value {
        Some(text) if args.json => json5::from_str::<Value>(&text)
            .with_context(|| format!("invalid JSON value for {}", args.key))?,
        Some(text) => Value::String(text),
        None => match PipedInput::new().read_stdin()? {
            Some(value) => value,
            None => bail!("no value given for {} and nothing piped on stdin", args.key),
        },
    };

    store.set(&args.key, value, args.local)?;
    Ok(())
}
