//! Data piped to the process on stdin.
//!
//! Used by `aio-config set KEY` when no value is given on the command line.

use serde_json::Value;
use std::io::{IsTerminal, Read};

/// Parse piped text: YAML when it parses, the raw text otherwise.
pub fn parse_piped(text: String) -> Value {
    if text.is_empty() {
        return Value::String(text);
    }
    match serde_yaml::from_str::<Value>(&text) {
        Ok(Value::Null) | Err(_) => Value::String(text),
        Ok(value) => value,
    }
}

/// Memoized piped input. The reader is consumed at most once.
#[derive(Debug, Clone, Default)]
pub struct PipedInput {
    cached: Option<Option<Value>>,
}

impl PipedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read everything from `reader` unless it is a terminal.
    ///
    /// Returns `None` for a terminal. The first result, including `None`, is
    /// remembered and returned by later calls without touching `reader`.
    pub fn read_from(
        &mut self,
        mut reader: impl Read,
        is_terminal: bool,
    ) -> std::io::Result<Option<Value>> {
        if let Some(cached) = &self.cached {
            return Ok(cached.clone());
        }

        let value = if is_terminal {
            None
        } else {
            let mut text = String::new();
            reader.read_to_string(&mut text)?;
            Some(parse_piped(text))
        };

        self.cached = Some(value.clone());
        Ok(value)
    }

    /// Read from the process's stdin.
    pub fn read_stdin(&mut self) -> std::io::Result<Option<Value>> {
        let stdin = std::io::stdin();
        let is_terminal = stdin.is_terminal();
        self.read_from(stdin.lock(), is_terminal)
    }
}
