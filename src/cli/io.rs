//! JSON line I/O for the CLI
//!
//! - Input: one JSON object per stdin line, blank lines ignored
//! - Output: one JSON object per stdout line
//! - UTF-8 only

use std::io::{self, BufRead, Write};

use serde::Serialize;
use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read JSON requests from stdin until EOF
pub fn read_requests() -> impl Iterator<Item = CliResult<Value>> {
    let stdin = io::stdin();
    stdin
        .lock()
        .lines()
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
        .map(|line| {
            let line = line.map_err(CliError::from)?;
            serde_json::from_str(&line).map_err(CliError::from)
        })
}

/// Write a success response to stdout
pub fn write_response<T: Serialize>(data: T) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_line(&response)
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_line(&response)
}

fn write_line(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
