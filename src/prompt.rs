//! Interactive input for arguments left off the command line

use anyhow::{bail, Context, Result};
use std::io::{self, BufRead, Write};

/// Print `label` and read one trimmed line from stdin
///
/// An empty answer or end of input is an error.
pub fn prompt_for(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().with_context(|| "Failed to flush stdout")?;

    let stdin = io::stdin();
    let answer = read_answer(&mut stdin.lock())?;
    match answer {
        Some(value) => Ok(value),
        None => bail!("No value given for {}", label.to_lowercase()),
    }
}

fn read_answer<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut input = String::new();
    reader
        .read_line(&mut input)
        .with_context(|| "Failed to read from stdin")?;

    let value = input.trim();
    if value.is_empty() {
        Ok(None)
    } else {
        Ok(Some(value.to_string()))
    }
}
