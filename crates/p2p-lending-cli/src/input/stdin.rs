use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Read a lifecycle action input piped on stdin.
/// Returns None if stdin is a TTY (interactive) or carries nothing.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let input: T = serde_json::from_str(trimmed)
        .map_err(|e| format!("Failed to parse action input from stdin: {}", e))?;
    Ok(Some(input))
}
