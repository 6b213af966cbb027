use anyhow::Result;
use std::io::{self, Write};

pub fn prompt_string(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    if s.ends_with('\n') {
        s.pop();
        if s.ends_with('\r') {
            s.pop();
        }
    }
    Ok(s)
}

/// Prompt with the current value as the default; empty input keeps it.
pub fn prompt_with_default(prompt: &str, current: &str) -> Result<String> {
    let input = prompt_string(&format!("{prompt} [{current}]: "))?;
    if input.trim().is_empty() {
        Ok(current.to_string())
    } else {
        Ok(input)
    }
}
