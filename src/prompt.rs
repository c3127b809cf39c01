use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result, bail};
use dialoguer::{Input, theme::ColorfulTheme};

const MFA_PROMPT: &str = "MFA code";

/// Read an MFA token code, prompting on stderr so stdout stays evaluable.
pub fn read_token_code() -> Result<String> {
    if io::stdin().is_terminal() {
        let code = Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(MFA_PROMPT)
            .interact_text()
            .context("Failed to read MFA code")?;
        return Ok(code.trim().to_string());
    }

    eprint!("{MFA_PROMPT}: ");
    io::stderr().flush().ok();
    read_token_line(io::stdin().lock())
}

fn read_token_line(mut reader: impl BufRead) -> Result<String> {
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .context("Failed to read MFA code")?;
    if read == 0 {
        bail!("Failed to read MFA code: unexpected end of input");
    }
    Ok(line.trim().to_string())
}
