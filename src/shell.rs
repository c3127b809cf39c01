use clap::ValueEnum;
use std::{env, fmt::Write};

use crate::{aws::Credentials, constants};

/// Shell dialect for printed credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShellFormat {
    Bash,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}

impl ShellFormat {
    /// Default format for the current platform and `SHELL`
    pub fn detect() -> Self {
        let shell = env::var("SHELL").ok();
        Self::for_platform(env::consts::OS, shell.as_deref())
    }

    /// Windows without a `SHELL` means PowerShell; a fish `SHELL` means fish; anything else bash.
    pub fn for_platform(os: &str, shell: Option<&str>) -> Self {
        let shell = shell.unwrap_or_default();
        if os == "windows" && shell.is_empty() {
            return Self::PowerShell;
        }
        if shell.ends_with("fish") {
            Self::Fish
        } else {
            Self::Bash
        }
    }

    fn assignment(self, name: &str, value: &str) -> String {
        match self {
            Self::Bash => format!("export {name}=\"{value}\""),
            Self::Fish => format!("set -gx {name} \"{value}\";"),
            Self::PowerShell => format!("$env:{name}=\"{value}\""),
        }
    }

    fn eval_hint(self, invocation: &str) -> String {
        match self {
            Self::Bash => format!("# eval $({invocation})"),
            Self::Fish => format!("# eval ({invocation})"),
            Self::PowerShell => format!("# {invocation} | Invoke-Expression "),
        }
    }
}

/// Environment variables carrying `creds` for `role`, in output order
pub fn credential_env<'a>(role: &'a str, creds: &'a Credentials) -> [(&'static str, &'a str); 5] {
    [
        (constants::ENV_ACCESS_KEY_ID, creds.access_key_id.as_str()),
        (constants::ENV_SECRET_ACCESS_KEY, creds.secret_access_key.as_str()),
        (constants::ENV_SESSION_TOKEN, creds.session_token.as_str()),
        (constants::ENV_SECURITY_TOKEN, creds.session_token.as_str()),
        (constants::ENV_ASSUMED_ROLE, role),
    ]
}

/// Render `creds` as statements the invoking shell can evaluate.
///
/// `invocation` is the command line echoed in the trailing hint.
pub fn render(role: &str, creds: &Credentials, format: ShellFormat, invocation: &str) -> String {
    let mut out = String::new();
    for (name, value) in credential_env(role, creds) {
        let _ = writeln!(out, "{}", format.assignment(name, value));
    }
    let _ = writeln!(out, "# Run this to configure your shell:");
    let _ = writeln!(out, "{}", format.eval_hint(invocation));
    out
}
