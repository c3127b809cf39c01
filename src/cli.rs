use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, ValueEnum, error::ErrorKind};
use clap_complete::Shell;
use std::{env, io, time::Duration};
use tracing::info;

use crate::{
    commands::CompletionsCommand,
    constants::{self, DEFAULT_DURATION},
    exec, prompt,
    resolver::{self, AwsCredentialSource},
    shell::{self, ShellFormat},
};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "assume-role",
    version,
    about = "Assume an AWS IAM role or profile and export or exec with temporary credentials",
    long_about = None
)]
pub struct Cli {
    #[arg(
        required_unless_present = "completions",
        help = "Role ARN, alias from ~/.aws/roles, or profile name"
    )]
    pub role: Option<String>,

    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND",
        help = "Command to run with the credentials instead of printing them"
    )]
    pub command: Vec<String>,

    #[arg(
        short = 'd',
        long,
        default_value = DEFAULT_DURATION,
        value_parser = parse_duration,
        help = "The duration that the credentials will be valid for (e.g. 1h, 30m, 1h30m)"
    )]
    pub duration: Duration,

    #[arg(
        short = 'f',
        long,
        value_name = "bash|fish|powershell",
        help = "Output format when no command is given [default: detected from platform and SHELL]"
    )]
    pub format: Option<String>,

    #[arg(short = 'v', long, action = ArgAction::Count, help = "Increase verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,

    #[arg(long, value_enum, value_name = "SHELL", help = "Generate shell completion script")]
    pub completions: Option<Shell>,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        if let Some(shell) = self.completions {
            CompletionsCommand { shell }.execute();
            return Ok(());
        }

        let role = self.role.clone().context("No role given")?;
        // A bad format only matters when printing, and fails before any prompt
        let format = if self.command.is_empty() {
            Some(self.print_format()?)
        } else {
            None
        };
        let legacy_path = constants::legacy_roles_path();
        let source = AwsCredentialSource::new(prompt::read_token_code);

        let creds = resolver::resolve(
            &source,
            &role,
            self.duration,
            legacy_path.as_deref(),
            &mut io::stderr(),
        )
        .await?;
        info!("Credentials expire at {}", creds.expiration_display());

        if let Some(format) = format {
            let invocation = env::args().collect::<Vec<_>>().join(" ");
            print!("{}", shell::render(&role, &creds, format, &invocation));
            return Ok(());
        }

        exec::exec_with_credentials(&role, &creds, &self.command)
    }

    /// Output dialect for print mode, detected from the platform when `--format` is absent
    pub fn print_format(&self) -> Result<ShellFormat, clap::Error> {
        let Some(name) = self.format.as_deref() else {
            return Ok(ShellFormat::detect());
        };

        ShellFormat::from_str(name, false).map_err(|_| {
            Self::command().error(
                ErrorKind::InvalidValue,
                format!(
                    "invalid value '{name}' for '--format <bash|fish|powershell>' [possible values: bash, fish, powershell]"
                ),
            )
        })
    }
}

/// Options that consume the following argument as their value
const VALUE_OPTIONS: [&str; 5] = ["-d", "--duration", "-f", "--format", "--completions"];

/// Accept the single-dash long spellings `-duration` and `-format`.
///
/// Only arguments before the role are rewritten so the trailing command is passed through untouched.
pub fn normalize_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut args = args.into_iter();
    let mut normalized: Vec<String> = args.next().into_iter().collect();

    let mut expects_value = false;
    for arg in args.by_ref() {
        if expects_value {
            expects_value = false;
            normalized.push(arg);
            continue;
        }
        if arg == "--" || !arg.starts_with('-') {
            normalized.push(arg);
            break;
        }

        let arg = if is_single_dash_long(&arg) {
            format!("-{arg}")
        } else {
            arg
        };
        expects_value = VALUE_OPTIONS.contains(&arg.as_str());
        normalized.push(arg);
    }

    normalized.extend(args);
    normalized
}

fn is_single_dash_long(arg: &str) -> bool {
    ["duration", "format"].iter().any(|name| {
        arg.strip_prefix('-')
            .and_then(|rest| rest.strip_prefix(name))
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('='))
    })
}

/// Parse a duration such as `1h`, `90m`, `1h30m`, `1.5h` or `3600s`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let invalid = || format!("invalid duration '{input}': expected e.g. 1h, 30m, 1h30m or 3600s");
    if input.is_empty() {
        return Err(invalid());
    }

    let mut rest = input;
    let mut total_millis = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let millis_per_unit = match &rest[..unit_len] {
            "h" => 3_600_000.0,
            "m" => 60_000.0,
            "s" => 1_000.0,
            "ms" => 1.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        total_millis += value * millis_per_unit;
    }

    let seconds = total_millis / 1_000.0;
    if seconds < 1.0 {
        return Err("duration must be at least 1s".to_string());
    }
    if seconds > f64::from(i32::MAX) {
        return Err(format!("duration '{input}' is too long"));
    }

    Ok(Duration::from_secs_f64(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_only() {
        let cli = Cli::try_parse_from(["assume-role", "prod"]).unwrap();
        assert_eq!(cli.role.as_deref(), Some("prod"));
        assert!(cli.command.is_empty());
        assert_eq!(cli.duration, Duration::from_secs(3600));
        assert_eq!(cli.format, None);
    }

    #[test]
    fn test_role_with_command() {
        let cli = Cli::try_parse_from([
            "assume-role",
            "arn:aws:iam::123456789012:role/Deploy",
            "aws",
            "s3",
            "ls",
            "--recursive",
        ])
        .unwrap();

        assert_eq!(
            cli.role.as_deref(),
            Some("arn:aws:iam::123456789012:role/Deploy")
        );
        assert_eq!(cli.command, vec!["aws", "s3", "ls", "--recursive"]);
    }

    #[test]
    fn test_command_flags_are_not_parsed() {
        let cli = Cli::try_parse_from(["assume-role", "prod", "terraform", "-v", "--format", "x"])
            .unwrap();

        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.format, None);
        assert_eq!(cli.command, vec!["terraform", "-v", "--format", "x"]);
    }

    fn args(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn test_single_dash_long_flags() {
        let cli = Cli::try_parse_from(normalize_args(args(&[
            "assume-role",
            "-duration",
            "2h",
            "-format",
            "fish",
            "prod",
        ])))
        .unwrap();

        assert_eq!(cli.duration, Duration::from_secs(7200));
        assert_eq!(cli.format.as_deref(), Some("fish"));
        assert_eq!(cli.role.as_deref(), Some("prod"));
        assert!(cli.command.is_empty());
    }

    #[test]
    fn test_single_dash_long_flags_with_equals() {
        let cli = Cli::try_parse_from(normalize_args(args(&[
            "assume-role",
            "-duration=30m",
            "-format=powershell",
            "prod",
        ])))
        .unwrap();

        assert_eq!(cli.duration, Duration::from_secs(1800));
        assert_eq!(cli.format.as_deref(), Some("powershell"));
    }

    #[test]
    fn test_normalize_args_stops_at_role() {
        let normalized = normalize_args(args(&[
            "assume-role",
            "-d",
            "-format",
            "prod",
            "terraform",
            "-duration",
            "-format=x",
        ]));

        // "-format" is the value of -d here, and everything after the role is the command
        assert_eq!(
            normalized,
            args(&[
                "assume-role",
                "-d",
                "-format",
                "prod",
                "terraform",
                "-duration",
                "-format=x",
            ])
        );
    }

    #[test]
    fn test_normalize_args_keeps_double_dash_spelling() {
        let input = args(&["assume-role", "--duration", "-v", "-vv", "prod", "env"]);
        assert_eq!(normalize_args(input.clone()), input);

        let normalized = normalize_args(args(&["assume-role", "--", "-duration"]));
        assert_eq!(normalized, args(&["assume-role", "--", "-duration"]));
    }

    #[test]
    fn test_duration_flag() {
        let cli = Cli::try_parse_from(["assume-role", "--duration", "2h", "prod"]).unwrap();
        assert_eq!(cli.duration, Duration::from_secs(7200));

        let cli = Cli::try_parse_from(["assume-role", "-d", "15m", "prod"]).unwrap();
        assert_eq!(cli.duration, Duration::from_secs(900));
    }

    #[test]
    fn test_format_flag() {
        let cli = Cli::try_parse_from(["assume-role", "--format", "fish", "prod"]).unwrap();
        assert_eq!(cli.print_format().unwrap(), ShellFormat::Fish);

        let cli = Cli::try_parse_from(["assume-role", "-f", "powershell", "prod"]).unwrap();
        assert_eq!(cli.print_format().unwrap(), ShellFormat::PowerShell);

        let cli = Cli::try_parse_from(["assume-role", "-f", "bash", "prod"]).unwrap();
        assert_eq!(cli.print_format().unwrap(), ShellFormat::Bash);
    }

    #[test]
    fn test_unknown_format_is_usage_error_when_printing() {
        for format in ["zsh", "Fish"] {
            let cli = Cli::try_parse_from(["assume-role", "--format", format, "prod"]).unwrap();
            let err = cli.print_format().unwrap_err();

            assert_eq!(err.kind(), ErrorKind::InvalidValue);
            assert!(err.use_stderr());
            assert!(err.to_string().contains(format));
        }
    }

    #[tokio::test]
    async fn test_unknown_format_fails_before_credentials() {
        let cli = Cli::try_parse_from(["assume-role", "--format", "zsh", "prod"]).unwrap();
        let err = cli.execute().await.unwrap_err();

        let usage = err.downcast_ref::<clap::Error>().unwrap();
        assert_eq!(usage.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn test_unknown_format_is_ignored_with_command() {
        let cli =
            Cli::try_parse_from(["assume-role", "--format", "zsh", "prod", "env"]).unwrap();

        assert_eq!(cli.format.as_deref(), Some("zsh"));
        assert_eq!(cli.command, vec!["env"]);
    }

    #[test]
    fn test_missing_role_is_usage_error() {
        let err = Cli::try_parse_from(["assume-role"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_completions_without_role() {
        let cli = Cli::try_parse_from(["assume-role", "--completions", "bash"]).unwrap();
        assert_eq!(cli.completions, Some(Shell::Bash));
        assert_eq!(cli.role, None);
    }

    #[test]
    fn test_verbose_flag_multiple() {
        let cli = Cli::try_parse_from(["assume-role", "-vv", "prod"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_help_flag_works() {
        let result = Cli::try_parse_from(["assume-role", "--help"]);
        assert!(result.is_err());
        if let Err(e) = result {
            assert_eq!(e.kind(), ErrorKind::DisplayHelp);
        }
    }

    #[test]
    fn test_version_flag_works() {
        let result = Cli::try_parse_from(["assume-role", "--version"]);
        assert!(result.is_err());
        if let Err(e) = result {
            assert_eq!(e.kind(), ErrorKind::DisplayVersion);
        }
    }

    #[test]
    fn test_command_structure_validation() {
        let cmd = Cli::command();
        cmd.debug_assert();
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("90m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("3600s"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("1500ms"), Ok(Duration::from_millis(1500)));
    }

    #[test]
    fn test_parse_duration_rejects_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("60").is_err());
        assert!(parse_duration("1d").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("-1h").is_err());
        assert!(parse_duration("500ms").is_err());
        assert!(parse_duration("1000000h").is_err());
    }
}
