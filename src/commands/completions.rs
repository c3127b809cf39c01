use clap::CommandFactory;
use clap_complete::Shell;
use std::io::{self, Write};

use crate::cli::Cli;

/// Writes a completion script for the assume-role CLI
#[derive(Debug, Clone, Copy)]
pub struct CompletionsCommand {
    pub shell: Shell,
}

impl CompletionsCommand {
    pub fn execute(self) {
        self.generate(&mut io::stdout());
    }

    fn generate(self, buf: &mut dyn Write) {
        let mut cmd = Cli::command();
        let app_name = cmd.get_name().to_string();
        clap_complete::generate(self.shell, &mut cmd, app_name, buf);
    }

    #[cfg(test)]
    pub fn generate_to_string(self) -> String {
        let mut buffer = Vec::new();
        self.generate(&mut buffer);
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_shell_completion(shell: Shell, expected_patterns: &[&str]) {
        let result = CompletionsCommand { shell }.generate_to_string();

        assert!(!result.is_empty(), "Completion script should not be empty");

        for pattern in expected_patterns {
            assert!(
                result.contains(pattern),
                "Expected pattern '{}' not found in {} completion script",
                pattern,
                shell
            );
        }
    }

    #[test]
    fn test_bash_completion() {
        validate_shell_completion(Shell::Bash, &["COMPREPLY", "complete -F"]);
    }

    #[test]
    fn test_zsh_completion() {
        validate_shell_completion(Shell::Zsh, &["#compdef assume-role", "_arguments"]);
    }

    #[test]
    fn test_fish_completion() {
        validate_shell_completion(Shell::Fish, &["complete -c assume-role"]);
    }

    #[test]
    fn test_powershell_completion() {
        validate_shell_completion(
            Shell::PowerShell,
            &["Register-ArgumentCompleter", "-CommandName 'assume-role'"],
        );
    }

    #[test]
    fn test_completion_contains_options() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
            let result = CompletionsCommand { shell }.generate_to_string();

            assert!(
                result.contains("duration"),
                "duration option should be in {} completions",
                shell
            );
            assert!(
                result.contains("format"),
                "format option should be in {} completions",
                shell
            );
        }
    }
}
