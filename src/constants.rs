use std::{env, path::PathBuf};

use dirs;

/// AWS configuration directory name
pub const AWS_CONFIG_DIR_NAME: &str = ".aws";

/// AWS configuration file name
pub const AWS_CONFIG_FILE_NAME: &str = "config";

/// Deprecated role alias file name, kept under the AWS configuration directory
pub const LEGACY_ROLES_FILE_NAME: &str = "roles";

/// Session name sent with every AssumeRole request
pub const ROLE_SESSION_NAME: &str = "cli";

/// Default validity window for requested credentials
pub const DEFAULT_DURATION: &str = "1h";

/// Default AWS region for STS operations when no region is configured
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
/// Legacy alias of `AWS_SESSION_TOKEN` still read by older SDKs
pub const ENV_SECURITY_TOKEN: &str = "AWS_SECURITY_TOKEN";
pub const ENV_ASSUMED_ROLE: &str = "ASSUMED_ROLE";

fn home_dir() -> Option<PathBuf> {
    dirs::home_dir().or_else(|| {
        env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .ok()
            .map(PathBuf::from)
    })
}

/// Get the deprecated role alias file path (~/.aws/roles)
pub fn legacy_roles_path() -> Option<PathBuf> {
    home_dir().map(|home| home.join(AWS_CONFIG_DIR_NAME).join(LEGACY_ROLES_FILE_NAME))
}

/// Get the AWS config file path
/// Respects AWS_CONFIG_FILE environment variable if set
pub fn get_aws_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("AWS_CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }

    home_dir().map(|home| home.join(AWS_CONFIG_DIR_NAME).join(AWS_CONFIG_FILE_NAME))
}
