use anyhow::{Context, Result};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_sts::Client as StsClient;
use ini::{Ini, Properties};
use std::{path::Path, time::Duration};
use tracing::{debug, info};

use super::{
    Credentials,
    sts::{self, AssumeRoleRequest},
};
use crate::constants;

/// Assume-role settings of a shared config profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleProfile {
    pub role_arn: String,
    pub mfa_serial: Option<String>,
    pub source_profile: Option<String>,
    pub role_session_name: Option<String>,
    pub external_id: Option<String>,
}

impl RoleProfile {
    fn from_ini_section(section: &Properties) -> Option<Self> {
        let value = |key: &str| {
            section
                .get(key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            role_arn: value("role_arn")?,
            mfa_serial: value("mfa_serial"),
            source_profile: value("source_profile"),
            role_session_name: value("role_session_name"),
            external_id: value("external_id"),
        })
    }
}

fn section_name(profile: &str) -> String {
    if profile == "default" {
        profile.to_string()
    } else {
        format!("profile {profile}")
    }
}

/// Look up `profile` in the config file at `path`.
///
/// Returns `None` when the file or profile is missing or the profile does not assume a role.
pub fn load_role_profile(path: &Path, profile: &str) -> Option<RoleProfile> {
    let ini = Ini::load_from_file(path)
        .inspect_err(|e| debug!("Could not read AWS config {}: {}", path.display(), e))
        .ok()?;

    ini.section(Some(section_name(profile)))
        .and_then(RoleProfile::from_ini_section)
}

/// Retrieve credentials for the named shared config profile.
///
/// `token_code` runs only when the profile assumes a role with `mfa_serial` set.
pub async fn assume_profile(
    profile: &str,
    duration: Duration,
    token_code: impl FnOnce() -> Result<String>,
) -> Result<Credentials> {
    let role_profile = constants::get_aws_config_path()
        .and_then(|path| load_role_profile(&path, profile));

    match role_profile {
        Some(role_profile) => assume_role_profile(profile, role_profile, duration, token_code)
            .await
            .with_context(|| format!("Failed to assume profile {profile}")),
        None => provide_profile_credentials(profile)
            .await
            .with_context(|| format!("Failed to load credentials for profile {profile}")),
    }
}

async fn assume_role_profile(
    profile: &str,
    role_profile: RoleProfile,
    duration: Duration,
    token_code: impl FnOnce() -> Result<String>,
) -> Result<Credentials> {
    info!(
        "Profile {} assumes role {}",
        profile, role_profile.role_arn
    );

    let source_profile = role_profile.source_profile.clone();
    let request = role_profile_request(role_profile, duration, token_code)?;

    // Without source_profile (e.g. credential_source) the default chain supplies the caller
    let config = sts::load_config(source_profile.as_deref()).await;
    let client = StsClient::new(&config);

    sts::send(&client, request).await
}

fn role_profile_request(
    role_profile: RoleProfile,
    duration: Duration,
    token_code: impl FnOnce() -> Result<String>,
) -> Result<AssumeRoleRequest> {
    let request = AssumeRoleRequest::new(
        &role_profile.role_arn,
        role_profile.mfa_serial.as_deref(),
        duration,
        token_code,
    )?
    .with_external_id(role_profile.external_id);

    Ok(match role_profile.role_session_name {
        Some(session_name) => request.with_session_name(session_name),
        None => request,
    })
}

async fn provide_profile_credentials(profile: &str) -> Result<Credentials> {
    info!("Loading credentials for profile {}", profile);

    let config = sts::load_config(Some(profile)).await;
    let provider = config
        .credentials_provider()
        .context("No credentials provider configured")?;

    let creds = provider.provide_credentials().await?;
    Ok(Credentials::from(creds))
}
