use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig, profile::ProfileFileCredentialsProvider};
use aws_sdk_sts::Client as StsClient;
use std::time::Duration;
use tracing::{debug, info};

use super::Credentials;
use crate::constants::{DEFAULT_AWS_REGION, ROLE_SESSION_NAME};

/// Second factor attached to an AssumeRole call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaToken {
    pub serial_number: String,
    pub token_code: String,
}

/// Parameters of a single AssumeRole call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub session_name: String,
    pub duration_seconds: i32,
    pub external_id: Option<String>,
    pub mfa: Option<MfaToken>,
}

impl AssumeRoleRequest {
    /// Build a request, reading a token code only when an MFA serial is given.
    ///
    /// `token_code` runs at most once and always before any network call.
    pub fn new(
        role_arn: &str,
        mfa_serial: Option<&str>,
        duration: Duration,
        token_code: impl FnOnce() -> Result<String>,
    ) -> Result<Self> {
        let duration_seconds = i32::try_from(duration.as_secs())
            .with_context(|| format!("Duration {duration:?} is too long"))?;

        let mfa = match mfa_serial.filter(|serial| !serial.is_empty()) {
            Some(serial) => Some(MfaToken {
                serial_number: serial.to_string(),
                token_code: token_code().context("Failed to read MFA token")?,
            }),
            None => None,
        };

        Ok(Self {
            role_arn: role_arn.to_string(),
            session_name: ROLE_SESSION_NAME.to_string(),
            duration_seconds,
            external_id: None,
            mfa,
        })
    }

    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = session_name.into();
        self
    }

    pub fn with_external_id(mut self, external_id: Option<String>) -> Self {
        self.external_id = external_id;
        self
    }
}

/// Load the shared AWS config, falling back to a default region for STS.
///
/// A named profile supplies the credentials even when `AWS_*` keys are set in the environment.
pub async fn load_config(profile: Option<&str>) -> SdkConfig {
    let loader = || {
        let loader = aws_config::defaults(BehaviorVersion::latest());
        match profile {
            Some(profile) => loader.profile_name(profile).credentials_provider(
                ProfileFileCredentialsProvider::builder()
                    .profile_name(profile)
                    .build(),
            ),
            None => loader,
        }
    };

    let loaded = loader().load().await;
    match loaded.region() {
        Some(region) => {
            debug!("Using region: {}", region);
            loaded
        }
        None => {
            debug!(
                "No region configured, using default {} for STS",
                DEFAULT_AWS_REGION
            );
            loader()
                .region(Region::new(DEFAULT_AWS_REGION))
                .load()
                .await
        }
    }
}

/// Send an AssumeRole request with the given client
pub async fn send(client: &StsClient, request: AssumeRoleRequest) -> Result<Credentials> {
    info!("Calling AWS STS AssumeRole");
    debug!("Role ARN: {}", request.role_arn);
    debug!("Session name: {}", request.session_name);
    debug!("Duration: {} seconds", request.duration_seconds);

    let role_arn = request.role_arn;
    let mut call = client
        .assume_role()
        .role_arn(&role_arn)
        .role_session_name(request.session_name)
        .duration_seconds(request.duration_seconds)
        .set_external_id(request.external_id);
    if let Some(mfa) = request.mfa {
        debug!("MFA serial: {}", mfa.serial_number);
        call = call
            .serial_number(mfa.serial_number)
            .token_code(mfa.token_code);
    }

    let response = call
        .send()
        .await
        .with_context(|| format!("Failed to assume role {role_arn}"))?;

    let sts_creds = response
        .credentials()
        .context("AWS STS returned no credentials")?;

    info!("Successfully obtained AWS credentials");
    Ok(Credentials::from(sts_creds))
}

/// Assume `role_arn` with the caller's ambient credentials
pub async fn assume_role(
    role_arn: &str,
    mfa_serial: Option<&str>,
    duration: Duration,
    token_code: impl FnOnce() -> Result<String>,
) -> Result<Credentials> {
    let request = AssumeRoleRequest::new(role_arn, mfa_serial, duration, token_code)?;

    let config = load_config(None).await;
    let client = StsClient::new(&config);

    send(&client, request).await
}
