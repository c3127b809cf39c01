//! Chooses how to obtain credentials for a role argument and obtains them.
//!
//! A role argument is handled by the first matching rule:
//! 1. a full IAM role ARN is assumed directly, without MFA;
//! 2. when the deprecated role file exists, the argument must be an alias in it;
//! 3. anything else names a shared config profile.

use anyhow::{Result, bail};
use regex::Regex;
use std::{io::Write, path::Path, sync::LazyLock, time::Duration};
use tracing::{debug, info};

use crate::aws::{Credentials, profile, roles::RoleStore, sts};

static ROLE_ARN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws:iam::(.+):role/([^/]+)(/.+)?$").expect("role ARN pattern is valid")
});

const ROLE_CONFIG_DOCS_URL: &str = "https://docs.aws.amazon.com/cli/latest/userguide/cli-roles.html";

/// Whether `role` is a fully qualified IAM role ARN
pub fn is_role_arn(role: &str) -> bool {
    ROLE_ARN.is_match(role)
}

/// How credentials for a role argument are obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// A role ARN given on the command line
    DirectRole { role_arn: String },
    /// An alias resolved through the deprecated role file
    LegacyRole {
        role_arn: String,
        mfa_serial: Option<String>,
    },
    /// A shared config profile
    Profile { name: String },
}

/// Pick the strategy for `role` given the loaded role file, if one exists.
pub fn classify(role: &str, store: Option<&RoleStore>) -> Result<Strategy> {
    if is_role_arn(role) {
        return Ok(Strategy::DirectRole {
            role_arn: role.to_string(),
        });
    }

    match store {
        Some(store) => match store.get(role) {
            Some(entry) => Ok(Strategy::LegacyRole {
                role_arn: entry.role.clone(),
                mfa_serial: entry.mfa_serial().map(str::to_string),
            }),
            None => bail!("{} not in {}", role, store.path().display()),
        },
        None => Ok(Strategy::Profile {
            name: role.to_string(),
        }),
    }
}

/// Something that can acquire credentials for a role or a profile
#[allow(async_fn_in_trait)]
pub trait CredentialSource {
    async fn assume_role(
        &self,
        role_arn: &str,
        mfa_serial: Option<&str>,
        duration: Duration,
    ) -> Result<Credentials>;

    async fn assume_profile(&self, profile: &str, duration: Duration) -> Result<Credentials>;
}

/// Credential source backed by AWS STS and the shared config files
pub struct AwsCredentialSource<F> {
    token_code: F,
}

impl<F> AwsCredentialSource<F>
where
    F: Fn() -> Result<String>,
{
    /// `token_code` supplies MFA codes and is only called when a second factor is required
    pub fn new(token_code: F) -> Self {
        Self { token_code }
    }
}

impl<F> CredentialSource for AwsCredentialSource<F>
where
    F: Fn() -> Result<String>,
{
    async fn assume_role(
        &self,
        role_arn: &str,
        mfa_serial: Option<&str>,
        duration: Duration,
    ) -> Result<Credentials> {
        sts::assume_role(role_arn, mfa_serial, duration, || (self.token_code)()).await
    }

    async fn assume_profile(&self, profile: &str, duration: Duration) -> Result<Credentials> {
        profile::assume_profile(profile, duration, || (self.token_code)()).await
    }
}

/// Load the deprecated role file when consulted, warning on `diagnostics`.
fn load_legacy_store(
    role: &str,
    legacy_path: Option<&Path>,
    diagnostics: &mut impl Write,
) -> Result<Option<RoleStore>> {
    if is_role_arn(role) {
        return Ok(None);
    }
    let Some(path) = legacy_path.filter(|path| path.exists()) else {
        return Ok(None);
    };

    writeln!(
        diagnostics,
        "WARNING: using deprecated role file ({}), switch to config file ({})",
        path.display(),
        ROLE_CONFIG_DOCS_URL
    )?;
    RoleStore::load(path).map(Some)
}

/// Resolve `role` into temporary credentials.
///
/// `legacy_path` is the deprecated role file location; it is only read when it exists.
pub async fn resolve<S: CredentialSource>(
    source: &S,
    role: &str,
    duration: Duration,
    legacy_path: Option<&Path>,
    diagnostics: &mut impl Write,
) -> Result<Credentials> {
    let store = load_legacy_store(role, legacy_path, diagnostics)?;
    let strategy = classify(role, store.as_ref())?;
    debug!("Resolved {} to {:?}", role, strategy);

    match strategy {
        Strategy::DirectRole { role_arn } => {
            info!("Assuming role {}", role_arn);
            source.assume_role(&role_arn, None, duration).await
        }
        Strategy::LegacyRole {
            role_arn,
            mfa_serial,
        } => {
            info!("Assuming role {} for alias {}", role_arn, role);
            source
                .assume_role(&role_arn, mfa_serial.as_deref(), duration)
                .await
        }
        Strategy::Profile { name } => {
            info!("Assuming profile {}", name);
            source.assume_profile(&name, duration).await
        }
    }
}
