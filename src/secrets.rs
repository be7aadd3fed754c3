//! Password retrieval.
//!
//! A credential either carries its `PASSWORD` inline or names a
//! `SECRETS_HOOK`: an external command that prints a JSON object on stdout.
//!
//! ```json
//! {"PASSWORD": "hunter2", "OTP_OPTIONS": {"SECRET": "JBSWY3DPEHPK3PXP", "LENGTH": 6, "TIME_STEP": 30}}
//! ```
//!
//! A hook given as a string runs through `sh -c`; a list is executed
//! directly as argv.

use crate::error::{JumplineError, Result};
use crate::profile::Credential;
use serde::Deserialize;
use std::process::Command;
use tracing::{debug, warn};

/// Command line of a secrets hook.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HookCommand {
    /// Run through the shell.
    Shell(String),
    /// Run directly, first element is the program.
    Argv(Vec<String>),
}

/// Parameters of a time-based one-time password.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct OtpOptions {
    /// Base32 shared secret.
    pub secret: String,
    /// Number of digits.
    #[serde(default = "default_length")]
    pub length: u32,
    /// Period in seconds.
    #[serde(default = "default_time_step")]
    pub time_step: u64,
}

fn default_length() -> u32 {
    6
}

fn default_time_step() -> u64 {
    30
}

/// What a credential yields once its secrets are fetched.
#[derive(Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Secrets {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub otp_options: Option<OtpOptions>,
}

// Never print the password, even in debug logs.
impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("otp", &self.otp_options.is_some())
            .finish()
    }
}

impl HookCommand {
    fn command(&self) -> Result<Command> {
        match self {
            HookCommand::Shell(line) => {
                let mut cmd = Command::new("sh");
                cmd.args(["-c", line.as_str()]);
                Ok(cmd)
            }
            HookCommand::Argv(argv) => {
                let (program, args) = argv
                    .split_first()
                    .ok_or_else(|| JumplineError::SecretsHook("empty SECRETS_HOOK".into()))?;
                let mut cmd = Command::new(program);
                cmd.args(args);
                Ok(cmd)
            }
        }
    }

    fn display(&self) -> String {
        match self {
            HookCommand::Shell(line) => line.clone(),
            HookCommand::Argv(argv) => argv.join(" "),
        }
    }

    /// Run the hook and parse its stdout.
    ///
    /// # Errors
    ///
    /// - [`JumplineError::SecretsHook`] if the hook cannot start or exits non-zero
    /// - [`JumplineError::SecretsJson`] if stdout is not the expected JSON object
    pub fn run(&self) -> Result<Secrets> {
        debug!(hook = %self.display(), "running secrets hook");
        let output = self
            .command()?
            .output()
            .map_err(|e| JumplineError::SecretsHook(format!("{}: {}", self.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(hook = %self.display(), status = %output.status, stderr = %stderr.trim(), "secrets hook failed");
            return Err(JumplineError::SecretsHook(format!(
                "{} exited with {}",
                self.display(),
                output.status
            )));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

/// Fetch the secrets of a credential: the hook output if a hook is
/// configured, the inline password otherwise.
pub fn fetch(credential: &Credential) -> Result<Secrets> {
    match &credential.secrets_hook {
        Some(hook) => hook.run(),
        None => Ok(Secrets {
            password: credential.password.clone(),
            otp_options: None,
        }),
    }
}
