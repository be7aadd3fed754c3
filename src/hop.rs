//! A single login step.
//!
//! One hop types the login command for a node into a pane and walks it
//! through the password, optional OTP and shell prompts:
//!
//! ```text
//! send login command
//!   ├── shell prompt ──────────────────────────────► done (shared connection)
//!   └── password prompt ─► send password
//!                            └── [OTP prompt ─► send code]
//!                                  └── shell prompt ► done
//! ```

use crate::error::{JumplineError, Result};
use crate::interpolate::login_command;
use crate::otp;
use crate::pane::{Input, Pane, Wait, wait_until, wait_until_any};
use crate::profile::LoginProfile;
use crate::property::Selector;
use crate::secrets;
use crate::settings::WaitSettings;
use crate::tree::{ConfigTree, NodeId};
use tracing::{debug, info};

/// Drives one node's login in a pane.
pub struct HopExecutor<'a> {
    selector: &'a dyn Selector,
    credential_index: Option<usize>,
    wait: WaitSettings,
}

impl<'a> HopExecutor<'a> {
    /// `credential_index` picks a credential without asking when it is in
    /// range for the node; otherwise `selector` decides.
    pub fn new(selector: &'a dyn Selector, credential_index: Option<usize>, wait: WaitSettings) -> Self {
        Self {
            selector,
            credential_index,
            wait,
        }
    }

    pub(crate) fn wait_for(&self, profile: &LoginProfile) -> Wait {
        Wait::new(
            profile.login_timeout.unwrap_or_else(|| self.wait.timeout()),
            self.wait.poll_interval(),
        )
    }

    /// Log in to `node` from whatever shell `pane` currently shows.
    ///
    /// # Errors
    ///
    /// Any failure of the hop: missing credential or prompt, timeout, secrets
    /// hook or OTP problems, pane errors.
    pub fn perform<P: Pane + ?Sized>(
        &self,
        pane: &P,
        tree: &ConfigTree,
        node: NodeId,
        login_format: &str,
        auto_exit: bool,
    ) -> Result<()> {
        let id = tree.node(node).id();
        let profile = tree.profile(node)?;

        let credential = match &profile.credential {
            Some(property) => property.select_one(id, self.credential_index, self.selector)?,
            None => None,
        }
        .ok_or_else(|| JumplineError::NoCredential(id.to_string()))?;
        let host = profile
            .host
            .as_deref()
            .ok_or_else(|| JumplineError::NoHost(id.to_string()))?;
        let shell_prompt = profile
            .shell_prompt
            .as_deref()
            .ok_or_else(|| JumplineError::MissingPrompt {
                node: id.to_string(),
                field: "SHELL_PROMPT",
            })?;
        let password_prompt = profile.password_prompt.as_deref();
        let wait = self.wait_for(profile);

        let command = login_command(login_format, credential.user.as_deref(), host, profile.port, auto_exit);
        debug!(node = id, pane = pane.id(), command = %command, "sending login command");
        pane.send_keys(&command, Input::Command)?;

        // Shell prompt first: a line matching both means the shell is ready.
        match wait_until_any(pane, &[Some(shell_prompt), password_prompt], wait)? {
            None => {
                return Err(JumplineError::PromptTimeout {
                    node: id.to_string(),
                    prompt: format!("{} or {}", password_prompt.unwrap_or("-"), shell_prompt),
                });
            }
            Some(0) => {
                info!(node = id, "shell ready without password");
                return Ok(());
            }
            Some(_) => {}
        }

        let secrets = secrets::fetch(credential)?;
        let password = secrets
            .password
            .as_deref()
            .ok_or_else(|| JumplineError::NoPassword(id.to_string()))?;
        pane.send_keys(password, Input::Secret)?;

        if let Some(otp_prompt) = profile.otp_prompt.as_deref() {
            if !wait_until(pane, otp_prompt, wait)? {
                return Err(JumplineError::PromptTimeout {
                    node: id.to_string(),
                    prompt: otp_prompt.to_string(),
                });
            }
            let options = secrets.otp_options.as_ref().ok_or_else(|| {
                JumplineError::Otp(format!("secrets of {} carry no OTP_OPTIONS", id))
            })?;
            pane.send_keys(&otp::generate(options)?, Input::Secret)?;
        }

        if !wait_until(pane, shell_prompt, wait)? {
            return Err(JumplineError::PromptTimeout {
                node: id.to_string(),
                prompt: shell_prompt.to_string(),
            });
        }
        info!(node = id, "logged in");
        Ok(())
    }
}
