//! Per-node login profiles.
//!
//! Each node file is parsed into a [`LocalProfile`] holding only what that
//! file declares. A [`LoginProfile`] is the resolved view: every field except
//! the host comes from the nearest node, walking from the node itself up to
//! the root, that declares it.
//!
//! # Node File Format
//!
//! ```yaml
//! PORT: 2222
//! CREDENTIAL:
//!   - USER: ops
//!     PASSWORD: hunter2
//!   - USER: admin
//!     SECRETS_HOOK: "pass show admin-json"
//!   - DEFAULT: 0
//! NEXT_LOGIN_FORMAT: "ssh -p {port} {user}@{host}"
//! PASSWORD_PROMPT: "password:"
//! SHELL_PROMPT: "]$"
//! OTP_PROMPT: "Verification code:"
//! PREVIOUS_LOGIN: bastion
//! AFTER_HOOKS: ["cd /var/log", "tail -f app.log"]
//! AUTO_EXIT_ENABLED: true
//! NO_BATCH: false
//! LOGIN_TIMEOUT: 30
//! ```

use crate::error::ConfigError;
use crate::property::{Declared, Labeled, Property};
use crate::secrets::HookCommand;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;
use std::time::Duration;

/// One way of authenticating on a host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Credential {
    /// Login user, substituted for `{user}`.
    #[serde(default)]
    pub user: Option<String>,
    /// Password typed at the password prompt.
    #[serde(default)]
    pub password: Option<String>,
    /// Command printing the password and OTP options as JSON.
    #[serde(default)]
    pub secrets_hook: Option<HookCommand>,
}

impl Labeled for Credential {
    fn label(&self) -> String {
        self.user.clone().unwrap_or_else(|| "<no user>".to_string())
    }
}

impl Credential {
    /// Display form with secrets masked.
    pub fn masked(&self) -> String {
        let secret = match (&self.secrets_hook, &self.password) {
            (Some(_), _) => "secrets hook",
            (None, Some(_)) => "password",
            (None, None) => "no secret",
        };
        format!("{} ({})", self.label(), secret)
    }
}

/// Hook commands field that accepts either a single string or array of strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Commands {
    /// A single command string.
    Single(String),
    /// Multiple commands executed in sequence.
    Multiple(Vec<String>),
}

impl Commands {
    /// Convert to a `Vec<String>`, normalizing both variants.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Commands::Single(s) => vec![s.clone()],
            Commands::Multiple(v) => v.clone(),
        }
    }
}

impl Labeled for Commands {
    fn label(&self) -> String {
        self.to_vec().join(" && ")
    }
}

/// What a single node file declares.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocalProfile {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub credential: Declared<Credential>,
    pub login_format: Option<String>,
    pub next_login_format: Option<String>,
    pub password_prompt: Option<String>,
    pub shell_prompt: Option<String>,
    pub otp_prompt: Option<String>,
    pub previous_login: Option<String>,
    pub after_hooks: Declared<Commands>,
    pub auto_exit_enabled: Option<bool>,
    pub no_batch: Option<bool>,
    pub login_timeout: Option<u64>,
}

impl LocalProfile {
    /// Parse the YAML text of a node file. An empty document declares nothing.
    pub fn parse(text: &str) -> Result<Self, String> {
        let doc: Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
        let map = match doc {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(map) => map,
            _ => return Err("expected a mapping of keys".to_string()),
        };

        Ok(Self {
            host: scalar(&map, "HOST")?,
            port: scalar(&map, "PORT")?,
            credential: Property::load("CREDENTIAL", map.get("CREDENTIAL"))?
                .map_property(|p| p.with_prompt("select a credential:")),
            login_format: scalar(&map, "LOGIN_FORMAT")?,
            next_login_format: scalar(&map, "NEXT_LOGIN_FORMAT")?,
            password_prompt: scalar(&map, "PASSWORD_PROMPT")?,
            shell_prompt: scalar(&map, "SHELL_PROMPT")?,
            otp_prompt: scalar(&map, "OTP_PROMPT")?,
            previous_login: scalar(&map, "PREVIOUS_LOGIN")?,
            after_hooks: Property::load("AFTER_HOOKS", hook_sets(map.get("AFTER_HOOKS")).as_ref())?,
            auto_exit_enabled: scalar(&map, "AUTO_EXIT_ENABLED")?,
            no_batch: scalar(&map, "NO_BATCH")?,
            login_timeout: scalar(&map, "LOGIN_TIMEOUT")?,
        })
    }

    /// Read and parse a node file. A missing file declares nothing.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::new(path, e.to_string()))?;
        Self::parse(&text).map_err(|message| ConfigError::new(path, message))
    }
}

impl<T> Declared<T> {
    fn map_property(self, f: impl FnOnce(Property<T>) -> Property<T>) -> Self {
        match self {
            Declared::Values(p) => Declared::Values(f(p)),
            other => other,
        }
    }
}

/// Absent and `null` keys both mean "not declared here".
fn scalar<T: DeserializeOwned>(map: &Mapping, key: &str) -> Result<Option<T>, String> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_yaml::from_value(value.clone())
            .map(Some)
            .map_err(|e| format!("{}: {}", key, e)),
    }
}

/// A flat list of command strings is one hook sequence, not a list of
/// alternatives.
fn hook_sets(raw: Option<&Value>) -> Option<Value> {
    match raw {
        Some(Value::Sequence(seq)) if !seq.is_empty() && seq.iter().all(Value::is_string) => {
            Some(Value::Sequence(vec![Value::Sequence(seq.clone())]))
        }
        other => other.cloned(),
    }
}

/// Names accepted by [`LoginProfile::field`].
pub const FIELDS: &[&str] = &[
    "after_hooks",
    "auto_exit_enabled",
    "credential",
    "host",
    "login_format",
    "login_timeout",
    "next_login_format",
    "no_batch",
    "otp_prompt",
    "password_prompt",
    "port",
    "previous_login",
    "shell_prompt",
];

/// Fully resolved login configuration of one node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoginProfile {
    /// Only set for leaf (file) nodes, never inherited.
    pub host: Option<String>,
    pub port: Option<u16>,
    pub credential: Option<Property<Credential>>,
    /// Format used to reach this node when no previous hop overrides it.
    pub login_format: Option<String>,
    /// Format used to reach the next hop from this node.
    pub next_login_format: Option<String>,
    pub password_prompt: Option<String>,
    pub shell_prompt: Option<String>,
    pub otp_prompt: Option<String>,
    /// Name of the node to log in to before this one.
    pub previous_login: Option<String>,
    pub after_hooks: Option<Property<Commands>>,
    pub auto_exit_enabled: bool,
    pub no_batch: bool,
    /// Per-node override of the prompt timeout.
    pub login_timeout: Option<Duration>,
}

impl LoginProfile {
    /// Resolve a profile from local profiles ordered from the node itself up
    /// to the root.
    pub fn resolve(locals: &[&LocalProfile], host: Option<String>) -> Self {
        Self {
            host,
            port: inherit(locals, |l| l.port.as_ref()),
            credential: inherit_declared(locals, |l| &l.credential),
            login_format: inherit(locals, |l| l.login_format.as_ref()),
            next_login_format: inherit(locals, |l| l.next_login_format.as_ref()),
            password_prompt: inherit(locals, |l| l.password_prompt.as_ref()),
            shell_prompt: inherit(locals, |l| l.shell_prompt.as_ref()),
            otp_prompt: inherit(locals, |l| l.otp_prompt.as_ref()),
            previous_login: inherit(locals, |l| l.previous_login.as_ref()),
            after_hooks: inherit_declared(locals, |l| &l.after_hooks),
            auto_exit_enabled: inherit(locals, |l| l.auto_exit_enabled.as_ref()).unwrap_or(false),
            no_batch: inherit(locals, |l| l.no_batch.as_ref()).unwrap_or(false),
            login_timeout: inherit(locals, |l| l.login_timeout.as_ref()).map(Duration::from_secs),
        }
    }

    /// Commands of the default `AFTER_HOOKS` choice.
    pub fn hooks(&self) -> Vec<String> {
        self.after_hooks
            .as_ref()
            .and_then(Property::default_value)
            .map(Commands::to_vec)
            .unwrap_or_default()
    }

    /// Render one resolved field for display. `None` for an unknown name.
    pub fn field(&self, name: &str) -> Option<String> {
        fn opt<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map_or_else(|| "None".to_string(), T::to_string)
        }

        let rendered = match name {
            "host" => opt(&self.host),
            "port" => opt(&self.port),
            "credential" => match &self.credential {
                Some(p) => p
                    .values()
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("{}: {}", i, c.masked()))
                    .collect::<Vec<_>>()
                    .join("\n"),
                None => "None".to_string(),
            },
            "login_format" => opt(&self.login_format),
            "next_login_format" => opt(&self.next_login_format),
            "password_prompt" => opt(&self.password_prompt),
            "shell_prompt" => opt(&self.shell_prompt),
            "otp_prompt" => opt(&self.otp_prompt),
            "previous_login" => opt(&self.previous_login),
            "after_hooks" => match &self.after_hooks {
                Some(p) => p
                    .values()
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("{}: {}", i, c.label()))
                    .collect::<Vec<_>>()
                    .join("\n"),
                None => "None".to_string(),
            },
            "auto_exit_enabled" => self.auto_exit_enabled.to_string(),
            "no_batch" => self.no_batch.to_string(),
            "login_timeout" => opt(&self.login_timeout.map(|d| d.as_secs())),
            _ => return None,
        };
        Some(rendered)
    }
}

fn inherit<'a, T: Clone + 'a>(
    locals: &[&'a LocalProfile],
    get: impl Fn(&'a LocalProfile) -> Option<&'a T>,
) -> Option<T> {
    locals.iter().find_map(|l| get(*l)).cloned()
}

fn inherit_declared<'a, T: Clone + 'a>(
    locals: &[&'a LocalProfile],
    get: impl Fn(&'a LocalProfile) -> &'a Declared<T>,
) -> Option<Property<T>> {
    for local in locals {
        match get(*local) {
            Declared::Unset => continue,
            Declared::Empty => return None,
            Declared::Values(p) => return Some(p.clone()),
        }
    }
    None
}
