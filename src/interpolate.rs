//! Variable interpolation for login commands.
//!
//! Login formats use `{user}`, `{host}` and `{port}` placeholders which are
//! filled from the chosen credential and the node's resolved profile.
//!
//! # Example
//!
//! ```
//! use jumpline::interpolate::interpolate;
//!
//! let cmd = interpolate("ssh -p {port} {user}@{host}", "admin", "10.0.0.1", 2222);
//! assert_eq!(cmd, "ssh -p 2222 admin@10.0.0.1");
//! ```

/// Port used when no node in the ancestry declares `PORT`.
pub const DEFAULT_PORT: u16 = 22;

/// Suffix appended to a hop's login command when auto exit is enabled, so
/// the pane's local shell exits once the remote session ends.
pub const EXIT_SUFFIX: &str = "; exit";

/// Replace `{user}`, `{host}` and `{port}` placeholders in a login format.
///
/// # Examples
///
/// ```
/// use jumpline::interpolate::interpolate;
///
/// let result = interpolate("ssh {user}@{host}", "root", "bastion", 22);
/// assert_eq!(result, "ssh root@bastion");
/// ```
pub fn interpolate(format: &str, user: &str, host: &str, port: u16) -> String {
    format
        .replace("{user}", user)
        .replace("{host}", host)
        .replace("{port}", &port.to_string())
}

/// Render the command for one hop, appending [`EXIT_SUFFIX`] when asked.
pub fn login_command(
    format: &str,
    user: Option<&str>,
    host: &str,
    port: Option<u16>,
    auto_exit: bool,
) -> String {
    let mut cmd = interpolate(format, user.unwrap_or_default(), host, port.unwrap_or(DEFAULT_PORT));
    if auto_exit {
        cmd.push_str(EXIT_SUFFIX);
    }
    cmd
}
