//! File transfer beyond plain uploads.
//!
//! [`rsync`] drives the local `rsync` binary against the target host. The
//! command is assembled as an argument vector and spawned directly, so
//! exclusions and paths never pass through a local shell.

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::exec::ExecError;
use crate::session::CommandOutput;

/// `ssh` option that disables host key verification.
const DISABLE_HOST_KEYS: &str = "-o StrictHostKeyChecking=no";

/// Flags always passed to rsync: preserve permissions and times, recurse,
/// verbose, compress.
const RSYNC_FLAGS: &str = "-pthrvz";

/// Where and how to reach the target over SSH.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
  pub user: String,
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
  /// Private keys handed to `ssh -i`, in order.
  #[serde(default)]
  pub key_filenames: Vec<String>,
}

fn default_port() -> u16 {
  22
}

impl ConnectionInfo {
  pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
    Self {
      user: user.into(),
      host: host.into(),
      port: default_port(),
      key_filenames: Vec::new(),
    }
  }

  pub fn with_port(mut self, port: u16) -> Self {
    self.port = port;
    self
  }

  pub fn with_key(mut self, path: impl Into<String>) -> Self {
    self.key_filenames.push(path.into());
    self
  }

  /// Whether the host is a literal IPv6 address.
  pub fn is_ipv6(&self) -> bool {
    self.host.matches(':').count() > 1
  }

  /// `user@host:target`, bracketed as `[user@host]:target` for IPv6 hosts.
  pub fn remote_spec(&self, target: &str) -> String {
    if self.is_ipv6() {
      format!("[{}@{}]:{}", self.user, self.host, target)
    } else {
      format!("{}@{}:{}", self.user, self.host, target)
    }
  }
}

/// Knobs for [`rsync`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsyncOptions {
  /// Each entry becomes `--exclude <entry>`.
  pub exclude: Vec<String>,
  /// Remove remote files that no longer exist locally.
  pub delete: bool,
  /// When false, ssh runs with `StrictHostKeyChecking=no`.
  pub strict_host_keys: bool,
  /// Extra rsync arguments, placed after the default flags.
  pub rsync_opts: Vec<String>,
  /// Extra ssh arguments for `--rsh`.
  pub ssh_opts: Vec<String>,
}

impl Default for RsyncOptions {
  fn default() -> Self {
    Self {
      exclude: Vec::new(),
      delete: false,
      strict_host_keys: true,
      rsync_opts: Vec::new(),
      ssh_opts: Vec::new(),
    }
  }
}

impl RsyncOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
    self.exclude.push(pattern.into());
    self
  }

  pub fn with_delete(mut self, delete: bool) -> Self {
    self.delete = delete;
    self
  }

  pub fn with_strict_host_keys(mut self, strict: bool) -> Self {
    self.strict_host_keys = strict;
    self
  }

  pub fn with_rsync_opt(mut self, opt: impl Into<String>) -> Self {
    self.rsync_opts.push(opt.into());
    self
  }

  pub fn with_ssh_opt(mut self, opt: impl Into<String>) -> Self {
    self.ssh_opts.push(opt.into());
    self
  }
}

/// The `--rsh` value: `ssh [-i KEY]... -p PORT [ssh opts]`.
pub fn rsh_command(conn: &ConnectionInfo, opts: &RsyncOptions) -> String {
  let mut parts = vec!["ssh".to_string()];
  for key in &conn.key_filenames {
    parts.push("-i".to_string());
    parts.push(key.clone());
  }
  parts.push("-p".to_string());
  parts.push(conn.port.to_string());
  parts.extend(opts.ssh_opts.iter().cloned());
  if !opts.strict_host_keys && !opts.ssh_opts.iter().any(|o| o.contains(DISABLE_HOST_KEYS)) {
    parts.push(DISABLE_HOST_KEYS.to_string());
  }
  parts.join(" ")
}

/// Arguments for the local `rsync` process (program name excluded).
pub fn rsync_args<P: AsRef<str>>(
  conn: &ConnectionInfo,
  sources: &[P],
  target: &str,
  opts: &RsyncOptions,
) -> Vec<String> {
  let mut args = Vec::new();
  if opts.delete {
    args.push("--delete".to_string());
  }
  for pattern in &opts.exclude {
    args.push("--exclude".to_string());
    args.push(pattern.clone());
  }
  args.push(RSYNC_FLAGS.to_string());
  args.extend(opts.rsync_opts.iter().cloned());
  args.push("--rsh".to_string());
  args.push(rsh_command(conn, opts));
  args.extend(sources.iter().map(|s| s.as_ref().to_string()));
  args.push(conn.remote_spec(target));
  args
}

/// Sync local `sources` to `target` on the host described by `conn`.
///
/// A source with a trailing slash copies its contents into `target`; without
/// one a directory named after the source is created inside `target`.
pub async fn rsync<P: AsRef<str>>(
  conn: &ConnectionInfo,
  sources: &[P],
  target: &str,
  opts: &RsyncOptions,
) -> Result<CommandOutput, ExecError> {
  let args = rsync_args(conn, sources, target, opts);
  info!(host = %conn.host, sources = sources.len(), target = %target, "rsync");
  debug!(args = ?args, "rsync arguments");

  let output = Command::new("rsync").args(&args).output().await?;
  let result = CommandOutput {
    stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
    stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
    exit_code: output.status.code(),
  };

  if result.failed() {
    return Err(ExecError::CmdFailed {
      cmd: format!("rsync {}", args.join(" ")),
      code: result.exit_code,
      stderr: result.stderr,
    });
  }
  Ok(result)
}
