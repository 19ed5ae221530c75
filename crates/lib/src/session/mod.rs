//! Command-execution session boundary.
//!
//! Everything in this crate talks to a target host through the [`Session`]
//! trait. A session runs one shell command at a time and reports its output;
//! it does not decide whether a non-zero exit is an error. That policy lives
//! in [`crate::exec::Exec`].

mod local;

use thiserror::Error;

use crate::shell;

pub use local::LocalSession;

/// Errors raised by the transport itself (not by the command it ran).
#[derive(Debug, Error)]
pub enum SessionError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("transport error: {0}")]
  Transport(String),
}

/// Captured result of a single command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  pub stdout: String,
  pub stderr: String,
  /// Exit status, or `None` if the process was terminated by a signal.
  pub exit_code: Option<i32>,
}

impl CommandOutput {
  /// A successful result with the given stdout.
  pub fn success(stdout: impl Into<String>) -> Self {
    Self {
      stdout: stdout.into(),
      stderr: String::new(),
      exit_code: Some(0),
    }
  }

  /// A failed result with the given exit code.
  pub fn failure(code: i32) -> Self {
    Self {
      stdout: String::new(),
      stderr: String::new(),
      exit_code: Some(code),
    }
  }

  pub fn succeeded(&self) -> bool {
    self.exit_code == Some(0)
  }

  pub fn failed(&self) -> bool {
    !self.succeeded()
  }
}

/// A connection to a host that can run shell commands and receive files.
///
/// Implementations must run each command in a fresh shell; working directory
/// changes are expressed by the caller as part of the command string.
#[allow(async_fn_in_trait)]
pub trait Session {
  /// Run `command` through the target's shell.
  async fn run(&self, command: &str) -> Result<CommandOutput, SessionError>;

  /// Run `command` with elevated privileges.
  ///
  /// The default wraps the whole command in `sudo -H sh -c '<command>'` so
  /// that `cd` prefixes and redirections happen inside the privileged shell.
  async fn sudo(&self, command: &str) -> Result<CommandOutput, SessionError> {
    self.run(&format!("sudo -H sh -c {}", shell::quote(command))).await
  }

  /// Write `contents` to `remote_path` on the target.
  async fn put(&self, contents: &[u8], remote_path: &str) -> Result<(), SessionError>;
}
