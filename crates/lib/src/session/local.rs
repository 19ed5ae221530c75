//! A [`Session`] that runs commands on the local machine.
//!
//! Useful for provisioning the host the library runs on, and for exercising
//! the helpers against a real shell in tests.

use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use super::{CommandOutput, Session, SessionError};

/// Runs commands through a local POSIX shell.
#[derive(Debug, Clone, Default)]
pub struct LocalSession {
  shell: Option<String>,
}

impl LocalSession {
  pub fn new() -> Self {
    Self::default()
  }

  /// Use `shell` (invoked as `<shell> -c <command>`) instead of `/bin/sh`.
  pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
    self.shell = Some(shell.into());
    self
  }

  fn shell(&self) -> &str {
    self.shell.as_deref().unwrap_or("/bin/sh")
  }
}

impl Session for LocalSession {
  async fn run(&self, command: &str) -> Result<CommandOutput, SessionError> {
    debug!(shell = %self.shell(), cmd = %command, "spawning local process");

    let output = Command::new(self.shell()).arg("-c").arg(command).output().await?;

    let result = CommandOutput {
      stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
      stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
      exit_code: output.status.code(),
    };

    if !result.stderr.is_empty() {
      debug!(stderr = %result.stderr, "command stderr");
    }

    Ok(result)
  }

  async fn put(&self, contents: &[u8], remote_path: &str) -> Result<(), SessionError> {
    let path = Path::new(remote_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    debug!(path = %remote_path, bytes = contents.len(), "wrote file");
    Ok(())
  }
}
