//! Execution context threaded through every helper.
//!
//! An [`Exec`] bundles the session handle with the per-call policy that the
//! helpers need: which [`Runner`] to use, which directory to run in, and
//! whether a non-zero exit is an error. Derived contexts are built by value,
//! so scoping a context to a directory never leaks into its parent:
//!
//! ```
//! # use hostcraft_lib::exec::Exec;
//! # use hostcraft_lib::session::LocalSession;
//! let session = LocalSession::new();
//! let ctx = Exec::new(&session);
//! let build = ctx.within("/opt/build").within("php-5.4.0");
//! assert_eq!(build.cwd(), Some("/opt/build/php-5.4.0"));
//! assert_eq!(ctx.cwd(), None);
//! ```

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::session::{CommandOutput, Session, SessionError};
use crate::shell;

/// Errors raised while running a command through an [`Exec`].
#[derive(Debug, Error)]
pub enum ExecError {
  #[error("session error: {0}")]
  Session(#[from] SessionError),

  #[error("command failed with exit code {code:?}: {cmd}")]
  CmdFailed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Rewrites a command before it is handed to [`Session::run`].
pub type CommandWrapper = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// How a command is executed on the target.
#[derive(Clone, Default)]
pub enum Runner {
  /// Run as the connected user.
  #[default]
  Run,

  /// Run with elevated privileges via [`Session::sudo`].
  Sudo,

  /// Run the command produced by the wrapper as the connected user,
  /// e.g. `sudo -u deploy` or `nice -n 10` prefixes.
  Custom(CommandWrapper),
}

impl Runner {
  /// A custom runner from a closure.
  pub fn custom(wrapper: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
    Self::Custom(Arc::new(wrapper))
  }
}

impl fmt::Debug for Runner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Runner::Run => write!(f, "Run"),
      Runner::Sudo => write!(f, "Sudo"),
      Runner::Custom(_) => write!(f, "Custom(..)"),
    }
  }
}

/// Session handle plus runner, working directory and failure policy.
pub struct Exec<'a, S: Session> {
  session: &'a S,
  runner: Runner,
  cwd: Option<String>,
  warn_only: bool,
}

// Manual impl: `S` itself need not be `Clone`.
impl<S: Session> Clone for Exec<'_, S> {
  fn clone(&self) -> Self {
    Self {
      session: self.session,
      runner: self.runner.clone(),
      cwd: self.cwd.clone(),
      warn_only: self.warn_only,
    }
  }
}

impl<S: Session> fmt::Debug for Exec<'_, S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Exec")
      .field("runner", &self.runner)
      .field("cwd", &self.cwd)
      .field("warn_only", &self.warn_only)
      .finish()
  }
}

impl<'a, S: Session> Exec<'a, S> {
  pub fn new(session: &'a S) -> Self {
    Self {
      session,
      runner: Runner::Run,
      cwd: None,
      warn_only: false,
    }
  }

  pub fn session(&self) -> &'a S {
    self.session
  }

  pub fn runner(&self) -> &Runner {
    &self.runner
  }

  pub fn cwd(&self) -> Option<&str> {
    self.cwd.as_deref()
  }

  pub fn is_warn_only(&self) -> bool {
    self.warn_only
  }

  /// A copy of this context using `runner`.
  pub fn with_runner(&self, runner: Runner) -> Self {
    Self {
      runner,
      ..self.clone()
    }
  }

  /// A copy of this context that runs commands through [`Session::sudo`].
  pub fn privileged(&self) -> Self {
    self.with_runner(Runner::Sudo)
  }

  /// A copy of this context scoped to `dir`.
  ///
  /// Relative directories are joined onto the current one.
  pub fn within(&self, dir: &str) -> Self {
    let cwd = match &self.cwd {
      Some(current) => shell::posix_join(&[current, dir]),
      None => dir.to_string(),
    };
    Self {
      cwd: Some(cwd),
      ..self.clone()
    }
  }

  /// A copy of this context where non-zero exits are returned, not raised.
  pub fn warn_only(&self) -> Self {
    Self {
      warn_only: true,
      ..self.clone()
    }
  }

  /// The command string that will be handed to the runner.
  pub fn command_line(&self, command: &str) -> String {
    match &self.cwd {
      Some(dir) => format!("cd {} && {}", shell::quote(dir), command),
      None => command.to_string(),
    }
  }

  /// Run `command`, failing on non-zero exit unless the context is warn-only.
  pub async fn run(&self, command: &str) -> Result<CommandOutput, ExecError> {
    info!(cmd = %command, cwd = ?self.cwd, runner = ?self.runner, "running command");
    let output = self.dispatch(command).await?;

    if output.failed() {
      if self.warn_only {
        debug!(cmd = %command, code = ?output.exit_code, "command failed (warn only)");
      } else {
        if !output.stderr.is_empty() {
          debug!(stderr = %output.stderr, "command stderr");
        }
        return Err(ExecError::CmdFailed {
          cmd: command.to_string(),
          code: output.exit_code,
          stderr: output.stderr,
        });
      }
    }

    Ok(output)
  }

  /// Run `command` quietly as a probe and report whether it succeeded.
  pub async fn check(&self, command: &str) -> Result<bool, ExecError> {
    debug!(cmd = %command, cwd = ?self.cwd, "probing");
    let output = self.dispatch(command).await?;
    Ok(output.succeeded())
  }

  async fn dispatch(&self, command: &str) -> Result<CommandOutput, SessionError> {
    let line = self.command_line(command);
    match &self.runner {
      Runner::Run => self.session.run(&line).await,
      Runner::Sudo => self.session.sudo(&line).await,
      Runner::Custom(wrap) => self.session.run(&wrap(&line)).await,
    }
  }
}
