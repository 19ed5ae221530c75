//! Test utilities for hostcraft-lib.
//!
//! [`MockSession`] records every command and upload it receives and answers
//! commands from a scripted responder, so helpers can be tested by the exact
//! command strings they issue.

use std::sync::Mutex;

use crate::session::{CommandOutput, Session, SessionError};

type Responder = Box<dyn Fn(&str) -> CommandOutput + Send + Sync>;

pub struct MockSession {
  commands: Mutex<Vec<String>>,
  uploads: Mutex<Vec<(String, Vec<u8>)>>,
  responder: Responder,
}

impl MockSession {
  /// A session where every command succeeds with empty output.
  pub fn new() -> Self {
    Self {
      commands: Mutex::new(Vec::new()),
      uploads: Mutex::new(Vec::new()),
      responder: Box::new(|_| CommandOutput::success("")),
    }
  }

  /// Answer commands with `responder` instead.
  pub fn respond(mut self, responder: impl Fn(&str) -> CommandOutput + Send + Sync + 'static) -> Self {
    self.responder = Box::new(responder);
    self
  }

  /// Commands received so far, in order.
  pub fn commands(&self) -> Vec<String> {
    self.commands.lock().unwrap().clone()
  }

  /// Uploads received so far as `(path, contents)`.
  pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
    self.uploads.lock().unwrap().clone()
  }
}

impl Session for MockSession {
  async fn run(&self, command: &str) -> Result<CommandOutput, SessionError> {
    self.commands.lock().unwrap().push(command.to_string());
    Ok((self.responder)(command))
  }

  async fn put(&self, contents: &[u8], remote_path: &str) -> Result<(), SessionError> {
    self
      .uploads
      .lock()
      .unwrap()
      .push((remote_path.to_string(), contents.to_vec()));
    Ok(())
  }
}

/// Responder that treats `test -e` probes as true only for `paths`, and
/// `which` probes as true only for `programs`. Everything else succeeds.
pub fn filesystem(paths: &[&str], programs: &[&str]) -> impl Fn(&str) -> CommandOutput + Send + Sync + 'static {
  let paths: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
  let programs: Vec<String> = programs.iter().map(|p| p.to_string()).collect();
  move |cmd: &str| {
    if let Some(idx) = cmd.find("test -e ") {
      let probe = &cmd[idx..];
      let hit = paths.iter().any(|p| probe == format!("test -e \"$(echo {p})\""));
      return if hit {
        CommandOutput::success("")
      } else {
        CommandOutput::failure(1)
      };
    }
    if let Some(program) = cmd.strip_prefix("which ") {
      return if programs.iter().any(|p| p == program) {
        CommandOutput::success(format!("/usr/bin/{program}"))
      } else {
        CommandOutput::failure(1)
      };
    }
    CommandOutput::success("")
  }
}
