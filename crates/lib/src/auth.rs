//! SSH authorization helpers.

use tracing::info;

use crate::exec::{Exec, ExecError};
use crate::files::{self, AppendOptions, ContainsOptions};
use crate::session::Session;
use crate::shell;

fn keyfile(user: &str) -> String {
  format!("/home/{user}/.ssh/authorized_keys")
}

/// Let whoever can log in as `from` also log in as `to`, by copying the
/// authorized keys of `from` onto those of `to`.
///
/// Both files are accessed with elevated privileges. Keys already present
/// are not duplicated; when at least one key is new, an empty separator line
/// precedes them. Returns the number of lines written.
pub async fn copy_pubkey<S: Session>(ctx: &Exec<'_, S>, from: &str, to: &str) -> Result<usize, ExecError> {
  let sudo = ctx.privileged();
  let target = keyfile(to);
  let keys = sudo.run(&format!("cat {}", shell::quote(&keyfile(from)))).await?;

  let target_exists = files::exists(&sudo, &target).await?;
  let exact = ContainsOptions {
    exact: true,
    escape: true,
  };
  let mut missing = Vec::new();
  for key in keys.stdout.lines().filter(|l| !l.trim().is_empty()) {
    if target_exists && files::contains(&sudo, &target, key, exact).await? {
      continue;
    }
    missing.push(key);
  }

  if missing.is_empty() {
    info!(from = %from, to = %to, "authorized keys already present");
    return Ok(0);
  }

  let mut lines = vec![""];
  lines.extend(missing);
  let written = files::append(&sudo, &target, &lines, AppendOptions::default()).await?;
  info!(from = %from, to = %to, written, "copied authorized keys");
  Ok(written)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::session::CommandOutput;
  use crate::util::testutil::MockSession;

  /// `alice` has two keys; `deploy` already holds those containing `present`.
  fn keys_session(present: &'static str) -> MockSession {
    MockSession::new().respond(move |cmd| {
      if cmd.contains("cat /home/alice") {
        CommandOutput::success("ssh-ed25519 AAAA alice@laptop\nssh-rsa BBBB alice@desktop")
      } else if cmd.contains("grep -E") && !present.is_empty() && present.split(',').any(|k| cmd.contains(k)) {
        CommandOutput::success("")
      } else if cmd.contains("grep -E") {
        CommandOutput::failure(1)
      } else {
        CommandOutput::success("")
      }
    })
  }

  fn appends(session: &MockSession) -> Vec<String> {
    session.commands().into_iter().filter(|c| c.contains(">>")).collect()
  }

  #[tokio::test]
  async fn appends_separator_and_missing_keys() {
    let session = keys_session("AAAA");

    let written = copy_pubkey(&Exec::new(&session), "alice", "deploy").await.unwrap();

    assert_eq!(written, 2);
    assert_eq!(
      session.commands()[0],
      "sudo -H sh -c 'cat /home/alice/.ssh/authorized_keys'"
    );
    let appends = appends(&session);
    assert_eq!(appends.len(), 2);
    assert!(appends[0].contains("printf"));
    assert!(appends[1].contains("alice@desktop"));
    assert!(appends.iter().all(|c| c.starts_with("sudo -H sh -c ")));
  }

  #[tokio::test]
  async fn no_separator_when_every_key_is_present() {
    let session = keys_session("AAAA,BBBB");

    let written = copy_pubkey(&Exec::new(&session), "alice", "deploy").await.unwrap();

    assert_eq!(written, 0);
    assert!(appends(&session).is_empty());
  }
}
