//! Git checkouts on the target.

use tracing::info;

use crate::consts::DEFAULT_PULL_COMMAND;
use crate::exec::{Exec, ExecError};
use crate::files;
use crate::session::{CommandOutput, Session};
use crate::shell;

/// Clone `repo` into `path`, or update it with `pull_command` (default
/// `git pull`) if `path` already exists.
pub async fn clone<S: Session>(
  ctx: &Exec<'_, S>,
  repo: &str,
  path: &str,
  pull_command: Option<&str>,
) -> Result<CommandOutput, ExecError> {
  if files::exists(ctx, path).await? {
    info!(path = %path, "checkout exists, pulling");
    return ctx.within(path).run(pull_command.unwrap_or(DEFAULT_PULL_COMMAND)).await;
  }
  info!(repo = %repo, path = %path, "cloning");
  ctx
    .run(&format!("git clone {} {}", shell::quote(repo), shell::quote(path)))
    .await
}
