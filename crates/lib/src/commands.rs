//! Composite commands combining uploads and execution.

use std::path::Path;

use tracing::{info, warn};

use crate::exec::{Exec, ExecError};
use crate::session::{CommandOutput, Session};
use crate::shell;

/// Run local script `source` inside remote directory `cwd` with `binary`
/// (e.g. `bash`).
///
/// The script is uploaded into `cwd`, invoked as `<binary> <file>` and then
/// removed. Execution is warn-only, and removal happens even when the script
/// fails; inspect the returned output for the exit status.
pub async fn run_script<S: Session>(
  ctx: &Exec<'_, S>,
  source: impl AsRef<Path>,
  cwd: &str,
  binary: &str,
) -> Result<CommandOutput, ExecError> {
  let source = source.as_ref();
  let contents = tokio::fs::read(source).await?;
  let local = source.to_string_lossy();
  let file = shell::basename(&local).to_string();

  ctx.session().put(&contents, &shell::posix_join(&[cwd, &file])).await?;

  let scoped = ctx.within(cwd).warn_only();
  let file_q = shell::quote(&file);
  info!(script = %file, cwd = %cwd, "running script");
  let result = scoped.run(&format!("{binary} {file_q}")).await;

  let removed = scoped.run(&format!("rm {file_q}")).await?;
  if removed.failed() {
    warn!(script = %file, "could not remove uploaded script");
  }
  result
}
