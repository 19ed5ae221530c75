//! Timestamped file backups and rollback.
//!
//! A backup of `/etc/app.conf` is a sibling copy named like
//! `/etc/app.conf-310712_142231` (`-%d%m%y_%H%M%S`). All commands here are
//! warn-only: a missing file yields `false`/`None`, not an error.

use tracing::{debug, info};

use crate::exec::{Exec, ExecError};
use crate::session::Session;

/// Copy `path` to a timestamped sibling. Returns whether the copy succeeded.
pub async fn backup_file<S: Session>(ctx: &Exec<'_, S>, path: &str) -> Result<bool, ExecError> {
  let output = ctx
    .warn_only()
    .run(&format!(r#"cp {path} {path}-$(date +"%d%m%y_%H%M%S")"#))
    .await?;
  debug!(path = %path, ok = output.succeeded(), "backup");
  Ok(output.succeeded())
}

/// Most recent backup of `path` made by [`backup_file`], if any.
pub async fn find_latest_backup<S: Session>(ctx: &Exec<'_, S>, path: &str) -> Result<Option<String>, ExecError> {
  let output = ctx
    .warn_only()
    .run(&format!("ls -t {path}-[0-9]*_[0-9]* | head -1"))
    .await?;
  let latest = output.stdout.trim();
  Ok((output.succeeded() && !latest.is_empty()).then(|| latest.to_string()))
}

/// Overwrite `path` with its latest backup. The current contents are lost.
///
/// Returns `false` when there is no backup or the copy fails.
pub async fn rollback_latest_backup<S: Session>(ctx: &Exec<'_, S>, path: &str) -> Result<bool, ExecError> {
  let Some(latest) = find_latest_backup(ctx, path).await? else {
    info!(path = %path, "no backup to roll back to");
    return Ok(false);
  };
  let output = ctx.warn_only().run(&format!("cp {latest} {path}")).await?;
  info!(path = %path, backup = %latest, ok = output.succeeded(), "rolled back");
  Ok(output.succeeded())
}
