//! Installing program definitions into supervisord.

use std::time::Duration;

use tracing::info;

use crate::consts::{SUPERVISOR_CONF_DIR, SUPERVISOR_RESTART_DELAY_SECS};
use crate::exec::{Exec, ExecError};
use crate::session::Session;
use crate::shell;

/// Install `contents` as `<destination>/<name>` and restart supervisord.
///
/// The file is uploaded to `/tmp/<name>` first and moved into place with
/// elevated privileges. `destination` defaults to `/etc/supervisor/conf.d`.
/// Returns the output of `supervisorctl status`.
pub async fn supervise<S: Session>(
  ctx: &Exec<'_, S>,
  name: &str,
  contents: &str,
  destination: Option<&str>,
) -> Result<String, ExecError> {
  let destination = destination.unwrap_or(SUPERVISOR_CONF_DIR);
  let staged = shell::posix_join(&["/tmp", name]);
  let installed = shell::posix_join(&[destination, name]);

  info!(program = %name, path = %installed, "installing supervisor config");
  ctx.session().put(contents.as_bytes(), &staged).await?;

  let sudo = ctx.privileged();
  sudo
    .run(&format!("mv {} {}", shell::quote(&staged), shell::quote(&installed)))
    .await?;
  sudo.run("service supervisor stop").await?;
  tokio::time::sleep(Duration::from_secs(SUPERVISOR_RESTART_DELAY_SECS)).await;
  sudo.run("service supervisor start").await?;

  let status = sudo.run("supervisorctl status").await?;
  Ok(status.stdout)
}
