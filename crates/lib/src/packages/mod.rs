//! OS and language package management.
//!
//! The [`source`] submodule builds packages from upstream tarballs.

pub mod source;

use tracing::info;

use crate::exec::{Exec, ExecError};
use crate::info::{self, DistroFamily};
use crate::session::{CommandOutput, Session};
use crate::shell;

/// Install command for one package on the given family.
///
/// Debian-family hosts use non-interactive `apt-get`; everything else `yum`.
pub fn install_command(family: DistroFamily, package: &str) -> String {
  let package = shell::quote(package);
  match family {
    DistroFamily::Debian => format!("DEBIAN_FRONTEND=noninteractive apt-get install -y {package}"),
    _ => format!("yum install -y {package}"),
  }
}

/// Install `packages` with the system package manager, one call per package.
///
/// Commands run privileged. An empty list does nothing, not even the
/// distribution probe.
pub async fn package<S: Session, P: AsRef<str>>(ctx: &Exec<'_, S>, packages: &[P]) -> Result<(), ExecError> {
  if packages.is_empty() {
    return Ok(());
  }

  let family = info::distro_family(ctx).await?;
  info!(%family, count = packages.len(), "installing packages");

  let sudo = ctx.privileged();
  for package in packages {
    sudo.run(&install_command(family, package.as_ref())).await?;
  }
  Ok(())
}

/// Install a Ruby gem, privileged.
pub async fn rubygem<S: Session>(ctx: &Exec<'_, S>, gem: &str) -> Result<CommandOutput, ExecError> {
  ctx
    .privileged()
    .run(&format!("gem install -b --no-rdoc --no-ri {}", shell::quote(gem)))
    .await
}
