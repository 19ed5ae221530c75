//! Interrogating the target for general attributes such as its Linux
//! distribution.

use std::fmt;

use crate::exec::{Exec, ExecError};
use crate::files;
use crate::session::Session;

/// Linux distribution identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distro {
  Centos,
  Debian,
  Fedora,
  Knoppix,
  Mint,
  Rhel,
  Ubuntu,
  Other,
}

impl Distro {
  pub fn as_str(&self) -> &'static str {
    match self {
      Distro::Centos => "centos",
      Distro::Debian => "debian",
      Distro::Fedora => "fedora",
      Distro::Knoppix => "knoppix",
      Distro::Mint => "mint",
      Distro::Rhel => "rhel",
      Distro::Ubuntu => "ubuntu",
      Distro::Other => "other",
    }
  }
}

impl fmt::Display for Distro {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Coarse packaging ecosystem of a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistroFamily {
  Debian,
  Redhat,
  /// Outside the known families; carries the distribution itself.
  Unknown(Distro),
}

impl DistroFamily {
  pub fn of(distro: Distro) -> Self {
    match distro {
      Distro::Debian | Distro::Knoppix | Distro::Mint | Distro::Ubuntu => DistroFamily::Debian,
      Distro::Centos | Distro::Fedora | Distro::Rhel => DistroFamily::Redhat,
      Distro::Other => DistroFamily::Unknown(distro),
    }
  }
}

impl fmt::Display for DistroFamily {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DistroFamily::Debian => write!(f, "debian"),
      DistroFamily::Redhat => write!(f, "redhat"),
      DistroFamily::Unknown(distro) => write!(f, "{distro}"),
    }
  }
}

/// Release files probed by [`distro_name`], in order. The first one found
/// wins, so Ubuntu hosts (which also ship `debian_version`) report Debian.
pub const RELEASE_FILES: &[(&str, Distro)] = &[
  ("/etc/centos-release", Distro::Centos),
  ("/etc/debian_version", Distro::Debian),
  ("/etc/debian_release", Distro::Debian),
  ("/etc/fedora-release", Distro::Fedora),
  ("/etc/knoppix_version", Distro::Knoppix),
  ("/etc/redhat-release", Distro::Rhel),
  ("/etc/redhat_version", Distro::Rhel),
  ("/etc/lsb-release", Distro::Ubuntu),
];

/// Detect the target's distribution from well-known release files.
pub async fn distro_name<S: Session>(ctx: &Exec<'_, S>) -> Result<Distro, ExecError> {
  for (path, distro) in RELEASE_FILES {
    if files::exists(ctx, path).await? {
      return Ok(*distro);
    }
  }
  Ok(Distro::Other)
}

/// Detect the target's distribution family.
pub async fn distro_family<S: Session>(ctx: &Exec<'_, S>) -> Result<DistroFamily, ExecError> {
  Ok(DistroFamily::of(distro_name(ctx).await?))
}
