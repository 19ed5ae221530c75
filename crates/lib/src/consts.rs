//! Shared constants.

/// Tool used to turn a staging directory into an OS package.
pub const PACKAGER: &str = "fpm";

/// Tool used to install [`PACKAGER`] when it is missing.
pub const PACKAGER_INSTALLER: &str = "gem";

/// Configure-stage sentinel when none is given.
pub const DEFAULT_CONFIGURE_SENTINEL: &str = "Makefile";

/// Staging directory name, under the build workdir.
pub const STAGE_DIR_NAME: &str = "stage";

/// Mode applied to the build workdir so unprivileged builds can write to it.
pub const WORKDIR_MODE: &str = "777";

/// Where `supervise` installs program definitions by default.
pub const SUPERVISOR_CONF_DIR: &str = "/etc/supervisor/conf.d";

/// Pause between stopping and starting supervisord.
pub const SUPERVISOR_RESTART_DELAY_SECS: u64 = 2;

/// Default command used by `git::clone` to update an existing checkout.
pub const DEFAULT_PULL_COMMAND: &str = "git pull";
