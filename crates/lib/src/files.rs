//! File and directory management on the target host.

use tracing::debug;

use crate::exec::{Exec, ExecError};
use crate::session::Session;
use crate::shell;

/// Ownership and permissions for [`directory`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryOptions {
  pub user: Option<String>,
  /// Defaults to `user` when unset.
  pub group: Option<String>,
  /// `chmod` compatible mode string, e.g. `"0700"` or `"u+rwx"`.
  pub mode: Option<String>,
}

impl DirectoryOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_user(mut self, user: impl Into<String>) -> Self {
    self.user = Some(user.into());
    self
  }

  pub fn with_group(mut self, group: impl Into<String>) -> Self {
    self.group = Some(group.into());
    self
  }

  pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
    self.mode = Some(mode.into());
    self
  }
}

/// Ensure a directory exists, optionally with the given owner and mode.
///
/// Issues `mkdir -p <path>`, then `chown <user>:<group> <path>` if a user is
/// given, then `chmod <mode> <path>` if a mode is given.
pub async fn directory<S: Session>(ctx: &Exec<'_, S>, path: &str, opts: &DirectoryOptions) -> Result<(), ExecError> {
  let path_q = shell::quote(path);
  ctx.run(&format!("mkdir -p {path_q}")).await?;

  if let Some(user) = &opts.user {
    let group = opts.group.as_deref().unwrap_or(user);
    ctx
      .run(&format!("chown {}:{} {path_q}", shell::quote(user), shell::quote(group)))
      .await?;
  }

  if let Some(mode) = &opts.mode {
    ctx.run(&format!("chmod {} {path_q}", shell::quote(mode))).await?;
  }

  Ok(())
}

/// Whether `path` exists on the target.
///
/// The path is expanded by the remote shell (`test -e "$(echo <path>)"`),
/// so `~` and globs resolve there. Relative paths are relative to the
/// context's working directory.
pub async fn exists<S: Session>(ctx: &Exec<'_, S>, path: &str) -> Result<bool, ExecError> {
  let found = ctx.check(&format!("test -e \"$(echo {path})\"")).await?;
  debug!(path = %path, found, "existence check");
  Ok(found)
}

/// How [`contains`] interprets the search text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainsOptions {
  /// Only match a line consisting of exactly `text`.
  pub exact: bool,
  /// Escape `text` for literal matching. When false, `text` is used as a raw
  /// extended regex and `exact` is ignored.
  pub escape: bool,
}

impl Default for ContainsOptions {
  fn default() -> Self {
    Self {
      exact: false,
      escape: true,
    }
  }
}

/// Whether `filename` contains `text` on any line.
///
/// Matching is done remotely with `grep -E "<pattern>" "<filename>"`.
pub async fn contains<S: Session>(
  ctx: &Exec<'_, S>,
  filename: &str,
  text: &str,
  opts: ContainsOptions,
) -> Result<bool, ExecError> {
  let pattern = if opts.escape {
    let escaped = shell::escape_for_regex(text);
    if opts.exact { format!("^{escaped}$") } else { escaped }
  } else {
    text.to_string()
  };
  ctx.check(&format!("grep -E \"{pattern}\" \"{filename}\"")).await
}

/// How [`append`] decides whether a line is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOptions {
  /// Treat a line as present when an existing line starts with it, instead
  /// of requiring a full-line match.
  pub partial: bool,
  /// Escape single quotes in the appended text.
  pub escape: bool,
}

impl Default for AppendOptions {
  fn default() -> Self {
    Self {
      partial: false,
      escape: true,
    }
  }
}

/// Append each of `lines` to `filename` unless it is already there.
///
/// Lines are handled independently and in order. A line is skipped when it
/// is non-empty, the file exists, and the file already holds a matching
/// line (`^<line>$`, or `^<line>` with `partial`). Empty lines are always
/// appended. Lines are written with `printf '%s\n'`, so backslashes reach
/// the file unchanged. Returns the number of lines written.
pub async fn append<S: Session, L: AsRef<str>>(
  ctx: &Exec<'_, S>,
  filename: &str,
  lines: &[L],
  opts: AppendOptions,
) -> Result<usize, ExecError> {
  let mut written = 0;

  for line in lines {
    let line = line.as_ref();
    let regex = format!(
      "^{}{}",
      shell::escape_for_regex(line),
      if opts.partial { "" } else { "$" }
    );

    let present = !line.is_empty()
      && exists(ctx, filename).await?
      && contains(
        ctx,
        filename,
        &regex,
        ContainsOptions {
          exact: false,
          escape: false,
        },
      )
      .await?;

    if present {
      debug!(file = %filename, line = %line, "line already present");
      continue;
    }

    let text = if opts.escape {
      shell::escape_single_quotes(line)
    } else {
      line.to_string()
    };
    ctx
      .run(&format!("printf '%s\\n' '{text}' >> {}", shell::quote(filename)))
      .await?;
    written += 1;
  }

  Ok(written)
}
