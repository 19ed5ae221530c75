//! Shell environment introspection, e.g. programs on the effective `$PATH`.

use crate::exec::{Exec, ExecError};
use crate::session::Session;
use crate::shell;

/// Whether the connected user has program `name` on their `$PATH`.
pub async fn have_program<S: Session>(ctx: &Exec<'_, S>, name: &str) -> Result<bool, ExecError> {
  ctx.check(&format!("which {}", shell::quote(name))).await
}
