//! User account queries.

use crate::exec::{Exec, ExecError};
use crate::session::Session;
use crate::shell;

/// Whether `user` exists on the target.
pub async fn user_exists<S: Session>(ctx: &Exec<'_, S>, user: &str) -> Result<bool, ExecError> {
  ctx.check(&format!("id {}", shell::quote(user))).await
}
