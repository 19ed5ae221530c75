//! hostcraft-lib: host provisioning helpers over a command-execution session
//!
//! Every helper takes an [`exec::Exec`] context wrapping a [`session::Session`]
//! and issues plain POSIX shell commands through it:
//! - `files`, `info`, `environment`, `users`: probes and idempotent edits
//! - `packages`: OS packages and gems, plus `packages::source`, which builds
//!   and packages upstream tarballs in resumable stages
//! - `transfers`, `supervisor`, `auth`, `backup`, `git`, `commands`: composite
//!   tasks built from the above

pub mod auth;
pub mod backup;
pub mod commands;
pub mod consts;
pub mod environment;
pub mod exec;
pub mod files;
pub mod git;
pub mod info;
pub mod packages;
pub mod session;
pub mod shell;
pub mod supervisor;
pub mod template;
pub mod transfers;
pub mod users;
pub mod util;
