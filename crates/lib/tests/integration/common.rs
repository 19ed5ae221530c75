//! Shared helpers for integration tests against the local machine.

use std::path::{Path, PathBuf};

use hostcraft_lib::session::LocalSession;
use tempfile::TempDir;

/// Isolated scratch directory plus a session running commands locally.
pub struct TestEnv {
  pub temp: TempDir,
  pub session: LocalSession,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
      session: LocalSession::new(),
    }
  }

  /// Absolute path inside the scratch directory.
  pub fn path(&self, rel: &str) -> PathBuf {
    self.temp.path().join(rel)
  }

  /// Same as [`TestEnv::path`], as a string for shell commands.
  pub fn path_str(&self, rel: &str) -> String {
    path_str(&self.path(rel))
  }

  pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
    let path = self.path(rel);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
  }

  pub fn read(&self, rel: &str) -> String {
    std::fs::read_to_string(self.path(rel)).unwrap()
  }
}

pub fn path_str(path: &Path) -> String {
  path.to_str().unwrap().to_string()
}
