use std::os::unix::fs::PermissionsExt;

use hostcraft_lib::exec::Exec;
use hostcraft_lib::files::{self, AppendOptions, ContainsOptions, DirectoryOptions};

use super::common::TestEnv;

#[tokio::test]
async fn directory_creates_nested_path_with_mode() {
  let env = TestEnv::new();
  let ctx = Exec::new(&env.session);
  let dir = env.path_str("a/b/c");

  files::directory(&ctx, &dir, &DirectoryOptions::new().with_mode("0750"))
    .await
    .unwrap();

  let meta = std::fs::metadata(&dir).unwrap();
  assert!(meta.is_dir());
  assert_eq!(meta.permissions().mode() & 0o777, 0o750);
}

#[tokio::test]
async fn exists_expands_relative_paths_within_cwd() {
  let env = TestEnv::new();
  env.write("src/Makefile", "all:\n");
  let ctx = Exec::new(&env.session);

  assert!(files::exists(&ctx, &env.path_str("src/Makefile")).await.unwrap());
  assert!(files::exists(&ctx.within(&env.path_str("src")), "Makefile").await.unwrap());
  assert!(!files::exists(&ctx, &env.path_str("src/configure")).await.unwrap());
}

#[tokio::test]
async fn append_is_idempotent() {
  let env = TestEnv::new();
  let ctx = Exec::new(&env.session);
  let file = env.path_str("etc/profile");
  std::fs::create_dir_all(env.path("etc")).unwrap();
  let lines = ["export PATH=/opt/bin:$PATH", "alias ll='ls -l'"];

  let first = files::append(&ctx, &file, &lines, AppendOptions::default()).await.unwrap();
  let second = files::append(&ctx, &file, &lines, AppendOptions::default()).await.unwrap();

  assert_eq!(first, 2);
  assert_eq!(second, 0);
  assert_eq!(
    env.read("etc/profile"),
    "export PATH=/opt/bin:$PATH\nalias ll='ls -l'\n"
  );
}

#[tokio::test]
async fn partial_append_matches_prefix() {
  let env = TestEnv::new();
  let ctx = Exec::new(&env.session);
  env.write("sshd_config", "PermitRootLogin no # hardened\n");
  let file = env.path_str("sshd_config");
  let opts = AppendOptions {
    partial: true,
    escape: true,
  };

  let written = files::append(&ctx, &file, &["PermitRootLogin no"], opts).await.unwrap();

  assert_eq!(written, 0);
}

#[tokio::test]
async fn contains_literal_and_exact() {
  let env = TestEnv::new();
  let ctx = Exec::new(&env.session);
  env.write("hosts", "127.0.0.1 localhost\n10.0.0.1 db.internal\n");
  let file = env.path_str("hosts");

  assert!(files::contains(&ctx, &file, "127.0.0.1", ContainsOptions::default()).await.unwrap());
  assert!(!files::contains(&ctx, &file, "127x0x0x1", ContainsOptions::default()).await.unwrap());

  let exact = ContainsOptions {
    exact: true,
    escape: true,
  };
  assert!(files::contains(&ctx, &file, "10.0.0.1 db.internal", exact).await.unwrap());
  assert!(!files::contains(&ctx, &file, "10.0.0.1", exact).await.unwrap());
}

#[tokio::test]
async fn append_keeps_backslashes_verbatim() {
  let env = TestEnv::new();
  let ctx = Exec::new(&env.session);
  let file = env.path_str("profile");
  let lines = [r"PATH=C:\new\tools", r"continued \", r"tab\tand\cstop"];

  let first = files::append(&ctx, &file, &lines, AppendOptions::default()).await.unwrap();
  let second = files::append(&ctx, &file, &lines, AppendOptions::default()).await.unwrap();

  assert_eq!(first, 3);
  assert_eq!(second, 0);
  assert_eq!(env.read("profile"), "PATH=C:\\new\\tools\ncontinued \\\ntab\\tand\\cstop\n");
}

#[tokio::test]
async fn partial_append_with_trailing_backslash() {
  let env = TestEnv::new();
  let ctx = Exec::new(&env.session);
  env.write("Makefile", "CFLAGS = -O2 \\\n");
  let file = env.path_str("Makefile");
  let opts = AppendOptions {
    partial: true,
    escape: true,
  };

  let written = files::append(&ctx, &file, &[r"CFLAGS = -O2 \"], opts).await.unwrap();

  assert_eq!(written, 0);
}
