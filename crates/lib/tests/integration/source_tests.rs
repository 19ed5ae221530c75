//! Runs the full source pipeline locally against a generated tarball, with a
//! stand-in `fpm` on the `$PATH`.

use std::os::unix::fs::PermissionsExt;

use hostcraft_lib::exec::{Exec, Runner};
use hostcraft_lib::packages::source::{self, BuildSpec, Stage, StageOutcome};

use super::common::{TestEnv, path_str};

const FAKE_FPM: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --package) shift; out="$1" ;;
  esac
  shift
done
find . -type f | sort > "$out"
"#;

const CONFIGURE: &str = "#!/bin/sh\necho \"PREFIX=/usr/local $*\" > Makefile\n";

fn executable(env: &TestEnv, rel: &str, contents: &str) {
  let path = env.write(rel, contents);
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Lays out `dist/demo-1.0.tar.gz` and a `bin/fpm` stub.
fn prepare(env: &TestEnv) {
  executable(env, "upstream/demo-1.0/configure", CONFIGURE);
  env.write("upstream/demo-1.0/hello.in", "#!/bin/sh\necho hello\n");
  executable(env, "bin/fpm", FAKE_FPM);
  std::fs::create_dir_all(env.path("dist")).unwrap();
  let status = std::process::Command::new("tar")
    .current_dir(env.path("upstream"))
    .args(["czf", &env.path_str("dist/demo-1.0.tar.gz"), "demo-1.0"])
    .status()
    .unwrap();
  assert!(status.success());
}

fn demo_spec(env: &TestEnv) -> BuildSpec {
  let mut spec = BuildSpec::new(
    "demo",
    "1.0",
    1,
    env.path_str("work"),
    format!("file://{}/%(package_name)s.tar.gz", env.path_str("dist")),
    "deb",
  )
  .with(["ssl"])
  .with_sentinel(Stage::Build, "hello")
  .with_sentinel(Stage::Install, "bin/hello")
  .with_sentinel(Stage::Package, "demo-1.0-1.deb")
  .with_install_command("mkdir -p %(stage_root)s/bin && cp hello %(stage_root)s/bin/hello");
  spec.build_command = "cp hello.in hello".to_string();
  spec
}

/// Whether the host has the tools the pipeline shells out to. Reports the
/// first missing one on stderr.
fn local_tools_available() -> bool {
  for tool in ["curl", "tar", "gzip", "which"] {
    let found = std::process::Command::new("sh")
      .args(["-c", &format!("command -v {tool}")])
      .output()
      .is_ok_and(|out| out.status.success());
    if !found {
      eprintln!("skipping source pipeline test: `{tool}` not found on PATH");
      return false;
    }
  }
  true
}

#[tokio::test]
async fn builds_then_skips_everything_on_rerun() {
  if !local_tools_available() {
    return;
  }
  let env = TestEnv::new();
  prepare(&env);
  let bin = path_str(&env.path("bin"));
  let ctx = Exec::new(&env.session).with_runner(Runner::custom(move |cmd| format!("PATH={bin}:$PATH; {cmd}")));
  let spec = demo_spec(&env);

  let first = source::build(&ctx, &spec).await.unwrap();

  assert_eq!(first.package_path, env.path_str("work/demo-1.0-1.deb"));
  assert!(Stage::ALL.iter().all(|s| first.ran(*s)));
  assert!(env.read("work/demo-1.0/Makefile").contains("--with-ssl"));
  assert_eq!(env.read("work/demo-1.0-1.deb"), "./bin/hello\n");

  let second = source::build(&ctx, &spec).await.unwrap();

  assert!(second.stages.iter().all(|(_, o)| *o == StageOutcome::Skipped));
}

#[tokio::test]
async fn forcing_stage_rebuilds_staging_directory() {
  if !local_tools_available() {
    return;
  }
  let env = TestEnv::new();
  prepare(&env);
  let bin = path_str(&env.path("bin"));
  let ctx = Exec::new(&env.session).with_runner(Runner::custom(move |cmd| format!("PATH={bin}:$PATH; {cmd}")));
  let spec = demo_spec(&env);
  source::build(&ctx, &spec).await.unwrap();
  env.write("work/stage/leftover", "stale\n");

  let forced = source::build(&ctx, &spec.clone().with_force("stage")).await.unwrap();

  assert!(!forced.ran(Stage::Build));
  assert!(forced.ran(Stage::Install));
  assert!(!env.path("work/stage/leftover").exists());
  assert!(env.path("work/stage/bin/hello").exists());
}
