use hostcraft_lib::backup;
use hostcraft_lib::exec::Exec;

use super::common::TestEnv;

#[tokio::test]
async fn backup_then_rollback_restores_contents() {
  let env = TestEnv::new();
  let ctx = Exec::new(&env.session);
  env.write("app.conf", "version=1\n");
  let file = env.path_str("app.conf");

  assert!(backup::backup_file(&ctx, &file).await.unwrap());
  let latest = backup::find_latest_backup(&ctx, &file).await.unwrap().unwrap();
  assert!(latest.starts_with(&format!("{file}-")));

  env.write("app.conf", "version=2\n");
  assert!(backup::rollback_latest_backup(&ctx, &file).await.unwrap());
  assert_eq!(env.read("app.conf"), "version=1\n");
}

#[tokio::test]
async fn missing_file_has_no_backup() {
  let env = TestEnv::new();
  let ctx = Exec::new(&env.session);
  let file = env.path_str("absent.conf");

  assert!(!backup::backup_file(&ctx, &file).await.unwrap());
  assert_eq!(backup::find_latest_backup(&ctx, &file).await.unwrap(), None);
  assert!(!backup::rollback_latest_backup(&ctx, &file).await.unwrap());
}
