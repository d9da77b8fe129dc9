use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_config(dir: &Path, image_dir: &Path) -> std::path::PathBuf {
    let path = dir.join("idiombot.toml");
    let contents = format!(
        "[log]\ndir = \"\"\nlevel = \"warn\"\n\n[idioms]\nimage_dir = {:?}\ntimeout_secs = 30\n",
        image_dir.display().to_string()
    );
    std::fs::write(&path, contents).unwrap();
    path
}

fn idiombot(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("idiombot").unwrap();
    cmd.current_dir(dir);
    cmd
}

#[test]
fn schema_prints_config_schema() {
    let dir = tempfile::tempdir().unwrap();
    idiombot(dir.path())
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"idioms\""))
        .stdout(predicate::str::contains("timeout_secs"));
}

#[test]
fn init_writes_config_once() {
    let dir = tempfile::tempdir().unwrap();
    idiombot(dir.path())
        .args(["init", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    let written = std::fs::read_to_string(dir.path().join("idiombot.toml")).unwrap();
    assert!(written.contains("trigger = \"猜成语\""));

    idiombot(dir.path())
        .args(["init", "."])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exists"));

    idiombot(dir.path())
        .args(["init", ".", "--force"])
        .assert()
        .success();
}

#[test]
fn unknown_log_level_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    idiombot(dir.path())
        .args(["--log-level", "loud", "schema"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown log level"));
}

#[test]
fn broken_config_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("idiombot.toml"), "[idioms\n").unwrap();
    idiombot(dir.path())
        .arg("doctor")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid idiombot.toml"));
}

#[test]
fn play_reports_failure_when_pool_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let pool = dir.path().join("pool");
    std::fs::create_dir_all(&pool).unwrap();
    let config = write_config(dir.path(), &pool);

    idiombot(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("play")
        .write_stdin("55 1 猜成语\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[55] @1 失败了..."));
}

#[test]
fn play_creates_missing_picture_directory() {
    let dir = tempfile::tempdir().unwrap();
    let pool = dir.path().join("data").join("img");
    let config = write_config(dir.path(), &pool);

    idiombot(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("play")
        .write_stdin("55 1 猜成语\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[55] @1 失败了..."));
    assert!(pool.is_dir());
}

#[test]
fn play_reveals_answer_when_input_ends() {
    let dir = tempfile::tempdir().unwrap();
    let pool = dir.path().join("pool");
    std::fs::create_dir_all(&pool).unwrap();
    std::fs::write(pool.join("一帆风顺.png"), "img").unwrap();
    let config = write_config(dir.path(), &pool);

    idiombot(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("play")
        .write_stdin("55 1 hello\nnot a line\n55 1 猜成语\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[55] @1 猜不出来的话"))
        .stdout(predicate::str::contains("一帆风顺.png"))
        .stdout(predicate::str::contains("[55] @1 太久啦，其实正确答案是一帆风顺哦"));
}

#[test]
fn doctor_flags_missing_pool() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &dir.path().join("missing"));
    idiombot(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("doctor")
        .assert()
        .failure()
        .stdout(predicate::str::contains("issue:"));
}

#[test]
fn doctor_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let pool = dir.path().join("pool");
    std::fs::create_dir_all(&pool).unwrap();
    std::fs::write(pool.join("画龙点睛.jpg"), "img").unwrap();
    let config = write_config(dir.path(), &pool);
    idiombot(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["doctor", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"local_pool\": 1"));
}
