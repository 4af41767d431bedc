use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use rstest::*;

macro_rules! cargo_run {
    ($cmd:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin($cmd)?;
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

/// 在 `<root>/raw/<split>/<video_id>` 下创建一个场景
///
/// `extra_rgb` 是只有 RGB 的时间戳
fn make_scene(
    root: &TempDir,
    split: &str,
    video_id: &str,
    times: &[&str],
    extra_rgb: &[&str],
) -> Result<()> {
    let scene = root.child(format!("raw/{split}/{video_id}"));
    for t in times {
        scene.child(format!("ultrawide/{video_id}_{t}.png")).touch()?;
        scene.child(format!("highres_depth/{video_id}_{t}.png")).touch()?;
        scene
            .child(format!("ultrawide_intrinsics/{video_id}_{t}.pincam"))
            .write_str("1920 1440 1500 1500 960 720")?;
    }
    for t in extra_rgb {
        scene.child(format!("ultrawide/{video_id}_{t}.png")).touch()?;
    }
    Ok(())
}

#[test]
fn reconcile_dry_run_keeps_files() -> Result<()> {
    let root = TempDir::new()?;
    make_scene(&root, "Training", "47333462", &["1.0", "2.0", "3.0"], &["4.0"])?;
    let scene = root.child("raw/Training/47333462");

    cargo_run!("arkprep", "reconcile", scene.path())
        .success()
        .stdout(predicate::str::contains("[DRY]"))
        .stdout(predicate::str::contains("孤立删除  1"));

    scene.child("ultrawide/47333462_4.0.png").assert(predicate::path::exists());
    Ok(())
}

#[test]
fn reconcile_execute_then_verify() -> Result<()> {
    let root = TempDir::new()?;
    make_scene(&root, "Training", "47333462", &["1.0", "2.0", "3.0"], &["4.0"])?;
    let scene = root.child("raw/Training/47333462");

    cargo_run!("arkprep", "verify", "--check", scene.path())
        .failure()
        .stdout(predicate::str::contains("[INVALID]"));

    cargo_run!("arkprep", "reconcile", "--execute", scene.path()).success();
    scene.child("ultrawide/47333462_4.0.png").assert(predicate::path::missing());
    scene.child("ultrawide/47333462_3.0.png").assert(predicate::path::exists());

    cargo_run!("arkprep", "verify", "--check", scene.path())
        .success()
        .stdout(predicate::str::contains("[OK]"));
    Ok(())
}

#[test]
fn reconcile_rejects_zero_stride() -> Result<()> {
    let root = TempDir::new()?;
    make_scene(&root, "Training", "47333462", &["1.0", "2.0"], &["4.0"])?;
    let scene = root.child("raw/Training/47333462");

    cargo_run!("arkprep", "reconcile", "--execute", "-n", "0", scene.path())
        .failure()
        .stderr(predicate::str::contains("无效的采样间隔"));

    scene.child("ultrawide/47333462_4.0.png").assert(predicate::path::exists());
    Ok(())
}

#[rstest]
#[case::json("json", "\"matched_count\": 3")]
#[case::table("table", "匹配      3")]
fn reconcile_output_format(#[case] format: &str, #[case] expected: &str) -> Result<()> {
    let root = TempDir::new()?;
    make_scene(&root, "Validation", "41069021", &["1", "2", "3"], &[])?;

    let split = root.child("raw/Validation");
    cargo_run!("arkprep", "reconcile", "--output-format", format, split.path())
        .success()
        .stdout(predicate::str::contains(expected));
    Ok(())
}

#[test]
fn reconcile_continues_after_failed_scene() -> Result<()> {
    let root = TempDir::new()?;
    make_scene(&root, "Validation", "100", &["1", "2"], &[])?;
    make_scene(&root, "Validation", "200", &["1", "2"], &["3"])?;
    root.child("raw/Validation/100/ultrawide/broken.png").touch()?;
    let split = root.child("raw/Validation");

    cargo_run!("arkprep", "reconcile", "--strict", "--execute", split.path())
        .failure()
        .stdout(predicate::str::contains("孤立删除  1"))
        .stderr(predicate::str::contains("1 个场景处理失败"));

    split.child("200/ultrawide/200_3.png").assert(predicate::path::missing());
    split.child("100/ultrawide/broken.png").assert(predicate::path::exists());
    Ok(())
}

#[test]
fn batch_over_data_dir() -> Result<()> {
    let root = TempDir::new()?;
    make_scene(&root, "Training", "47333462", &["1", "2", "3"], &["9"])?;
    make_scene(&root, "Validation", "41069021", &["1", "2"], &[])?;

    cargo_run!("arkprep", "-d", root.path(), "batch", "--execute", "--output-format", "json")
        .success()
        .stdout(predicate::str::contains("\"summary\""))
        .stdout(predicate::str::contains("\"orphan_removed\": 1"));

    root.child("raw/Training/47333462/ultrawide/47333462_9.png").assert(predicate::path::missing());

    cargo_run!("arkprep", "-d", root.path(), "batch", "--validate-only")
        .success()
        .stdout(predicate::str::contains("有效场景  2/2"));
    Ok(())
}

#[test]
fn list_scenes() -> Result<()> {
    let root = TempDir::new()?;
    make_scene(&root, "Training", "47333462", &["1"], &[])?;
    make_scene(&root, "Validation", "41069021", &["1"], &[])?;

    cargo_run!("arkprep", "-d", root.path(), "list", "--split", "Validation")
        .success()
        .stdout(predicate::str::contains("41069021"))
        .stdout(predicate::str::contains("47333462").not());
    Ok(())
}
