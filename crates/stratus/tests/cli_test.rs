#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("stratus").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("クラウドは形になる"))
        .stdout(predicate::str::contains("synth"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("outputs"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("stratus").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stratus"));
}

/// synthコマンドのヘルプが正しく表示されることを確認
#[test]
fn test_synth_help() {
    let mut cmd = Command::cargo_bin("stratus").unwrap();
    cmd.arg("synth")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--topology"))
        .stdout(predicate::str::contains("--out"));
}

/// validateコマンドのヘルプが正しく表示されることを確認
#[test]
fn test_validate_help() {
    let mut cmd = Command::cargo_bin("stratus").unwrap();
    cmd.arg("validate")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--topology"));
}

/// outputsコマンドのヘルプが正しく表示されることを確認
#[test]
fn test_outputs_help() {
    let mut cmd = Command::cargo_bin("stratus").unwrap();
    cmd.arg("outputs")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--json"));
}

/// 不正なコマンドでエラーになることを確認
#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("stratus").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

/// プロジェクトディレクトリ外でvalidateを実行するとエラーになることを確認
#[test]
fn test_validate_without_project() {
    let mut cmd = Command::cargo_bin("stratus").unwrap();
    cmd.current_dir(std::env::temp_dir())
        .env_remove("STRATUS_PROJECT_ROOT")
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("プロジェクトルートが見つかりません"));
}

/// プロジェクトディレクトリ外でもversionは動くことを確認
#[test]
fn test_version_works_without_project() {
    let mut cmd = Command::cargo_bin("stratus").unwrap();
    cmd.current_dir(std::env::temp_dir())
        .env_remove("STRATUS_PROJECT_ROOT")
        .arg("version")
        .assert()
        .success();
}
