use std::io::Write;

use assert_cmd::Command;
use predicates::boolean::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::NamedTempFile;

const BINARY_NAME: &str = "arena";

#[test]
fn plays_a_short_match() {
    let mut cmd = Command::cargo_bin(BINARY_NAME).expect("Binary should be built");

    drop(
        cmd.args(["--games", "2", "--strategy", "root", "--threads", "2"])
            .args(["--start-ms", "2000", "--play-ms", "2000", "--max-iterations", "200"])
            .args(["--turn-margin-ms", "0", "--meta-game-margin-ms", "0"])
            .assert()
            .success()
            .stdout(contains("\"games\": 2").and(contains("\"records\"")).and(contains("\"agent_reward\""))),
    );
}

#[test]
fn reads_settings_from_a_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{ "strategy": "sequential", "max_iterations": 100, "turn_margin_ms": 0, "meta_game_margin_ms": 0 }}"#).unwrap();

    let mut cmd = Command::cargo_bin(BINARY_NAME).expect("Binary should be built");
    drop(
        cmd.arg("--config")
            .arg(file.path())
            .args(["--role", "o", "--play-ms", "2000", "--start-ms", "1000"])
            .assert()
            .success()
            .stdout(contains("\"games\": 1")),
    );

    let path = file.path().to_path_buf();
    drop(file);
    assert!(!path.exists());
}

#[test]
fn rejects_a_missing_settings_file() {
    let mut cmd = Command::cargo_bin(BINARY_NAME).expect("Binary should be built");

    drop(
        cmd.args(["--config", "/nonexistent/arena.json"])
            .assert()
            .failure()
            .stderr(contains("arena.json")),
    );
}
