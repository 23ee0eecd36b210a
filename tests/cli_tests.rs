#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

struct TestHome {
    home: TempDir,
}

impl TestHome {
    fn new() -> TestHome {
        TestHome {
            home: TempDir::new().unwrap(),
        }
    }

    // Helper function to set up a test Command instance
    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("secview").unwrap();
        cmd.env_clear()
            .env("PATH", "/usr/bin:/bin")
            .env("HOME", self.home.path())
            .env("SECVIEW_DATA_DIR", self.home.path().join("data"))
            .env("SECVIEW_SCAN_ROOT", self.home.path())
            .env("SECVIEW_TEST_PASSPHRASE", "integration-pass");
        cmd
    }

    /// Writes an executable stand-in ciphertext under the test home.
    fn script(&self, name: &str, body: &str) -> std::path::PathBuf {
        let path = self.home.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

#[test]
#[serial]
fn test_cli_help() {
    let home = TestHome::new();
    home.command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("helper-encrypted"));
}

#[test]
#[serial]
fn test_cli_no_args_with_empty_cache() {
    let home = TestHome::new();

    // With no cache and no scan, the list flow has nothing to show
    home.command()
        .assert()
        .success()
        .stdout(predicate::str::contains("--scan"));
}

#[test]
#[serial]
fn test_cli_scan_finds_encrypted_files() {
    let home = TestHome::new();
    fs::create_dir_all(home.home.path().join("docs")).unwrap();
    fs::write(home.home.path().join("docs/secret.senc"), b"x").unwrap();
    fs::write(home.home.path().join("docs/plain.txt"), b"y").unwrap();

    home.command()
        .arg("--scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("secret.senc"))
        .stdout(predicate::str::contains("plain.txt").not());

    // The scan persists its findings for the next launch
    assert!(home.home.path().join("data/file_cache.json").exists());

    home.command()
        .assert()
        .success()
        .stdout(predicate::str::contains("secret.senc"));
}

#[test]
#[serial]
fn test_cli_scan_survives_unsaveable_cache() {
    let home = TestHome::new();
    fs::write(home.home.path().join("secret.senc"), b"x").unwrap();

    // Occupy the cache path with a directory so the write-then-rename
    // save cannot succeed. Cache persistence failures are non-fatal: the
    // scan must still report what it found.
    fs::create_dir_all(home.home.path().join("data/file_cache.json")).unwrap();

    home.command()
        .arg("--scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("secret.senc"));
}

#[test]
#[serial]
fn test_cli_view_missing_file_fails() {
    let home = TestHome::new();
    home.command()
        .arg("/no/such/file.senc")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
#[serial]
fn test_cli_view_displays_and_clears() {
    let home = TestHome::new();
    let ciphertext = home.script("note.senc", r#"read pass; printf 'decrypted body\n' > note.txt"#);

    // Enter on stdin clears the session after display
    home.command()
        .arg(&ciphertext)
        .write_stdin("\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("decrypted body"))
        .stdout(predicate::str::contains("[content cleared]"));
}

#[test]
#[serial]
fn test_cli_view_wrong_passphrase_fails() {
    let home = TestHome::new();
    let ciphertext = home.script("note.senc", r#"read pass; echo 'MAC check failed' >&2; exit 1"#);

    home.command()
        .arg(&ciphertext)
        .assert()
        .failure()
        .stderr(predicate::str::contains("MAC check failed"))
        .stderr(predicate::str::contains("integration-pass").not());
}

#[test]
#[serial]
fn test_cli_encrypt_via_configured_helper() {
    let home = TestHome::new();
    let helper = home.script(
        "senc",
        r#"read p1; read p2; [ "$p1" = "$p2" ] || exit 2; cp "$1" "$1.senc" && rm "$1""#,
    );
    let plaintext = home.home.path().join("diary.txt");
    fs::write(&plaintext, b"dear diary").unwrap();

    home.command()
        .env("SECVIEW_HELPER", &helper)
        .arg(&plaintext)
        .assert()
        .success()
        .stdout(predicate::str::contains("diary.txt.senc"));

    assert!(!plaintext.exists());
    assert!(Path::new(&format!("{}.senc", plaintext.display())).exists());
}

#[test]
#[serial]
fn test_cli_scan_conflicts_with_file_argument() {
    let home = TestHome::new();
    home.command()
        .arg("--scan")
        .arg("/tmp/a.senc")
        .assert()
        .failure();
}
