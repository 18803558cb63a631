//! CLI contract tests.

use assert_cmd::Command;

fn wacloud(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("wacloud").expect("binary should build");
    cmd.env("HOME", home)
        .env_remove("WACLOUD_CONFIG_PATH")
        .env_remove("WHATSAPP_PHONE_NUMBER_ID")
        .env_remove("WHATSAPP_ACCESS_TOKEN")
        .env_remove("WHATSAPP_API_VERSION")
        .env_remove("WHATSAPP_VERIFY_TOKEN");
    cmd
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn help_lists_subcommands() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let output = wacloud(home.path()).arg("--help").output().expect("should run");
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    for sub in ["text", "template", "media", "location", "verify"] {
        assert!(stdout.contains(sub), "help should mention {sub}");
    }
}

#[test]
fn verify_echoes_challenge_for_matching_token() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let output = wacloud(home.path())
        .env("WHATSAPP_VERIFY_TOKEN", "verify-secret")
        .args([
            "verify",
            "hub.mode=subscribe&hub.verify_token=verify-secret&hub.challenge=42",
        ])
        .output()
        .expect("should run");
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("200"));
    assert!(stdout.lines().any(|line| line.trim() == "42"));
}

#[test]
fn verify_fails_for_mismatched_token() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let output = wacloud(home.path())
        .env("WHATSAPP_VERIFY_TOKEN", "verify-secret")
        .args([
            "verify",
            "hub_mode=subscribe&hub_verify_token=wrong&hub_challenge=42",
        ])
        .output()
        .expect("should run");
    assert!(!output.status.success());
    assert!(stdout_of(&output).contains("403"));
}

#[test]
fn dry_run_prints_body_without_network() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let output = wacloud(home.path())
        .env("WHATSAPP_PHONE_NUMBER_ID", "1234567890")
        .env("WHATSAPP_ACCESS_TOKEN", "test-token")
        .args(["--dry-run", "template", "123", "template_id", "--lang", "ES", "--header-text", "Ana"])
        .output()
        .expect("should run");
    assert!(output.status.success());

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("dry run should print JSON");
    assert_eq!(
        parsed["url"],
        "https://graph.facebook.com/v14.0/1234567890/messages"
    );
    assert_eq!(parsed["body"]["template"]["language"]["code"], "ES");
    assert_eq!(
        parsed["body"]["template"]["components"][0]["parameters"][0]["text"],
        "Ana"
    );
    assert!(!stdout_of(&output).contains("test-token"));
}

#[test]
fn invalid_media_fails_before_sending() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let output = wacloud(home.path())
        .env("WHATSAPP_PHONE_NUMBER_ID", "1234567890")
        .env("WHATSAPP_ACCESS_TOKEN", "test-token")
        .args(["media", "image", "123", "ftp://x/y.png"])
        .output()
        .expect("should run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("scheme"));
}

#[test]
fn send_without_credentials_fails() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let output = wacloud(home.path())
        .args(["--dry-run", "text", "123", "hello"])
        .output()
        .expect("should run");
    assert!(!output.status.success());
}
