use assert_cmd::Command;
use serde_json::Value;

fn mailpilot() -> Command {
    let mut cmd = Command::cargo_bin("mailpilot").unwrap();
    cmd.env_remove("RUST_LOG")
        .args(["--config", "tests/fixtures/config.yaml"]);
    cmd
}

fn json_stdout(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn parse_prints_the_structured_intent() {
    let output = mailpilot()
        .args(["--output", "json", "parse"])
        .args(["send", "an", "email", "to", "bob@example.com", "about", "lunch"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let intent = json_stdout(&output);
    assert_eq!(intent["recipient"], "bob@example.com");
    assert_eq!(intent["subject"], "lunch");
}

#[test]
fn parse_rejects_instructions_without_a_recipient() {
    mailpilot()
        .args(["parse", "write", "something", "nice"])
        .assert()
        .failure();
}

#[test]
fn providers_lists_the_builtin_catalog() {
    let output = mailpilot()
        .args(["--output", "json", "providers"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let providers = json_stdout(&output);
    let names: Vec<&str> = providers
        .as_array()
        .unwrap()
        .iter()
        .map(|provider| provider["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["gmail", "outlook"]);
}

#[test]
fn dry_run_send_walks_every_provider() {
    let output = mailpilot()
        .args([
            "--output",
            "json",
            "send",
            "--dry-run",
            "--providers",
            "gmail",
            "outlook",
            "--",
            "email",
            "to",
            "carol@example.com",
            "saying",
            "hello",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let summary = json_stdout(&output);
    assert_eq!(summary["dry_run"], true);
    assert_eq!(summary["results"]["gmail"], true);
    assert_eq!(summary["results"]["outlook"], true);
    assert_eq!(summary["intent"]["body"], "hello");
}

#[test]
fn dry_run_with_unknown_provider_fails() {
    let output = mailpilot()
        .args([
            "--output", "json", "send", "--dry-run", "--providers", "yahoo", "--", "to",
            "dan@example.com",
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let summary = json_stdout(&output);
    assert_eq!(summary["results"]["yahoo"], false);
}
