//! Smoke tests for command wiring

use assert_cmd::Command;
use predicates::prelude::*;

fn vgenie() -> Command {
    let mut cmd = Command::cargo_bin("vgenie").unwrap();
    // Keep the developer's own config out of the picture
    cmd.env("HOME", std::env::temp_dir().join("vgenie-smoke-home"))
        .env_remove("VGENIE_CONFIG")
        .env_remove("DATABASE_URL")
        .env_remove("STRIPE_SECRET_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    vgenie()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("estimate"))
        .stdout(predicate::str::contains("migrate"));
}

#[test]
fn test_serve_help() {
    vgenie()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Address to bind to"));
}

#[test]
fn test_estimate_text() {
    vgenie()
        .args([
            "estimate",
            "--industry",
            "restaurant",
            "--revenue",
            "850000",
            "--profit",
            "120000",
            "--owner-salary",
            "60000",
            "--name",
            "Harbor Cafe",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Harbor Cafe"))
        .stdout(predicate::str::contains("Value:"));
}

#[test]
fn test_estimate_json() {
    let output = vgenie()
        .args([
            "estimate", "--industry", "retail", "--revenue", "500000", "--profit", "80000", "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["value_low"].as_f64().unwrap() <= value["value_high"].as_f64().unwrap());
}

#[test]
fn test_estimate_rejects_negative_revenue() {
    vgenie()
        .args(["estimate", "--industry", "retail", "--revenue=-5", "--profit", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("annual_revenue"));
}

#[test]
fn test_industries_table() {
    vgenie()
        .arg("industries")
        .assert()
        .success()
        .stdout(predicate::str::contains("restaurant"))
        .stdout(predicate::str::contains("Unlisted industries use 2x - 3x"));
}

#[test]
fn test_config_show_masks_secrets() {
    vgenie()
        .args(["config", "show"])
        .env("STRIPE_SECRET_KEY", "sk_test_supersecret")
        .assert()
        .success()
        .stdout(predicate::str::contains("[pricing]"))
        .stdout(predicate::str::contains("sk_test_supersecret").not());
}

#[test]
fn test_config_show_missing_file_fails() {
    vgenie()
        .args(["--config", "/nonexistent/vgenie.toml", "config", "show"])
        .assert()
        .failure();
}

#[test]
fn test_migrate_requires_database_url() {
    vgenie()
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL"));
}
