use assert_cmd::Command;

#[test]
fn settings_prints_resolved_configuration() {
    let output = Command::cargo_bin("bookstore")
        .unwrap()
        .arg("settings")
        .env("BOOKSTORE_CONFIG_DIR", "/nonexistent")
        .env("BOOKSTORE_ENV", "staging")
        .env("BOOKSTORE_SERVER__PORT", "9311")
        .output()
        .unwrap();

    assert!(output.status.success());
    let settings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(settings["environment"], "staging");
    assert_eq!(settings["server"]["port"], 9311);
    assert_eq!(settings["backend"]["mode"], "store");
}

#[test]
fn unknown_environment_fails() {
    Command::cargo_bin("bookstore")
        .unwrap()
        .arg("settings")
        .env("BOOKSTORE_CONFIG_DIR", "/nonexistent")
        .env("BOOKSTORE_ENV", "qa")
        .assert()
        .failure();
}

#[test]
fn serve_rejects_unknown_mode() {
    Command::cargo_bin("bookstore")
        .unwrap()
        .args(["serve", "--mode", "mirror"])
        .assert()
        .failure();
}
