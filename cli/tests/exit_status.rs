use std::path::Path;
use std::process::{Command, Output};

/// Run `hubfetch` with its config, token and working directory inside `home`.
fn hubfetch(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hubfetch"))
        .args(args)
        .current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("HF_HOME", home.join("hf"))
        .env_remove("HF_TOKEN")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn assert_exit_zero(out: &Output) {
    assert_eq!(
        out.status.code(),
        Some(0),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
}

/// Point the hub at a port nothing listens on.
#[cfg(target_os = "linux")]
fn unreachable_hub(home: &Path) {
    let dir = home.join("config").join("hubfetch");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "[hub]\nendpoint = \"http://127.0.0.1:9\"\n").unwrap();
}

#[test]
fn unknown_subcommand_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let out = hubfetch(home.path(), &["bogus"]);
    assert_exit_zero(&out);
    assert!(String::from_utf8_lossy(&out.stderr).contains("bogus"));
}

#[test]
fn invalid_flag_value_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let out = hubfetch(home.path(), &["--limit", "abc", "config"]);
    assert_exit_zero(&out);
    assert!(String::from_utf8_lossy(&out.stderr).contains("abc"));
}

#[test]
fn help_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let out = hubfetch(home.path(), &["--help"]);
    assert_exit_zero(&out);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("pull"));
    assert!(stdout.contains("search"));
}

#[test]
fn command_error_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let out = hubfetch(home.path(), &["config", "no.such.key"]);
    assert_exit_zero(&out);
    assert!(String::from_utf8_lossy(&out.stderr).contains("Unknown config key"));
}

#[cfg(target_os = "linux")]
#[test]
fn unreachable_hub_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    unreachable_hub(home.path());

    let out = hubfetch(home.path(), &["--lang", "en", "search", "bert"]);
    assert_exit_zero(&out);
    assert!(String::from_utf8_lossy(&out.stdout).contains("Search failed"));

    let out = hubfetch(home.path(), &["--lang", "en", "pull", "org/model"]);
    assert_exit_zero(&out);
    assert!(String::from_utf8_lossy(&out.stdout).contains("Error: "));
}
