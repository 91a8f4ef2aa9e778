#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

#[allow(dead_code)]
pub const NOTE: &str = "---\ntags: [rust, notes]\n---\n\n# Rust\n\nOwnership rules everything.\n\nPinned paragraph ^pin001\n\n- borrow\n- move\n- copy\n";

/// A `notechunk` command pointed at a config file inside `dir` with no
/// inter-call delay.
#[allow(dead_code)]
pub fn notechunk_cmd(dir: &Path) -> Command {
    let config = dir.join("config.toml");
    if !config.exists() {
        fs::write(&config, "[sync]\ninter_call_delay_ms = 0\nembedding_dimensions = 8\n")
            .expect("failed to write test config");
    }
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("notechunk"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env("NO_COLOR", "1");
    cmd.env("NOTECHUNK_CONFIG", &config);
    cmd
}

#[allow(dead_code)]
pub fn write_note(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("failed to write note");
    path
}
