//! Common test utilities for specpulse integration tests
//!
//! - CLI invocation helpers with piped answers on stdin
//! - Fixture paths and temporary spec files
//! - Helpers for driving the blocking engine from async wiremock tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// An address nothing listens on
pub const CLOSED_URL: &str = "http://127.0.0.1:9";

/// Exit status codes matching the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success = 0,
    Error = 1,
    Interrupted = 130,
}

impl From<i32> for ExitStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => ExitStatus::Success,
            130 => ExitStatus::Interrupted,
            _ => ExitStatus::Error,
        }
    }
}

/// Result of running the CLI
#[derive(Debug)]
pub struct CliResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: ExitStatus,
    pub exit_code: i32,
}

impl CliResponse {
    /// stdout and stderr together, for checks that do not care where a line went
    pub fn output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Isolated environment for one CLI run
pub struct MockEnvironment {
    pub config_dir: TempDir,
    pub env_vars: HashMap<String, String>,
    pub stdin: Option<Vec<u8>>,
}

impl Default for MockEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEnvironment {
    pub fn new() -> Self {
        let mut env_vars = HashMap::new();
        env_vars.insert("NO_COLOR".to_string(), "1".to_string());
        Self {
            config_dir: TempDir::new().expect("Failed to create temp config dir"),
            env_vars,
            stdin: None,
        }
    }

    pub fn set_env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env_vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Answers fed to the prompts, one per line
    pub fn with_answers(mut self, answers: &[&str]) -> Self {
        let mut input = answers.join("\n");
        input.push('\n');
        self.stdin = Some(input.into_bytes());
        self
    }

    /// Write `config.toml` into the isolated config directory
    pub fn with_config(self, content: &str) -> Self {
        std::fs::write(self.config_dir.path().join("config.toml"), content).expect("Failed to write config");
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.path().to_path_buf()
    }
}

/// Run the CLI with no input
pub fn specpulse(args: &[&str]) -> CliResponse {
    specpulse_with_env(args, &MockEnvironment::new())
}

/// Run the CLI feeding `answers` to the prompts
pub fn specpulse_with_answers(args: &[&str], answers: &[&str]) -> CliResponse {
    specpulse_with_env(args, &MockEnvironment::new().with_answers(answers))
}

pub fn specpulse_with_env(args: &[&str], env: &MockEnvironment) -> CliResponse {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_specpulse"));

    // Mock servers answer quickly; keep failures fast
    cmd.args(["--timeout", "2"]);
    cmd.args(args);

    cmd.env("SPECPULSE_CONFIG_DIR", env.config_path());
    cmd.env_remove("SPECPULSE_LOG");
    cmd.env_remove("RUST_LOG");
    for (key, value) in &env.env_vars {
        cmd.env(key, value);
    }

    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    if let Some(ref stdin_data) = env.stdin {
        cmd.stdin(Stdio::piped());
        let mut child = cmd.spawn().expect("Failed to spawn command");
        {
            let stdin = child.stdin.as_mut().expect("Failed to open stdin");
            stdin.write_all(stdin_data).expect("Failed to write to stdin");
        }
        let output = child.wait_with_output().expect("Failed to wait for command");
        parse_output(output)
    } else {
        cmd.stdin(Stdio::null());
        let output = cmd.output().expect("Failed to execute command");
        parse_output(output)
    }
}

fn parse_output(output: Output) -> CliResponse {
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(1);

    CliResponse {
        stdout,
        stderr,
        exit_status: ExitStatus::from(exit_code),
        exit_code,
    }
}

/// Write a spec document into a fresh temp dir, keeping the extension
pub fn write_spec(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let file_path = dir.path().join(name);
    std::fs::write(&file_path, content).expect("Failed to write spec file");
    (dir, file_path)
}

/// Copy a fixture and replace every `{{SERVER}}` with `server_url`
pub fn fixture_with_server(name: &str, server_url: &str) -> (TempDir, PathBuf) {
    let content = std::fs::read_to_string(fixtures::fixture_path(name)).expect("Failed to read fixture");
    write_spec(name, &content.replace("{{SERVER}}", server_url))
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("non UTF-8 temp path")
}

/// Test fixture paths
pub mod fixtures {
    use std::path::PathBuf;

    pub fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
    }

    pub fn fixture_path(name: &str) -> PathBuf {
        fixtures_dir().join(name)
    }

    /// Fixture path as an owned string for CLI arguments
    pub fn fixture_arg(name: &str) -> String {
        fixture_path(name).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_from_i32() {
        assert_eq!(ExitStatus::from(0), ExitStatus::Success);
        assert_eq!(ExitStatus::from(1), ExitStatus::Error);
        assert_eq!(ExitStatus::from(130), ExitStatus::Interrupted);
    }
}
