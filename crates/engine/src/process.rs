//! Subprocess execution boundary
//!
//! Prerequisite checks run commands and scripts through [`ProcessRunner`],
//! so tests can substitute canned output. [`ShellRunner`] is the real
//! implementation built on `duct`.

use crate::error::{Error, Result};
use keepstate_core::platform::CURRENT_PLATFORM;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Combined output and exit status of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if terminated by a signal
    pub code: Option<i32>,
    /// stdout and stderr, interleaved
    pub output: String,
}

impl ProcessOutput {
    /// Whether the process exited with status 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs commands and scripts, capturing combined output
///
/// Calls block until the child exits; there is no timeout.
pub trait ProcessRunner {
    /// Run a command line through the platform shell
    fn run_command(&self, command: &str) -> Result<ProcessOutput>;

    /// Run a script file with its interpreter
    fn run_script_file(&self, path: &Path) -> Result<ProcessOutput>;

    /// Run script text by writing it to a temporary file first
    fn run_inline_script(&self, script: &str) -> Result<ProcessOutput>;
}

/// Real process runner
///
/// Relative script paths resolve against the base directory (the manifest's
/// directory in the CLI), falling back to the current directory.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    base_dir: Option<PathBuf>,
}

impl ShellRunner {
    /// Create a runner resolving relative paths against the current directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative script paths against `dir`
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    #[tracing::instrument(skip(self, args), fields(program = %program))]
    fn run(&self, program: &str, args: &[String]) -> Result<ProcessOutput> {
        let resolved = which::which(program).map_err(|e| Error::Process {
            program: program.to_string(),
            message: e.to_string(),
        })?;

        let mut expression = duct::cmd(&resolved, args)
            .stderr_to_stdout()
            .stdout_capture()
            .unchecked();
        if let Some(dir) = &self.base_dir {
            expression = expression.dir(dir);
        }

        let output = expression.run().map_err(|e| Error::Process {
            program: program.to_string(),
            message: e.to_string(),
        })?;

        let result = ProcessOutput {
            code: output.status.code(),
            output: String::from_utf8_lossy(&output.stdout).into_owned(),
        };
        tracing::debug!(code = ?result.code, bytes = result.output.len(), "Process finished");
        Ok(result)
    }
}

impl ProcessRunner for ShellRunner {
    fn run_command(&self, command: &str) -> Result<ProcessOutput> {
        if command.trim().is_empty() {
            return Err(Error::Process {
                program: String::new(),
                message: "Empty command".to_string(),
            });
        }

        let (shell, shell_args) = CURRENT_PLATFORM.shell();
        let mut args: Vec<String> = shell_args.iter().map(|s| (*s).to_string()).collect();
        args.push(command.to_string());
        self.run(shell, &args)
    }

    fn run_script_file(&self, path: &Path) -> Result<ProcessOutput> {
        let script = self.resolve(path);
        if !script.is_file() {
            return Err(Error::Process {
                program: script.display().to_string(),
                message: "Script not found".to_string(),
            });
        }

        let (interpreter, mut args) = interpreter_for(&script)?;
        args.push(script.to_string_lossy().into_owned());
        tracing::debug!("Using interpreter: {} {:?}", interpreter, args);
        self.run(&interpreter, &args)
    }

    fn run_inline_script(&self, script: &str) -> Result<ProcessOutput> {
        let suffix = if CURRENT_PLATFORM.is_windows() {
            ".ps1"
        } else {
            ".sh"
        };

        let mut temp_file = tempfile::Builder::new()
            .prefix("keepstate-check-")
            .suffix(suffix)
            .tempfile()?;
        temp_file.write_all(script.as_bytes())?;
        temp_file.flush()?;

        // temp_file is deleted when dropped, after the child exits
        self.run_script_file(temp_file.path())
    }
}

/// Pick the interpreter for a script: shebang first, then extension
fn interpreter_for(script: &Path) -> Result<(String, Vec<String>)> {
    let file = fs::File::open(script)?;
    let mut first_line = String::new();
    BufReader::new(file).read_line(&mut first_line)?;

    match first_line.strip_prefix("#!") {
        Some(shebang) => parse_shebang(shebang.trim()),
        None => Ok(infer_interpreter(script)),
    }
}

/// Parse a shebang line (without `#!`) into interpreter and arguments
///
/// - `/bin/bash` → ("bash", [])
/// - `/usr/bin/env python3` → ("python3", [])
/// - `/bin/sh -e` → ("sh", ["-e"])
fn parse_shebang(shebang: &str) -> Result<(String, Vec<String>)> {
    let parts = shell_words::split(shebang).map_err(|e| Error::Process {
        program: shebang.to_string(),
        message: format!("Invalid shebang: {e}"),
    })?;

    let mut parts = parts.into_iter();
    let first = parts.next().ok_or_else(|| Error::Process {
        program: String::new(),
        message: "Empty shebang".to_string(),
    })?;

    let name = Path::new(&first)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&first)
        .to_string();

    if name == "env" {
        let interpreter = parts.next().ok_or_else(|| Error::Process {
            program: first.clone(),
            message: "env shebang without interpreter".to_string(),
        })?;
        return Ok((interpreter, parts.collect()));
    }

    Ok((name, parts.collect()))
}

/// Infer an interpreter from the file extension
fn infer_interpreter(script: &Path) -> (String, Vec<String>) {
    let extension = script
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let (interpreter, args): (&str, &[&str]) = match extension.as_str() {
        "ps1" => (
            if CURRENT_PLATFORM.is_windows() {
                "powershell"
            } else {
                "pwsh"
            },
            &["-NoProfile", "-NonInteractive", "-File"],
        ),
        "bash" => ("bash", &[]),
        "zsh" => ("zsh", &[]),
        "py" => ("python3", &[]),
        "rb" => ("ruby", &[]),
        "pl" => ("perl", &[]),
        "js" => ("node", &[]),
        "cmd" | "bat" => ("cmd", &["/C"]),
        _ => ("sh", &[]),
    };

    (
        interpreter.to_string(),
        args.iter().map(|s| (*s).to_string()).collect(),
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_shebang_plain() {
        assert_eq!(
            parse_shebang("/bin/bash").unwrap(),
            ("bash".to_string(), vec![])
        );
    }

    #[test]
    fn test_parse_shebang_env() {
        assert_eq!(
            parse_shebang("/usr/bin/env python3 -u").unwrap(),
            ("python3".to_string(), vec!["-u".to_string()])
        );
    }

    #[test]
    fn test_parse_shebang_with_args() {
        assert_eq!(
            parse_shebang("/bin/sh -e").unwrap(),
            ("sh".to_string(), vec!["-e".to_string()])
        );
    }

    #[test]
    fn test_parse_shebang_env_without_interpreter() {
        assert!(parse_shebang("/usr/bin/env").is_err());
    }

    #[test]
    fn test_infer_interpreter() {
        assert_eq!(infer_interpreter(Path::new("check.py")).0, "python3");
        assert_eq!(infer_interpreter(Path::new("check")).0, "sh");
        let (ps, args) = infer_interpreter(Path::new("Check.PS1"));
        assert!(ps == "pwsh" || ps == "powershell");
        assert_eq!(args.last().unwrap(), "-File");
    }

    #[test]
    fn test_process_output_success() {
        let ok = ProcessOutput {
            code: Some(0),
            output: String::new(),
        };
        let failed = ProcessOutput {
            code: Some(2),
            output: String::new(),
        };
        assert!(ok.success());
        assert!(!failed.success());
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let runner = ShellRunner::new().with_base_dir("/opt/manifests");
        assert_eq!(
            runner.resolve(Path::new("checks/a.sh")),
            PathBuf::from("/opt/manifests/checks/a.sh")
        );
        assert_eq!(
            runner.resolve(Path::new("/abs/a.sh")),
            PathBuf::from("/abs/a.sh")
        );
    }

    #[test]
    fn test_missing_script_is_error() {
        let temp = TempDir::new().unwrap();
        let runner = ShellRunner::new();
        let result = runner.run_script_file(&temp.path().join("absent.sh"));
        assert!(matches!(result, Err(Error::Process { .. })));
    }

    #[test]
    fn test_empty_command_is_error() {
        assert!(ShellRunner::new().run_command("   ").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_captures_stdout_and_stderr() {
        let output = ShellRunner::new()
            .run_command("echo out; echo err 1>&2")
            .unwrap();
        assert!(output.success());
        assert!(output.output.contains("out"));
        assert!(output.output.contains("err"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_nonzero_exit_is_not_error() {
        let output = ShellRunner::new().run_command("exit 3").unwrap();
        assert_eq!(output.code, Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_inline_script() {
        let output = ShellRunner::new()
            .run_inline_script("#!/bin/sh\necho version 1.2.3\n")
            .unwrap();
        assert!(output.output.contains("version 1.2.3"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_script_file_relative_to_base() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("probe.sh"), "echo probed\n").unwrap();

        let output = ShellRunner::new()
            .with_base_dir(temp.path())
            .run_script_file(Path::new("probe.sh"))
            .unwrap();
        assert_eq!(output.output.trim(), "probed");
    }
}
