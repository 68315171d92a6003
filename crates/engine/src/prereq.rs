//! Prerequisite Engine
//!
//! Decides whether a backup or restore may proceed. Each prerequisite is a
//! probe (an application's output, a registry key or value, or a script's
//! output) plus a policy saying what a failed probe means for the running
//! operation.

use crate::error::{Error, Result};
use crate::process::{ProcessOutput, ProcessRunner};
use crate::registry::{RegistryAccessor, RegistryValue};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Operation being gated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Capturing state
    Backup,
    /// Replaying state
    Restore,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backup => f.write_str("Backup"),
            Self::Restore => f.write_str("Restore"),
        }
    }
}

/// What a failed prerequisite means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnMissing {
    /// Log a warning and continue
    #[default]
    Warn,
    /// Abort backups; warn on restore
    FailBackup,
    /// Abort restores; warn on backup
    FailRestore,
}

impl OnMissing {
    /// Whether a failure under `operation` aborts it
    pub fn is_fatal_for(self, operation: Operation) -> bool {
        matches!(
            (self, operation),
            (Self::FailBackup, Operation::Backup) | (Self::FailRestore, Operation::Restore)
        )
    }
}

impl fmt::Display for OnMissing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Warn => "warn",
            Self::FailBackup => "fail_backup",
            Self::FailRestore => "fail_restore",
        };
        f.write_str(name)
    }
}

/// One prerequisite from the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prerequisite {
    /// Display name, used in the failure message
    pub name: String,
    /// Failure policy
    #[serde(default)]
    pub on_missing: OnMissing,
    /// The probe to run
    #[serde(flatten)]
    pub check: PrerequisiteCheck,
}

/// Probe kinds, tagged by `type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum PrerequisiteCheck {
    /// Run a command and search its output
    Application {
        check_command: String,
        #[serde(alias = "expectedOutput")]
        expected_output_pattern: String,
    },
    /// Look for a key, optionally a value and its contents
    Registry {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_name: Option<String>,
        /// Compared by text form, so `1` and `"1"` match
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_value: Option<RegistryValue>,
    },
    /// Run a script and search its output
    ///
    /// `path` takes precedence over `inline_script` when both are set.
    Script {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        inline_script: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
        #[serde(alias = "expectedOutput")]
        expected_output_pattern: String,
    },
}

impl PrerequisiteCheck {
    /// Short kind name
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Application { .. } => "application",
            Self::Registry { .. } => "registry",
            Self::Script { .. } => "script",
        }
    }
}

/// Result of one prerequisite that did not abort the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// The probe succeeded
    Passed,
    /// The probe failed and the policy let the operation continue
    Warned,
}

/// Per-prerequisite outcome, in evaluation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrerequisiteOutcome {
    /// Prerequisite name
    pub name: String,
    /// What happened
    pub status: CheckStatus,
}

/// Evaluates prerequisites against the registry and by running processes
pub struct PrerequisiteEngine<'a> {
    registry: &'a dyn RegistryAccessor,
    runner: &'a dyn ProcessRunner,
}

impl<'a> PrerequisiteEngine<'a> {
    /// Create an engine
    pub fn new(registry: &'a dyn RegistryAccessor, runner: &'a dyn ProcessRunner) -> Self {
        Self { registry, runner }
    }

    /// Evaluate every prerequisite in order
    ///
    /// Returns `Ok(true)` when nothing aborted the operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PrerequisiteFailed`] for the first failed prerequisite
    /// whose policy is fatal for `operation`.
    pub fn evaluate(&self, prerequisites: &[Prerequisite], operation: Operation) -> Result<bool> {
        self.evaluate_report(prerequisites, operation).map(|_| true)
    }

    /// Like [`Self::evaluate`], returning an outcome per prerequisite
    ///
    /// # Errors
    ///
    /// Stops at the first fatal failure with [`Error::PrerequisiteFailed`];
    /// later prerequisites are not run.
    #[tracing::instrument(skip(self, prerequisites), fields(count = prerequisites.len()))]
    pub fn evaluate_report(
        &self,
        prerequisites: &[Prerequisite],
        operation: Operation,
    ) -> Result<Vec<PrerequisiteOutcome>> {
        let mut outcomes = Vec::with_capacity(prerequisites.len());

        for prerequisite in prerequisites {
            let status = if self.check(prerequisite) {
                tracing::debug!("Prerequisite '{}' passed", prerequisite.name);
                CheckStatus::Passed
            } else if prerequisite.on_missing.is_fatal_for(operation) {
                return Err(Error::PrerequisiteFailed {
                    name: prerequisite.name.clone(),
                    operation,
                    policy: prerequisite.on_missing,
                });
            } else {
                tracing::warn!(
                    "Prerequisite '{}' failed; continuing with {} ({})",
                    prerequisite.name,
                    operation,
                    prerequisite.on_missing
                );
                CheckStatus::Warned
            };

            outcomes.push(PrerequisiteOutcome {
                name: prerequisite.name.clone(),
                status,
            });
        }

        Ok(outcomes)
    }

    /// Run one probe; any error counts as a failure
    #[tracing::instrument(skip(self, prerequisite), fields(name = %prerequisite.name, kind = prerequisite.check.kind()))]
    pub fn check(&self, prerequisite: &Prerequisite) -> bool {
        match &prerequisite.check {
            PrerequisiteCheck::Application {
                check_command,
                expected_output_pattern,
            } => output_matches(self.runner.run_command(check_command), expected_output_pattern),
            PrerequisiteCheck::Registry {
                path,
                key_name,
                expected_value,
            } => self.check_registry(path, key_name.as_deref(), expected_value.as_ref()),
            PrerequisiteCheck::Script {
                inline_script,
                path,
                expected_output_pattern,
            } => {
                let output = match (path, inline_script) {
                    (Some(path), inline) => {
                        if inline.is_some() {
                            tracing::debug!("Both path and inlineScript set; using path");
                        }
                        self.runner.run_script_file(path)
                    }
                    (None, Some(script)) => self.runner.run_inline_script(script),
                    (None, None) => {
                        tracing::warn!("Script prerequisite has neither path nor inlineScript");
                        return false;
                    }
                };
                output_matches(output, expected_output_pattern)
            }
        }
    }

    fn check_registry(
        &self,
        path: &str,
        key_name: Option<&str>,
        expected: Option<&RegistryValue>,
    ) -> bool {
        match self.registry.key_exists(path) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("Registry key not found: {}", path);
                return false;
            }
            Err(e) => {
                tracing::debug!("Registry check failed: {}", e);
                return false;
            }
        }

        let Some(key_name) = key_name else {
            return true;
        };

        let value = match self.registry.get_value(path, key_name) {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::debug!("Registry value not found: {}\\{}", path, key_name);
                return false;
            }
            Err(e) => {
                tracing::debug!("Registry check failed: {}", e);
                return false;
            }
        };

        match expected {
            Some(expected) => {
                let matches = value.to_string() == expected.to_string();
                if !matches {
                    tracing::debug!("Registry value is '{}', expected '{}'", value, expected);
                }
                matches
            }
            None => true,
        }
    }
}

fn output_matches(output: Result<ProcessOutput>, pattern: &str) -> bool {
    let output = match output {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!("Check could not run: {}", e);
            return false;
        }
    };

    if !output.success() {
        tracing::debug!(code = ?output.code, "Check exited unsuccessfully");
        return false;
    }

    match Regex::new(pattern) {
        Ok(regex) => {
            let found = regex.is_match(&output.output);
            if !found {
                tracing::debug!("Output did not match /{}/: {}", pattern, output.output.trim());
            }
            found
        }
        Err(e) => {
            tracing::warn!("Invalid expectedOutputPattern '{}': {}", pattern, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::registry::MemoryRegistry;
    use std::cell::RefCell;
    use std::path::Path;

    /// Returns canned output and records what it was asked to run
    #[derive(Default)]
    struct FakeRunner {
        output: String,
        code: Option<i32>,
        fail_launch: bool,
        calls: RefCell<Vec<String>>,
    }

    impl FakeRunner {
        fn printing(output: &str) -> Self {
            Self {
                output: output.to_string(),
                code: Some(0),
                ..Self::default()
            }
        }

        fn respond(&self, call: String) -> Result<ProcessOutput> {
            self.calls.borrow_mut().push(call);
            if self.fail_launch {
                return Err(Error::Process {
                    program: "fake".to_string(),
                    message: "not found".to_string(),
                });
            }
            Ok(ProcessOutput {
                code: self.code,
                output: self.output.clone(),
            })
        }
    }

    impl ProcessRunner for FakeRunner {
        fn run_command(&self, command: &str) -> Result<ProcessOutput> {
            self.respond(format!("command:{command}"))
        }

        fn run_script_file(&self, path: &Path) -> Result<ProcessOutput> {
            self.respond(format!("file:{}", path.display()))
        }

        fn run_inline_script(&self, script: &str) -> Result<ProcessOutput> {
            self.respond(format!("inline:{script}"))
        }
    }

    fn application(name: &str, pattern: &str, on_missing: OnMissing) -> Prerequisite {
        Prerequisite {
            name: name.to_string(),
            on_missing,
            check: PrerequisiteCheck::Application {
                check_command: "git --version".to_string(),
                expected_output_pattern: pattern.to_string(),
            },
        }
    }

    #[test]
    fn test_application_match_passes() {
        let registry = MemoryRegistry::new();
        let runner = FakeRunner::printing("git version 2.43.0\n");
        let engine = PrerequisiteEngine::new(&registry, &runner);

        let prereqs = [application("Git", r"git version \d+\.\d+", OnMissing::FailBackup)];
        assert!(engine.evaluate(&prereqs, Operation::Backup).unwrap());
        assert_eq!(runner.calls.borrow()[0], "command:git --version");
    }

    #[test]
    fn test_pattern_is_a_search_not_full_match() {
        let registry = MemoryRegistry::new();
        let runner = FakeRunner::printing("prefix 1.2.3 suffix");
        let engine = PrerequisiteEngine::new(&registry, &runner);
        assert!(engine.check(&application("App", r"\d\.\d", OnMissing::Warn)));
    }

    #[test]
    fn test_fail_backup_aborts_backup_with_message() {
        let registry = MemoryRegistry::new();
        let runner = FakeRunner::printing("nothing useful");
        let engine = PrerequisiteEngine::new(&registry, &runner);

        let err = engine
            .evaluate(
                &[application("Git", "git version", OnMissing::FailBackup)],
                Operation::Backup,
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Prerequisite 'Git' failed. Cannot proceed with Backup operation as 'fail_backup' is set."
        );
    }

    #[test]
    fn test_fail_backup_only_warns_on_restore() {
        let registry = MemoryRegistry::new();
        let runner = FakeRunner::printing("nothing useful");
        let engine = PrerequisiteEngine::new(&registry, &runner);

        let report = engine
            .evaluate_report(
                &[application("Git", "git version", OnMissing::FailBackup)],
                Operation::Restore,
            )
            .unwrap();
        assert_eq!(report[0].status, CheckStatus::Warned);
    }

    #[test]
    fn test_fail_restore_aborts_restore_only() {
        let registry = MemoryRegistry::new();
        let runner = FakeRunner::printing("");
        let engine = PrerequisiteEngine::new(&registry, &runner);
        let prereqs = [application("Terminal", "x", OnMissing::FailRestore)];

        assert!(engine.evaluate(&prereqs, Operation::Backup).unwrap());
        let err = engine.evaluate(&prereqs, Operation::Restore).unwrap_err();
        assert!(matches!(
            err,
            Error::PrerequisiteFailed {
                operation: Operation::Restore,
                policy: OnMissing::FailRestore,
                ..
            }
        ));
    }

    #[test]
    fn test_short_circuits_on_first_hard_failure() {
        let registry = MemoryRegistry::new();
        let runner = FakeRunner::printing("");
        let engine = PrerequisiteEngine::new(&registry, &runner);

        let prereqs = [
            application("First", "x", OnMissing::Warn),
            application("Second", "x", OnMissing::FailBackup),
            application("Third", "x", OnMissing::FailBackup),
        ];
        let err = engine.evaluate(&prereqs, Operation::Backup).unwrap_err();
        assert!(err.to_string().contains("'Second'"));
        assert_eq!(runner.calls.borrow().len(), 2);
    }

    #[test]
    fn test_nonzero_exit_fails_even_if_output_matches() {
        let registry = MemoryRegistry::new();
        let runner = FakeRunner {
            code: Some(1),
            ..FakeRunner::printing("git version 2.0")
        };
        let engine = PrerequisiteEngine::new(&registry, &runner);
        assert!(!engine.check(&application("Git", "git version", OnMissing::Warn)));
    }

    #[test]
    fn test_launch_error_is_failed_check() {
        let registry = MemoryRegistry::new();
        let runner = FakeRunner {
            fail_launch: true,
            ..FakeRunner::default()
        };
        let engine = PrerequisiteEngine::new(&registry, &runner);
        assert!(!engine.check(&application("Git", ".*", OnMissing::Warn)));
    }

    #[test]
    fn test_invalid_regex_is_failed_check() {
        let registry = MemoryRegistry::new();
        let runner = FakeRunner::printing("anything");
        let engine = PrerequisiteEngine::new(&registry, &runner);
        assert!(!engine.check(&application("Bad", "(unclosed", OnMissing::Warn)));
    }

    #[test]
    fn test_registry_checks() {
        let registry = MemoryRegistry::new();
        registry
            .set_value("HKCU:\\Software\\App", "Version", &3_i64.into())
            .unwrap();
        let runner = FakeRunner::default();
        let engine = PrerequisiteEngine::new(&registry, &runner);

        let check = |key_name: Option<&str>, expected: Option<RegistryValue>| {
            engine.check(&Prerequisite {
                name: "App".to_string(),
                on_missing: OnMissing::Warn,
                check: PrerequisiteCheck::Registry {
                    path: "HKCU:\\Software\\App".to_string(),
                    key_name: key_name.map(str::to_string),
                    expected_value: expected,
                },
            })
        };

        assert!(check(None, None));
        assert!(check(Some("Version"), None));
        assert!(check(Some("Version"), Some("3".into())));
        assert!(check(Some("Version"), Some(3_i64.into())));
        assert!(!check(Some("Version"), Some("4".into())));
        assert!(!check(Some("Missing"), None));
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_registry_missing_key_fails() {
        let registry = MemoryRegistry::new();
        let runner = FakeRunner::default();
        let engine = PrerequisiteEngine::new(&registry, &runner);
        assert!(!engine.check(&Prerequisite {
            name: "App".to_string(),
            on_missing: OnMissing::Warn,
            check: PrerequisiteCheck::Registry {
                path: "HKCU:\\Software\\Absent".to_string(),
                key_name: None,
                expected_value: None,
            },
        }));
    }

    #[test]
    fn test_script_path_wins_over_inline() {
        let registry = MemoryRegistry::new();
        let runner = FakeRunner::printing("ok");
        let engine = PrerequisiteEngine::new(&registry, &runner);

        let passed = engine.check(&Prerequisite {
            name: "Script".to_string(),
            on_missing: OnMissing::Warn,
            check: PrerequisiteCheck::Script {
                inline_script: Some("echo inline".to_string()),
                path: Some(PathBuf::from("checks/probe.sh")),
                expected_output_pattern: "ok".to_string(),
            },
        });
        assert!(passed);
        assert_eq!(*runner.calls.borrow(), vec!["file:checks/probe.sh".to_string()]);
    }

    #[test]
    fn test_script_inline_runs_when_no_path() {
        let registry = MemoryRegistry::new();
        let runner = FakeRunner::printing("ok");
        let engine = PrerequisiteEngine::new(&registry, &runner);

        engine.check(&Prerequisite {
            name: "Script".to_string(),
            on_missing: OnMissing::Warn,
            check: PrerequisiteCheck::Script {
                inline_script: Some("echo ok".to_string()),
                path: None,
                expected_output_pattern: "ok".to_string(),
            },
        });
        assert_eq!(*runner.calls.borrow(), vec!["inline:echo ok".to_string()]);
    }

    #[test]
    fn test_script_without_source_fails() {
        let registry = MemoryRegistry::new();
        let runner = FakeRunner::printing("ok");
        let engine = PrerequisiteEngine::new(&registry, &runner);

        assert!(!engine.check(&Prerequisite {
            name: "Script".to_string(),
            on_missing: OnMissing::Warn,
            check: PrerequisiteCheck::Script {
                inline_script: None,
                path: None,
                expected_output_pattern: "ok".to_string(),
            },
        }));
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_deserialize_descriptors() {
        let prereqs: Vec<Prerequisite> = serde_json::from_str(
            r#"[
                {"type":"application","name":"Git","onMissing":"fail_backup",
                 "checkCommand":"git --version","expectedOutputPattern":"git version"},
                {"type":"registry","name":"App","path":"HKCU:\\Software\\App",
                 "keyName":"Version","expectedValue":3},
                {"type":"script","name":"Probe","inlineScript":"echo hi","expectedOutput":"hi"}
            ]"#,
        )
        .unwrap();

        assert_eq!(prereqs[0].on_missing, OnMissing::FailBackup);
        assert_eq!(prereqs[0].check.kind(), "application");
        assert_eq!(prereqs[1].on_missing, OnMissing::Warn);
        assert_eq!(
            prereqs[1].check,
            PrerequisiteCheck::Registry {
                path: "HKCU:\\Software\\App".to_string(),
                key_name: Some("Version".to_string()),
                expected_value: Some(RegistryValue::Integer(3)),
            }
        );
        assert!(matches!(
            &prereqs[2].check,
            PrerequisiteCheck::Script { inline_script: Some(s), path: None, .. } if s == "echo hi"
        ));
    }

    #[test]
    fn test_policy_display() {
        assert_eq!(OnMissing::Warn.to_string(), "warn");
        assert_eq!(OnMissing::FailRestore.to_string(), "fail_restore");
        assert_eq!(Operation::Restore.to_string(), "Restore");
    }
}
