//! Embedded code execution for `!py` fields.
//!
//! The field's text is handed to the configured interpreter as `-c <code>`
//! and whatever the script prints becomes the field's value. Output is
//! captured through a pipe owned by this call, so nothing else in the
//! process sees it and capture ends when the child exits.
//!
//! Scripts run with the project root as working directory and inherit the
//! environment. There is no sandbox and no timeout: a script that never
//! exits stalls the build.

use super::ProcessorError;
use std::path::PathBuf;
use std::process::{Command, Stdio};

pub struct ScriptRunner {
    interpreter: String,
    workdir: PathBuf,
}

impl ScriptRunner {
    pub fn new(interpreter: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            workdir: workdir.into(),
        }
    }

    /// Run `code` and return its captured standard output.
    pub fn run(&self, code: &str) -> Result<String, ProcessorError> {
        let output = Command::new(&self.interpreter)
            .arg("-c")
            .arg(code)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ProcessorError::Spawn {
                interpreter: self.interpreter.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(ProcessorError::Script {
                status: output.status,
                stderr: stderr.trim_end().to_string(),
            });
        }
        if !stderr.trim().is_empty() {
            tracing::debug!(
                interpreter = %self.interpreter,
                "script stderr: {}",
                stderr.trim_end()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::python_available;

    #[cfg(unix)]
    #[test]
    fn captures_standard_output() {
        let runner = ScriptRunner::new("sh", ".");
        assert_eq!(runner.run("echo hi; echo there").unwrap(), "hi\nthere\n");
    }

    #[cfg(unix)]
    #[test]
    fn runs_in_the_working_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("marker.txt"), "found").unwrap();
        let runner = ScriptRunner::new("sh", tmp.path());
        assert_eq!(runner.run("cat marker.txt").unwrap(), "found");
    }

    #[cfg(unix)]
    #[test]
    fn failing_script_reports_status_and_stderr() {
        let runner = ScriptRunner::new("sh", ".");
        let err = runner.run("echo broken >&2; exit 3").unwrap_err();
        match err {
            ProcessorError::Script { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected script failure, got {other:?}"),
        }
    }

    #[test]
    fn missing_interpreter_is_a_spawn_error() {
        let runner = ScriptRunner::new("cereal-no-such-interpreter", ".");
        let err = runner.run("print('x')").unwrap_err();
        assert!(matches!(err, ProcessorError::Spawn { .. }));
    }

    #[test]
    fn python_print_is_captured() {
        if !python_available() {
            eprintln!("python3 not installed, skipping");
            return;
        }
        let runner = ScriptRunner::new("python3", ".");
        assert_eq!(runner.run("print(\"hi\")").unwrap(), "hi\n");
    }

    #[test]
    fn python_exception_is_an_error() {
        if !python_available() {
            eprintln!("python3 not installed, skipping");
            return;
        }
        let runner = ScriptRunner::new("python3", ".");
        let err = runner.run("raise ValueError('boom')").unwrap_err();
        match err {
            ProcessorError::Script { stderr, .. } => assert!(stderr.contains("ValueError: boom")),
            other => panic!("expected script failure, got {other:?}"),
        }
    }
}
