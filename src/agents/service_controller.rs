use crate::error::{Result, SyncError};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Runs external programs to completion.
pub trait CommandRunner {
    fn run(&self, program: &Path, args: &[&str]) -> Result<()>;
}

/// Executes commands with `std::process::Command`, capturing their output.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn ensure_success(output: &Output, command: &str) -> Result<()> {
        if output.status.success() {
            return Ok(());
        }

        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        Err(SyncError::Command(format!(
            "{} exited with {}: {}",
            command,
            code,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[&str]) -> Result<()> {
        let command = format!("{} {}", program.display(), args.join(" "));
        debug!(%command, "Executing");

        let output = Command::new(program).args(args).output().map_err(|e| {
            SyncError::Command(format!("Failed to execute '{command}': {e}"))
        })?;
        Self::ensure_success(&output, &command)
    }
}

/// ServiceController drives docker-compose for the game server service
pub struct ServiceController<'a> {
    runner: &'a dyn CommandRunner,
    compose: PathBuf,
    compose_file: PathBuf,
    service: String,
    restart_delay: Duration,
}

impl<'a> ServiceController<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        compose: impl Into<PathBuf>,
        compose_file: impl Into<PathBuf>,
        service: impl Into<String>,
        restart_delay: Duration,
    ) -> Self {
        Self {
            runner,
            compose: compose.into(),
            compose_file: compose_file.into(),
            service: service.into(),
            restart_delay,
        }
    }

    /// `<compose> -f <file> restart <service>`, then wait for the service to
    /// come back up.
    pub fn restart(&self) -> Result<()> {
        self.run_compose(&["restart", self.service.as_str()])?;

        if !self.restart_delay.is_zero() {
            info!(delay = ?self.restart_delay, "Waiting for restart");
            thread::sleep(self.restart_delay);
        }
        Ok(())
    }

    /// `pull` the service image, then recreate it with `up -d`.
    pub fn update_server(&self) -> Result<()> {
        self.run_compose(&["pull", self.service.as_str()])?;
        self.run_compose(&["up", "-d", self.service.as_str()])
    }

    fn run_compose(&self, args: &[&str]) -> Result<()> {
        let compose_file = self.compose_file.to_string_lossy().into_owned();
        let mut full = vec!["-f", compose_file.as_str()];
        full.extend_from_slice(args);
        self.runner.run(&self.compose, &full)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every invocation and fails on the configured subcommand.
    #[derive(Default)]
    pub(crate) struct RecordingRunner {
        pub calls: RefCell<Vec<String>>,
        pub fail_on: Option<&'static str>,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, program: &Path, args: &[&str]) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(format!("{} {}", program.display(), args.join(" ")));
            match self.fail_on {
                Some(sub) if args.contains(&sub) => {
                    Err(SyncError::Command(format!("{sub} exited with 1")))
                }
                _ => Ok(()),
            }
        }
    }

    fn controller(runner: &RecordingRunner) -> ServiceController<'_> {
        ServiceController::new(
            runner,
            "docker-compose",
            "docker-compose.yml",
            "factorio",
            Duration::ZERO,
        )
    }

    #[test]
    fn restart_uses_compose_file_and_service() {
        let runner = RecordingRunner::default();
        controller(&runner).restart().unwrap();
        assert_eq!(
            *runner.calls.borrow(),
            vec!["docker-compose -f docker-compose.yml restart factorio"]
        );
    }

    #[test]
    fn update_server_pulls_before_up() {
        let runner = RecordingRunner::default();
        controller(&runner).update_server().unwrap();
        assert_eq!(
            *runner.calls.borrow(),
            vec![
                "docker-compose -f docker-compose.yml pull factorio",
                "docker-compose -f docker-compose.yml up -d factorio",
            ]
        );
    }

    #[test]
    fn failed_pull_skips_up() {
        let runner = RecordingRunner {
            fail_on: Some("pull"),
            ..RecordingRunner::default()
        };
        let err = controller(&runner).update_server().unwrap_err();
        assert!(matches!(err, SyncError::Command(_)));
        assert_eq!(runner.calls.borrow().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_reports_exit_status() {
        let runner = SystemRunner;
        assert!(runner.run(Path::new("true"), &[]).is_ok());
        let err = runner.run(Path::new("false"), &[]).unwrap_err();
        assert!(matches!(err, SyncError::Command(msg) if msg.contains("exited with 1")));
    }

    #[test]
    fn system_runner_reports_missing_program() {
        let err = SystemRunner
            .run(Path::new("/nonexistent/docker-compose"), &["restart"])
            .unwrap_err();
        assert!(matches!(err, SyncError::Command(msg) if msg.contains("Failed to execute")));
    }
}
