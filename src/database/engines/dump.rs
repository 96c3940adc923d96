//! External dump/restore tool runner
//!
//! The client/server backends back up through their vendor programs. Each
//! invocation tries a list of program names in order, so `mariadb-dump` can
//! fall back to `mysqldump` on hosts that only ship the older name.

use crate::error::DatabaseError;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// One vendor tool run
#[derive(Debug, Clone, Default)]
pub(crate) struct ToolInvocation {
    /// Program names tried in order until one can be spawned
    pub programs: Vec<String>,
    pub args: Vec<String>,
    /// Extra environment, used for credentials so they never show up in `ps`
    pub envs: Vec<(&'static str, String)>,
    /// File fed to the program's standard input
    pub stdin: Option<PathBuf>,
}

impl ToolInvocation {
    /// `override_program` (from configuration) replaces the default candidates
    pub fn new(override_program: Option<&str>, defaults: &[&str]) -> Self {
        let programs = match override_program {
            Some(program) => vec![program.to_string()],
            None => defaults.iter().map(|p| p.to_string()).collect(),
        };
        Self {
            programs,
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.envs.push((key, value.into()));
        self
    }

    pub fn stdin_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    /// Run the first available program and require a zero exit status
    pub async fn run(&self) -> Result<(), DatabaseError> {
        for program in &self.programs {
            let mut command = Command::new(program);
            command
                .args(&self.args)
                .envs(self.envs.iter().map(|(k, v)| (*k, v.as_str())))
                .stdout(Stdio::null())
                .stderr(Stdio::piped());

            if let Some(path) = &self.stdin {
                let file = std::fs::File::open(path).map_err(|e| {
                    DatabaseError::BackupFailed(format!("{}: {}", path.display(), e))
                })?;
                command.stdin(Stdio::from(file));
            } else {
                command.stdin(Stdio::null());
            }

            debug!(program = %program, args = ?self.args, "Running database tool");

            let output = match command.output().await {
                Ok(output) => output,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(program = %program, "Database tool not found");
                    continue;
                }
                Err(e) => {
                    return Err(DatabaseError::BackupFailed(format!(
                        "Failed to run {}: {}",
                        program, e
                    )))
                }
            };

            if output.status.success() {
                return Ok(());
            }

            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DatabaseError::BackupFailed(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )));
        }

        Err(DatabaseError::BackupFailed(format!(
            "None of the tools could be started: {}",
            self.programs.join(", ")
        )))
    }
}
