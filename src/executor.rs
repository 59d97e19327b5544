use std::process::{Command, Output};

use crate::command::{CommandBuilder, RunOn};
use crate::commands::utils::ssh_command;
use crate::config::ClusterConfig;
use crate::report::ExecutionOutcome;

/// Runs a generated command for each host and reports one outcome per host.
pub trait RemoteExecutor {
    fn execute(&self, status: &str, builder: &CommandBuilder, hosts: &[String])
        -> Vec<ExecutionOutcome>;
}

/// Runs commands one host at a time, over `ssh` or through the local shell.
pub struct SshExecutor<'a> {
    config: &'a ClusterConfig,
}

impl<'a> SshExecutor<'a> {
    pub fn new(config: &'a ClusterConfig) -> Self {
        Self { config }
    }

    fn command_for(&self, host: &str, builder: &CommandBuilder) -> Command {
        let line = builder.for_host(host);
        match builder.run_on() {
            RunOn::Remote => {
                let mut cmd = ssh_command(host, &self.config.ssh_for(host));
                cmd.arg(line);
                cmd
            }
            RunOn::Local => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(line);
                cmd
            }
        }
    }
}

impl RemoteExecutor for SshExecutor<'_> {
    fn execute(
        &self,
        status: &str,
        builder: &CommandBuilder,
        hosts: &[String],
    ) -> Vec<ExecutionOutcome> {
        let span = tracing::info_span!("execute", status);
        let _guard = span.enter();

        hosts
            .iter()
            .map(|host| {
                let mut cmd = self.command_for(host, builder);
                tracing::debug!(%host, run_on = ?builder.run_on(), command = ?cmd, "running command");
                match cmd.output() {
                    Ok(output) => outcome_from_output(host, output),
                    Err(e) => ExecutionOutcome {
                        hostname: host.clone(),
                        stdout: String::new(),
                        stderr: format!(
                            "Failed to execute {}: {}",
                            cmd.get_program().to_string_lossy(),
                            e
                        ),
                        error: Some(e.to_string()),
                    },
                }
            })
            .collect()
    }
}

fn outcome_from_output(host: &str, output: Output) -> ExecutionOutcome {
    let error = if output.status.success() {
        None
    } else {
        Some(match output.status.code() {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        })
    };
    ExecutionOutcome {
        hostname: host.to_string(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        error,
    }
}
