use std::fmt;
use std::io::{BufRead, Write};

use crate::env::{self, EnvSource, EnvVar};
use crate::error::{ClusterError, Result};
use crate::topology::{count_noun, ClusterTopology, Scope};

/// Directories under `$PXF_RUN` copied to every host by `sync`.
const SYNC_DIRS: [&str; 3] = ["conf", "lib", "servers"];

const RESET_WARNING: &str = "Ensure your PXF cluster is stopped before continuing. \
This is a destructive action. Press y to continue:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    Start,
    Stop,
    Restart,
    Status,
    Sync,
    Register,
    Prepare,
    Migrate,
    Reset,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::Init,
        Operation::Start,
        Operation::Stop,
        Operation::Restart,
        Operation::Status,
        Operation::Sync,
        Operation::Register,
        Operation::Prepare,
        Operation::Migrate,
        Operation::Reset,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Init => "init",
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::Restart => "restart",
            Operation::Status => "status",
            Operation::Sync => "sync",
            Operation::Register => "register",
            Operation::Prepare => "prepare",
            Operation::Migrate => "migrate",
            Operation::Reset => "reset",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Status,
    Success,
    Failure,
}

#[derive(Debug)]
struct Messages {
    status: &'static str,
    success: &'static str,
    failure: &'static str,
}

/// Caller-chosen switches applied when a descriptor is resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Pass `--delete` to rsync so hosts drop files no longer on the master.
    pub delete_on_sync: bool,
}

/// Where a generated command line is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOn {
    /// On the target host, over ssh.
    Remote,
    /// On this host, once per target.
    Local,
}

/// Produces the shell command to run for a given host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandBuilder {
    /// Same command line on every host.
    Fixed(String),
    /// Copy `$PXF_RUN/{conf,lib,servers}` from this host to the target.
    Rsync { run_dir: String, delete: bool },
}

impl CommandBuilder {
    /// Rsync pushes from the master; every other command runs on the target.
    pub fn run_on(&self) -> RunOn {
        match self {
            CommandBuilder::Fixed(_) => RunOn::Remote,
            CommandBuilder::Rsync { .. } => RunOn::Local,
        }
    }

    pub fn for_host(&self, hostname: &str) -> String {
        match self {
            CommandBuilder::Fixed(cmd) => cmd.clone(),
            CommandBuilder::Rsync { run_dir, delete } => {
                let mut cmd = String::from("rsync -az ");
                if *delete {
                    cmd.push_str("--delete ");
                }
                cmd.push_str("-e 'ssh -o StrictHostKeyChecking=no' ");
                for dir in SYNC_DIRS {
                    cmd.push_str(&format!("'{}/{}' ", run_dir, dir));
                }
                cmd.push_str(&format!("'{}:{}'", hostname, run_dir));
                cmd
            }
        }
    }
}

/// Immutable definition of one `pxf cluster` operation.
#[derive(Debug)]
pub struct CommandDescriptor {
    operation: Operation,
    /// Validated in this order; the first failure is reported.
    env_vars: &'static [EnvVar],
    extra_args: &'static [&'static str],
    scope: Scope,
    warning: Option<&'static str>,
    messages: Messages,
}

impl CommandDescriptor {
    fn new(operation: Operation) -> Self {
        use EnvVar::*;

        let (env_vars, messages): (&'static [EnvVar], Messages) = match operation {
            Operation::Init => (
                &[Gphome, PxfHome, JavaHome],
                Messages {
                    status: "Initializing PXF on",
                    success: "PXF initialized successfully on",
                    failure: "PXF failed to initialize on",
                },
            ),
            Operation::Start => (
                &[PxfHome, PxfRun],
                Messages {
                    status: "Starting PXF on",
                    success: "PXF started successfully on",
                    failure: "PXF failed to start on",
                },
            ),
            Operation::Stop => (
                &[PxfHome, PxfRun],
                Messages {
                    status: "Stopping PXF on",
                    success: "PXF stopped successfully on",
                    failure: "PXF failed to stop on",
                },
            ),
            Operation::Restart => (
                &[PxfHome, PxfRun],
                Messages {
                    status: "Restarting PXF on",
                    success: "PXF restarted successfully on",
                    failure: "PXF failed to restart on",
                },
            ),
            Operation::Status => (
                &[PxfHome, PxfRun],
                Messages {
                    status: "Checking status of PXF servers on",
                    success: "PXF is running on",
                    failure: "PXF is not running on",
                },
            ),
            Operation::Sync => (
                &[PxfRun],
                Messages {
                    status: "Syncing PXF configuration files from",
                    success: "PXF configs synced successfully on",
                    failure: "PXF configs failed to sync on",
                },
            ),
            Operation::Register => (
                &[Gphome, PxfHome],
                Messages {
                    status: "Installing PXF extension on",
                    success: "PXF extension has been installed on",
                    failure: "Failed to install PXF extension on",
                },
            ),
            Operation::Prepare => (
                &[PxfHome, PxfRun],
                Messages {
                    status: "Preparing PXF on",
                    success: "PXF prepared successfully on",
                    failure: "PXF failed to prepare on",
                },
            ),
            Operation::Migrate => (
                &[PxfHome, PxfConf, PxfRun],
                Messages {
                    status: "Migrating PXF configuration on",
                    success: "PXF configuration migrated successfully on",
                    failure: "PXF failed to migrate configuration on",
                },
            ),
            Operation::Reset => (
                &[PxfHome],
                Messages {
                    status: "Resetting PXF on",
                    success: "PXF has been reset on",
                    failure: "Failed to reset PXF on",
                },
            ),
        };

        let scope = match operation {
            Operation::Sync => Scope::ExcludingMaster,
            _ => Scope::WholeCluster,
        };
        let (extra_args, warning): (&'static [&'static str], _) = match operation {
            Operation::Reset => (&["--force"], Some(RESET_WARNING)),
            _ => (&[], None),
        };

        Self {
            operation,
            env_vars,
            extra_args,
            scope,
            warning,
            messages,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn requires_confirmation(&self) -> bool {
        self.warning.is_some()
    }

    /// Leading clause of the message for `kind`, without the host part.
    ///
    /// `render_status` completes it with the topology phrase and
    /// `render_count` with `"<k> out of <n> host(s)"`.
    pub fn messages(&self, kind: MessageKind) -> &'static str {
        match kind {
            MessageKind::Status => self.messages.status,
            MessageKind::Success => self.messages.success,
            MessageKind::Failure => self.messages.failure,
        }
    }

    /// Validates the environment and returns the per-host command builder.
    ///
    /// Variables are checked in declaration order and the first missing or
    /// blank one is returned. Every variable except `PXF_HOME` is forwarded to
    /// the remote shell as a `VAR=value` prefix; `PXF_HOME` locates the binary.
    pub fn resolve(&self, source: &dyn EnvSource, options: BuildOptions) -> Result<CommandBuilder> {
        let mut resolved = Vec::with_capacity(self.env_vars.len());
        for &var in self.env_vars {
            resolved.push((var, env::resolve(source, var)?));
        }

        if self.operation == Operation::Sync {
            let run_dir = value_of(&resolved, EnvVar::PxfRun)?;
            return Ok(CommandBuilder::Rsync {
                run_dir: run_dir.to_string(),
                delete: options.delete_on_sync,
            });
        }

        let pxf_home = value_of(&resolved, EnvVar::PxfHome)?;
        let mut cmd = String::new();
        for (var, value) in &resolved {
            if *var != EnvVar::PxfHome && !value.is_empty() {
                cmd.push_str(&format!("{}={} ", var, value));
            }
        }
        cmd.push_str(&format!("{}/bin/pxf {}", pxf_home, self.operation));
        for arg in self.extra_args {
            cmd.push(' ');
            cmd.push_str(arg);
        }
        Ok(CommandBuilder::Fixed(cmd))
    }

    /// Shows the confirmation prompt for destructive operations and reads one
    /// line of input. Any answer, including none, lets the operation proceed.
    pub fn warn(&self, input: &mut dyn BufRead, output: &mut dyn Write) -> Result<()> {
        if !self.requires_confirmation() {
            return Ok(());
        }
        writeln!(output, "{}", self.warning.unwrap_or_default())?;
        output.flush()?;
        let mut answer = String::new();
        input.read_line(&mut answer)?;
        Ok(())
    }

    /// Pre-execution line, e.g. "Starting PXF on master host and 2 segment hosts".
    pub fn render_status(&self, topology: &ClusterTopology) -> String {
        format!(
            "{} {}",
            self.messages(MessageKind::Status),
            topology.describe(self.scope)
        )
    }

    /// Summary line, e.g. "PXF failed to start on 1 out of 3 hosts".
    pub fn render_count(&self, kind: MessageKind, count: usize, total: usize) -> String {
        format!(
            "{} {} out of {}",
            self.messages(kind),
            count,
            count_noun(total, "host")
        )
    }
}

fn value_of(resolved: &[(EnvVar, String)], var: EnvVar) -> Result<&str> {
    resolved
        .iter()
        .find(|(v, _)| *v == var)
        .map(|(_, value)| value.as_str())
        .ok_or(ClusterError::EnvUnset(var))
}

/// One descriptor per operation, built once at startup.
#[derive(Debug)]
pub struct DescriptorTable {
    descriptors: Vec<CommandDescriptor>,
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self {
            descriptors: Operation::ALL
                .iter()
                .map(|&op| CommandDescriptor::new(op))
                .collect(),
        }
    }

    pub fn get(&self, operation: Operation) -> &CommandDescriptor {
        // Built from Operation::ALL in declaration order.
        &self.descriptors[operation as usize]
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}
