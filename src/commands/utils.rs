use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;

use crate::config::SshSettings;

pub fn log_info(msg: &str) {
    println!("{} {}", "[INFO]".blue().bold(), msg);
}

pub fn log_error(msg: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), msg);
}

pub fn run_command_output(cmd: &mut Command) -> Result<String> {
    let output = cmd
        .output()
        .with_context(|| format!("Failed to execute: {:?}", cmd))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Command failed: {}", stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `ssh [-o ..]* <host>`; the caller appends the remote command.
pub fn ssh_command(host: &str, ssh: &SshSettings) -> Command {
    let mut cmd = Command::new("ssh");
    cmd.arg("-o")
        .arg(format!("ConnectTimeout={}", ssh.connect_timeout));
    cmd.arg("-o")
        .arg(format!("StrictHostKeyChecking={}", ssh.strict_host_key));
    // An explicit BatchMode option wins over the flag.
    if ssh.batch_mode && !ssh.options.contains_key("BatchMode") {
        cmd.arg("-o").arg("BatchMode=yes");
    }
    let mut options: Vec<_> = ssh.options.iter().collect();
    options.sort();
    for (k, v) in options {
        cmd.arg("-o").arg(format!("{}={}", k, v));
    }
    cmd.arg(host);
    cmd
}
