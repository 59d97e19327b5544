use crate::command::{CommandDescriptor, MessageKind};
use crate::error::{ClusterError, Result};
use crate::log::LogSink;

/// What one host returned for one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub hostname: String,
    pub stdout: String,
    pub stderr: String,
    /// `None` means the host reported no failure.
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateReport {
    pub total: usize,
    pub failed: usize,
    /// (hostname, truncated diagnostic) for failed hosts, in outcome order.
    pub failures: Vec<(String, String)>,
}

impl AggregateReport {
    pub fn succeeded(&self) -> usize {
        self.total - self.failed
    }

    /// One `"<host> ==> <diagnostic>\n"` block per failed host.
    pub fn diagnostics(&self) -> String {
        self.failures
            .iter()
            .map(|(host, diag)| format!("{} ==> {}\n", host, diag))
            .collect()
    }
}

/// Folds per-host outcomes into a single verdict and logs it.
///
/// Stderr text on a host without an error is noise, not a failure. On
/// failure the returned error carries the same diagnostics that were logged.
pub fn aggregate(
    descriptor: &CommandDescriptor,
    outcomes: &[ExecutionOutcome],
    log: &mut dyn LogSink,
) -> Result<AggregateReport> {
    let failures: Vec<(String, String)> = outcomes
        .iter()
        .filter(|o| o.failed())
        .map(|o| (o.hostname.clone(), diagnostic(o)))
        .collect();

    let report = AggregateReport {
        total: outcomes.len(),
        failed: failures.len(),
        failures,
    };

    if report.failed == 0 {
        log.info(&descriptor.render_count(MessageKind::Success, report.succeeded(), report.total));
        return Ok(report);
    }

    let diagnostics = report.diagnostics();
    log.error(&format!(
        "ERROR: {}",
        descriptor.render_count(MessageKind::Failure, report.failed, report.total)
    ));
    log.error(&diagnostics);
    Err(ClusterError::PartialFleetFailure {
        failed: report.failed,
        total: report.total,
        diagnostics,
    })
}

/// Stderr if there is any, stdout otherwise, cut to two lines with `...`
/// marking anything dropped. Lines are split on `\n` alone, so a trailing
/// newline counts as a further (empty) line and `\r` is kept.
fn diagnostic(outcome: &ExecutionOutcome) -> String {
    let source = if outcome.stderr.is_empty() {
        &outcome.stdout
    } else {
        &outcome.stderr
    };

    let mut lines = source.split('\n');
    let mut message = lines.next().unwrap_or_default().to_string();
    if let Some(second) = lines.next() {
        message.push('\n');
        message.push_str(second);
    }
    if lines.next().is_some() {
        message.push_str("...");
    }
    message
}
