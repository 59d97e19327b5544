use crate::commands::utils::{log_error, log_info};

/// Leveled destination for operator-facing report lines.
pub trait LogSink {
    fn info(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Colored `[INFO]` lines on stdout, `[ERROR]` lines on stderr.
pub struct ConsoleLog;

impl LogSink for ConsoleLog {
    fn info(&mut self, msg: &str) {
        log_info(msg);
    }

    fn error(&mut self, msg: &str) {
        log_error(msg);
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// Keeps every record in memory for assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingLog {
    pub records: Vec<(Level, String)>,
}

#[cfg(test)]
impl RecordingLog {
    pub fn at(&self, level: Level) -> Vec<&str> {
        self.records
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.as_str())
            .collect()
    }
}

#[cfg(test)]
impl LogSink for RecordingLog {
    fn info(&mut self, msg: &str) {
        self.records.push((Level::Info, msg.to_string()));
    }

    fn error(&mut self, msg: &str) {
        self.records.push((Level::Error, msg.to_string()));
    }
}
