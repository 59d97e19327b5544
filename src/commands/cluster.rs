use std::io::{BufRead, Write};

use crate::command::{BuildOptions, DescriptorTable, Operation};
use crate::discovery::TopologySource;
use crate::env::EnvSource;
use crate::error::Result;
use crate::executor::RemoteExecutor;
use crate::log::LogSink;
use crate::report::{self, AggregateReport};

/// Collaborators one `pxf cluster` invocation talks to.
pub struct Session<'a> {
    pub env: &'a dyn EnvSource,
    pub topology: &'a dyn TopologySource,
    pub executor: &'a dyn RemoteExecutor,
    pub log: &'a mut dyn LogSink,
}

/// Runs `operation` across the cluster.
///
/// Confirmation, environment and topology problems stop the run before any
/// host is contacted. Every error is logged with the same text it returns.
pub fn run(
    table: &DescriptorTable,
    operation: Operation,
    options: BuildOptions,
    session: &mut Session<'_>,
    input: &mut dyn BufRead,
    prompt: &mut dyn Write,
) -> Result<AggregateReport> {
    let descriptor = table.get(operation);

    let prepared = descriptor.warn(input, prompt).and_then(|()| {
        let builder = descriptor.resolve(session.env, options)?;
        let topology = session.topology.discover()?;
        Ok((builder, topology))
    });
    let (builder, topology) = match prepared {
        Ok(p) => p,
        Err(e) => {
            session.log.error(&e.to_string());
            return Err(e);
        }
    };

    let hosts = topology.target_hosts(descriptor.scope());
    let status = descriptor.render_status(&topology);
    tracing::debug!(
        operation = %descriptor.operation(),
        discovered = topology.hosts().len(),
        targets = hosts.len(),
        "dispatching"
    );
    session.log.info(&status);

    let outcomes = session.executor.execute(&status, &builder, &hosts);
    report::aggregate(descriptor, &outcomes, session.log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandBuilder;
    use crate::error::ClusterError;
    use crate::log::{Level, RecordingLog};
    use crate::report::ExecutionOutcome;
    use crate::topology::{fixtures, ClusterTopology};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::Cursor;

    struct FixedTopology(Option<ClusterTopology>);

    impl TopologySource for FixedTopology {
        fn discover(&self) -> Result<ClusterTopology> {
            self.0
                .clone()
                .ok_or_else(|| ClusterError::TopologyUnavailable("Could not connect to GPDB.".into()))
        }
    }

    /// Records every command it is asked to run; fails the hosts listed.
    #[derive(Default)]
    struct FakeExecutor {
        failing: Vec<&'static str>,
        calls: RefCell<Vec<(String, String)>>,
    }

    impl RemoteExecutor for FakeExecutor {
        fn execute(
            &self,
            _status: &str,
            builder: &CommandBuilder,
            hosts: &[String],
        ) -> Vec<ExecutionOutcome> {
            hosts
                .iter()
                .map(|host| {
                    let cmd = builder.for_host(host);
                    self.calls.borrow_mut().push((host.clone(), cmd));
                    let fails = self.failing.iter().any(|f| *f == host.as_str());
                    ExecutionOutcome {
                        hostname: host.clone(),
                        stdout: "ok".to_string(),
                        stderr: if fails {
                            format!("an error happened on {}", host)
                        } else {
                            String::new()
                        },
                        error: fails.then(|| "exit status 1".to_string()),
                    }
                })
                .collect()
        }
    }

    fn full_env() -> HashMap<String, String> {
        [
            ("GPHOME", "/test/gphome"),
            ("PXF_HOME", "/test/pxfhome"),
            ("PXF_RUN", "/test/run"),
            ("JAVA_HOME", "/etc/java/home"),
            ("PXF_CONF", "/test/conf"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn run_with(
        operation: Operation,
        env: &HashMap<String, String>,
        topology: &FixedTopology,
        executor: &FakeExecutor,
        log: &mut RecordingLog,
    ) -> Result<AggregateReport> {
        let table = DescriptorTable::new();
        let mut session = Session {
            env,
            topology,
            executor,
            log,
        };
        run(
            &table,
            operation,
            BuildOptions::default(),
            &mut session,
            &mut Cursor::new(b"y\n".to_vec()),
            &mut Vec::new(),
        )
    }

    #[test]
    fn starts_pxf_on_every_host() {
        let executor = FakeExecutor::default();
        let mut log = RecordingLog::default();
        let report = run_with(
            Operation::Start,
            &full_env(),
            &FixedTopology(Some(fixtures::with_standby())),
            &executor,
            &mut log,
        )
        .unwrap();

        assert_eq!((report.total, report.failed), (4, 0));
        let calls = executor.calls.borrow();
        let hosts: Vec<_> = calls.iter().map(|(h, _)| h.as_str()).collect();
        assert_eq!(hosts, vec!["mdw", "smdw", "sdw1", "sdw2"]);
        assert!(calls
            .iter()
            .all(|(_, c)| c == "PXF_RUN=/test/run /test/pxfhome/bin/pxf start"));
        assert_eq!(
            log.at(Level::Info),
            vec![
                "Starting PXF on master host, standby master host, and 2 segment hosts",
                "PXF started successfully on 4 out of 4 hosts",
            ]
        );
    }

    #[test]
    fn sync_skips_the_master() {
        let executor = FakeExecutor::default();
        let mut log = RecordingLog::default();
        let report = run_with(
            Operation::Sync,
            &full_env(),
            &FixedTopology(Some(fixtures::without_standby())),
            &executor,
            &mut log,
        )
        .unwrap();

        assert_eq!(report.total, 2);
        let calls = executor.calls.borrow();
        assert_eq!(calls[0].0, "sdw1");
        assert!(calls[0].1.ends_with("'sdw1:/test/run'"));
        assert_eq!(
            log.at(Level::Info)[0],
            "Syncing PXF configuration files from master host to 2 segment hosts"
        );
    }

    #[test]
    fn missing_environment_aborts_before_any_host_runs() {
        let executor = FakeExecutor::default();
        let mut log = RecordingLog::default();
        let mut env = full_env();
        env.remove("PXF_RUN");

        let err = run_with(
            Operation::Stop,
            &env,
            &FixedTopology(Some(fixtures::without_standby())),
            &executor,
            &mut log,
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "PXF_RUN must be set");
        assert!(executor.calls.borrow().is_empty());
        assert_eq!(log.at(Level::Error), vec!["PXF_RUN must be set"]);
    }

    #[test]
    fn topology_failure_aborts_before_any_host_runs() {
        let executor = FakeExecutor::default();
        let mut log = RecordingLog::default();
        let err = run_with(
            Operation::Init,
            &full_env(),
            &FixedTopology(None),
            &executor,
            &mut log,
        )
        .unwrap_err();

        assert!(matches!(err, ClusterError::TopologyUnavailable(_)));
        assert!(executor.calls.borrow().is_empty());
        assert_eq!(log.at(Level::Error), vec!["Could not connect to GPDB."]);
    }

    #[test]
    fn partial_failure_is_reported_not_retried() {
        let executor = FakeExecutor {
            failing: vec!["sdw2"],
            ..Default::default()
        };
        let mut log = RecordingLog::default();
        let err = run_with(
            Operation::Reset,
            &full_env(),
            &FixedTopology(Some(fixtures::without_standby())),
            &executor,
            &mut log,
        )
        .unwrap_err();

        assert_eq!(executor.calls.borrow().len(), 3);
        assert_eq!(err.to_string(), "sdw2 ==> an error happened on sdw2\n");
        assert_eq!(
            log.at(Level::Error),
            vec![
                "ERROR: Failed to reset PXF on 1 out of 3 hosts",
                "sdw2 ==> an error happened on sdw2\n",
            ]
        );
    }
}
