use serde::Deserialize;
use std::process::Command;

use crate::commands::utils::run_command_output;
use crate::config::PsqlConfig;
use crate::env::EnvSource;
use crate::error::{ClusterError, Result};
use crate::topology::ClusterTopology;

/// When set, holds the segment configuration as a JSON array and replaces the
/// database query.
pub const SEGMENTS_ENV: &str = "PXF_CLUSTER_SEGMENTS";

/// Primaries plus both masters; mirror segments never run PXF.
const SEGMENT_QUERY: &str = "SELECT role, content, hostname \
FROM gp_segment_configuration \
WHERE role = 'p' OR content = -1 \
ORDER BY content, role DESC";

/// One row of `gp_segment_configuration`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SegmentRow {
    pub role: String,
    pub content: i32,
    pub hostname: String,
}

pub trait TopologySource {
    fn discover(&self) -> Result<ClusterTopology>;
}

/// Queries the master through `psql`.
pub struct PsqlSource {
    database: String,
}

impl PsqlSource {
    pub fn new(config: &PsqlConfig) -> Self {
        Self {
            database: config.database.clone(),
        }
    }
}

impl TopologySource for PsqlSource {
    fn discover(&self) -> Result<ClusterTopology> {
        tracing::debug!(database = %self.database, "querying segment configuration");
        let mut cmd = Command::new("psql");
        cmd.args(["-X", "-A", "-t", "-F", "|", "-d", self.database.as_str(), "-c", SEGMENT_QUERY]);
        let output = run_command_output(&mut cmd).map_err(|e| {
            ClusterError::TopologyUnavailable(format!(
                "Could not connect to GPDB.\n{}\n\
                 Please make sure that your Greenplum database is running and you are on the master node.",
                e
            ))
        })?;
        ClusterTopology::from_rows(&parse_psql_rows(&output)?)
    }
}

/// Reads rows from a JSON array such as
/// `[{"role":"p","content":-1,"hostname":"mdw"}]`.
pub struct JsonSource {
    json: String,
}

impl JsonSource {
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

impl TopologySource for JsonSource {
    fn discover(&self) -> Result<ClusterTopology> {
        let rows: Vec<SegmentRow> = serde_json::from_str(&self.json).map_err(|e| {
            ClusterError::TopologyUnavailable(format!("Failed to parse {}: {}", SEGMENTS_ENV, e))
        })?;
        ClusterTopology::from_rows(&rows)
    }
}

/// Picks the JSON source when `PXF_CLUSTER_SEGMENTS` is set, psql otherwise.
pub fn from_environment(env: &dyn EnvSource, psql: &PsqlConfig) -> Box<dyn TopologySource> {
    match env.lookup(SEGMENTS_ENV) {
        Some(json) if !json.is_empty() => Box::new(JsonSource::new(json)),
        _ => Box::new(PsqlSource::new(psql)),
    }
}

/// Parses unaligned `role|content|hostname` output.
fn parse_psql_rows(output: &str) -> Result<Vec<SegmentRow>> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut fields = line.splitn(3, '|');
            let (Some(role), Some(content), Some(hostname)) =
                (fields.next(), fields.next(), fields.next())
            else {
                return Err(ClusterError::TopologyUnavailable(format!(
                    "unexpected segment configuration row: {}",
                    line
                )));
            };
            let content = content.parse::<i32>().map_err(|_| {
                ClusterError::TopologyUnavailable(format!("invalid content id in row: {}", line))
            })?;
            Ok(SegmentRow {
                role: role.to_string(),
                content,
                hostname: hostname.to_string(),
            })
        })
        .collect()
}
