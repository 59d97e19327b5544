use std::collections::HashSet;

use crate::discovery::SegmentRow;
use crate::error::{ClusterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    StandbyMaster,
    Segment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub role: Role,
    pub hostname: String,
}

impl Host {
    pub fn new(role: Role, hostname: impl Into<String>) -> Self {
        Self {
            role,
            hostname: hostname.into(),
        }
    }
}

/// Which hosts an operation runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Master, standby master and every segment host.
    WholeCluster,
    /// Everything but the master; the master is the source of a sync.
    ExcludingMaster,
}

/// Role-tagged hosts of one Greenplum cluster. Holds exactly one master and
/// at most one standby master.
#[derive(Debug, Clone)]
pub struct ClusterTopology {
    hosts: Vec<Host>,
}

impl ClusterTopology {
    pub fn new(hosts: Vec<Host>) -> Result<Self> {
        let masters = hosts.iter().filter(|h| h.role == Role::Master).count();
        let standbys = hosts
            .iter()
            .filter(|h| h.role == Role::StandbyMaster)
            .count();
        if masters != 1 {
            return Err(ClusterError::InvalidTopology(format!(
                "expected exactly one master host, found {}",
                masters
            )));
        }
        if standbys > 1 {
            return Err(ClusterError::InvalidTopology(format!(
                "expected at most one standby master host, found {}",
                standbys
            )));
        }
        Ok(Self { hosts })
    }

    /// Builds a topology from `gp_segment_configuration` rows. Content `-1`
    /// marks the master (`p`) and standby (`m`); mirror segments are dropped.
    pub fn from_rows(rows: &[SegmentRow]) -> Result<Self> {
        let mut hosts = Vec::with_capacity(rows.len());
        for row in rows {
            let role = match (row.content, row.role.as_str()) {
                (-1, "p") => Role::Master,
                (-1, "m") => Role::StandbyMaster,
                (c, "p") if c >= 0 => Role::Segment,
                (c, "m") if c >= 0 => continue,
                (c, r) => {
                    return Err(ClusterError::InvalidTopology(format!(
                        "unexpected segment entry role={} content={} on {}",
                        r, c, row.hostname
                    )))
                }
            };
            hosts.push(Host::new(role, row.hostname.clone()));
        }
        Self::new(hosts)
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    fn hostname_of(&self, role: Role) -> Option<&str> {
        self.hosts
            .iter()
            .find(|h| h.role == role)
            .map(|h| h.hostname.as_str())
    }

    pub fn master(&self) -> Option<&str> {
        self.hostname_of(Role::Master)
    }

    pub fn standby(&self) -> Option<&str> {
        self.hostname_of(Role::StandbyMaster)
    }

    /// Distinct hostnames carrying at least one segment, in discovery order.
    pub fn segment_hosts(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.hosts
            .iter()
            .filter(|h| h.role == Role::Segment)
            .map(|h| h.hostname.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    pub fn segment_host_count(&self) -> usize {
        self.segment_hosts().len()
    }

    /// True when the standby master lives on a host of its own, not shared
    /// with the master or any segment.
    pub fn has_distinct_standby(&self) -> bool {
        match self.standby() {
            None => false,
            Some(standby) => {
                self.master() != Some(standby) && !self.segment_hosts().contains(&standby)
            }
        }
    }

    /// Hostnames an operation with the given scope runs on, each once.
    /// Ordered master, standby, then segment hosts.
    pub fn target_hosts(&self, scope: Scope) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        let mut push = |name: &str| {
            if seen.insert(name.to_string()) {
                targets.push(name.to_string());
            }
        };

        if scope == Scope::WholeCluster {
            if let Some(master) = self.master() {
                push(master);
            }
        }
        if self.has_distinct_standby() {
            if let Some(standby) = self.standby() {
                push(standby);
            }
        }
        for segment in self.segment_hosts() {
            push(segment);
        }
        targets
    }

    /// Phrase naming the participating roles, e.g.
    /// "master host, standby master host, and 2 segment hosts".
    pub fn describe(&self, scope: Scope) -> String {
        let segments = count_noun(self.segment_host_count(), "segment host");
        match (scope, self.has_distinct_standby()) {
            (Scope::WholeCluster, false) => format!("master host and {}", segments),
            (Scope::WholeCluster, true) => {
                format!("master host, standby master host, and {}", segments)
            }
            (Scope::ExcludingMaster, false) => format!("master host to {}", segments),
            (Scope::ExcludingMaster, true) => {
                format!("master host to standby master host and {}", segments)
            }
        }
    }
}

/// "1 host", "0 hosts", "3 hosts".
pub fn count_noun(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}
