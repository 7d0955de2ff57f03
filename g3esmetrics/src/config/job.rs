/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

use super::yaml_util::{
    as_duration, as_json, as_list, as_string, foreach_kv, get_required_str, normalize,
};
use crate::flatten::ResponseAdapter;
use crate::store::StalePolicy;

const CONFIG_KEY_JOB_TYPE: &str = "type";
const CONFIG_KEY_JOB_NAME: &str = "name";

const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthLevel {
    Cluster,
    Indices,
    Shards,
}

impl HealthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLevel::Cluster => "cluster",
            HealthLevel::Indices => "indices",
            HealthLevel::Shards => "shards",
        }
    }
}

impl FromStr for HealthLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cluster" => Ok(HealthLevel::Cluster),
            "indices" => Ok(HealthLevel::Indices),
            "shards" => Ok(HealthLevel::Shards),
            _ => Err(anyhow!("unsupported cluster health level {s}")),
        }
    }
}

/// What a job fetches from the cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobEndpoint {
    Search {
        indices: String,
        /// the json request body
        query: String,
    },
    ClusterHealth {
        level: HealthLevel,
    },
    NodesStats {
        metrics: Vec<String>,
    },
    IndicesStats {
        per_index: bool,
        metrics: Vec<String>,
        fields: Vec<String>,
    },
    IndicesAliases,
    IndicesMappings,
}

impl JobEndpoint {
    fn new(job_type: &str) -> anyhow::Result<Self> {
        match normalize(job_type).as_str() {
            "search" | "query" => Ok(JobEndpoint::Search {
                indices: "_all".to_string(),
                query: String::new(),
            }),
            "cluster_health" => Ok(JobEndpoint::ClusterHealth {
                level: HealthLevel::Indices,
            }),
            "nodes_stats" => Ok(JobEndpoint::NodesStats {
                metrics: Vec::new(),
            }),
            "indices_stats" => Ok(JobEndpoint::IndicesStats {
                per_index: false,
                metrics: Vec::new(),
                fields: Vec::new(),
            }),
            "indices_aliases" => Ok(JobEndpoint::IndicesAliases),
            "indices_mappings" => Ok(JobEndpoint::IndicesMappings),
            _ => Err(anyhow!("unsupported job type {job_type}")),
        }
    }

    pub fn adapter(&self) -> ResponseAdapter {
        match self {
            JobEndpoint::Search { .. } => ResponseAdapter::Search,
            JobEndpoint::ClusterHealth { .. } => ResponseAdapter::ClusterHealth,
            JobEndpoint::NodesStats { .. } => ResponseAdapter::NodesStats,
            JobEndpoint::IndicesStats { per_index, .. } => ResponseAdapter::IndicesStats {
                per_index: *per_index,
            },
            JobEndpoint::IndicesAliases => ResponseAdapter::IndicesAliases,
            JobEndpoint::IndicesMappings => ResponseAdapter::IndicesMappings,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            JobEndpoint::Search { .. } => "search",
            JobEndpoint::ClusterHealth { .. } => "cluster_health",
            JobEndpoint::NodesStats { .. } => "nodes_stats",
            JobEndpoint::IndicesStats { .. } => "indices_stats",
            JobEndpoint::IndicesAliases => "indices_aliases",
            JobEndpoint::IndicesMappings => "indices_mappings",
        }
    }

    fn set(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match (self, normalize(k).as_str()) {
            (JobEndpoint::Search { indices, .. }, "indices") => {
                *indices = as_list(v, as_string)
                    .context(format!("invalid string list value for key {k}"))?
                    .join(",");
                Ok(())
            }
            (JobEndpoint::Search { query, .. }, "query") => {
                *query = match v {
                    Yaml::String(s) => {
                        serde_json::Value::from_str(s)
                            .map_err(|e| anyhow!("invalid json string for key {k}: {e}"))?;
                        s.to_string()
                    }
                    Yaml::Hash(_) => as_json(v)
                        .context(format!("invalid query map value for key {k}"))?
                        .to_string(),
                    _ => {
                        return Err(anyhow!(
                            "the value for key {k} should be a map or a json string"
                        ));
                    }
                };
                Ok(())
            }
            (JobEndpoint::ClusterHealth { level }, "level") => {
                let s = as_string(v)?;
                *level = HealthLevel::from_str(&normalize(&s))?;
                Ok(())
            }
            (JobEndpoint::NodesStats { metrics }, "metrics")
            | (JobEndpoint::IndicesStats { metrics, .. }, "metrics") => {
                *metrics = as_list(v, as_string)
                    .context(format!("invalid string list value for key {k}"))?;
                Ok(())
            }
            (JobEndpoint::IndicesStats { per_index, .. }, "mode") => {
                let s = as_string(v)?;
                *per_index = match normalize(&s).as_str() {
                    "cluster" => false,
                    "indices" => true,
                    _ => return Err(anyhow!("unsupported indices stats mode {s}")),
                };
                Ok(())
            }
            (JobEndpoint::IndicesStats { fields, .. }, "fields") => {
                *fields = as_list(v, as_string)
                    .context(format!("invalid string list value for key {k}"))?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }

    fn check(&self) -> anyhow::Result<()> {
        match self {
            JobEndpoint::Search { query, .. } if query.is_empty() => {
                Err(anyhow!("query is not set"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobConfig {
    pub name: String,
    pub endpoint: JobEndpoint,
    pub interval: Duration,
    pub timeout: Duration,
    pub on_error: StalePolicy,
    pub on_missing: StalePolicy,
    prefix: Option<String>,
}

impl JobConfig {
    fn new(endpoint: JobEndpoint) -> Self {
        JobConfig {
            name: String::new(),
            endpoint,
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            on_error: StalePolicy::default(),
            on_missing: StalePolicy::default(),
            prefix: None,
        }
    }

    pub fn with_endpoint(name: &str, endpoint: JobEndpoint) -> Self {
        let mut job = JobConfig::new(endpoint);
        job.name = name.to_string();
        job
    }

    pub fn parse(map: &yaml::Hash) -> anyhow::Result<Self> {
        let job_type = get_required_str(map, CONFIG_KEY_JOB_TYPE)?;
        let endpoint = JobEndpoint::new(job_type)?;
        let mut job = JobConfig::new(endpoint);

        foreach_kv(map, |k, v| job.set(k, v))?;

        job.check()?;
        Ok(job)
    }

    fn set(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match normalize(k).as_str() {
            CONFIG_KEY_JOB_TYPE => Ok(()),
            CONFIG_KEY_JOB_NAME => {
                self.name = as_string(v)?;
                Ok(())
            }
            "interval" => {
                self.interval =
                    as_duration(v).context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "timeout" => {
                self.timeout =
                    as_duration(v).context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "on_error" => {
                let s = as_string(v)?;
                self.on_error = StalePolicy::from_str(&normalize(&s))
                    .context(format!("invalid stale policy value for key {k}"))?;
                Ok(())
            }
            "on_missing" => {
                let s = as_string(v)?;
                self.on_missing = StalePolicy::from_str(&normalize(&s))
                    .context(format!("invalid stale policy value for key {k}"))?;
                Ok(())
            }
            "prefix" => {
                self.prefix = Some(as_string(v)?);
                Ok(())
            }
            _ => self.endpoint.set(k, v),
        }
    }

    fn check(&mut self) -> anyhow::Result<()> {
        if self.name.is_empty() {
            return Err(anyhow!("name is not set"));
        }
        if self.interval.is_zero() {
            return Err(anyhow!("interval should not be zero"));
        }
        if self.timeout.is_zero() {
            return Err(anyhow!("timeout should not be zero"));
        }
        self.endpoint
            .check()
            .context(format!("invalid {} job {}", self.endpoint.type_name(), self.name))
    }

    /// The metric prefix, which defaults to the job name
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(&self.name)
    }

    pub fn set_prefix(&mut self, prefix: &str) {
        self.prefix = Some(prefix.to_string());
    }
}
