/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::ffi::OsStr;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

use crate::store::up_metric_name;

mod yaml_util;
use yaml_util::{HybridParser, as_nonzero_usize, foreach_doc, foreach_kv, normalize};

mod cluster;
pub use cluster::ClusterConfig;

mod job;
pub use job::{HealthLevel, JobConfig, JobEndpoint};

#[derive(Debug, Default)]
pub struct ExporterConfig {
    pub cluster: ClusterConfig,
    pub worker: Option<NonZeroUsize>,
    pub jobs: Vec<Arc<JobConfig>>,
}

impl ExporterConfig {
    fn add_job(&mut self, job: JobConfig) -> anyhow::Result<()> {
        if self.jobs.iter().any(|j| j.name == job.name) {
            return Err(anyhow!("job with name {} already exists", job.name));
        }
        // jobs with the same metric prefix would publish the same families
        let up_metric = up_metric_name(job.prefix());
        if let Some(other) = self
            .jobs
            .iter()
            .find(|j| up_metric_name(j.prefix()) == up_metric)
        {
            return Err(anyhow!(
                "metric prefix {} of job {} is already used by job {}",
                job.prefix(),
                job.name,
                other.name
            ));
        }
        self.jobs.push(Arc::new(job));
        Ok(())
    }

    fn load_doc(
        &mut self,
        map: &yaml::Hash,
        conf_dir: &Path,
        conf_extension: Option<&OsStr>,
    ) -> anyhow::Result<()> {
        foreach_kv(map, |k, v| match normalize(k).as_str() {
            "cluster" => {
                self.cluster = ClusterConfig::parse(v).context("invalid cluster config")?;
                Ok(())
            }
            "worker" => {
                self.worker = match v {
                    Yaml::Null => None,
                    _ => Some(as_nonzero_usize(v)?),
                };
                Ok(())
            }
            "job" | "jobs" => {
                let parser = HybridParser::new(conf_dir, conf_extension);
                parser.foreach_map(v, &mut |map| {
                    let job = JobConfig::parse(map).context("failed to load job")?;
                    self.add_job(job)
                })
            }
            _ => Err(anyhow!("invalid key {k} in main conf")),
        })
    }

    fn load_docs(
        docs: &[Yaml],
        conf_dir: &Path,
        conf_extension: Option<&OsStr>,
    ) -> anyhow::Result<Self> {
        let mut config = ExporterConfig::default();
        for (i, doc) in docs.iter().enumerate() {
            match doc {
                Yaml::Hash(map) => config
                    .load_doc(map, conf_dir, conf_extension)
                    .context(format!("failed to load doc {i}"))?,
                _ => return Err(anyhow!("yaml doc root should be hash")),
            }
        }
        Ok(config)
    }
}

/// Load the main config file, multiple docs in it are merged.
pub fn load(config_file: &Path) -> anyhow::Result<ExporterConfig> {
    let current_dir = std::env::current_dir()?;
    let conf_dir = config_file.parent().unwrap_or(&current_dir);
    let conf_extension = config_file.extension();

    let mut docs = Vec::new();
    foreach_doc(config_file, |_, doc| {
        docs.push(doc.clone());
        Ok(())
    })?;
    ExporterConfig::load_docs(&docs, conf_dir, conf_extension)
}
