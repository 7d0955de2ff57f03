/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, warn};
use thiserror::Error;

use crate::config::JobConfig;
use crate::fetch::{DocumentFetcher, FetchError};
use crate::flatten::MalformedDocument;
use crate::schedule::ScheduledJob;
use crate::store::{JobState, LabelKeyInconsistency, MetricStateStore, group, up_metric_name};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Transport(#[from] FetchError),
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed document: {0}")]
    Malformed(#[from] MalformedDocument),
    #[error(transparent)]
    LabelKeyInconsistency(#[from] LabelKeyInconsistency),
}

/// One fetch, flatten and merge cycle of a configured job.
pub struct ExportJob {
    config: Arc<JobConfig>,
    fetcher: Arc<dyn DocumentFetcher>,
    state: Arc<JobState>,
}

impl ExportJob {
    pub fn new(
        config: Arc<JobConfig>,
        fetcher: Arc<dyn DocumentFetcher>,
        store: &MetricStateStore,
    ) -> Self {
        let state = store.register(&config.name, up_metric_name(config.prefix()));
        ExportJob {
            config,
            fetcher,
            state,
        }
    }

    async fn run_cycle(&self) -> Result<(), CycleError> {
        let doc = tokio::time::timeout(
            self.config.timeout,
            self.fetcher.fetch(&self.config.endpoint),
        )
        .await
        .map_err(|_| CycleError::Timeout(self.config.timeout))??;

        let tuples = self
            .config
            .endpoint
            .adapter()
            .flatten(self.config.prefix(), &doc)?;
        let families = group(&tuples)?;
        debug!(
            "job {}: got {} values in {} metrics",
            self.config.name,
            tuples.len(),
            families.len()
        );

        self.state.apply_success(families, self.config.on_missing);
        Ok(())
    }
}

#[async_trait]
impl ScheduledJob for ExportJob {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn interval(&self) -> Duration {
        self.config.interval
    }

    async fn run(&self) -> anyhow::Result<()> {
        if let Err(e) = self.run_cycle().await {
            match &e {
                CycleError::LabelKeyInconsistency(_) => {
                    error!("job {}: {e}", self.config.name)
                }
                _ => warn!("job {}: {e}", self.config.name),
            }
            self.state.apply_failure(self.config.on_error);
        }
        Ok(())
    }
}
