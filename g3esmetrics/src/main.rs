/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use log::{debug, error, info};
use tokio_util::sync::CancellationToken;

use g3esmetrics::config::ExporterConfig;
use g3esmetrics::fetch::{DocumentFetcher, HttpFetcher};
use g3esmetrics::job::ExportJob;
use g3esmetrics::opts::ProcArgs;
use g3esmetrics::schedule::{ArcScheduledJob, Scheduler};
use g3esmetrics::store::MetricStateStore;

fn main() -> anyhow::Result<()> {
    let Some(proc_args) =
        g3esmetrics::opts::parse_clap().context("failed to parse command line options")?
    else {
        return Ok(());
    };

    // set up process logger early, only proc args is used inside
    let _log_guard = g3esmetrics::log::setup(proc_args.verbose_level)
        .map_err(|e| anyhow!("failed to setup logger: {e}"))?;

    let config = g3esmetrics::config::load(&proc_args.config_file).context(format!(
        "failed to load config, opts: {:?}",
        &proc_args
    ))?;
    debug!(
        "loaded config from {}, {} jobs",
        proc_args.config_file.display(),
        config.jobs.len()
    );

    if proc_args.test_config {
        info!("the format of the config file is ok");
        return Ok(());
    }

    let ret = tokio_run(&proc_args, config);
    match ret {
        Ok(_) => Ok(()),
        Err(e) => {
            error!("{e:?}");
            Err(e)
        }
    }
}

fn tokio_run(args: &ProcArgs, config: ExporterConfig) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("es-metrics")
        .build()
        .context("failed to start runtime")?;
    rt.block_on(async {
        let store = MetricStateStore::new();
        let fetcher: Arc<dyn DocumentFetcher> =
            Arc::new(HttpFetcher::new(&config.cluster).context("failed to create fetcher")?);

        let jobs: Vec<ArcScheduledJob> = config
            .jobs
            .iter()
            .map(|job| {
                let job: ArcScheduledJob =
                    Arc::new(ExportJob::new(job.clone(), fetcher.clone(), &store));
                job
            })
            .collect();

        if args.run_once {
            return run_once(&jobs, &store).await;
        }

        let quit = CancellationToken::new();
        g3esmetrics::signal::register_quit(&quit).context("failed to setup signal handler")?;

        let mut scheduler = Scheduler::new(jobs);
        if let Some(size) = config.worker {
            scheduler = scheduler.with_worker_pool(size);
        }
        info!("started {} jobs", config.jobs.len());
        scheduler.into_running(quit).await;
        info!("quit now");
        Ok(())
    })
}

async fn run_once(jobs: &[ArcScheduledJob], store: &MetricStateStore) -> anyhow::Result<()> {
    for job in jobs {
        if let Err(e) = job.run().await {
            error!("job {} failed: {e:?}", job.name());
        }
    }

    let mut stdout = io::stdout().lock();
    for family in store.snapshot() {
        write!(stdout, "{family}").context("failed to write to stdout")?;
    }
    stdout.flush().context("failed to flush stdout")
}
