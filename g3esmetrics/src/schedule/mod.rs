/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::future::pending;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use log::{debug, error, info, warn};
use tokio::sync::{Semaphore, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

mod target;
pub use target::next_target;

#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &str;
    fn interval(&self) -> Duration;
    async fn run(&self) -> anyhow::Result<()>;
}

pub type ArcScheduledJob = Arc<dyn ScheduledJob>;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Pending {
    target: Instant,
    seq: u64,
    index: usize,
}

/// Runs each job repeatedly at its fixed interval.
///
/// The first run is immediate. A job is rescheduled only after its previous
/// run has finished, so one job never overlaps with itself.
pub struct Scheduler {
    jobs: Vec<ArcScheduledJob>,
    worker_pool: Option<NonZeroUsize>,
    queue: BinaryHeap<Reverse<Pending>>,
    seq: u64,
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(t) => tokio::time::sleep_until(t).await,
        None => pending().await,
    }
}

async fn run_guarded(job: &dyn ScheduledJob) {
    match AssertUnwindSafe(job.run()).catch_unwind().await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!("job {} failed: {e:?}", job.name()),
        Err(_) => error!("job {} panicked", job.name()),
    }
}

impl Scheduler {
    pub fn new(jobs: Vec<ArcScheduledJob>) -> Self {
        Scheduler {
            jobs,
            worker_pool: None,
            queue: BinaryHeap::new(),
            seq: 0,
        }
    }

    /// Run job bodies in background tasks, at most `size` at the same time
    pub fn with_worker_pool(mut self, size: NonZeroUsize) -> Self {
        self.worker_pool = Some(size);
        self
    }

    fn push(&mut self, index: usize, target: Instant) {
        self.seq = self.seq.wrapping_add(1);
        self.queue.push(Reverse(Pending {
            target,
            seq: self.seq,
            index,
        }));
    }

    fn reschedule(&mut self, index: usize, prev_target: Instant) {
        let Some(job) = self.jobs.get(index) else {
            return;
        };
        let interval = job.interval();
        let now = Instant::now();
        let next = next_target(prev_target, interval, now);
        let skipped = next.duration_since(prev_target).as_nanos() / interval.as_nanos().max(1);
        if skipped > 1 {
            debug!("job {} is late, skipped {} run(s)", job.name(), skipped - 1);
        }
        self.push(index, next);
    }

    pub async fn into_running(mut self, quit: CancellationToken) {
        let (done_sender, mut done_receiver) = mpsc::unbounded_channel::<(usize, Instant)>();
        let semaphore = self
            .worker_pool
            .map(|size| Arc::new(Semaphore::new(size.get())));

        let now = Instant::now();
        for index in 0..self.jobs.len() {
            self.push(index, now);
        }
        info!("scheduler started with {} job(s)", self.jobs.len());

        loop {
            let deadline = self.queue.peek().map(|Reverse(p)| p.target);

            tokio::select! {
                biased;

                _ = quit.cancelled() => break,
                Some((index, target)) = done_receiver.recv() => {
                    self.reschedule(index, target);
                }
                _ = wait_until(deadline) => {
                    let Some(Reverse(pending)) = self.queue.pop() else {
                        continue;
                    };
                    let Some(job) = self.jobs.get(pending.index).cloned() else {
                        continue;
                    };

                    match &semaphore {
                        Some(semaphore) => {
                            let semaphore = semaphore.clone();
                            let done_sender = done_sender.clone();
                            tokio::spawn(async move {
                                let Ok(_permit) = semaphore.acquire_owned().await else {
                                    return;
                                };
                                run_guarded(job.as_ref()).await;
                                let _ = done_sender.send((pending.index, pending.target));
                            });
                        }
                        None => {
                            tokio::select! {
                                biased;

                                _ = quit.cancelled() => break,
                                _ = run_guarded(job.as_ref()) => {}
                            }
                            self.reschedule(pending.index, pending.target);
                        }
                    }
                }
            }
        }

        info!("scheduler quit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;

    struct TestJob {
        name: String,
        interval: Duration,
        work: Duration,
        start: Instant,
        starts: Mutex<Vec<u64>>,
        calls: AtomicUsize,
        fail: bool,
        panic: bool,
    }

    impl TestJob {
        fn new(name: &str, interval: u64, work: u64) -> Self {
            TestJob {
                name: name.to_string(),
                interval: Duration::from_secs(interval),
                work: Duration::from_secs(work),
                start: Instant::now(),
                starts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                fail: false,
                panic: false,
            }
        }

        fn starts(&self) -> Vec<u64> {
            self.starts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ScheduledJob for TestJob {
        fn name(&self) -> &str {
            &self.name
        }

        fn interval(&self) -> Duration {
            self.interval
        }

        async fn run(&self) -> anyhow::Result<()> {
            let elapsed = Instant::now().duration_since(self.start).as_secs();
            self.starts.lock().unwrap().push(elapsed);
            let n = self.calls.fetch_add(1, Ordering::Relaxed);
            if self.panic && n % 2 == 0 {
                panic!("job {} panic at run {n}", self.name);
            }
            tokio::time::sleep(self.work).await;
            if self.fail {
                return Err(anyhow!("job {} failed", self.name));
            }
            Ok(())
        }
    }

    async fn run_for(scheduler: Scheduler, secs: u64) {
        let quit = CancellationToken::new();
        let handle = tokio::spawn(scheduler.into_running(quit.clone()));
        tokio::time::sleep(Duration::from_millis(secs * 1000 + 500)).await;
        quit.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_interval() {
        let job = Arc::new(TestJob::new("a", 10, 1));
        run_for(Scheduler::new(vec![job.clone()]), 30).await;
        assert_eq!(job.starts(), [0, 10, 20, 30]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_job_inline() {
        let job = Arc::new(TestJob::new("slow", 2, 7));
        run_for(Scheduler::new(vec![job.clone()]), 20).await;
        // skip the missed runs, and keep the original phase
        assert_eq!(job.starts(), [0, 8, 16]);
    }

    #[tokio::test(start_paused = true)]
    async fn inline_serializes() {
        let a = Arc::new(TestJob::new("a", 10, 3));
        let b = Arc::new(TestJob::new("b", 10, 3));
        run_for(Scheduler::new(vec![a.clone(), b.clone()]), 5).await;
        assert_eq!(a.starts(), [0]);
        assert_eq!(b.starts(), [3]);
    }

    #[tokio::test(start_paused = true)]
    async fn pool_runs_in_parallel() {
        let a = Arc::new(TestJob::new("a", 10, 3));
        let b = Arc::new(TestJob::new("b", 10, 3));
        let scheduler = Scheduler::new(vec![a.clone(), b.clone()])
            .with_worker_pool(NonZeroUsize::new(2).unwrap());
        run_for(scheduler, 15).await;
        assert_eq!(a.starts(), [0, 10]);
        assert_eq!(b.starts(), [0, 10]);
    }

    #[tokio::test(start_paused = true)]
    async fn pool_is_bounded() {
        let a = Arc::new(TestJob::new("a", 10, 3));
        let b = Arc::new(TestJob::new("b", 10, 3));
        let scheduler = Scheduler::new(vec![a.clone(), b.clone()])
            .with_worker_pool(NonZeroUsize::new(1).unwrap());
        run_for(scheduler, 5).await;
        assert_eq!(a.starts(), [0]);
        assert_eq!(b.starts(), [3]);
    }

    #[tokio::test(start_paused = true)]
    async fn pool_no_overlap() {
        let job = Arc::new(TestJob::new("slow", 10, 25));
        let scheduler =
            Scheduler::new(vec![job.clone()]).with_worker_pool(NonZeroUsize::new(4).unwrap());
        run_for(scheduler, 35).await;
        assert_eq!(job.starts(), [0, 30]);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_keep_schedule() {
        let mut failing = TestJob::new("failing", 1, 0);
        failing.fail = true;
        let failing = Arc::new(failing);
        let mut panicking = TestJob::new("panicking", 1, 0);
        panicking.panic = true;
        let panicking = Arc::new(panicking);

        run_for(Scheduler::new(vec![failing.clone(), panicking.clone()]), 3).await;
        assert_eq!(failing.starts(), [0, 1, 2, 3]);
        assert_eq!(panicking.starts(), [0, 1, 2, 3]);

        let mut pooled = TestJob::new("pooled", 1, 0);
        pooled.panic = true;
        let pooled = Arc::new(pooled);
        let scheduler =
            Scheduler::new(vec![pooled.clone()]).with_worker_pool(NonZeroUsize::new(1).unwrap());
        run_for(scheduler, 3).await;
        assert_eq!(pooled.starts(), [0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn quit_without_jobs() {
        run_for(Scheduler::new(Vec::new()), 1).await;
    }
}
