/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex};

use ahash::AHashMap;
use arc_swap::ArcSwap;

use crate::types::MetricName;

mod family;
pub use family::{FamilySet, LabelKeyInconsistency, MetricFamily, group};

mod merge;
pub use merge::{StalePolicy, merge};

mod snapshot;
pub use snapshot::FamilySnapshot;

/// The families and the up flag of one job, always published together.
pub struct PublishedState {
    pub families: Arc<FamilySet>,
    pub up: bool,
}

/// The published state of one job.
///
/// Only the owning job writes to it, and it is never run concurrently with
/// itself, so a plain load then store is enough. Readers always see either
/// the previous or the next state as a whole.
pub struct JobState {
    name: String,
    up_metric: MetricName,
    state: ArcSwap<PublishedState>,
}

impl JobState {
    fn new(name: &str, up_metric: MetricName) -> Self {
        JobState {
            name: name.to_string(),
            up_metric,
            state: ArcSwap::from_pointee(PublishedState {
                families: Arc::new(FamilySet::new()),
                up: false,
            }),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current(&self) -> Arc<PublishedState> {
        self.state.load_full()
    }

    pub fn load(&self) -> Arc<FamilySet> {
        self.state.load().families.clone()
    }

    pub fn is_up(&self) -> bool {
        self.state.load().up
    }

    /// Merge the families of a successful cycle into the current state
    pub fn apply_success(&self, new: FamilySet, on_missing: StalePolicy) {
        let old = self.state.load();
        let merged = on_missing.on_missing(&old.families, new);
        self.state.store(Arc::new(PublishedState {
            families: Arc::new(merged),
            up: true,
        }));
    }

    /// Resolve the current state after a failed cycle
    pub fn apply_failure(&self, on_error: StalePolicy) {
        let old = self.state.load();
        let families = if on_error == StalePolicy::Preserve {
            old.families.clone()
        } else {
            Arc::new(on_error.on_error(&old.families))
        };
        self.state.store(Arc::new(PublishedState {
            families,
            up: false,
        }));
    }

    fn snapshot_into(&self, out: &mut Vec<FamilySnapshot>) {
        let state = self.state.load_full();
        out.push(FamilySnapshot::single(
            self.up_metric.clone(),
            if state.up { 1.0 } else { 0.0 },
        ));
        for (name, family) in state.families.iter() {
            out.push(FamilySnapshot::new(name, family));
        }
    }
}

/// Holds the state of every registered job.
#[derive(Default)]
pub struct MetricStateStore {
    jobs: Mutex<AHashMap<String, Arc<JobState>>>,
}

impl MetricStateStore {
    pub fn new() -> Self {
        MetricStateStore::default()
    }

    fn jobs(&self) -> std::sync::MutexGuard<'_, AHashMap<String, Arc<JobState>>> {
        // the map is never left half-updated, so a poisoned lock is still usable
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create the slot of a job, or return the existing one
    pub fn register(&self, job: &str, up_metric: MetricName) -> Arc<JobState> {
        let mut ht = self.jobs();
        ht.entry(job.to_string())
            .or_insert_with(|| Arc::new(JobState::new(job, up_metric)))
            .clone()
    }

    pub fn job(&self, name: &str) -> Option<Arc<JobState>> {
        self.jobs().get(name).cloned()
    }

    /// Read the current state of all jobs, ordered by job name
    pub fn snapshot(&self) -> Vec<FamilySnapshot> {
        let mut jobs: Vec<Arc<JobState>> = self.jobs().values().cloned().collect();
        jobs.sort_by(|a, b| a.name.cmp(&b.name));

        let mut out = Vec::new();
        for job in jobs {
            job.snapshot_into(&mut out);
        }
        out
    }
}

/// The name of the per job up metric, `<prefix>_up`
pub fn up_metric_name(prefix: &str) -> MetricName {
    if prefix.is_empty() {
        MetricName::new("up")
    } else {
        MetricName::from_segments(&[prefix, "up"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LabelKey, LabelSet, MetricPath, MetricTuple};

    fn families(value: f64) -> FamilySet {
        let tuples = vec![
            MetricTuple::new(MetricPath::new(["q1", "hits"]), LabelSet::default(), 42.0),
            MetricTuple::new(
                MetricPath::new(["q1", "status", "doc_count"]),
                LabelSet::default().with("status", "ok"),
                value,
            ),
        ];
        group(&tuples).unwrap()
    }

    #[test]
    fn register() {
        let store = MetricStateStore::new();
        let a = store.register("q1", up_metric_name("q1"));
        let b = store.register("q1", up_metric_name("other"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(store.job("q1").is_some());
        assert!(store.job("q2").is_none());
    }

    #[test]
    fn snapshot() {
        let store = MetricStateStore::new();
        let b = store.register("b", up_metric_name("b"));
        let a = store.register("a", up_metric_name("a"));

        let snap = store.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].name.as_str(), "a_up");
        assert_eq!(snap[0].samples, vec![(Vec::<String>::new(), 0.0)]);
        assert_eq!(snap[1].name.as_str(), "b_up");

        a.apply_success(families(40.0), StalePolicy::Drop);
        b.apply_failure(StalePolicy::Drop);
        let snap = store.snapshot();
        let names: Vec<&str> = snap.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a_up", "q1_hits", "q1_status_doc_count", "b_up"]);
        assert_eq!(snap[0].samples, vec![(Vec::<String>::new(), 1.0)]);
        assert_eq!(snap[2].label_keys, vec![LabelKey::new("status")]);
        assert_eq!(snap[2].samples, vec![(vec!["ok".to_string()], 40.0)]);
        assert_eq!(snap[3].samples, vec![(Vec::<String>::new(), 0.0)]);
    }

    #[test]
    fn failure_policy() {
        let store = MetricStateStore::new();
        let job = store.register("q1", up_metric_name("q1"));
        job.apply_success(families(40.0), StalePolicy::Drop);
        assert!(job.is_up());

        job.apply_failure(StalePolicy::Preserve);
        assert!(!job.is_up());
        assert_eq!(*job.load(), families(40.0));

        job.apply_failure(StalePolicy::Zero);
        let zeroed = job.load();
        let hits = zeroed.get(&MetricName::new("q1_hits")).unwrap();
        assert_eq!(hits.get(&[]), Some(0.0));
        let doc_count = zeroed.get(&MetricName::new("q1_status_doc_count")).unwrap();
        assert_eq!(doc_count.get(&["ok".to_string()]), Some(0.0));

        // drop clears everything
        job.apply_failure(StalePolicy::Drop);
        assert!(job.load().is_empty());
    }

    #[test]
    fn published_together() {
        let store = MetricStateStore::new();
        let job = store.register("q1", up_metric_name("q1"));
        let before = job.current();

        job.apply_success(families(40.0), StalePolicy::Drop);
        let after = job.current();
        assert!(!before.up);
        assert!(before.families.is_empty());
        assert!(after.up);
        assert_eq!(*after.families, families(40.0));

        job.apply_failure(StalePolicy::Preserve);
        let failed = job.current();
        assert!(!failed.up);
        assert!(Arc::ptr_eq(&failed.families, &after.families));
    }
}
