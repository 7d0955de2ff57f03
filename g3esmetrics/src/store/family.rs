/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::types::{LabelKey, MetricName, MetricTuple};

#[derive(Debug, Error, PartialEq)]
#[error("not all values for metric {metric} have the same label keys: {expected:?} vs. {found:?}")]
pub struct LabelKeyInconsistency {
    pub metric: MetricName,
    pub expected: Vec<String>,
    pub found: Vec<String>,
}

/// All values sharing one metric name.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricFamily {
    label_keys: Arc<[LabelKey]>,
    values: BTreeMap<Vec<String>, f64>,
}

pub type FamilySet = BTreeMap<MetricName, MetricFamily>;

impl MetricFamily {
    pub fn new(label_keys: Vec<LabelKey>) -> Self {
        MetricFamily {
            label_keys: label_keys.into(),
            values: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn label_keys(&self) -> &[LabelKey] {
        &self.label_keys
    }

    #[inline]
    pub fn values(&self) -> &BTreeMap<Vec<String>, f64> {
        &self.values
    }

    pub fn insert(&mut self, label_values: Vec<String>, value: f64) {
        self.values.insert(label_values, value);
    }

    pub fn get(&self, label_values: &[String]) -> Option<f64> {
        self.values.get(label_values).copied()
    }

    pub(super) fn same_key_set(&self, other: &[LabelKey]) -> bool {
        self.label_keys.len() == other.len() && other.iter().all(|k| self.label_keys.contains(k))
    }

    /// Position of each of our keys within `order`
    pub(super) fn key_positions(&self, order: &[LabelKey]) -> Vec<usize> {
        self.label_keys
            .iter()
            .map(|k| order.iter().position(|o| o == k).unwrap_or_default())
            .collect()
    }

    /// Rewrite every label value tuple to follow the key order of `keys`
    pub(super) fn reorder_as(&self, keys: &Arc<[LabelKey]>) -> MetricFamily {
        if *self.label_keys == **keys {
            return self.clone();
        }
        let positions = self.key_positions(keys);
        let values = self
            .values
            .iter()
            .map(|(label_values, v)| {
                let mut reordered = vec![String::new(); label_values.len()];
                for (i, value) in label_values.iter().enumerate() {
                    reordered[positions[i]] = value.clone();
                }
                (reordered, *v)
            })
            .collect();
        MetricFamily {
            label_keys: keys.clone(),
            values,
        }
    }

    pub(super) fn shared_keys(&self) -> &Arc<[LabelKey]> {
        &self.label_keys
    }

    pub(super) fn values_mut(&mut self) -> &mut BTreeMap<Vec<String>, f64> {
        &mut self.values
    }
}

/// Sanitize the label keys of one tuple.
///
/// If two raw keys collapse into the same key, the first position is kept
/// and the later value wins.
fn sanitized_labels(tuple: &MetricTuple) -> Vec<(LabelKey, String)> {
    let mut labels: Vec<(LabelKey, String)> = Vec::with_capacity(tuple.labels.len());
    for (raw_key, value) in tuple.labels.iter_joined() {
        let key = LabelKey::new(raw_key);
        match labels.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => labels.push((key, value)),
        }
    }
    labels
}

/// Group flattened tuples by metric name
pub fn group(tuples: &[MetricTuple]) -> Result<FamilySet, LabelKeyInconsistency> {
    let mut families = FamilySet::new();

    for tuple in tuples {
        let name = tuple.metric_name();
        let labels = sanitized_labels(tuple);

        let family = families.entry(name.clone()).or_insert_with(|| {
            MetricFamily::new(labels.iter().map(|(k, _)| k.clone()).collect())
        });

        let keys: Vec<LabelKey> = labels.iter().map(|(k, _)| k.clone()).collect();
        if !family.same_key_set(&keys) {
            return Err(LabelKeyInconsistency {
                metric: name,
                expected: family.label_keys().iter().map(|k| k.to_string()).collect(),
                found: keys.iter().map(|k| k.to_string()).collect(),
            });
        }

        let label_values = family
            .label_keys()
            .iter()
            .map(|k| {
                labels
                    .iter()
                    .find(|(lk, _)| lk == k)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default()
            })
            .collect();
        family.insert(label_values, tuple.value);
    }

    Ok(families)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LabelSet, MetricPath};

    fn tuple(path: &[&str], labels: &[(&str, &str)], value: f64) -> MetricTuple {
        let mut set = LabelSet::default();
        for (k, v) in labels {
            set = set.with(k, v);
        }
        MetricTuple::new(MetricPath::new(path.iter().copied()), set, value)
    }

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn group_values() {
        let tuples = vec![
            tuple(&["q1", "hits"], &[], 42.0),
            tuple(&["q1", "status", "doc_count"], &[("status", "ok")], 40.0),
            tuple(&["q1", "status", "doc_count"], &[("status", "error")], 2.0),
        ];
        let families = group(&tuples).unwrap();
        assert_eq!(families.len(), 2);

        let hits = families.get(&MetricName::new("q1_hits")).unwrap();
        assert!(hits.label_keys().is_empty());
        assert_eq!(hits.get(&[]), Some(42.0));

        let doc_count = families.get(&MetricName::new("q1_status_doc_count")).unwrap();
        assert_eq!(doc_count.label_keys(), &[LabelKey::new("status")]);
        let sorted: Vec<_> = doc_count.values().iter().collect();
        assert_eq!(sorted[0], (&s(&["error"]), &2.0));
        assert_eq!(sorted[1], (&s(&["ok"]), &40.0));
    }

    #[test]
    fn key_order_follows_first_seen() {
        let tuples = vec![
            tuple(&["m"], &[("b", "1"), ("a", "2")], 1.0),
            tuple(&["m"], &[("a", "3"), ("b", "4")], 2.0),
        ];
        let families = group(&tuples).unwrap();
        let m = families.get(&MetricName::new("m")).unwrap();
        assert_eq!(m.label_keys(), &[LabelKey::new("b"), LabelKey::new("a")]);
        assert_eq!(m.get(&s(&["4", "3"])), Some(2.0));
    }

    #[test]
    fn inconsistent_keys() {
        let tuples = vec![
            tuple(&["m"], &[("a", "1")], 1.0),
            tuple(&["m"], &[("b", "1")], 2.0),
        ];
        let e = group(&tuples).unwrap_err();
        assert_eq!(e.metric.as_str(), "m");
        assert_eq!(e.expected, s(&["a"]));
        assert_eq!(e.found, s(&["b"]));
    }

    #[test]
    fn colliding_keys() {
        let tuples = vec![tuple(&["m"], &[("a.b", "1"), ("x", "2"), ("a_b", "3")], 1.0)];
        let families = group(&tuples).unwrap();
        let m = families.get(&MetricName::new("m")).unwrap();
        assert_eq!(m.label_keys(), &[LabelKey::new("a_b"), LabelKey::new("x")]);
        assert_eq!(m.get(&s(&["3", "2"])), Some(1.0));
    }

    #[test]
    fn reorder() {
        let tuples = vec![tuple(&["m"], &[("a", "1"), ("b", "2")], 1.0)];
        let families = group(&tuples).unwrap();
        let m = families.get(&MetricName::new("m")).unwrap();
        let keys: Arc<[LabelKey]> = vec![LabelKey::new("b"), LabelKey::new("a")].into();
        let r = m.reorder_as(&keys);
        assert_eq!(r.get(&s(&["2", "1"])), Some(1.0));
    }
}
