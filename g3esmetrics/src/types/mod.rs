/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod name;
pub use name::MetricName;

mod label;
pub use label::{LabelKey, LabelSet};

mod path;
pub use path::MetricPath;

/// One flattened value, before grouping.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricTuple {
    pub path: MetricPath,
    pub labels: LabelSet,
    pub value: f64,
}

impl MetricTuple {
    pub fn new(path: MetricPath, labels: LabelSet, value: f64) -> Self {
        MetricTuple {
            path,
            labels,
            value,
        }
    }

    #[inline]
    pub fn metric_name(&self) -> MetricName {
        MetricName::from_segments(self.path.segments())
    }
}
