/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::sync::Arc;

/// An immutable list of metric name segments.
///
/// `join` returns a new path and leaves `self` untouched, so a path handed
/// down one branch of a document walk is never seen modified by a sibling.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MetricPath {
    segments: Arc<[String]>,
}

impl MetricPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MetricPath {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn join(&self, segment: &str) -> MetricPath {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment.to_string());
        MetricPath {
            segments: segments.into(),
        }
    }

    pub fn join_all(&self, more: &[&str]) -> MetricPath {
        let mut segments = Vec::with_capacity(self.segments.len() + more.len());
        segments.extend(self.segments.iter().cloned());
        segments.extend(more.iter().map(|s| s.to_string()));
        MetricPath {
            segments: segments.into(),
        }
    }

    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for MetricPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.segments.iter();
        let Some(s) = iter.next() else {
            return Ok(());
        };
        f.write_str(s)?;
        for s in iter {
            f.write_str(".")?;
            f.write_str(s)?;
        }
        Ok(())
    }
}
